//! Bytecode: the instruction set, the data section, the script file format
//! and a disassembler.

pub mod address;
pub mod data;
pub mod disasm;
pub mod op;
pub mod script;

pub use address::MemoryAddress;
pub use data::{Constant, DataArena};
pub use op::{Instruction, NumKind, Opcode};
pub use script::{LoadError, Script, ScriptView, Version};
