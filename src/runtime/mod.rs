//! Byte-stack virtual machine that runs assembled scripts.

pub mod runtime_error;
pub mod vm;

pub use runtime_error::VmFault;
pub use vm::{Exit, Vm, VmConfig};
