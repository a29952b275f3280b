//! # Keel
//!
//! A statically typed language core: a two-pass compiler from syntax trees
//! to a compact bytecode container, and the virtual machine that runs it.

pub mod bytecode;
pub mod compiler;
pub mod lang;
pub mod runtime;
pub mod types;
