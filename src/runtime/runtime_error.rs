use thiserror::Error;

use crate::bytecode::address::MemoryAddress;

/// Unrecoverable faults raised while running a script. `ip` is the index of
/// the faulting instruction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VmFault {
    #[error("stack overflow at {ip}: {needed} bytes needed, capacity {capacity}")]
    StackOverflow {
        ip: usize,
        needed: usize,
        capacity: usize,
    },

    #[error("stack underflow at {ip}: popped {wanted} bytes with {available} on the stack")]
    StackUnderflow {
        ip: usize,
        wanted: usize,
        available: usize,
    },

    #[error("division by zero at {ip}")]
    DivisionByZero { ip: usize },

    #[error("invalid opcode {tag:#04x} at {ip}")]
    InvalidOpcode { tag: u8, ip: usize },

    #[error("{address} is out of range at {ip}")]
    BadAddress { address: MemoryAddress, ip: usize },

    #[error("unsupported operand width {width} at {ip}")]
    BadWidth { width: u16, ip: usize },

    #[error("jump to {target} outside the code at {ip}")]
    BadJump { target: usize, ip: usize },
}

impl VmFault {
    pub fn ip(&self) -> usize {
        match self {
            VmFault::StackOverflow { ip, .. }
            | VmFault::StackUnderflow { ip, .. }
            | VmFault::DivisionByZero { ip }
            | VmFault::InvalidOpcode { ip, .. }
            | VmFault::BadAddress { ip, .. }
            | VmFault::BadWidth { ip, .. }
            | VmFault::BadJump { ip, .. } => *ip,
        }
    }
}
