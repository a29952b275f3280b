use serde::{Deserialize, Serialize};

/// Where a value lives, at compile time or at run time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MemoryAddress {
    /// Offset into the data section.
    Data(u32),
    /// Offset from the bottom of the operand stack.
    Stack(u32),
    /// Heap handle.
    Heap(u32),
}

impl MemoryAddress {
    /// The canonical null handle.
    pub const NULL: MemoryAddress = MemoryAddress::Heap(0);

    pub fn offset(self) -> u32 {
        match self {
            MemoryAddress::Data(o) | MemoryAddress::Stack(o) | MemoryAddress::Heap(o) => o,
        }
    }

    pub fn is_null(self) -> bool {
        self == Self::NULL
    }
}

impl std::fmt::Display for MemoryAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MemoryAddress::Data(o) => write!(f, "data+{:#06x}", o),
            MemoryAddress::Stack(o) => write!(f, "stack+{}", o),
            MemoryAddress::Heap(0) => write!(f, "null"),
            MemoryAddress::Heap(o) => write!(f, "heap#{}", o),
        }
    }
}
