use std::collections::HashMap;

use tracing::trace;

use super::address::MemoryAddress;
use crate::types::literal::IntegerLiteral;
use crate::types::primitive::Primitive;

/// Allocation unit of the data section. Objects whose size is not a multiple
/// of it leave a hole behind.
pub const ALIGNMENT: u32 = 8;

/// The finished blob is padded to a multiple of this.
pub const BLOB_ALIGNMENT: u32 = 16;

/// A typed compile-time constant headed for the data section.
#[derive(Debug, Clone, PartialEq)]
pub enum Constant {
    Bool(bool),
    /// One UTF-16 code unit.
    Char(u16),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    I128(i128),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    U128(u128),
    /// binary16 bits.
    F16(u16),
    F32(f32),
    F64(f64),
    Str(String),
}

macro_rules! constant_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Constant {
                fn from(value: $ty) -> Self {
                    Constant::$variant(value)
                }
            }
        )*
    };
}

constant_from! {
    bool => Bool,
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    i128 => I128,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    u128 => U128,
    f32 => F32,
    f64 => F64,
    String => Str,
}

impl From<&str> for Constant {
    fn from(value: &str) -> Self {
        Constant::Str(value.to_string())
    }
}

impl Constant {
    /// An integer literal stored at the given integer width.
    pub fn integer(primitive: Primitive, literal: &IntegerLiteral) -> Option<Self> {
        let mut bytes = [0u8; 16];
        let le = literal.to_le_bytes(primitive);
        bytes[..le.len()].copy_from_slice(&le);
        let wide = u128::from_le_bytes(bytes);

        Some(match primitive {
            Primitive::I8 => Constant::I8(wide as u8 as i8),
            Primitive::I16 => Constant::I16(wide as u16 as i16),
            Primitive::I32 => Constant::I32(wide as u32 as i32),
            Primitive::I64 => Constant::I64(wide as u64 as i64),
            Primitive::I128 => Constant::I128(wide as i128),
            Primitive::U8 => Constant::U8(wide as u8),
            Primitive::U16 => Constant::U16(wide as u16),
            Primitive::U32 => Constant::U32(wide as u32),
            Primitive::U64 => Constant::U64(wide as u64),
            Primitive::U128 => Constant::U128(wide),
            _ => return None,
        })
    }

    /// A float value stored at the given float width.
    pub fn float(primitive: Primitive, value: f64) -> Option<Self> {
        Some(match primitive {
            Primitive::F16 => {
                Constant::F16(crate::types::literal::f16_bits_from_f32(value as f32))
            }
            Primitive::F32 => Constant::F32(value as f32),
            Primitive::F64 => Constant::F64(value),
            _ => return None,
        })
    }

    // Distinguishes bit-identical payloads of different types.
    fn tag(&self) -> u8 {
        match self {
            Constant::Bool(_) => 0,
            Constant::Char(_) => 1,
            Constant::I8(_) => 2,
            Constant::I16(_) => 3,
            Constant::I32(_) => 4,
            Constant::I64(_) => 5,
            Constant::I128(_) => 6,
            Constant::U8(_) => 7,
            Constant::U16(_) => 8,
            Constant::U32(_) => 9,
            Constant::U64(_) => 10,
            Constant::U128(_) => 11,
            Constant::F16(_) => 12,
            Constant::F32(_) => 13,
            Constant::F64(_) => 14,
            Constant::Str(_) => 15,
        }
    }

    /// Little-endian encoding. Strings are a u32 length in code units
    /// followed by UTF-16 code units.
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            Constant::Bool(v) => vec![*v as u8],
            Constant::Char(v) => v.to_le_bytes().to_vec(),
            Constant::I8(v) => v.to_le_bytes().to_vec(),
            Constant::I16(v) => v.to_le_bytes().to_vec(),
            Constant::I32(v) => v.to_le_bytes().to_vec(),
            Constant::I64(v) => v.to_le_bytes().to_vec(),
            Constant::I128(v) => v.to_le_bytes().to_vec(),
            Constant::U8(v) => v.to_le_bytes().to_vec(),
            Constant::U16(v) => v.to_le_bytes().to_vec(),
            Constant::U32(v) => v.to_le_bytes().to_vec(),
            Constant::U64(v) => v.to_le_bytes().to_vec(),
            Constant::U128(v) => v.to_le_bytes().to_vec(),
            Constant::F16(v) => v.to_le_bytes().to_vec(),
            Constant::F32(v) => v.to_le_bytes().to_vec(),
            Constant::F64(v) => v.to_le_bytes().to_vec(),
            Constant::Str(s) => {
                let units: Vec<u16> = s.encode_utf16().collect();
                let mut out = Vec::with_capacity(4 + units.len() * 2);
                out.extend_from_slice(&(units.len() as u32).to_le_bytes());
                for unit in units {
                    out.extend_from_slice(&unit.to_le_bytes());
                }
                out
            }
        }
    }

    pub fn size(&self) -> u32 {
        match self {
            Constant::Str(s) => 4 + s.encode_utf16().count() as u32 * 2,
            other => other.to_bytes().len() as u32,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Hole {
    offset: u32,
    len: u32,
}

/// Deduplicating allocator for the data section.
#[derive(Debug, Default)]
pub struct DataArena {
    mark: u32,
    holes: Vec<Hole>,
    objects: Vec<(u32, Vec<u8>)>,
    index: HashMap<(u8, Vec<u8>), u32>,
}

impl DataArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a constant and return its address. Bit-identical constants of
    /// the same type share one address.
    pub fn add(&mut self, value: impl Into<Constant>) -> MemoryAddress {
        let value = value.into();
        let bytes = value.to_bytes();
        let key = (value.tag(), bytes);

        if let Some(&offset) = self.index.get(&key) {
            return MemoryAddress::Data(offset);
        }

        let offset = self.allocate(key.1.len() as u32);
        trace!(offset, size = key.1.len(), ?value, "constant allocated");
        self.objects.push((offset, key.1.clone()));
        self.index.insert(key, offset);
        MemoryAddress::Data(offset)
    }

    fn allocate(&mut self, size: u32) -> u32 {
        if size % ALIGNMENT == 0 {
            let at = self.mark;
            self.mark += size;
            return at;
        }

        if size < ALIGNMENT {
            if let Some(i) = self.holes.iter().position(|h| h.len >= size) {
                let hole = &mut self.holes[i];
                let at = hole.offset;
                hole.offset += size;
                hole.len -= size;
                if hole.len == 0 {
                    self.holes.remove(i);
                }
                return at;
            }
        }

        let at = self.mark;
        let rounded = round_up(size, ALIGNMENT);
        self.mark += rounded;
        self.holes.push(Hole {
            offset: at + size,
            len: rounded - size,
        });
        at
    }

    /// High-water mark in bytes.
    pub fn len(&self) -> u32 {
        self.mark
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Lay every stored object out in one contiguous blob.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut blob = vec![0u8; round_up(self.mark, BLOB_ALIGNMENT) as usize];
        for (offset, bytes) in &self.objects {
            let start = *offset as usize;
            blob[start..start + bytes.len()].copy_from_slice(bytes);
        }
        blob
    }
}

fn round_up(value: u32, unit: u32) -> u32 {
    value.div_ceil(unit) * unit
}
