use serde::{Deserialize, Serialize};

/// Numeric family of a primitive. Drives both cast classification and the
/// flavor of arithmetic opcodes the emitter picks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Family {
    Bool,
    Char,
    Signed,
    Unsigned,
    Float,
}

/// Built-in value types.
///
/// The discriminant is the stable ordinal used to index the cast matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Primitive {
    Bool = 0,
    Char = 1,
    I8 = 2,
    I16 = 3,
    I32 = 4,
    I64 = 5,
    I128 = 6,
    U8 = 7,
    U16 = 8,
    U32 = 9,
    U64 = 10,
    U128 = 11,
    F16 = 12,
    F32 = 13,
    F64 = 14,
}

impl Primitive {
    pub const COUNT: usize = 15;

    pub const ALL: [Primitive; Primitive::COUNT] = [
        Primitive::Bool,
        Primitive::Char,
        Primitive::I8,
        Primitive::I16,
        Primitive::I32,
        Primitive::I64,
        Primitive::I128,
        Primitive::U8,
        Primitive::U16,
        Primitive::U32,
        Primitive::U64,
        Primitive::U128,
        Primitive::F16,
        Primitive::F32,
        Primitive::F64,
    ];

    pub const SIGNED: [Primitive; 5] = [
        Primitive::I8,
        Primitive::I16,
        Primitive::I32,
        Primitive::I64,
        Primitive::I128,
    ];

    pub const UNSIGNED: [Primitive; 5] = [
        Primitive::U8,
        Primitive::U16,
        Primitive::U32,
        Primitive::U64,
        Primitive::U128,
    ];

    pub fn ordinal(self) -> usize {
        self as usize
    }

    /// Size in bytes of a value of this type on the operand stack.
    pub fn size(self) -> u16 {
        match self {
            Primitive::Bool | Primitive::I8 | Primitive::U8 => 1,
            Primitive::Char | Primitive::I16 | Primitive::U16 | Primitive::F16 => 2,
            Primitive::I32 | Primitive::U32 | Primitive::F32 => 4,
            Primitive::I64 | Primitive::U64 | Primitive::F64 => 8,
            Primitive::I128 | Primitive::U128 => 16,
        }
    }

    pub fn family(self) -> Family {
        match self {
            Primitive::Bool => Family::Bool,
            Primitive::Char => Family::Char,
            Primitive::I8 | Primitive::I16 | Primitive::I32 | Primitive::I64 | Primitive::I128 => {
                Family::Signed
            }
            Primitive::U8 | Primitive::U16 | Primitive::U32 | Primitive::U64 | Primitive::U128 => {
                Family::Unsigned
            }
            Primitive::F16 | Primitive::F32 | Primitive::F64 => Family::Float,
        }
    }

    /// Name the type is visible under in source code.
    pub fn name(self) -> &'static str {
        match self {
            Primitive::Bool => "bool",
            Primitive::Char => "char",
            Primitive::I8 => "i8",
            Primitive::I16 => "i16",
            Primitive::I32 => "i32",
            Primitive::I64 => "i64",
            Primitive::I128 => "i128",
            Primitive::U8 => "u8",
            Primitive::U16 => "u16",
            Primitive::U32 => "u32",
            Primitive::U64 => "u64",
            Primitive::U128 => "u128",
            Primitive::F16 => "f16",
            Primitive::F32 => "f32",
            Primitive::F64 => "f64",
        }
    }

    pub fn is_integer(self) -> bool {
        matches!(self.family(), Family::Signed | Family::Unsigned)
    }

    pub fn is_float(self) -> bool {
        self.family() == Family::Float
    }

    pub fn is_numeric(self) -> bool {
        self.is_integer() || self.is_float()
    }

    pub fn is_signed(self) -> bool {
        self.family() == Family::Signed
    }

    /// Smallest signed integer type of at least `bytes` bytes.
    pub fn signed_with_size(bytes: u16) -> Option<Primitive> {
        Primitive::SIGNED.into_iter().find(|p| p.size() >= bytes)
    }

    /// Smallest unsigned integer type of at least `bytes` bytes.
    pub fn unsigned_with_size(bytes: u16) -> Option<Primitive> {
        Primitive::UNSIGNED.into_iter().find(|p| p.size() >= bytes)
    }
}

impl std::fmt::Display for Primitive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
