// =============================================================================
// OP - Bytecode instructions
// =============================================================================

/// Size in bytes of one encoded instruction.
pub const INSTRUCTION_SIZE: usize = 8;

// Payload field offsets. `WORD` overlaps the second type-size field; no
// opcode uses both.
const WIDTH: usize = 1;
const SECOND: usize = 3;
const WORD: usize = 4;

/// Opcode tag, the first byte of every instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Opcode {
    // control
    Halt = 0x00,
    DebugPause = 0x01,
    Jump = 0x02,
    JumpIfFalse = 0x03,

    // stack moves
    PushData = 0x10,
    PushStack = 0x11,
    AssignStack = 0x12,
    PushZero = 0x13,
    Pop = 0x14,
    PushDataRef = 0x15,

    // casts: width = source size, second = destination size
    CastFloatToFloat = 0x20,
    CastSignedToFloat = 0x21,
    CastUnsignedToFloat = 0x22,
    CastFloatToSigned = 0x23,
    CastFloatToUnsigned = 0x24,
    SignExtend = 0x25,

    // arithmetic: width = operand size, second = NumKind
    AddInt = 0x30,
    AddFloat = 0x31,
    SubInt = 0x32,
    SubFloat = 0x33,
    MulInt = 0x34,
    MulFloat = 0x35,
    DivInt = 0x36,
    DivFloat = 0x37,
    ModInt = 0x38,
    ModFloat = 0x39,

    // bits
    ShiftLeft = 0x40,
    ShiftRight = 0x41,
    BitAnd = 0x42,
    BitOr = 0x43,
    BitXor = 0x44,

    // comparison
    Eq = 0x50,
    Neq = 0x51,
    Lt = 0x52,
    Lte = 0x53,
    Gt = 0x54,
    Gte = 0x55,

    // unary
    IncInt = 0x60,
    IncFloat = 0x61,
    DecInt = 0x62,
    DecFloat = 0x63,
    NegInt = 0x64,
    NegFloat = 0x65,
    Not = 0x66,
}

impl Opcode {
    pub fn from_u8(byte: u8) -> Option<Opcode> {
        use Opcode::*;
        Some(match byte {
            0x00 => Halt,
            0x01 => DebugPause,
            0x02 => Jump,
            0x03 => JumpIfFalse,
            0x10 => PushData,
            0x11 => PushStack,
            0x12 => AssignStack,
            0x13 => PushZero,
            0x14 => Pop,
            0x15 => PushDataRef,
            0x20 => CastFloatToFloat,
            0x21 => CastSignedToFloat,
            0x22 => CastUnsignedToFloat,
            0x23 => CastFloatToSigned,
            0x24 => CastFloatToUnsigned,
            0x25 => SignExtend,
            0x30 => AddInt,
            0x31 => AddFloat,
            0x32 => SubInt,
            0x33 => SubFloat,
            0x34 => MulInt,
            0x35 => MulFloat,
            0x36 => DivInt,
            0x37 => DivFloat,
            0x38 => ModInt,
            0x39 => ModFloat,
            0x40 => ShiftLeft,
            0x41 => ShiftRight,
            0x42 => BitAnd,
            0x43 => BitOr,
            0x44 => BitXor,
            0x50 => Eq,
            0x51 => Neq,
            0x52 => Lt,
            0x53 => Lte,
            0x54 => Gt,
            0x55 => Gte,
            0x60 => IncInt,
            0x61 => IncFloat,
            0x62 => DecInt,
            0x63 => DecFloat,
            0x64 => NegInt,
            0x65 => NegFloat,
            0x66 => Not,
            _ => return None,
        })
    }

    /// Mnemonic used by the disassembler.
    pub fn name(self) -> &'static str {
        use Opcode::*;
        match self {
            Halt => "HALT",
            DebugPause => "DEBUG",
            Jump => "JUMP",
            JumpIfFalse => "JUMP_FALSE",
            PushData => "PUSH_DATA",
            PushStack => "PUSH_STACK",
            AssignStack => "ASSIGN",
            PushZero => "PUSH_ZERO",
            Pop => "POP",
            PushDataRef => "PUSH_REF",
            CastFloatToFloat => "F2F",
            CastSignedToFloat => "S2F",
            CastUnsignedToFloat => "U2F",
            CastFloatToSigned => "F2S",
            CastFloatToUnsigned => "F2U",
            SignExtend => "SEXT",
            AddInt => "ADD",
            AddFloat => "FADD",
            SubInt => "SUB",
            SubFloat => "FSUB",
            MulInt => "MUL",
            MulFloat => "FMUL",
            DivInt => "DIV",
            DivFloat => "FDIV",
            ModInt => "MOD",
            ModFloat => "FMOD",
            ShiftLeft => "SHL",
            ShiftRight => "SHR",
            BitAnd => "AND",
            BitOr => "OR",
            BitXor => "XOR",
            Eq => "EQ",
            Neq => "NEQ",
            Lt => "LT",
            Lte => "LTE",
            Gt => "GT",
            Gte => "GTE",
            IncInt => "INC",
            IncFloat => "FINC",
            DecInt => "DEC",
            DecFloat => "FDEC",
            NegInt => "NEG",
            NegFloat => "FNEG",
            Not => "NOT",
        }
    }

    /// How the payload bytes are read for this opcode.
    pub fn family(self) -> OperandFamily {
        use Opcode::*;
        match self {
            DebugPause => OperandFamily::None,
            Halt => OperandFamily::Code,
            Jump | JumpIfFalse => OperandFamily::Target,
            PushData | PushStack | AssignStack => OperandFamily::SizedAddress,
            PushDataRef => OperandFamily::Address,
            PushZero | Pop => OperandFamily::Count,
            CastFloatToFloat | CastSignedToFloat | CastUnsignedToFloat | CastFloatToSigned
            | CastFloatToUnsigned | SignExtend => OperandFamily::Sizes,
            _ => OperandFamily::Typed,
        }
    }
}

/// Payload shapes, one per opcode family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandFamily {
    None,
    /// `word` is an i32 return code.
    Code,
    /// `word` is an instruction index.
    Target,
    /// `width` bytes at address `word`.
    SizedAddress,
    /// Address `word` only.
    Address,
    /// `word` is a byte count.
    Count,
    /// `width` = source size, `second` = destination size.
    Sizes,
    /// `width` = operand size, `second` = [`NumKind`].
    Typed,
}

/// How typed opcodes interpret their operand bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum NumKind {
    Unsigned = 0,
    Signed = 1,
    Float = 2,
}

impl NumKind {
    pub fn from_u16(value: u16) -> Option<NumKind> {
        match value {
            0 => Some(NumKind::Unsigned),
            1 => Some(NumKind::Signed),
            2 => Some(NumKind::Float),
            _ => None,
        }
    }
}

/// One fixed-size instruction: a tag byte and seven payload bytes whose
/// meaning depends on the tag.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Instruction([u8; INSTRUCTION_SIZE]);

impl Instruction {
    pub fn from_bytes(bytes: [u8; INSTRUCTION_SIZE]) -> Self {
        Self(bytes)
    }

    pub fn to_bytes(self) -> [u8; INSTRUCTION_SIZE] {
        self.0
    }

    fn with_tag(opcode: Opcode) -> Self {
        let mut bytes = [0u8; INSTRUCTION_SIZE];
        bytes[0] = opcode as u8;
        Self(bytes)
    }

    fn set_width(mut self, value: u16) -> Self {
        self.0[WIDTH..WIDTH + 2].copy_from_slice(&value.to_le_bytes());
        self
    }

    fn set_second(mut self, value: u16) -> Self {
        self.0[SECOND..SECOND + 2].copy_from_slice(&value.to_le_bytes());
        self
    }

    fn set_word(mut self, value: u32) -> Self {
        self.0[WORD..WORD + 4].copy_from_slice(&value.to_le_bytes());
        self
    }

    // ----- constructors, one per family -----

    pub fn simple(opcode: Opcode) -> Self {
        Self::with_tag(opcode)
    }

    pub fn halt(code: i32) -> Self {
        Self::with_tag(Opcode::Halt).set_word(code as u32)
    }

    pub fn jump(opcode: Opcode, target: u32) -> Self {
        Self::with_tag(opcode).set_word(target)
    }

    pub fn sized(opcode: Opcode, width: u16, address: u32) -> Self {
        Self::with_tag(opcode).set_width(width).set_word(address)
    }

    pub fn address(opcode: Opcode, address: u32) -> Self {
        Self::with_tag(opcode).set_word(address)
    }

    pub fn count(opcode: Opcode, count: u32) -> Self {
        Self::with_tag(opcode).set_word(count)
    }

    pub fn cast(opcode: Opcode, from: u16, to: u16) -> Self {
        Self::with_tag(opcode).set_width(from).set_second(to)
    }

    pub fn typed(opcode: Opcode, width: u16, kind: NumKind) -> Self {
        Self::with_tag(opcode).set_width(width).set_second(kind as u16)
    }

    // ----- accessors -----

    pub fn tag(&self) -> u8 {
        self.0[0]
    }

    pub fn opcode(&self) -> Option<Opcode> {
        Opcode::from_u8(self.0[0])
    }

    pub fn width(&self) -> u16 {
        u16::from_le_bytes([self.0[WIDTH], self.0[WIDTH + 1]])
    }

    pub fn second(&self) -> u16 {
        u16::from_le_bytes([self.0[SECOND], self.0[SECOND + 1]])
    }

    pub fn word(&self) -> u32 {
        u32::from_le_bytes([
            self.0[WORD],
            self.0[WORD + 1],
            self.0[WORD + 2],
            self.0[WORD + 3],
        ])
    }

    pub fn code(&self) -> i32 {
        self.word() as i32
    }

    pub fn kind(&self) -> Option<NumKind> {
        NumKind::from_u16(self.second())
    }

    /// Bytes `(popped, pushed)` on the operand stack. `None` for an
    /// unknown tag.
    pub fn stack_effect(&self) -> Option<(u32, u32)> {
        use Opcode::*;
        let width = self.width() as u32;
        Some(match self.opcode()? {
            Halt | DebugPause | Jump => (0, 0),
            JumpIfFalse => (1, 0),
            PushData | PushStack => (0, width),
            AssignStack => (width, 0),
            PushZero => (0, self.word()),
            Pop => (self.word(), 0),
            PushDataRef => (0, 8),
            CastFloatToFloat | CastSignedToFloat | CastUnsignedToFloat | CastFloatToSigned
            | CastFloatToUnsigned | SignExtend => (width, self.second() as u32),
            Eq | Neq | Lt | Lte | Gt | Gte => (2 * width, 1),
            IncInt | IncFloat | DecInt | DecFloat | NegInt | NegFloat | Not => (width, width),
            _ => (2 * width, width),
        })
    }
}

impl std::fmt::Debug for Instruction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let Some(opcode) = self.opcode() else {
            return write!(f, "INVALID({:#04x})", self.tag());
        };
        match opcode.family() {
            OperandFamily::None => write!(f, "{}", opcode.name()),
            OperandFamily::Code => write!(f, "{} {}", opcode.name(), self.code()),
            OperandFamily::Target => write!(f, "{} @{}", opcode.name(), self.word()),
            OperandFamily::SizedAddress => {
                write!(f, "{} {}b @{}", opcode.name(), self.width(), self.word())
            }
            OperandFamily::Address => write!(f, "{} @{}", opcode.name(), self.word()),
            OperandFamily::Count => write!(f, "{} {}b", opcode.name(), self.word()),
            OperandFamily::Sizes => {
                write!(f, "{} {}b->{}b", opcode.name(), self.width(), self.second())
            }
            OperandFamily::Typed => {
                write!(f, "{} {}b {:?}", opcode.name(), self.width(), self.kind())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_opcode_roundtrips_through_its_tag() {
        for byte in 0..=u8::MAX {
            if let Some(op) = Opcode::from_u8(byte) {
                assert_eq!(op as u8, byte);
            }
        }
        assert_eq!(Opcode::from_u8(0xFF), None);
    }

    #[test]
    fn test_field_overlay() {
        let ins = Instruction::sized(Opcode::PushData, 4, 0x0102_0304);
        assert_eq!(ins.to_bytes(), [0x10, 4, 0, 0, 0x04, 0x03, 0x02, 0x01]);
        assert_eq!(ins.width(), 4);
        assert_eq!(ins.word(), 0x0102_0304);

        let cast = Instruction::cast(Opcode::CastSignedToFloat, 2, 8);
        assert_eq!(cast.width(), 2);
        assert_eq!(cast.second(), 8);

        let halt = Instruction::halt(-3);
        assert_eq!(halt.code(), -3);
    }

    #[test]
    fn test_typed_kind() {
        let add = Instruction::typed(Opcode::AddInt, 1, NumKind::Signed);
        assert_eq!(add.kind(), Some(NumKind::Signed));
        assert_eq!(format!("{:?}", add), "ADD 1b Some(Signed)");
    }

    #[test]
    fn test_stack_effects() {
        let add = Instruction::typed(Opcode::AddInt, 4, NumKind::Signed);
        assert_eq!(add.stack_effect(), Some((8, 4)));

        let lt = Instruction::typed(Opcode::Lt, 8, NumKind::Float);
        assert_eq!(lt.stack_effect(), Some((16, 1)));

        let widen = Instruction::cast(Opcode::SignExtend, 1, 4);
        assert_eq!(widen.stack_effect(), Some((1, 4)));

        let branch = Instruction::jump(Opcode::JumpIfFalse, 12);
        assert_eq!(branch.stack_effect(), Some((1, 0)));

        assert_eq!(Instruction::count(Opcode::Pop, 6).stack_effect(), Some((6, 0)));
        assert_eq!(Instruction::from_bytes([0xEE; 8]).stack_effect(), None);
    }

    #[test]
    fn test_debug_of_invalid_tag() {
        let ins = Instruction::from_bytes([0xEE, 0, 0, 0, 0, 0, 0, 0]);
        assert_eq!(ins.opcode(), None);
        assert_eq!(format!("{:?}", ins), "INVALID(0xee)");
    }
}
