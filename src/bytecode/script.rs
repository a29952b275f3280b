// =============================================================================
// SCRIPT - Compiled program container
// =============================================================================
//
// [Header]        36 bytes, little-endian
//   u64 signature
//   u64 version          major<<48 | minor<<32 | build<<16 | revision
//   i64 compiled_at      seconds since the Unix epoch
//   i32 data_start
//   i32 code_start
//   i32 module_name      data offset of the module name, -1 if undefined
// [Data]          code_start - data_start bytes
// [Code]          8-byte instructions up to the end of the buffer

use std::time::{SystemTime, UNIX_EPOCH};

use thiserror::Error;
use tracing::debug;

use super::data::DataArena;
use super::op::{INSTRUCTION_SIZE, Instruction};

/// `b"KEELBC\0\x01"` read as a little-endian u64.
pub const SIGNATURE: u64 = u64::from_le_bytes(*b"KEELBC\0\x01");

pub const HEADER_SIZE: usize = 36;

/// `module_name` value when the program has no module name.
pub const UNDEFINED_ADDRESS: i32 = -1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version {
    pub major: u16,
    pub minor: u16,
    pub build: u16,
    pub revision: u16,
}

impl Version {
    /// Version written by this build; the only one it loads.
    pub const CURRENT: Version = Version::new(0, 1, 0, 0);

    pub const fn new(major: u16, minor: u16, build: u16, revision: u16) -> Self {
        Self {
            major,
            minor,
            build,
            revision,
        }
    }

    pub fn pack(self) -> u64 {
        (self.major as u64) << 48
            | (self.minor as u64) << 32
            | (self.build as u64) << 16
            | self.revision as u64
    }

    pub fn unpack(packed: u64) -> Self {
        Self {
            major: (packed >> 48) as u16,
            minor: (packed >> 32) as u16,
            build: (packed >> 16) as u16,
            revision: packed as u16,
        }
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}.{}.{}.{}",
            self.major, self.minor, self.build, self.revision
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub signature: u64,
    pub version: Version,
    pub compiled_at: i64,
    pub data_start: i32,
    pub code_start: i32,
    pub module_name: i32,
}

impl Header {
    fn write(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.signature.to_le_bytes());
        out.extend_from_slice(&self.version.pack().to_le_bytes());
        out.extend_from_slice(&self.compiled_at.to_le_bytes());
        out.extend_from_slice(&self.data_start.to_le_bytes());
        out.extend_from_slice(&self.code_start.to_le_bytes());
        out.extend_from_slice(&self.module_name.to_le_bytes());
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    #[error("file is {len} bytes, too short for a header")]
    TooShort { len: usize },

    #[error("bad signature {found:#018x}")]
    BadSignature { found: u64 },

    #[error(
        "inconsistent offsets: data at {data_start}, code at {code_start}, file is {len} bytes"
    )]
    BadOffsets {
        data_start: i32,
        code_start: i32,
        len: usize,
    },

    #[error("code section of {len} bytes is not a whole number of instructions")]
    RaggedCode { len: usize },

    #[error("bytecode version {found} does not match {expected}")]
    VersionMismatch { found: Version, expected: Version },
}

/// An owned compiled program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Script {
    pub header: Header,
    pub data: Vec<u8>,
    pub code: Vec<Instruction>,
}

impl Script {
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out =
            Vec::with_capacity(HEADER_SIZE + self.data.len() + self.code.len() * INSTRUCTION_SIZE);
        self.header.write(&mut out);
        out.extend_from_slice(&self.data);
        for instruction in &self.code {
            out.extend_from_slice(&instruction.to_bytes());
        }
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Script, LoadError> {
        Ok(ScriptView::parse(bytes)?.to_owned())
    }

    pub fn view(&self) -> ScriptView<'_> {
        ScriptView {
            header: self.header,
            data: &self.data,
            code: CodeSlice::Owned(&self.code),
        }
    }
}

/// Instruction storage of a view: borrowed raw bytes from a file, or the
/// decoded instructions of an owned script.
#[derive(Debug, Clone, Copy)]
pub enum CodeSlice<'a> {
    Raw(&'a [u8]),
    Owned(&'a [Instruction]),
}

impl CodeSlice<'_> {
    pub fn len(&self) -> usize {
        match self {
            CodeSlice::Raw(bytes) => bytes.len() / INSTRUCTION_SIZE,
            CodeSlice::Owned(code) => code.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, index: usize) -> Option<Instruction> {
        match self {
            CodeSlice::Raw(bytes) => {
                let start = index.checked_mul(INSTRUCTION_SIZE)?;
                let chunk = bytes.get(start..start + INSTRUCTION_SIZE)?;
                let mut raw = [0u8; INSTRUCTION_SIZE];
                raw.copy_from_slice(chunk);
                Some(Instruction::from_bytes(raw))
            }
            CodeSlice::Owned(code) => code.get(index).copied(),
        }
    }
}

/// A validated program borrowed from a byte buffer.
#[derive(Debug, Clone, Copy)]
pub struct ScriptView<'a> {
    pub header: Header,
    pub data: &'a [u8],
    code: CodeSlice<'a>,
}

impl<'a> ScriptView<'a> {
    /// Validate `bytes` and slice it into data and code. Checks run in
    /// order: signature, offsets, version.
    pub fn parse(bytes: &'a [u8]) -> Result<Self, LoadError> {
        let signature = read_u64(bytes, 0).ok_or(LoadError::TooShort { len: bytes.len() })?;
        if signature != SIGNATURE {
            return Err(LoadError::BadSignature { found: signature });
        }
        if bytes.len() < HEADER_SIZE {
            return Err(LoadError::TooShort { len: bytes.len() });
        }

        let header = Header {
            signature,
            version: Version::unpack(read_u64(bytes, 8).unwrap_or_default()),
            compiled_at: read_u64(bytes, 16).unwrap_or_default() as i64,
            data_start: read_i32(bytes, 24).unwrap_or_default(),
            code_start: read_i32(bytes, 28).unwrap_or_default(),
            module_name: read_i32(bytes, 32).unwrap_or(UNDEFINED_ADDRESS),
        };

        let bad_offsets = LoadError::BadOffsets {
            data_start: header.data_start,
            code_start: header.code_start,
            len: bytes.len(),
        };
        let (Ok(data_start), Ok(code_start)) = (
            usize::try_from(header.data_start),
            usize::try_from(header.code_start),
        ) else {
            return Err(bad_offsets);
        };
        if data_start < HEADER_SIZE || data_start > code_start || code_start > bytes.len() {
            return Err(bad_offsets);
        }
        let code_len = bytes.len() - code_start;
        if code_len % INSTRUCTION_SIZE != 0 {
            return Err(LoadError::RaggedCode { len: code_len });
        }

        if header.version != Version::CURRENT {
            return Err(LoadError::VersionMismatch {
                found: header.version,
                expected: Version::CURRENT,
            });
        }

        Ok(Self {
            header,
            data: &bytes[data_start..code_start],
            code: CodeSlice::Raw(&bytes[code_start..]),
        })
    }

    pub fn instruction(&self, index: usize) -> Option<Instruction> {
        self.code.get(index)
    }

    /// Number of instructions.
    pub fn len(&self) -> usize {
        self.code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }

    pub fn instructions(&self) -> impl Iterator<Item = Instruction> + '_ {
        (0..self.len()).filter_map(|i| self.instruction(i))
    }

    /// The module name stored in the data section, if any.
    pub fn module_name(&self) -> Option<String> {
        let at = usize::try_from(self.header.module_name).ok()?;
        let count = read_i32(self.data, at)? as usize;
        let units = (0..count)
            .map(|i| {
                let o = at + 4 + i * 2;
                Some(u16::from_le_bytes([*self.data.get(o)?, *self.data.get(o + 1)?]))
            })
            .collect::<Option<Vec<u16>>>()?;
        String::from_utf16(&units).ok()
    }

    pub fn to_owned(&self) -> Script {
        Script {
            header: self.header,
            data: self.data.to_vec(),
            code: self.instructions().collect(),
        }
    }
}

fn read_u64(bytes: &[u8], at: usize) -> Option<u64> {
    let chunk: [u8; 8] = bytes.get(at..at + 8)?.try_into().ok()?;
    Some(u64::from_le_bytes(chunk))
}

fn read_i32(bytes: &[u8], at: usize) -> Option<i32> {
    let chunk: [u8; 4] = bytes.get(at..at + 4)?.try_into().ok()?;
    Some(i32::from_le_bytes(chunk))
}

/// Lay out a finished compilation. The module name, when given, is stored
/// in the data section.
pub fn assemble(mut data: DataArena, code: Vec<Instruction>, module_name: Option<&str>) -> Script {
    let module_name = match module_name {
        Some(name) => data.add(name).offset() as i32,
        None => UNDEFINED_ADDRESS,
    };
    let data = data.to_bytes();

    let compiled_at = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0);

    let header = Header {
        signature: SIGNATURE,
        version: Version::CURRENT,
        compiled_at,
        data_start: HEADER_SIZE as i32,
        code_start: (HEADER_SIZE + data.len()) as i32,
        module_name,
    };
    debug!(
        data = data.len(),
        instructions = code.len(),
        total = HEADER_SIZE + data.len() + code.len() * INSTRUCTION_SIZE,
        "script assembled"
    );

    Script { header, data, code }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::op::{NumKind, Opcode};
    use pretty_assertions::assert_eq;

    fn sample() -> Script {
        let mut data = DataArena::new();
        let a = data.add(200u8);
        let b = data.add(-100i8);
        let code = vec![
            Instruction::sized(Opcode::PushData, 1, a.offset()),
            Instruction::count(Opcode::Pop, 0),
            Instruction::sized(Opcode::PushData, 1, b.offset()),
            Instruction::typed(Opcode::AddInt, 1, NumKind::Signed),
        ];
        assemble(data, code, Some("demo"))
    }

    #[test]
    fn test_roundtrip() {
        let script = sample();
        let bytes = script.to_bytes();
        let back = Script::from_bytes(&bytes).unwrap();
        assert_eq!(back, script);
        assert_eq!(back.to_bytes(), bytes);
    }

    #[test]
    fn test_layout() {
        let script = sample();
        let bytes = script.to_bytes();
        assert_eq!(&bytes[..8], b"KEELBC\0\x01");
        assert_eq!(script.header.data_start, 36);
        // two bytes, then "demo" (12 bytes) bumped to offset 8, padded to 32
        assert_eq!(script.header.module_name, 8);
        assert_eq!(script.header.code_start, 36 + 32);
        assert_eq!(bytes.len(), 36 + 32 + 4 * 8);
    }

    #[test]
    fn test_module_name() {
        let script = sample();
        let bytes = script.to_bytes();
        let view = ScriptView::parse(&bytes).unwrap();
        assert_eq!(view.module_name().as_deref(), Some("demo"));

        let anonymous = assemble(DataArena::new(), vec![], None);
        assert_eq!(anonymous.header.module_name, UNDEFINED_ADDRESS);
        assert_eq!(anonymous.view().module_name(), None);
    }

    #[test]
    fn test_version_packing() {
        let v = Version::new(1, 2, 3, 4);
        assert_eq!(v.pack(), 0x0001_0002_0003_0004);
        assert_eq!(Version::unpack(v.pack()), v);
    }

    #[test]
    fn test_bad_signature() {
        let mut bytes = sample().to_bytes();
        bytes[0] = b'X';
        assert!(matches!(
            ScriptView::parse(&bytes),
            Err(LoadError::BadSignature { .. })
        ));
    }

    #[test]
    fn test_truncated_file() {
        let bytes = sample().to_bytes();
        assert_eq!(
            ScriptView::parse(&bytes[..4]).unwrap_err(),
            LoadError::TooShort { len: 4 }
        );
        assert!(matches!(
            ScriptView::parse(&bytes[..30]),
            Err(LoadError::TooShort { len: 30 })
        ));
        // header intact, data cut short
        assert!(matches!(
            ScriptView::parse(&bytes[..40]),
            Err(LoadError::BadOffsets { .. })
        ));
    }

    #[test]
    fn test_ragged_code() {
        let mut bytes = sample().to_bytes();
        bytes.push(0);
        assert_eq!(
            ScriptView::parse(&bytes).unwrap_err(),
            LoadError::RaggedCode { len: 33 }
        );
    }

    #[test]
    fn test_version_gate_before_body() {
        let mut script = sample();
        script.header.version = Version::new(0, 2, 0, 0);
        let bytes = script.to_bytes();
        assert_eq!(
            ScriptView::parse(&bytes).unwrap_err(),
            LoadError::VersionMismatch {
                found: Version::new(0, 2, 0, 0),
                expected: Version::CURRENT,
            }
        );
    }

    #[test]
    fn test_view_reads_instructions_in_place() {
        let script = sample();
        let bytes = script.to_bytes();
        let view = ScriptView::parse(&bytes).unwrap();
        assert_eq!(view.len(), 4);
        assert_eq!(view.instruction(3).and_then(|i| i.opcode()), Some(Opcode::AddInt));
        assert_eq!(view.instruction(4), None);
    }
}
