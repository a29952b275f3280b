use std::cmp::Ordering;

use tracing::{debug, trace};

use crate::bytecode::address::MemoryAddress;
use crate::bytecode::op::{Instruction, NumKind, Opcode};
use crate::bytecode::script::ScriptView;
use crate::runtime::runtime_error::VmFault;
use crate::types::literal::{f16_bits_from_f32, f32_from_f16_bits};

pub const DEFAULT_STACK_SIZE: usize = 64 * 1024;

/// Widest integer operand, in bytes.
const MAX_INT_WIDTH: usize = 16;

#[derive(Debug, Clone)]
pub struct VmConfig {
    /// Operand stack capacity in bytes.
    pub stack_size: usize,
}

impl Default for VmConfig {
    fn default() -> Self {
        VmConfig {
            stack_size: DEFAULT_STACK_SIZE,
        }
    }
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    /// A `HALT` instruction ran with this code.
    Halted(i32),
    /// The instruction pointer ran off the end of the code.
    Finished,
}

impl Exit {
    pub fn code(self) -> i32 {
        match self {
            Exit::Halted(code) => code,
            Exit::Finished => 0,
        }
    }
}

enum Flow {
    Next,
    Goto(usize),
    Halt(i32),
}

/// Byte-stack interpreter. Values are stored little-endian; every typed
/// instruction says how wide its operands are.
pub struct Vm {
    stack: Vec<u8>,
    config: VmConfig,
    steps: u64,
}

impl Default for Vm {
    fn default() -> Self {
        Self::new()
    }
}

impl Vm {
    pub fn new() -> Self {
        Self::with_config(VmConfig::default())
    }

    pub fn with_config(config: VmConfig) -> Self {
        Self {
            stack: Vec::with_capacity(config.stack_size),
            config,
            steps: 0,
        }
    }

    pub fn stack(&self) -> &[u8] {
        &self.stack
    }

    /// The top `n` bytes of the stack.
    pub fn top(&self, n: usize) -> Option<&[u8]> {
        let start = self.stack.len().checked_sub(n)?;
        Some(&self.stack[start..])
    }

    /// Instructions executed by the last run.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Run a script from its first instruction on an empty stack.
    pub fn run(&mut self, script: &ScriptView) -> Result<Exit, VmFault> {
        self.stack.clear();
        self.steps = 0;
        debug!(
            instructions = script.len(),
            data = script.data.len(),
            "vm start"
        );

        let mut ip = 0;
        while ip < script.len() {
            let ins = script
                .instruction(ip)
                .ok_or(VmFault::BadJump { target: ip, ip })?;
            self.steps += 1;
            trace!(ip, sp = self.stack.len(), op = ?ins, "step");

            match self.step(ip, &ins, script.data)? {
                Flow::Next => ip += 1,
                Flow::Goto(target) => {
                    if target > script.len() {
                        return Err(VmFault::BadJump { target, ip });
                    }
                    ip = target;
                }
                Flow::Halt(code) => {
                    debug!(code, steps = self.steps, "vm halted");
                    return Ok(Exit::Halted(code));
                }
            }
        }

        debug!(steps = self.steps, sp = self.stack.len(), "vm finished");
        Ok(Exit::Finished)
    }

    fn step(&mut self, ip: usize, ins: &Instruction, data: &[u8]) -> Result<Flow, VmFault> {
        use Opcode::*;

        let opcode = ins.opcode().ok_or(VmFault::InvalidOpcode {
            tag: ins.tag(),
            ip,
        })?;
        let width = ins.width() as usize;
        let second = ins.second() as usize;

        match opcode {
            // Control flow
            Halt => return Ok(Flow::Halt(ins.code())),
            DebugPause => debug!(ip, sp = self.stack.len(), "debug pause"),
            Jump => return Ok(Flow::Goto(ins.word() as usize)),
            JumpIfFalse => {
                let cond = self.pop_int(ip, 1, false)?;
                if cond == 0 {
                    return Ok(Flow::Goto(ins.word() as usize));
                }
            }

            // Stack moves
            PushData => {
                let address = ins.word() as usize;
                let bytes = data
                    .get(address..address + width)
                    .ok_or(VmFault::BadAddress {
                        address: MemoryAddress::Data(ins.word()),
                        ip,
                    })?;
                self.reserve(ip, width)?;
                self.stack.extend_from_slice(bytes);
            }
            PushStack => {
                let offset = ins.word() as usize;
                if offset + width > self.stack.len() {
                    return Err(VmFault::BadAddress {
                        address: MemoryAddress::Stack(ins.word()),
                        ip,
                    });
                }
                self.reserve(ip, width)?;
                self.stack.extend_from_within(offset..offset + width);
            }
            AssignStack => {
                let start = self.underflow_check(ip, width)?;
                let offset = ins.word() as usize;
                if offset + width > start {
                    return Err(VmFault::BadAddress {
                        address: MemoryAddress::Stack(ins.word()),
                        ip,
                    });
                }
                self.stack.copy_within(start.., offset);
                self.stack.truncate(start);
            }
            PushZero => {
                let count = ins.word() as usize;
                self.reserve(ip, count)?;
                self.stack.resize(self.stack.len() + count, 0);
            }
            Pop => {
                let start = self.underflow_check(ip, ins.word() as usize)?;
                self.stack.truncate(start);
            }
            PushDataRef => {
                if ins.word() as usize >= data.len() {
                    return Err(VmFault::BadAddress {
                        address: MemoryAddress::Data(ins.word()),
                        ip,
                    });
                }
                self.reserve(ip, 8)?;
                self.stack
                    .extend_from_slice(&(ins.word() as u64).to_le_bytes());
            }

            // Casts
            CastFloatToFloat => {
                let value = self.pop_float(ip, width)?;
                self.push_float(ip, value, second)?;
            }
            CastSignedToFloat => {
                let value = self.pop_int(ip, width, true)? as i128;
                self.push_float(ip, value as f64, second)?;
            }
            CastUnsignedToFloat => {
                let value = self.pop_int(ip, width, false)?;
                self.push_float(ip, value as f64, second)?;
            }
            CastFloatToSigned => {
                let value = self.pop_float(ip, width)?;
                self.push_int(ip, saturate_signed(value, second), second)?;
            }
            CastFloatToUnsigned => {
                let value = self.pop_float(ip, width)?;
                self.push_int(ip, saturate_unsigned(value, second), second)?;
            }
            SignExtend => {
                let value = self.pop_int(ip, width, true)?;
                self.push_int(ip, value, second)?;
            }

            // Integer arithmetic and bits
            AddInt | SubInt | MulInt | DivInt | ModInt | ShiftLeft | ShiftRight | BitAnd
            | BitOr | BitXor => {
                let signed = ins.kind() == Some(NumKind::Signed);
                let rhs = self.pop_int(ip, width, signed)?;
                let lhs = self.pop_int(ip, width, signed)?;
                let value = int_binary(opcode, lhs, rhs, width, signed)
                    .ok_or(VmFault::DivisionByZero { ip })?;
                self.push_int(ip, value, width)?;
            }

            // Float arithmetic
            AddFloat | SubFloat | MulFloat | DivFloat | ModFloat => {
                let rhs = self.pop_float(ip, width)?;
                let lhs = self.pop_float(ip, width)?;
                let value = match opcode {
                    AddFloat => lhs + rhs,
                    SubFloat => lhs - rhs,
                    MulFloat => lhs * rhs,
                    DivFloat => lhs / rhs,
                    _ => lhs % rhs,
                };
                self.push_float(ip, value, width)?;
            }

            // Comparison
            Eq | Neq | Lt | Lte | Gt | Gte => {
                let ordering = match ins.kind() {
                    Some(NumKind::Float) => {
                        let rhs = self.pop_float(ip, width)?;
                        let lhs = self.pop_float(ip, width)?;
                        lhs.partial_cmp(&rhs)
                    }
                    Some(NumKind::Signed) => {
                        let rhs = self.pop_int(ip, width, true)? as i128;
                        let lhs = self.pop_int(ip, width, true)? as i128;
                        Some(lhs.cmp(&rhs))
                    }
                    _ => {
                        let rhs = self.pop_int(ip, width, false)?;
                        let lhs = self.pop_int(ip, width, false)?;
                        Some(lhs.cmp(&rhs))
                    }
                };
                self.push_int(ip, compare(opcode, ordering) as u128, 1)?;
            }

            // Unary
            IncInt | DecInt | NegInt => {
                let signed = ins.kind() == Some(NumKind::Signed);
                let value = self.pop_int(ip, width, signed)?;
                let value = match opcode {
                    IncInt => value.wrapping_add(1),
                    DecInt => value.wrapping_sub(1),
                    _ => value.wrapping_neg(),
                };
                self.push_int(ip, value, width)?;
            }
            IncFloat | DecFloat | NegFloat => {
                let value = self.pop_float(ip, width)?;
                let value = match opcode {
                    IncFloat => value + 1.0,
                    DecFloat => value - 1.0,
                    _ => -value,
                };
                self.push_float(ip, value, width)?;
            }
            Not => {
                let value = self.pop_int(ip, width, false)?;
                self.push_int(ip, (value == 0) as u128, width)?;
            }
        }

        Ok(Flow::Next)
    }

    // ----- stack helpers -----

    fn reserve(&self, ip: usize, n: usize) -> Result<(), VmFault> {
        let needed = self.stack.len() + n;
        if needed > self.config.stack_size {
            return Err(VmFault::StackOverflow {
                ip,
                needed,
                capacity: self.config.stack_size,
            });
        }
        Ok(())
    }

    /// Start index of the top `n` bytes.
    fn underflow_check(&self, ip: usize, n: usize) -> Result<usize, VmFault> {
        self.stack
            .len()
            .checked_sub(n)
            .ok_or(VmFault::StackUnderflow {
                ip,
                wanted: n,
                available: self.stack.len(),
            })
    }

    /// Pop an integer of `width` bytes, sign-extending when `signed`.
    fn pop_int(&mut self, ip: usize, width: usize, signed: bool) -> Result<u128, VmFault> {
        check_int_width(ip, width)?;
        let start = self.underflow_check(ip, width)?;

        let mut raw = [0u8; MAX_INT_WIDTH];
        raw[..width].copy_from_slice(&self.stack[start..]);
        self.stack.truncate(start);

        let value = u128::from_le_bytes(raw);
        if signed && width < MAX_INT_WIDTH {
            let shift = 128 - 8 * width as u32;
            return Ok(((value << shift) as i128 >> shift) as u128);
        }
        Ok(value)
    }

    /// Push the low `width` bytes of `value`.
    fn push_int(&mut self, ip: usize, value: u128, width: usize) -> Result<(), VmFault> {
        check_int_width(ip, width)?;
        self.reserve(ip, width)?;
        self.stack.extend_from_slice(&value.to_le_bytes()[..width]);
        Ok(())
    }

    fn pop_float(&mut self, ip: usize, width: usize) -> Result<f64, VmFault> {
        check_float_width(ip, width)?;
        let start = self.underflow_check(ip, width)?;
        let bytes = &self.stack[start..];
        let value = match width {
            2 => f32_from_f16_bits(u16::from_le_bytes([bytes[0], bytes[1]])) as f64,
            4 => f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as f64,
            _ => {
                let mut raw = [0u8; 8];
                raw.copy_from_slice(bytes);
                f64::from_le_bytes(raw)
            }
        };
        self.stack.truncate(start);
        Ok(value)
    }

    fn push_float(&mut self, ip: usize, value: f64, width: usize) -> Result<(), VmFault> {
        check_float_width(ip, width)?;
        self.reserve(ip, width)?;
        match width {
            2 => self
                .stack
                .extend_from_slice(&f16_bits_from_f32(value as f32).to_le_bytes()),
            4 => self.stack.extend_from_slice(&(value as f32).to_le_bytes()),
            _ => self.stack.extend_from_slice(&value.to_le_bytes()),
        }
        Ok(())
    }
}

fn check_int_width(ip: usize, width: usize) -> Result<(), VmFault> {
    if width == 0 || width > MAX_INT_WIDTH {
        return Err(VmFault::BadWidth {
            width: width as u16,
            ip,
        });
    }
    Ok(())
}

fn check_float_width(ip: usize, width: usize) -> Result<(), VmFault> {
    if !matches!(width, 2 | 4 | 8) {
        return Err(VmFault::BadWidth {
            width: width as u16,
            ip,
        });
    }
    Ok(())
}

/// `None` on division or modulo by zero. Results wrap at `width` once the
/// caller truncates them.
fn int_binary(op: Opcode, lhs: u128, rhs: u128, width: usize, signed: bool) -> Option<u128> {
    let bits = 8 * width as u32;
    Some(match op {
        Opcode::AddInt => lhs.wrapping_add(rhs),
        Opcode::SubInt => lhs.wrapping_sub(rhs),
        Opcode::MulInt => lhs.wrapping_mul(rhs),
        Opcode::DivInt | Opcode::ModInt => {
            if rhs == 0 {
                return None;
            }
            let div = op == Opcode::DivInt;
            if signed {
                let (a, b) = (lhs as i128, rhs as i128);
                (if div { a.wrapping_div(b) } else { a.wrapping_rem(b) }) as u128
            } else if div {
                lhs / rhs
            } else {
                lhs % rhs
            }
        }
        Opcode::ShiftLeft => lhs << (rhs as u32 % bits),
        Opcode::ShiftRight => {
            let amount = rhs as u32 % bits;
            if signed {
                ((lhs as i128) >> amount) as u128
            } else {
                lhs >> amount
            }
        }
        Opcode::BitAnd => lhs & rhs,
        Opcode::BitOr => lhs | rhs,
        _ => lhs ^ rhs,
    })
}

/// Unordered operands (NaN) only satisfy `!=`.
fn compare(op: Opcode, ordering: Option<Ordering>) -> bool {
    let Some(o) = ordering else {
        return op == Opcode::Neq;
    };
    match op {
        Opcode::Eq => o == Ordering::Equal,
        Opcode::Neq => o != Ordering::Equal,
        Opcode::Lt => o == Ordering::Less,
        Opcode::Lte => o != Ordering::Greater,
        Opcode::Gt => o == Ordering::Greater,
        _ => o != Ordering::Less,
    }
}

/// Float to signed integer, clamped to the target width. NaN becomes 0.
fn saturate_signed(value: f64, width: usize) -> u128 {
    let bits = 8 * width as u32;
    let truncated = value as i128;
    if bits >= 128 {
        return truncated as u128;
    }
    let max = (1i128 << (bits - 1)) - 1;
    truncated.clamp(-max - 1, max) as u128
}

/// Float to unsigned integer, clamped to the target width. Negative values
/// and NaN become 0.
fn saturate_unsigned(value: f64, width: usize) -> u128 {
    let bits = 8 * width as u32;
    let truncated = value as u128;
    if bits >= 128 {
        return truncated;
    }
    truncated.min((1u128 << bits) - 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::data::{Constant, DataArena};
    use crate::bytecode::script::assemble;
    use pretty_assertions::assert_eq;

    // ============================================================
    // Test Helpers
    // ============================================================

    fn run_ops_with_config(
        data: DataArena,
        ops: Vec<Instruction>,
        config: VmConfig,
    ) -> Result<(Exit, Vec<u8>), VmFault> {
        let script = assemble(data, ops, None);
        let mut vm = Vm::with_config(config);
        let exit = vm.run(&script.view())?;
        Ok((exit, vm.stack().to_vec()))
    }

    fn run_ops(data: DataArena, ops: Vec<Instruction>) -> Result<(Exit, Vec<u8>), VmFault> {
        run_ops_with_config(data, ops, VmConfig::default())
    }

    fn assert_stack(data: DataArena, ops: Vec<Instruction>, expected: &[u8]) {
        let (_, stack) = run_ops(data, ops).expect("execution should succeed");
        assert_eq!(stack, expected, "stack mismatch");
    }

    fn push(address: MemoryAddress, width: u16) -> Instruction {
        Instruction::sized(Opcode::PushData, width, address.offset())
    }

    fn typed(op: Opcode, width: u16, kind: NumKind) -> Instruction {
        Instruction::typed(op, width, kind)
    }

    /// Push two constants and apply one typed op.
    fn binary(lhs: impl Into<Constant>, rhs: impl Into<Constant>, op: Instruction) -> Vec<u8> {
        let mut data = DataArena::new();
        let (lhs, rhs) = (lhs.into(), rhs.into());
        let width = lhs.size() as u16;
        let a = data.add(lhs);
        let b = data.add(rhs);
        let (_, stack) = run_ops(data, vec![push(a, width), push(b, width), op]).unwrap();
        stack
    }

    // ============================================================
    // Integer arithmetic
    // ============================================================

    #[test]
    fn test_mixed_sign_add_leaves_100() {
        let mut data = DataArena::new();
        let lhs = data.add(200u8);
        let rhs = data.add(-100i8);
        let ops = vec![
            push(lhs, 1),
            Instruction::count(Opcode::Pop, 0),
            push(rhs, 1),
            typed(Opcode::AddInt, 1, NumKind::Signed),
        ];
        assert_stack(data, ops, &[100]);
    }

    #[test]
    fn test_add_wraps_at_width() {
        let sum = binary(100i8, 100i8, typed(Opcode::AddInt, 1, NumKind::Signed));
        assert_eq!(sum, vec![(-56i8) as u8]);

        let product = binary(300u16, 300u16, typed(Opcode::MulInt, 2, NumKind::Unsigned));
        assert_eq!(product, (90_000u32 as u16).to_le_bytes().to_vec());
    }

    #[test]
    fn test_signed_division_truncates_toward_zero() {
        let quotient = binary(-7i8, 2i8, typed(Opcode::DivInt, 1, NumKind::Signed));
        assert_eq!(quotient, vec![(-3i8) as u8]);

        let rem = binary(-7i8, 2i8, typed(Opcode::ModInt, 1, NumKind::Signed));
        assert_eq!(rem, vec![(-1i8) as u8]);

        let unsigned = binary(0xF9u8, 2u8, typed(Opcode::DivInt, 1, NumKind::Unsigned));
        assert_eq!(unsigned, vec![0x7C]);
    }

    #[test]
    fn test_wide_integers() {
        let big = i128::MAX - 1;
        let sum = binary(big, 1i128, typed(Opcode::AddInt, 16, NumKind::Signed));
        assert_eq!(sum, i128::MAX.to_le_bytes().to_vec());

        let diff = binary(5u64, 7u64, typed(Opcode::SubInt, 8, NumKind::Unsigned));
        assert_eq!(diff, (u64::MAX - 1).to_le_bytes().to_vec());
    }

    #[test]
    fn test_division_by_zero() {
        let mut data = DataArena::new();
        let a = data.add(9i32);
        let z = data.add(0i32);
        let ops = vec![push(a, 4), push(z, 4), typed(Opcode::ModInt, 4, NumKind::Signed)];
        assert_eq!(run_ops(data, ops), Err(VmFault::DivisionByZero { ip: 2 }));
    }

    #[test]
    fn test_shifts() {
        let arithmetic = binary(-8i8, 1i8, typed(Opcode::ShiftRight, 1, NumKind::Signed));
        assert_eq!(arithmetic, vec![(-4i8) as u8]);

        let logical = binary(0xF0u8, 4u8, typed(Opcode::ShiftRight, 1, NumKind::Unsigned));
        assert_eq!(logical, vec![0x0F]);

        let left = binary(1u16, 17u16, typed(Opcode::ShiftLeft, 2, NumKind::Unsigned));
        assert_eq!(left, 2u16.to_le_bytes().to_vec());
    }

    #[test]
    fn test_bits_on_bool() {
        let and = binary(true, false, typed(Opcode::BitAnd, 1, NumKind::Unsigned));
        assert_eq!(and, vec![0]);
        let xor = binary(true, false, typed(Opcode::BitXor, 1, NumKind::Unsigned));
        assert_eq!(xor, vec![1]);
    }

    // ============================================================
    // Comparison
    // ============================================================

    #[test]
    fn test_compare_respects_signedness() {
        let signed = binary(0xFFu8, 1u8, typed(Opcode::Lt, 1, NumKind::Signed));
        assert_eq!(signed, vec![1]);
        let unsigned = binary(0xFFu8, 1u8, typed(Opcode::Lt, 1, NumKind::Unsigned));
        assert_eq!(unsigned, vec![0]);
    }

    #[test]
    fn test_compare_floats() {
        let lte = binary(1.5f64, 1.5f64, typed(Opcode::Lte, 8, NumKind::Float));
        assert_eq!(lte, vec![1]);
        let neq = binary(f32::NAN, f32::NAN, typed(Opcode::Neq, 4, NumKind::Float));
        assert_eq!(neq, vec![1]);
        let eq = binary(f32::NAN, f32::NAN, typed(Opcode::Eq, 4, NumKind::Float));
        assert_eq!(eq, vec![0]);
    }

    // ============================================================
    // Floats and casts
    // ============================================================

    #[test]
    fn test_float_arithmetic() {
        let sum = binary(1.5f32, 2.25f32, typed(Opcode::AddFloat, 4, NumKind::Float));
        assert_eq!(sum, 3.75f32.to_le_bytes().to_vec());

        let half = Constant::F16(f16_bits_from_f32(0.5));
        let quarter = Constant::F16(f16_bits_from_f32(0.25));
        let product = binary(half, quarter, typed(Opcode::MulFloat, 2, NumKind::Float));
        assert_eq!(product, f16_bits_from_f32(0.125).to_le_bytes().to_vec());
    }

    #[test]
    fn test_casts() {
        let mut data = DataArena::new();
        let minus_three = data.add(-3i8);
        let big = data.add(300.7f64);
        let ops = vec![
            push(minus_three, 1),
            Instruction::cast(Opcode::CastSignedToFloat, 1, 8),
            push(big, 8),
            Instruction::cast(Opcode::CastFloatToSigned, 8, 1),
            push(minus_three, 1),
            Instruction::cast(Opcode::SignExtend, 1, 4),
        ];
        let mut expected = (-3.0f64).to_le_bytes().to_vec();
        expected.push(127);
        expected.extend_from_slice(&(-3i32).to_le_bytes());
        assert_stack(data, ops, &expected);
    }

    #[test]
    fn test_float_to_unsigned_clamps_negative() {
        let mut data = DataArena::new();
        let neg = data.add(-1.0f32);
        let ops = vec![
            push(neg, 4),
            Instruction::cast(Opcode::CastFloatToUnsigned, 4, 2),
            push(neg, 4),
            Instruction::cast(Opcode::CastFloatToFloat, 4, 2),
        ];
        let mut expected = vec![0, 0];
        expected.extend_from_slice(&f16_bits_from_f32(-1.0).to_le_bytes());
        assert_stack(data, ops, &expected);
    }

    #[test]
    fn test_unary() {
        let mut data = DataArena::new();
        let max = data.add(127i8);
        let yes = data.add(true);
        let ops = vec![
            push(max, 1),
            typed(Opcode::IncInt, 1, NumKind::Signed),
            push(max, 1),
            typed(Opcode::NegInt, 1, NumKind::Signed),
            push(yes, 1),
            typed(Opcode::Not, 1, NumKind::Unsigned),
        ];
        assert_stack(data, ops, &[0x80, (-127i8) as u8, 0]);
    }

    // ============================================================
    // Stack and control flow
    // ============================================================

    #[test]
    fn test_assign_and_read_stack() {
        let mut data = DataArena::new();
        let seven = data.add(7u16);
        let ops = vec![
            Instruction::count(Opcode::PushZero, 4),
            push(seven, 2),
            Instruction::sized(Opcode::AssignStack, 2, 2),
            Instruction::sized(Opcode::PushStack, 2, 2),
        ];
        assert_stack(data, ops, &[0, 0, 7, 0, 7, 0]);
    }

    #[test]
    fn test_conditional_jump() {
        let mut data = DataArena::new();
        let no = data.add(false);
        let ops = vec![
            push(no, 1),
            Instruction::jump(Opcode::JumpIfFalse, 3),
            Instruction::halt(1),
            Instruction::halt(2),
        ];
        let (exit, stack) = run_ops(data, ops).unwrap();
        assert_eq!(exit, Exit::Halted(2));
        assert!(stack.is_empty());
    }

    #[test]
    fn test_loop_counts_down() {
        let mut data = DataArena::new();
        let three = data.add(3u8);
        let zero = data.add(0u8);
        let ops = vec![
            push(three, 1),
            // 1: loop head
            Instruction::sized(Opcode::PushStack, 1, 0),
            push(zero, 1),
            typed(Opcode::Gt, 1, NumKind::Unsigned),
            Instruction::jump(Opcode::JumpIfFalse, 9),
            Instruction::sized(Opcode::PushStack, 1, 0),
            typed(Opcode::DecInt, 1, NumKind::Unsigned),
            Instruction::sized(Opcode::AssignStack, 1, 0),
            Instruction::jump(Opcode::Jump, 1),
        ];
        let (exit, stack) = run_ops(data, ops).unwrap();
        assert_eq!(exit, Exit::Finished);
        assert_eq!(exit.code(), 0);
        assert_eq!(stack, vec![0]);
    }

    #[test]
    fn test_push_data_ref() {
        let mut data = DataArena::new();
        let text = data.add("abc");
        let ops = vec![Instruction::address(Opcode::PushDataRef, text.offset())];
        assert_stack(data, ops, &(text.offset() as u64).to_le_bytes());
    }

    // ============================================================
    // Faults
    // ============================================================

    #[test]
    fn test_stack_overflow() {
        let config = VmConfig { stack_size: 8 };
        let ops = vec![
            Instruction::count(Opcode::PushZero, 8),
            Instruction::count(Opcode::PushZero, 1),
        ];
        let result = run_ops_with_config(DataArena::new(), ops, config);
        assert_eq!(
            result,
            Err(VmFault::StackOverflow {
                ip: 1,
                needed: 9,
                capacity: 8
            })
        );
    }

    #[test]
    fn test_stack_underflow() {
        let ops = vec![Instruction::count(Opcode::Pop, 1)];
        assert!(matches!(
            run_ops(DataArena::new(), ops),
            Err(VmFault::StackUnderflow { ip: 0, .. })
        ));
    }

    #[test]
    fn test_invalid_opcode() {
        let ops = vec![Instruction::from_bytes([0xEE, 0, 0, 0, 0, 0, 0, 0])];
        assert_eq!(
            run_ops(DataArena::new(), ops),
            Err(VmFault::InvalidOpcode { tag: 0xEE, ip: 0 })
        );
    }

    #[test]
    fn test_bad_addresses() {
        let ops = vec![Instruction::sized(Opcode::PushData, 4, 64)];
        assert!(matches!(
            run_ops(DataArena::new(), ops),
            Err(VmFault::BadAddress { .. })
        ));

        let ops = vec![Instruction::jump(Opcode::Jump, 9)];
        assert_eq!(
            run_ops(DataArena::new(), ops),
            Err(VmFault::BadJump { target: 9, ip: 0 })
        );
    }

    #[test]
    fn test_bad_float_width() {
        let ops = vec![
            Instruction::count(Opcode::PushZero, 6),
            typed(Opcode::AddFloat, 3, NumKind::Float),
        ];
        assert_eq!(
            run_ops(DataArena::new(), ops),
            Err(VmFault::BadWidth { width: 3, ip: 1 })
        );
    }
}
