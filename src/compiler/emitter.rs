use std::collections::VecDeque;

use thiserror::Error;
use tracing::trace;

use crate::bytecode::address::MemoryAddress;
use crate::bytecode::data::{Constant, DataArena};
use crate::bytecode::op::{Instruction, NumKind, Opcode};
use crate::types::cast::PrimitiveCast;
use crate::types::definition::TypeIdentifier;
use crate::types::primitive::{Family, Primitive};

/// A named stack slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variable {
    pub name: String,
    pub ty: TypeIdentifier,
    /// Offset from the bottom of the operand stack.
    pub offset: u32,
}

/// One level of lexical nesting.
#[derive(Debug, Clone, Default)]
pub struct Scope {
    entry_size: u32,
    variables: Vec<Variable>,
}

impl Scope {
    /// Abstract stack size when the scope was entered.
    pub fn entry_size(&self) -> u32 {
        self.entry_size
    }

    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    fn find(&self, name: &str) -> Option<&Variable> {
        self.variables.iter().rev().find(|v| v.name == name)
    }
}

/// A jump whose other end is not written yet. Consumed by
/// [`Emitter::finish_jump`].
#[derive(Debug, PartialEq, Eq)]
pub enum JumpHandle {
    /// Reserved instruction slot; the target is the position at finish time.
    Source(usize),
    /// Recorded position; the jump is appended at finish time.
    Label(usize),
}

/// Value produced by one expression node.
#[derive(Debug, Clone)]
pub struct ExpressionResult {
    pub address: MemoryAddress,
    pub ty: TypeIdentifier,
    /// Instructions to emit right after the value, before anything else
    /// touches the stack.
    pub deferred: VecDeque<Instruction>,
}

impl ExpressionResult {
    pub fn new(address: MemoryAddress, ty: TypeIdentifier) -> Self {
        Self {
            address,
            ty,
            deferred: VecDeque::new(),
        }
    }

    pub fn size(&self) -> u32 {
        self.ty.size()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DefineError {
    #[error("variable '{0}' is already defined in this scope")]
    Duplicate(String),
    #[error("no open scope")]
    NoScope,
}

/// Operand interpretation of a primitive for typed opcodes.
pub fn num_kind(primitive: Primitive) -> NumKind {
    match primitive.family() {
        Family::Float => NumKind::Float,
        Family::Signed => NumKind::Signed,
        Family::Unsigned | Family::Bool | Family::Char => NumKind::Unsigned,
    }
}

/// Appends instructions and tracks the operand stack the VM will see.
///
/// Every instruction goes through [`emit`](Self::emit), which applies its
/// stack effect to the abstract size. A fresh emitter has one open scope.
#[derive(Debug)]
pub struct Emitter {
    instructions: Vec<Instruction>,
    stack_size: u32,
    scopes: Vec<Scope>,
    data: DataArena,
}

impl Default for Emitter {
    fn default() -> Self {
        Self::new()
    }
}

impl Emitter {
    pub fn new() -> Self {
        Self {
            instructions: Vec::new(),
            stack_size: 0,
            scopes: vec![Scope::default()],
            data: DataArena::new(),
        }
    }

    pub fn stack_size(&self) -> u32 {
        self.stack_size
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    /// Index the next instruction will get.
    pub fn position(&self) -> usize {
        self.instructions.len()
    }

    pub fn data(&mut self) -> &mut DataArena {
        &mut self.data
    }

    pub fn into_parts(self) -> (DataArena, Vec<Instruction>) {
        (self.data, self.instructions)
    }

    /// Append one instruction and return its index.
    pub fn emit(&mut self, instruction: Instruction) -> usize {
        let (popped, pushed) = instruction.stack_effect().unwrap_or((0, 0));
        debug_assert!(
            popped <= self.stack_size,
            "{:?} pops {} of {} bytes",
            instruction,
            popped,
            self.stack_size
        );
        self.stack_size = self.stack_size.saturating_sub(popped) + pushed;
        trace!(?instruction, stack = self.stack_size, "emit");

        self.instructions.push(instruction);
        self.instructions.len() - 1
    }

    // ─── Scopes ───

    pub fn enter_scope(&mut self) {
        self.scopes.push(Scope {
            entry_size: self.stack_size,
            variables: Vec::new(),
        });
    }

    /// Close the innermost scope, popping everything pushed since it was
    /// entered. Returns the number of bytes popped.
    pub fn exit_scope(&mut self) -> u32 {
        let Some(scope) = self.scopes.pop() else {
            return 0;
        };
        let excess = self.stack_size - scope.entry_size.min(self.stack_size);
        if excess > 0 {
            self.pop(excess);
        }
        excess
    }

    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    /// Bind `name` to the value of type `ty` on top of the stack.
    ///
    /// Returns the outer variable the new one shadows, if any.
    pub fn define_variable(
        &mut self,
        name: &str,
        ty: TypeIdentifier,
    ) -> Result<Option<Variable>, DefineError> {
        let shadowed = self.lookup(name).cloned();
        let offset = self.stack_size.saturating_sub(ty.size());
        let scope = self.scopes.last_mut().ok_or(DefineError::NoScope)?;
        if scope.find(name).is_some() {
            return Err(DefineError::Duplicate(name.to_string()));
        }

        trace!(name, offset, ty = %ty, "variable");
        scope.variables.push(Variable {
            name: name.to_string(),
            ty,
            offset,
        });
        Ok(shadowed)
    }

    /// Innermost variable named `name` across all open scopes.
    pub fn lookup(&self, name: &str) -> Option<&Variable> {
        self.scopes.iter().rev().find_map(|s| s.find(name))
    }

    // ─── Values ───

    /// Store `value` in the data section and push it. Reference types push
    /// a handle to the stored object.
    pub fn push_constant(
        &mut self,
        value: impl Into<Constant>,
        ty: TypeIdentifier,
    ) -> ExpressionResult {
        let at = MemoryAddress::Stack(self.stack_size);
        let address = self.data.add(value);
        if ty.is_reference() {
            self.emit(Instruction::address(Opcode::PushDataRef, address.offset()));
        } else {
            self.emit(Instruction::sized(
                Opcode::PushData,
                ty.size() as u16,
                address.offset(),
            ));
        }
        ExpressionResult::new(at, ty)
    }

    /// Push a copy of `ty.size()` bytes at stack `offset`.
    pub fn push_stack(&mut self, offset: u32, ty: TypeIdentifier) -> ExpressionResult {
        let at = MemoryAddress::Stack(self.stack_size);
        self.emit(Instruction::sized(Opcode::PushStack, ty.size() as u16, offset));
        ExpressionResult::new(at, ty)
    }

    /// Pop `size` bytes into stack `offset`.
    pub fn assign(&mut self, offset: u32, size: u32) {
        self.emit(Instruction::sized(Opcode::AssignStack, size as u16, offset));
    }

    pub fn push_zero(&mut self, ty: TypeIdentifier) -> ExpressionResult {
        let at = MemoryAddress::Stack(self.stack_size);
        self.emit(Instruction::count(Opcode::PushZero, ty.size()));
        ExpressionResult::new(at, ty)
    }

    pub fn pop(&mut self, count: u32) {
        self.emit(Instruction::count(Opcode::Pop, count));
    }

    /// Drop an expression's value.
    pub fn discard(&mut self, result: ExpressionResult) {
        let size = result.size();
        if size > 0 {
            self.pop(size);
        }
    }

    /// Emit everything queued on `result`.
    pub fn flush(&mut self, result: &mut ExpressionResult) {
        while let Some(instruction) = result.deferred.pop_front() {
            self.emit(instruction);
        }
    }

    // ─── Operators ───

    /// Binary operator over two `operand` values on top of the stack.
    pub fn emit_binary(
        &mut self,
        opcode: Opcode,
        operand: Primitive,
        result: TypeIdentifier,
    ) -> ExpressionResult {
        let width = operand.size();
        let at = MemoryAddress::Stack(self.stack_size.saturating_sub(2 * width as u32));
        self.emit(Instruction::typed(opcode, width, num_kind(operand)));
        ExpressionResult::new(at, result)
    }

    /// Unary operator applied in place to the value on top of the stack.
    pub fn emit_unary(
        &mut self,
        opcode: Opcode,
        operand: Primitive,
        result: TypeIdentifier,
    ) -> ExpressionResult {
        let width = operand.size();
        let at = MemoryAddress::Stack(self.stack_size.saturating_sub(width as u32));
        self.emit(Instruction::typed(opcode, width, num_kind(operand)));
        ExpressionResult::new(at, result)
    }

    /// The single instruction converting `from` into `to`, or `None` when
    /// the bytes already match.
    pub fn cast_instruction(
        from: Primitive,
        to: Primitive,
        cast: PrimitiveCast,
    ) -> Option<Instruction> {
        let (src, dst) = (from.size(), to.size());
        match cast {
            PrimitiveCast::NotRequired | PrimitiveCast::None => None,
            PrimitiveCast::ImplicitResize | PrimitiveCast::ExplicitResize => Some(if dst > src {
                if from.family() == Family::Signed {
                    Instruction::cast(Opcode::SignExtend, src, dst)
                } else {
                    Instruction::count(Opcode::PushZero, (dst - src) as u32)
                }
            } else {
                Instruction::count(Opcode::Pop, (src - dst) as u32)
            }),
            PrimitiveCast::ImplicitFloatWiden | PrimitiveCast::ExplicitFloatNarrow => {
                Some(Instruction::cast(Opcode::CastFloatToFloat, src, dst))
            }
            PrimitiveCast::ImplicitIntToFloat => {
                let opcode = if from.is_signed() {
                    Opcode::CastSignedToFloat
                } else {
                    Opcode::CastUnsignedToFloat
                };
                Some(Instruction::cast(opcode, src, dst))
            }
            PrimitiveCast::ExplicitFloatToInt => {
                let opcode = if to.is_signed() {
                    Opcode::CastFloatToSigned
                } else {
                    Opcode::CastFloatToUnsigned
                };
                Some(Instruction::cast(opcode, src, dst))
            }
        }
    }

    /// Convert the value on top of the stack. Returns whether anything was
    /// emitted.
    pub fn emit_cast(&mut self, from: Primitive, to: Primitive, cast: PrimitiveCast) -> bool {
        match Self::cast_instruction(from, to, cast) {
            Some(instruction) => {
                self.emit(instruction);
                true
            }
            None => false,
        }
    }

    // ─── Control flow ───

    /// Reserve a jump slot whose target is set by [`finish_jump`](Self::finish_jump).
    /// A conditional jump consumes the condition byte here.
    pub fn create_jump_placeholder(&mut self, has_condition: bool) -> JumpHandle {
        let slot = self.emit(Instruction::jump(jump_opcode(has_condition), u32::MAX));
        JumpHandle::Source(slot)
    }

    /// Handle to the current position, for jumping backwards.
    pub fn create_label(&self) -> JumpHandle {
        JumpHandle::Label(self.position())
    }

    /// Patch a `Source` slot to jump here, or append a jump back to a
    /// `Label`. A `Source` handle's condition byte was already taken off the
    /// abstract stack by [`create_jump_placeholder`](Self::create_jump_placeholder).
    pub fn finish_jump(&mut self, handle: JumpHandle, has_condition: bool) {
        let opcode = jump_opcode(has_condition);
        match handle {
            JumpHandle::Source(slot) => {
                debug_assert_eq!(self.instructions[slot].opcode(), Some(opcode));
                let target = self.position() as u32;
                self.instructions[slot] = Instruction::jump(opcode, target);
            }
            JumpHandle::Label(target) => {
                self.emit(Instruction::jump(opcode, target as u32));
            }
        }
    }

    pub fn halt(&mut self, code: i32) {
        self.emit(Instruction::halt(code));
    }

    pub fn debug_pause(&mut self) {
        self.emit(Instruction::simple(Opcode::DebugPause));
    }
}

fn jump_opcode(has_condition: bool) -> Opcode {
    if has_condition {
        Opcode::JumpIfFalse
    } else {
        Opcode::Jump
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::module::{CoreTypes, ModuleCatalog};
    use pretty_assertions::assert_eq;

    fn core() -> CoreTypes {
        ModuleCatalog::standard().core_types().unwrap()
    }

    fn ops(emitter: &Emitter) -> Vec<Option<Opcode>> {
        emitter.instructions().iter().map(|i| i.opcode()).collect()
    }

    #[test]
    fn test_scope_restores_stack_size() {
        let core = core();
        let mut e = Emitter::new();
        e.push_constant(1u8, core.primitive(Primitive::U8));
        e.define_variable("a", core.primitive(Primitive::U8)).unwrap();
        let before = e.stack_size();

        e.enter_scope();
        for (name, p, v) in [("b", Primitive::I32, 7i32), ("c", Primitive::I32, 9)] {
            e.push_constant(v, core.primitive(p));
            e.define_variable(name, core.primitive(p)).unwrap();
        }
        e.push_zero(core.primitive(Primitive::F64));
        e.define_variable("d", core.primitive(Primitive::F64)).unwrap();
        assert_eq!(e.stack_size(), before + 16);

        assert_eq!(e.exit_scope(), 16);
        assert_eq!(e.stack_size(), before);
        let last = *e.instructions().last().unwrap();
        assert_eq!(last.opcode(), Some(Opcode::Pop));
        assert_eq!(last.word(), 16);
    }

    #[test]
    fn test_empty_scope_emits_nothing() {
        let mut e = Emitter::new();
        e.enter_scope();
        assert_eq!(e.exit_scope(), 0);
        assert!(e.instructions().is_empty());
    }

    #[test]
    fn test_lookup_innermost_first() {
        let core = core();
        let mut e = Emitter::new();
        e.push_constant(1u8, core.primitive(Primitive::U8));
        e.define_variable("x", core.primitive(Primitive::U8)).unwrap();

        e.enter_scope();
        e.push_constant(2i64, core.primitive(Primitive::I64));
        let shadowed = e.define_variable("x", core.primitive(Primitive::I64)).unwrap();
        assert_eq!(shadowed.map(|v| v.offset), Some(0));

        let inner = e.lookup("x").unwrap();
        assert_eq!(inner.offset, 1);
        assert!(inner.ty.is_primitive(Primitive::I64));

        e.exit_scope();
        assert_eq!(e.lookup("x").unwrap().offset, 0);
        assert!(e.lookup("y").is_none());
    }

    #[test]
    fn test_duplicate_in_same_scope() {
        let core = core();
        let mut e = Emitter::new();
        e.push_constant(true, core.bool());
        e.define_variable("flag", core.bool()).unwrap();
        e.push_constant(false, core.bool());
        assert_eq!(
            e.define_variable("flag", core.bool()),
            Err(DefineError::Duplicate("flag".to_string()))
        );
    }

    #[test]
    fn test_forward_jump_patched() {
        let core = core();
        let mut e = Emitter::new();
        e.push_constant(true, core.bool());
        let skip = e.create_jump_placeholder(true);
        assert_eq!(e.stack_size(), 0);
        e.debug_pause();
        e.debug_pause();
        e.finish_jump(skip, true);

        let branch = e.instructions()[1];
        assert_eq!(branch.opcode(), Some(Opcode::JumpIfFalse));
        assert_eq!(branch.word(), 4);
        assert_eq!(e.stack_size(), 0);
    }

    #[test]
    fn test_backward_jump_appended() {
        let mut e = Emitter::new();
        e.debug_pause();
        let top = e.create_label();
        e.debug_pause();
        e.finish_jump(top, false);

        assert_eq!(
            ops(&e),
            vec![
                Some(Opcode::DebugPause),
                Some(Opcode::DebugPause),
                Some(Opcode::Jump)
            ]
        );
        assert_eq!(e.instructions()[2].word(), 1);
    }

    #[test]
    fn test_cast_emission() {
        use Primitive::*;
        use PrimitiveCast::{
            ExplicitFloatToInt, ExplicitResize, ImplicitFloatWiden, ImplicitIntToFloat,
            ImplicitResize, NotRequired,
        };
        let op = |from, to, cast| {
            Emitter::cast_instruction(from, to, cast).and_then(|i| i.opcode())
        };

        assert_eq!(op(I8, I8, NotRequired), None);
        assert_eq!(op(U8, U32, ImplicitResize), Some(Opcode::PushZero));
        assert_eq!(op(I8, I32, ImplicitResize), Some(Opcode::SignExtend));
        assert_eq!(op(I64, I16, ExplicitResize), Some(Opcode::Pop));
        assert_eq!(op(F32, F64, ImplicitFloatWiden), Some(Opcode::CastFloatToFloat));
        assert_eq!(op(U16, F32, ImplicitIntToFloat), Some(Opcode::CastUnsignedToFloat));
        assert_eq!(op(I16, F32, ImplicitIntToFloat), Some(Opcode::CastSignedToFloat));
        assert_eq!(op(F64, U8, ExplicitFloatToInt), Some(Opcode::CastFloatToUnsigned));
        assert_eq!(op(F64, I8, ExplicitFloatToInt), Some(Opcode::CastFloatToSigned));

        // same-width reinterpretation is still one instruction
        let same = Emitter::cast_instruction(U8, I8, ExplicitResize).unwrap();
        assert_eq!(same.opcode(), Some(Opcode::Pop));
        assert_eq!(same.word(), 0);
    }

    #[test]
    fn test_deferred_flush_tracks_stack() {
        let core = core();
        let mut e = Emitter::new();
        let mut r = e.push_constant(5u8, core.primitive(Primitive::U8));
        let widen =
            Emitter::cast_instruction(Primitive::U8, Primitive::U32, PrimitiveCast::ImplicitResize);
        r.deferred.push_back(widen.unwrap());
        e.flush(&mut r);
        assert!(r.deferred.is_empty());
        assert_eq!(e.stack_size(), 4);
    }

    #[test]
    fn test_binary_stack_effect() {
        let core = core();
        let mut e = Emitter::new();
        e.push_constant(1i32, core.primitive(Primitive::I32));
        e.push_constant(2i32, core.primitive(Primitive::I32));
        let sum = e.emit_binary(Opcode::AddInt, Primitive::I32, core.primitive(Primitive::I32));
        assert_eq!(sum.address, MemoryAddress::Stack(0));
        assert_eq!(e.stack_size(), 4);

        e.push_constant(3i32, core.primitive(Primitive::I32));
        e.emit_binary(Opcode::Lt, Primitive::I32, core.bool());
        assert_eq!(e.stack_size(), 1);
    }

    #[test]
    fn test_string_constant_pushes_handle() {
        let core = core();
        let mut e = Emitter::new();
        e.push_constant("hey", core.string());
        assert_eq!(e.stack_size(), 8);
        assert_eq!(e.instructions()[0].opcode(), Some(Opcode::PushDataRef));
    }
}
