//! Pass 2b: emit instructions.
//!
//! Runs only on a tree that inference accepted, so every lookup here is
//! expected to succeed. A `None` bubbling out means the annotations and the
//! tree disagree.

use tracing::debug;

use super::emitter::{Emitter, ExpressionResult};
use super::infer::{Annotation, Annotations};
use super::resolve::{Resolution, resolve_type};
use crate::bytecode::op::Opcode;
use crate::lang::node::{BinaryOp, Expr, ExprKind, Place, Stmt, StmtKind, UnaryOp};
use crate::types::definition::TypeIdentifier;
use crate::types::primitive::Family;

pub fn generate(
    body: &[Stmt],
    annotations: &Annotations,
    resolution: &Resolution,
) -> Option<Emitter> {
    let mut generator = CodeGenerator {
        annotations,
        resolution,
        emitter: Emitter::new(),
    };
    generator.statements(body)?;
    debug!(
        instructions = generator.emitter.position(),
        stack = generator.emitter.stack_size(),
        "pass 2: code generated"
    );
    Some(generator.emitter)
}

struct CodeGenerator<'a> {
    annotations: &'a Annotations,
    resolution: &'a Resolution,
    emitter: Emitter,
}

impl CodeGenerator<'_> {
    fn statements(&mut self, stmts: &[Stmt]) -> Option<()> {
        for stmt in stmts {
            self.statement(stmt)?;
        }
        Some(())
    }

    fn scoped(&mut self, stmts: &[Stmt]) -> Option<()> {
        self.emitter.enter_scope();
        self.statements(stmts)?;
        self.emitter.exit_scope();
        Some(())
    }

    fn statement(&mut self, stmt: &Stmt) -> Option<()> {
        match &stmt.kind {
            StmtKind::Let { name, ty, value } => {
                let declared = match ty {
                    Some(ty) => Some(resolve_type(&self.resolution.types, ty).ok()?),
                    None => None,
                };
                let result = match (value, &declared) {
                    (Some(value), _) => self.expression(value)?,
                    (None, Some(ty)) => self.emitter.push_zero(ty.clone()),
                    (None, None) => return None,
                };
                // the declared type wins over the value's own
                let ty = declared.unwrap_or(result.ty);
                self.emitter.define_variable(name, ty).ok()?;
            }

            StmtKind::Assign { target, value } => {
                self.expression(value)?;
                let (offset, ty) = self.place(target)?;
                self.emitter.assign(offset, ty.size());
            }

            StmtKind::Expr(expr) => {
                let result = self.expression(expr)?;
                self.emitter.discard(result);
            }

            StmtKind::Block(body) => self.scoped(body)?,

            StmtKind::If {
                cond,
                then_branch,
                else_branch,
            } => {
                self.expression(cond)?;
                let skip_then = self.emitter.create_jump_placeholder(true);
                self.scoped(then_branch)?;
                match else_branch {
                    Some(else_branch) => {
                        let skip_else = self.emitter.create_jump_placeholder(false);
                        self.emitter.finish_jump(skip_then, true);
                        self.scoped(else_branch)?;
                        self.emitter.finish_jump(skip_else, false);
                    }
                    None => self.emitter.finish_jump(skip_then, true),
                }
            }

            StmtKind::While { cond, body } => {
                let top = self.emitter.create_label();
                self.expression(cond)?;
                let exit = self.emitter.create_jump_placeholder(true);
                self.scoped(body)?;
                self.emitter.finish_jump(top, false);
                self.emitter.finish_jump(exit, true);
            }

            StmtKind::Halt(code) => self.emitter.halt(*code),

            StmtKind::Debug => self.emitter.debug_pause(),
        }
        Some(())
    }

    /// Stack offset and type of an assignment target or field read.
    fn place(&self, place: &Place) -> Option<(u32, TypeIdentifier)> {
        let variable = self.emitter.lookup(&place.name)?;
        let mut offset = variable.offset;
        let mut ty = variable.ty.clone();
        for name in &place.fields {
            let field = ty.definition().field(name)?;
            offset += field.offset;
            ty = field.ty.clone();
        }
        Some((offset, ty))
    }

    fn annotation(&self, expr: &Expr) -> Option<&Annotation> {
        self.annotations.get(expr.id)
    }

    /// Emit `expr` followed by the conversion its parent asked for.
    fn expression(&mut self, expr: &Expr) -> Option<ExpressionResult> {
        let annotation = self.annotation(expr)?.clone();
        let mut result = self.value(expr, &annotation)?;

        if let Some(coercion) = &annotation.coercion {
            let from = annotation.ty.primitive()?;
            let to = coercion.target.primitive()?;
            if let Some(cast) = Emitter::cast_instruction(from, to, coercion.cast) {
                result.deferred.push_back(cast);
            }
            self.emitter.flush(&mut result);
            result.ty = coercion.target.clone();
        }
        Some(result)
    }

    fn value(&mut self, expr: &Expr, annotation: &Annotation) -> Option<ExpressionResult> {
        let result = match &expr.kind {
            ExprKind::Literal(_) => {
                let constant = annotation.constant.clone()?;
                self.emitter.push_constant(constant, annotation.ty.clone())
            }

            ExprKind::Variable(name) => {
                let variable = self.emitter.lookup(name)?;
                let (offset, ty) = (variable.offset, variable.ty.clone());
                self.emitter.push_stack(offset, ty)
            }

            ExprKind::Field { .. } => {
                let (offset, ty) = self.place(&field_path(expr)?)?;
                self.emitter.push_stack(offset, ty)
            }

            ExprKind::Binary { op, lhs, rhs } => {
                let left = self.expression(lhs)?;
                self.expression(rhs)?;
                let operand = left.ty.primitive()?;
                let opcode = binary_opcode(*op, operand.family());
                self.emitter.emit_binary(opcode, operand, annotation.ty.clone())
            }

            ExprKind::Unary { op, operand } => {
                let inner = self.expression(operand)?;
                let primitive = inner.ty.primitive()?;
                let float = primitive.is_float();
                let opcode = match (op, float) {
                    (UnaryOp::Neg, false) => Opcode::NegInt,
                    (UnaryOp::Neg, true) => Opcode::NegFloat,
                    (UnaryOp::Not, _) => Opcode::Not,
                    (UnaryOp::Inc, false) => Opcode::IncInt,
                    (UnaryOp::Inc, true) => Opcode::IncFloat,
                    (UnaryOp::Dec, false) => Opcode::DecInt,
                    (UnaryOp::Dec, true) => Opcode::DecFloat,
                };
                self.emitter.emit_unary(opcode, primitive, annotation.ty.clone())
            }

            ExprKind::Cast { expr: inner, .. } => {
                let mut result = self.expression(inner)?;
                result.ty = annotation.ty.clone();
                result
            }
        };
        Some(result)
    }
}

/// `a.b.c` as a place, if the expression is a variable-rooted field chain.
fn field_path(expr: &Expr) -> Option<Place> {
    match &expr.kind {
        ExprKind::Variable(name) => Some(Place {
            name: name.clone(),
            fields: Vec::new(),
        }),
        ExprKind::Field { target, name } => {
            let mut place = field_path(target)?;
            place.fields.push(name.clone());
            Some(place)
        }
        _ => None,
    }
}

fn binary_opcode(op: BinaryOp, family: Family) -> Opcode {
    let float = family == Family::Float;
    match op {
        BinaryOp::Add if float => Opcode::AddFloat,
        BinaryOp::Add => Opcode::AddInt,
        BinaryOp::Sub if float => Opcode::SubFloat,
        BinaryOp::Sub => Opcode::SubInt,
        BinaryOp::Mul if float => Opcode::MulFloat,
        BinaryOp::Mul => Opcode::MulInt,
        BinaryOp::Div if float => Opcode::DivFloat,
        BinaryOp::Div => Opcode::DivInt,
        BinaryOp::Mod if float => Opcode::ModFloat,
        BinaryOp::Mod => Opcode::ModInt,
        BinaryOp::Shl => Opcode::ShiftLeft,
        BinaryOp::Shr => Opcode::ShiftRight,
        BinaryOp::BitAnd | BinaryOp::And => Opcode::BitAnd,
        BinaryOp::BitOr | BinaryOp::Or => Opcode::BitOr,
        BinaryOp::BitXor => Opcode::BitXor,
        BinaryOp::Eq => Opcode::Eq,
        BinaryOp::NotEq => Opcode::Neq,
        BinaryOp::Lt => Opcode::Lt,
        BinaryOp::LtEq => Opcode::Lte,
        BinaryOp::Gt => Opcode::Gt,
        BinaryOp::GtEq => Opcode::Gte,
    }
}
