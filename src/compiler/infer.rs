//! Pass 2a: type every expression.
//!
//! Results go to a side table keyed by node id; the tree is never touched.
//! A node that cannot be typed gets no entry and its parent stops there,
//! so one mistake produces one issue.

use std::collections::HashMap;

use tracing::debug;

use super::issue::{Issue, IssueCollector, IssueId};
use super::resolve::{Resolution, resolve_type};
use crate::bytecode::data::Constant;
use crate::lang::node::{
    BinaryOp, Expr, ExprKind, Literal, NodeId, OperatorClass, Place, Position, SourceTree, Stmt,
    StmtKind, UnaryOp,
};
use crate::types::cast::{BinaryError, CastEngine, Operand, PrimitiveCast};
use crate::types::definition::TypeIdentifier;
use crate::types::literal::{FloatLiteral, IntegerLiteral, LiteralError, parse_char};
use crate::types::primitive::{Family, Primitive};

/// A conversion the parent applies to a node's value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Coercion {
    pub target: TypeIdentifier,
    pub cast: PrimitiveCast,
}

/// What pass 2a learned about one expression node.
#[derive(Debug, Clone, PartialEq)]
pub struct Annotation {
    pub ty: TypeIdentifier,
    /// Smallest signed type a non-negative integer literal also fits.
    pub secondary: Option<TypeIdentifier>,
    /// Value of a literal, at the literal's type.
    pub constant: Option<Constant>,
    pub coercion: Option<Coercion>,
}

impl Annotation {
    fn typed(ty: TypeIdentifier) -> Self {
        Self {
            ty,
            secondary: None,
            constant: None,
            coercion: None,
        }
    }

    /// Type of the value once the coercion, if any, is applied.
    pub fn final_type(&self) -> &TypeIdentifier {
        self.coercion.as_ref().map_or(&self.ty, |c| &c.target)
    }

    fn operand(&self) -> Operand {
        Operand::literal(self.ty.clone(), self.secondary.clone())
    }
}

#[derive(Debug, Clone, Default)]
pub struct Annotations {
    map: HashMap<NodeId, Annotation>,
}

impl Annotations {
    pub fn get(&self, id: NodeId) -> Option<&Annotation> {
        self.map.get(&id)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

pub fn infer(
    tree: &SourceTree,
    resolution: &Resolution,
    casts: &CastEngine,
    issues: &mut IssueCollector,
) -> Annotations {
    debug!(statements = tree.body.len(), "pass 2: inference");
    let mut inferrer = Inferrer {
        resolution,
        casts,
        issues,
        scopes: vec![HashMap::new()],
        annotations: Annotations::default(),
    };
    inferrer.statements(&tree.body);
    inferrer.annotations
}

struct Inferrer<'a> {
    resolution: &'a Resolution,
    casts: &'a CastEngine,
    issues: &'a mut IssueCollector,
    scopes: Vec<HashMap<String, TypeIdentifier>>,
    annotations: Annotations,
}

impl Inferrer<'_> {
    // ─── Statements ───

    fn statements(&mut self, stmts: &[Stmt]) {
        for stmt in stmts {
            self.statement(stmt);
        }
    }

    fn scoped(&mut self, stmts: &[Stmt]) {
        self.scopes.push(HashMap::new());
        self.statements(stmts);
        self.scopes.pop();
    }

    fn statement(&mut self, stmt: &Stmt) {
        match &stmt.kind {
            StmtKind::Let { name, ty, value } => {
                let declared = match ty {
                    Some(ty) => match resolve_type(&self.resolution.types, ty) {
                        Ok(t) => Some(t),
                        Err(issue) => {
                            self.issues.push(issue);
                            return;
                        }
                    },
                    None => None,
                };

                let var_ty = match (declared, value) {
                    (Some(declared), Some(value)) => {
                        self.expression(value);
                        self.coerce(value, &declared);
                        declared
                    }
                    (Some(declared), None) => declared,
                    (None, Some(value)) => match self.expression(value) {
                        Some(a) => a.ty,
                        None => return,
                    },
                    (None, None) => {
                        self.issues.report(
                            IssueId::UnknownType,
                            stmt.position,
                            format!("cannot tell the type of '{}'", name),
                        );
                        return;
                    }
                };
                self.declare(name, var_ty, stmt.position);
            }

            StmtKind::Assign { target, value } => {
                let Some(target_ty) = self.place(target, stmt.position) else {
                    self.expression(value);
                    return;
                };
                self.expression(value);
                self.coerce(value, &target_ty);
            }

            StmtKind::Expr(expr) => {
                self.expression(expr);
            }

            StmtKind::Block(body) => self.scoped(body),

            StmtKind::If {
                cond,
                then_branch,
                else_branch,
            } => {
                self.condition(cond);
                self.scoped(then_branch);
                if let Some(else_branch) = else_branch {
                    self.scoped(else_branch);
                }
            }

            StmtKind::While { cond, body } => {
                self.condition(cond);
                self.scoped(body);
            }

            StmtKind::Halt(_) | StmtKind::Debug => {}
        }
    }

    fn declare(&mut self, name: &str, ty: TypeIdentifier, position: Position) {
        let innermost = self.scopes.len() - 1;
        if self.scopes[innermost].contains_key(name) {
            self.issues.report(
                IssueId::DuplicateVariable,
                position,
                format!("variable '{}' is already defined in this scope", name),
            );
            return;
        }
        if self.scopes[..innermost].iter().any(|s| s.contains_key(name)) {
            self.issues.report(
                IssueId::ShadowedVariable,
                position,
                format!("'{}' shadows an outer variable", name),
            );
        }
        self.scopes[innermost].insert(name.to_string(), ty);
    }

    fn variable(&self, name: &str) -> Option<&TypeIdentifier> {
        self.scopes.iter().rev().find_map(|s| s.get(name))
    }

    /// Type of an assignment target.
    fn place(&mut self, place: &Place, position: Position) -> Option<TypeIdentifier> {
        let Some(mut ty) = self.variable(&place.name).cloned() else {
            self.issues.push(Issue::unknown_variable(&place.name, position));
            return None;
        };
        for name in &place.fields {
            let owner = ty.definition();
            if !owner.fields.is_empty() && !owner.modifiers.mutable {
                self.issues.report(
                    IssueId::NotAssignable,
                    position,
                    format!("fields of '{}' cannot be assigned", owner.name),
                );
                return None;
            }
            ty = self.field_type(&ty, name, position)?;
        }
        Some(ty)
    }

    fn field_type(
        &mut self,
        owner: &TypeIdentifier,
        name: &str,
        position: Position,
    ) -> Option<TypeIdentifier> {
        match owner.definition().field(name) {
            Some(field) => Some(field.ty.clone()),
            None => {
                self.issues.report(
                    IssueId::UnknownField,
                    position,
                    format!("type '{}' has no field '{}'", owner, name),
                );
                None
            }
        }
    }

    fn condition(&mut self, cond: &Expr) {
        let Some(a) = self.expression(cond) else {
            return;
        };
        if !a.ty.is_primitive(Primitive::Bool) {
            self.issues.report(
                IssueId::ConditionNotBool,
                cond.position,
                format!("condition must be 'bool', found '{}'", a.ty),
            );
        }
    }

    /// Record the conversion of `expr`'s value to `target`, or report why
    /// it is not allowed.
    fn coerce(&mut self, expr: &Expr, target: &TypeIdentifier) -> bool {
        let Some(annotation) = self.annotations.map.get_mut(&expr.id) else {
            return false;
        };
        let cast = self.casts.classify_operand(&annotation.operand(), target);

        if cast == PrimitiveCast::NotRequired {
            return true;
        }
        if cast.is_implicit() {
            annotation.coercion = Some(Coercion {
                target: target.clone(),
                cast,
            });
            return true;
        }

        let found = annotation.ty.clone();
        if cast.is_possible() {
            self.issues.report(
                IssueId::ImplicitCastRequired,
                expr.position,
                format!("'{}' converts to '{}' only with an explicit cast", found, target),
            );
        } else {
            self.issues
                .push(Issue::type_mismatch(&target.to_string(), &found.to_string(), expr.position));
        }
        false
    }

    // ─── Expressions ───

    fn expression(&mut self, expr: &Expr) -> Option<Annotation> {
        let annotation = match &expr.kind {
            ExprKind::Literal(literal) => self.literal(literal, expr.position)?,

            ExprKind::Variable(name) => match self.variable(name) {
                Some(ty) => Annotation::typed(ty.clone()),
                None => {
                    self.issues.push(Issue::unknown_variable(name, expr.position));
                    return None;
                }
            },

            ExprKind::Field { target, name } => {
                if !is_place(target) {
                    self.issues.report(
                        IssueId::InvalidOperator,
                        expr.position,
                        "field access needs a variable",
                    );
                    return None;
                }
                let owner = self.expression(target)?;
                Annotation::typed(self.field_type(&owner.ty, name, expr.position)?)
            }

            ExprKind::Binary { op, lhs, rhs } => {
                let left = self.expression(lhs);
                let right = self.expression(rhs);
                self.binary(*op, lhs, &left?, rhs, &right?, expr.position)?
            }

            ExprKind::Unary { op, operand } => {
                let inner = self.expression(operand)?;
                self.unary(*op, &inner, expr.position)?
            }

            ExprKind::Cast { expr: inner, ty } => {
                let source = self.expression(inner)?;
                let target = match resolve_type(&self.resolution.types, ty) {
                    Ok(t) => t,
                    Err(issue) => {
                        self.issues.push(issue);
                        return None;
                    }
                };
                self.cast(inner, &source, target, expr.position)?
            }
        };

        self.annotations.map.insert(expr.id, annotation.clone());
        Some(annotation)
    }

    fn literal(&mut self, literal: &Literal, position: Position) -> Option<Annotation> {
        let resolution = self.resolution;
        let core = &resolution.core;
        let annotation = match literal {
            Literal::Integer { digits, negative } => {
                let parsed = match IntegerLiteral::parse(digits, *negative) {
                    Ok(parsed) => parsed,
                    Err(e) => {
                        self.literal_error(e, digits, position);
                        return None;
                    }
                };
                let width = parsed.width();
                Annotation {
                    ty: core.primitive(width.primary),
                    secondary: width.secondary.map(|p| core.primitive(p)),
                    constant: Constant::integer(width.primary, &parsed),
                    coercion: None,
                }
            }
            Literal::Float { text, negative } => {
                let parsed = match FloatLiteral::parse(text, *negative) {
                    Ok(parsed) => parsed,
                    Err(e) => {
                        self.literal_error(e, text, position);
                        return None;
                    }
                };
                Annotation {
                    constant: Constant::float(parsed.primitive, parsed.value),
                    ..Annotation::typed(core.primitive(parsed.primitive))
                }
            }
            Literal::Bool(value) => Annotation {
                constant: Some(Constant::Bool(*value)),
                ..Annotation::typed(core.bool())
            },
            Literal::Char(text) => match parse_char(text) {
                Ok(unit) => Annotation {
                    constant: Some(Constant::Char(unit)),
                    ..Annotation::typed(core.primitive(Primitive::Char))
                },
                Err(e) => {
                    self.literal_error(e, text, position);
                    return None;
                }
            },
            Literal::Str(text) => Annotation {
                constant: Some(Constant::Str(text.clone())),
                ..Annotation::typed(core.string())
            },
        };
        Some(annotation)
    }

    fn literal_error(&mut self, error: LiteralError, text: &str, position: Position) {
        match error {
            LiteralError::TooLarge => self.issues.report(
                IssueId::IntegerTooLarge,
                position,
                format!("'{}' does not fit in 128 bits", text),
            ),
            LiteralError::Malformed => self.issues.report(
                IssueId::InvalidLiteral,
                position,
                format!("malformed literal '{}'", text),
            ),
        }
    }

    fn binary(
        &mut self,
        op: BinaryOp,
        lhs: &Expr,
        left: &Annotation,
        rhs: &Expr,
        right: &Annotation,
        position: Position,
    ) -> Option<Annotation> {
        let invalid = |issues: &mut IssueCollector| {
            issues.report(
                IssueId::InvalidOperator,
                position,
                format!(
                    "operator '{}' cannot be applied to '{}' and '{}'",
                    op.symbol(),
                    left.ty,
                    right.ty
                ),
            );
        };

        if left.ty.primitive().is_none() || right.ty.primitive().is_none() {
            invalid(self.issues);
            return None;
        }

        let resolution = match self.casts.resolve_binary(&left.operand(), &right.operand()) {
            Ok(resolution) => resolution,
            Err(BinaryError::Incompatible) => {
                invalid(self.issues);
                return None;
            }
            Err(BinaryError::ImplicitCastRequired(cast)) => {
                self.issues.report(
                    IssueId::ImplicitCastRequired,
                    position,
                    format!(
                        "'{}' and '{}' need an explicit cast to combine with '{}' ({:?})",
                        left.ty,
                        right.ty,
                        op.symbol(),
                        cast
                    ),
                );
                return None;
            }
        };

        let operand = resolution.result.primitive()?;
        let allowed = match op.class() {
            OperatorClass::Arithmetic => operand.is_numeric(),
            OperatorClass::Bitwise => {
                operand.is_integer()
                    || (operand == Primitive::Bool
                        && matches!(op, BinaryOp::BitAnd | BinaryOp::BitOr | BinaryOp::BitXor))
            }
            OperatorClass::Equality => true,
            OperatorClass::Ordering => operand.is_numeric() || operand == Primitive::Char,
            OperatorClass::Logical => operand == Primitive::Bool,
        };
        if !allowed {
            invalid(self.issues);
            return None;
        }

        for (expr, cast) in [(lhs, resolution.left_cast), (rhs, resolution.right_cast)] {
            if cast != PrimitiveCast::NotRequired {
                if let Some(a) = self.annotations.map.get_mut(&expr.id) {
                    a.coercion = Some(Coercion {
                        target: resolution.result.clone(),
                        cast,
                    });
                }
            }
        }

        let ty = match op.class() {
            OperatorClass::Equality | OperatorClass::Ordering => self.resolution.core.bool(),
            _ => resolution.result,
        };
        Some(Annotation::typed(ty))
    }

    fn unary(
        &mut self,
        op: UnaryOp,
        operand: &Annotation,
        position: Position,
    ) -> Option<Annotation> {
        let allowed = match (op, operand.ty.primitive()) {
            (UnaryOp::Neg, Some(p)) => matches!(p.family(), Family::Signed | Family::Float),
            (UnaryOp::Not, Some(p)) => p == Primitive::Bool,
            (UnaryOp::Inc | UnaryOp::Dec, Some(p)) => p.is_numeric(),
            (_, None) => false,
        };
        if !allowed {
            self.issues.report(
                IssueId::InvalidOperator,
                position,
                format!("operator '{}' cannot be applied to '{}'", op.symbol(), operand.ty),
            );
            return None;
        }
        Some(Annotation::typed(operand.ty.clone()))
    }

    fn cast(
        &mut self,
        inner: &Expr,
        source: &Annotation,
        target: TypeIdentifier,
        position: Position,
    ) -> Option<Annotation> {
        let cast = self.casts.classify(&source.ty, &target);
        match cast {
            PrimitiveCast::NotRequired => {
                self.issues.report(
                    IssueId::RedundantCast,
                    position,
                    format!("value is already '{}'", target),
                );
            }
            PrimitiveCast::None => {
                self.issues.report(
                    IssueId::InvalidCast,
                    position,
                    format!("'{}' cannot be cast to '{}'", source.ty, target),
                );
                return None;
            }
            _ => {
                if let Some(a) = self.annotations.map.get_mut(&inner.id) {
                    a.coercion = Some(Coercion {
                        target: target.clone(),
                        cast,
                    });
                }
            }
        }
        Some(Annotation::typed(target))
    }
}

/// Whether `expr` names a stack location: a variable or a field of one.
pub fn is_place(expr: &Expr) -> bool {
    match &expr.kind {
        ExprKind::Variable(_) => true,
        ExprKind::Field { target, .. } => is_place(target),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::issue::Severity;
    use crate::compiler::resolve::resolve;
    use crate::lang::build::TreeBuilder;
    use crate::types::module::ModuleCatalog;

    fn run(tree: &SourceTree) -> (Annotations, IssueCollector) {
        let mut issues = IssueCollector::new();
        let resolution = resolve(tree, &ModuleCatalog::standard(), true, &mut issues).unwrap();
        let annotations = infer(tree, &resolution, &CastEngine::new(), &mut issues);
        (annotations, issues)
    }

    fn ids(issues: &IssueCollector) -> Vec<IssueId> {
        issues.issues().iter().map(|i| i.id).collect()
    }

    #[test]
    fn test_literal_widths() {
        let mut b = TreeBuilder::new();
        let pos = b.int("200");
        let neg = b.neg_int("100");
        let (pos_id, neg_id) = (pos.id, neg.id);
        let s1 = b.expr_stmt(pos);
        let s2 = b.expr_stmt(neg);
        b.push(s1).push(s2);
        let (annotations, issues) = run(&b.finish());
        assert!(issues.is_empty());

        let pos = annotations.get(pos_id).unwrap();
        assert!(pos.ty.is_primitive(Primitive::U8));
        assert!(pos.secondary.as_ref().unwrap().is_primitive(Primitive::I16));

        let neg = annotations.get(neg_id).unwrap();
        assert!(neg.ty.is_primitive(Primitive::I8));
        assert_eq!(neg.constant, Some(Constant::I8(-100)));
    }

    #[test]
    fn test_binary_picks_signed_through_secondary() {
        let mut b = TreeBuilder::new();
        let l = b.int("200");
        let r = b.neg_int("100");
        let (l_id, r_id) = (l.id, r.id);
        let sum = b.binary(BinaryOp::Add, l, r);
        let sum_id = sum.id;
        let stmt = b.expr_stmt(sum);
        b.push(stmt);
        let (annotations, issues) = run(&b.finish());
        assert!(issues.is_empty());

        assert!(annotations.get(sum_id).unwrap().ty.is_primitive(Primitive::I8));
        let left = annotations.get(l_id).unwrap().coercion.clone().unwrap();
        assert_eq!(left.cast, PrimitiveCast::ImplicitResize);
        assert!(left.target.is_primitive(Primitive::I8));
        assert_eq!(annotations.get(r_id).unwrap().coercion, None);
    }

    #[test]
    fn test_comparison_yields_bool() {
        let mut b = TreeBuilder::new();
        let l = b.float("1.5");
        let r = b.int("2");
        let lt = b.binary(BinaryOp::Lt, l, r);
        let id = lt.id;
        let stmt = b.expr_stmt(lt);
        b.push(stmt);
        let (annotations, issues) = run(&b.finish());
        assert!(issues.is_empty(), "{:?}", issues.issues());
        assert!(annotations.get(id).unwrap().ty.is_primitive(Primitive::Bool));
    }

    #[test]
    fn test_signedness_crossing_needs_cast() {
        let mut b = TreeBuilder::new();
        let u = b.ty("u32");
        let i = b.ty("i32");
        let zero_u = b.let_("a", Some(u), None);
        let zero_i = b.let_("b", Some(i), None);
        let (va, vb) = (b.var("a"), b.var("b"));
        let sum = b.binary(BinaryOp::Add, va, vb);
        let stmt = b.expr_stmt(sum);
        b.push(zero_u).push(zero_i).push(stmt);
        let (_, issues) = run(&b.finish());
        assert_eq!(ids(&issues), vec![IssueId::ImplicitCastRequired]);
    }

    #[test]
    fn test_invalid_operator() {
        let mut b = TreeBuilder::new();
        let (t, f) = (b.bool(true), b.int("1"));
        let sum = b.binary(BinaryOp::Add, t, f);
        let s = b.str("a");
        let neg = b.unary(UnaryOp::Neg, s);
        let (s1, s2) = (b.expr_stmt(sum), b.expr_stmt(neg));
        b.push(s1).push(s2);
        let (_, issues) = run(&b.finish());
        assert_eq!(ids(&issues), vec![IssueId::InvalidOperator, IssueId::InvalidOperator]);
    }

    #[test]
    fn test_variables_and_scopes() {
        let mut b = TreeBuilder::new();
        let one = b.int("1");
        let outer = b.let_("x", None, Some(one));
        let two = b.int("2");
        let inner = b.let_("x", None, Some(two));
        let block = b.block(vec![inner]);
        let missing = b.var("y");
        let use_missing = b.expr_stmt(missing);
        b.push(outer).push(block).push(use_missing);

        let (_, issues) = run(&b.finish());
        assert_eq!(ids(&issues), vec![IssueId::ShadowedVariable, IssueId::UnknownVariable]);
        assert_eq!(issues.count(Severity::Warning), 1);
    }

    #[test]
    fn test_duplicate_variable() {
        let mut b = TreeBuilder::new();
        let (one, two) = (b.int("1"), b.int("2"));
        let first = b.let_("x", None, Some(one));
        let second = b.let_("x", None, Some(two));
        b.push(first).push(second);
        let (_, issues) = run(&b.finish());
        assert_eq!(ids(&issues), vec![IssueId::DuplicateVariable]);
    }

    #[test]
    fn test_declared_type_coerces_literal() {
        let mut b = TreeBuilder::new();
        let ty = b.ty("i32");
        let five = b.int("5");
        let id = five.id;
        let stmt = b.let_("x", Some(ty), Some(five));
        b.push(stmt);
        let (annotations, issues) = run(&b.finish());
        assert!(issues.is_empty());
        let coercion = annotations.get(id).unwrap().coercion.clone().unwrap();
        assert!(coercion.target.is_primitive(Primitive::I32));
        assert!(coercion.cast.is_implicit());
    }

    #[test]
    fn test_narrowing_assignment_rejected() {
        let mut b = TreeBuilder::new();
        let ty = b.ty("u8");
        let big = b.int("300");
        let stmt = b.let_("x", Some(ty), Some(big));
        let s = b.str("no");
        let ty = b.ty("bool");
        let mismatch = b.let_("y", Some(ty), Some(s));
        b.push(stmt).push(mismatch);
        let (_, issues) = run(&b.finish());
        assert_eq!(ids(&issues), vec![IssueId::ImplicitCastRequired, IssueId::TypeMismatch]);
    }

    #[test]
    fn test_literal_errors() {
        let mut b = TreeBuilder::new();
        let huge = b.int("340282366920938463463374607431768211456");
        let bad = b.int("0xZZ");
        let (s1, s2) = (b.expr_stmt(huge), b.expr_stmt(bad));
        b.push(s1).push(s2);
        let (_, issues) = run(&b.finish());
        assert_eq!(ids(&issues), vec![IssueId::IntegerTooLarge, IssueId::InvalidLiteral]);
    }

    #[test]
    fn test_condition_must_be_bool() {
        let mut b = TreeBuilder::new();
        let cond = b.int("1");
        let stmt = b.while_(cond, vec![]);
        b.push(stmt);
        let (_, issues) = run(&b.finish());
        assert_eq!(ids(&issues), vec![IssueId::ConditionNotBool]);
    }

    #[test]
    fn test_casts() {
        let mut b = TreeBuilder::new();
        let f = b.float("2.5");
        let ty = b.ty("i32");
        let ok = b.cast(f, ty);
        let ok_id = ok.id;

        let n = b.neg_int("1");
        let ty = b.ty("i8");
        let redundant = b.cast(n, ty);

        let s = b.str("x");
        let ty = b.ty("u8");
        let invalid = b.cast(s, ty);

        let (s1, s2, s3) = (b.expr_stmt(ok), b.expr_stmt(redundant), b.expr_stmt(invalid));
        b.push(s1).push(s2).push(s3);
        let (annotations, issues) = run(&b.finish());
        assert_eq!(ids(&issues), vec![IssueId::RedundantCast, IssueId::InvalidCast]);
        assert!(annotations.get(ok_id).unwrap().ty.is_primitive(Primitive::I32));
    }

    #[test]
    fn test_fields() {
        let mut b = TreeBuilder::new();
        let (x, y) = (b.ty("i16"), b.ty("i16"));
        b.structure("point", vec![("x", x), ("y", y)]);
        let ty = b.ty("point");
        let decl = b.let_("p", Some(ty), None);
        let one = b.neg_int("1");
        let assign = b.assign("p.y", one);
        let p = b.var("p");
        let read = b.field(p, "x");
        let read_id = read.id;
        let read_stmt = b.expr_stmt(read);
        let zero = b.int("0");
        let bad = b.assign("p.z", zero);
        b.push(decl).push(assign).push(read_stmt).push(bad);

        let (annotations, issues) = run(&b.finish());
        assert_eq!(ids(&issues), vec![IssueId::UnknownField]);
        assert!(annotations.get(read_id).unwrap().ty.is_primitive(Primitive::I16));
    }
}
