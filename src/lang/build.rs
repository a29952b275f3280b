use super::node::{
    BinaryOp, Expr, ExprKind, Import, ImportItem, Literal, NodeId, Place, Position, SourceTree,
    Stmt, StmtKind, StructDecl, TypeRef, UnaryOp,
};

/// Builds syntax trees with unique node ids.
///
/// Every node gets the builder's current position; move it with
/// [`at`](Self::at) before building the nodes of a new line.
#[derive(Debug, Default)]
pub struct TreeBuilder {
    next_id: u32,
    position: Position,
    tree: SourceTree,
}

impl TreeBuilder {
    pub fn new() -> Self {
        Self {
            next_id: 0,
            position: Position { line: 1, col: 1 },
            tree: SourceTree::default(),
        }
    }

    pub fn at(&mut self, line: usize, col: usize) -> &mut Self {
        self.position = Position { line, col };
        self
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn finish(self) -> SourceTree {
        self.tree
    }

    // ─── Top level ───

    pub fn module(&mut self, name: &str) -> &mut Self {
        self.tree.module = Some(name.to_string());
        self
    }

    pub fn import(&mut self, module: &str, item: &str) -> &mut Self {
        let item = if item == "*" {
            ImportItem::All
        } else {
            ImportItem::Single(item.to_string())
        };
        self.tree.imports.push(Import {
            module: module.to_string(),
            item,
            position: self.position,
        });
        self
    }

    /// `struct name { fields }`; fields are `(name, type)` pairs.
    pub fn structure(&mut self, name: &str, fields: Vec<(&str, TypeRef)>) -> &mut Self {
        let position = self.position;
        let fields = fields
            .into_iter()
            .map(|(name, ty)| super::node::FieldDecl {
                name: name.to_string(),
                ty,
                position,
            })
            .collect();
        self.tree.structs.push(StructDecl {
            name: name.to_string(),
            public: true,
            fields,
            position,
        });
        self
    }

    pub fn push(&mut self, stmt: Stmt) -> &mut Self {
        self.tree.body.push(stmt);
        self
    }

    // ─── Types ───

    pub fn ty(&self, name: &str) -> TypeRef {
        self.generic(name, Vec::new())
    }

    pub fn generic(&self, name: &str, params: Vec<TypeRef>) -> TypeRef {
        TypeRef {
            name: name.to_string(),
            params,
            position: self.position,
        }
    }

    // ─── Expressions ───

    pub fn expr(&mut self, kind: ExprKind) -> Expr {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        Expr {
            id,
            kind,
            position: self.position,
        }
    }

    pub fn int(&mut self, digits: &str) -> Expr {
        self.expr(ExprKind::Literal(Literal::Integer {
            digits: digits.to_string(),
            negative: false,
        }))
    }

    pub fn neg_int(&mut self, digits: &str) -> Expr {
        self.expr(ExprKind::Literal(Literal::Integer {
            digits: digits.to_string(),
            negative: true,
        }))
    }

    pub fn float(&mut self, text: &str) -> Expr {
        let (negative, text) = match text.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, text),
        };
        self.expr(ExprKind::Literal(Literal::Float {
            text: text.to_string(),
            negative,
        }))
    }

    pub fn bool(&mut self, value: bool) -> Expr {
        self.expr(ExprKind::Literal(Literal::Bool(value)))
    }

    pub fn char(&mut self, text: &str) -> Expr {
        self.expr(ExprKind::Literal(Literal::Char(text.to_string())))
    }

    pub fn str(&mut self, text: &str) -> Expr {
        self.expr(ExprKind::Literal(Literal::Str(text.to_string())))
    }

    pub fn var(&mut self, name: &str) -> Expr {
        self.expr(ExprKind::Variable(name.to_string()))
    }

    pub fn field(&mut self, target: Expr, name: &str) -> Expr {
        self.expr(ExprKind::Field {
            target: Box::new(target),
            name: name.to_string(),
        })
    }

    pub fn binary(&mut self, op: BinaryOp, lhs: Expr, rhs: Expr) -> Expr {
        self.expr(ExprKind::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        })
    }

    pub fn unary(&mut self, op: UnaryOp, operand: Expr) -> Expr {
        self.expr(ExprKind::Unary {
            op,
            operand: Box::new(operand),
        })
    }

    pub fn cast(&mut self, expr: Expr, ty: TypeRef) -> Expr {
        self.expr(ExprKind::Cast {
            expr: Box::new(expr),
            ty,
        })
    }

    // ─── Statements ───

    pub fn stmt(&self, kind: StmtKind) -> Stmt {
        Stmt {
            kind,
            position: self.position,
        }
    }

    pub fn let_(&self, name: &str, ty: Option<TypeRef>, value: Option<Expr>) -> Stmt {
        self.stmt(StmtKind::Let {
            name: name.to_string(),
            ty,
            value,
        })
    }

    /// Assignment to `path`, written `a` or `a.b.c`.
    pub fn assign(&self, path: &str, value: Expr) -> Stmt {
        let mut parts = path.split('.').map(str::to_string);
        let name = parts.next().unwrap_or_default();
        self.stmt(StmtKind::Assign {
            target: Place {
                name,
                fields: parts.collect(),
            },
            value,
        })
    }

    pub fn expr_stmt(&self, expr: Expr) -> Stmt {
        self.stmt(StmtKind::Expr(expr))
    }

    pub fn block(&self, body: Vec<Stmt>) -> Stmt {
        self.stmt(StmtKind::Block(body))
    }

    pub fn if_(&self, cond: Expr, then_branch: Vec<Stmt>, else_branch: Option<Vec<Stmt>>) -> Stmt {
        self.stmt(StmtKind::If {
            cond,
            then_branch,
            else_branch,
        })
    }

    pub fn while_(&self, cond: Expr, body: Vec<Stmt>) -> Stmt {
        self.stmt(StmtKind::While { cond, body })
    }

    pub fn halt(&self, code: i32) -> Stmt {
        self.stmt(StmtKind::Halt(code))
    }

    pub fn debug(&self) -> Stmt {
        self.stmt(StmtKind::Debug)
    }
}
