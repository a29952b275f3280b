use serde::{Deserialize, Serialize};

/// 1-based source location handed over by the front end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Position {
    pub line: usize,
    pub col: usize,
}

/// Identity of an expression node. Unique within one tree; keys the
/// compiler's side tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId(pub u32);

/// A parsed compilation unit.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SourceTree {
    /// Module the program's own types belong to.
    pub module: Option<String>,
    pub imports: Vec<Import>,
    pub structs: Vec<StructDecl>,
    /// Top-level statements, run in order.
    pub body: Vec<Stmt>,
}

// ───────────────────────────── Declarations ─────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Import {
    pub module: String,
    pub item: ImportItem,
    pub position: Position,
}

/// Item selection in an `import` statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ImportItem {
    /// Import a single type.
    Single(String),
    /// Import every type of the module.
    All,
}

/// `struct Name { field: Type, ... }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructDecl {
    pub name: String,
    pub public: bool,
    pub fields: Vec<FieldDecl>,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDecl {
    pub name: String,
    pub ty: TypeRef,
    pub position: Position,
}

/// A type as written in source: a name plus generic arguments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeRef {
    pub name: String,
    pub params: Vec<TypeRef>,
    pub position: Position,
}

// ────────────────────────────── Statements ──────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stmt {
    pub kind: StmtKind,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StmtKind {
    /// `let name [: Type] [= value];`. A missing value zero-initialises.
    Let {
        name: String,
        ty: Option<TypeRef>,
        value: Option<Expr>,
    },

    /// `target = value;`
    Assign { target: Place, value: Expr },

    /// Expression evaluated for its effect; the value is discarded.
    Expr(Expr),

    /// `{ ... }`, opens a scope.
    Block(Vec<Stmt>),

    If {
        cond: Expr,
        then_branch: Vec<Stmt>,
        else_branch: Option<Vec<Stmt>>,
    },

    While { cond: Expr, body: Vec<Stmt> },

    /// Stop the program with a return code.
    Halt(i32),

    /// Debug pause.
    Debug,
}

/// An assignable location: a variable and an optional field path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Place {
    pub name: String,
    pub fields: Vec<String>,
}

// ────────────────────────────── Expressions ─────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expr {
    pub id: NodeId,
    pub kind: ExprKind,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExprKind {
    Literal(Literal),

    Variable(String),

    /// `target.name`
    Field { target: Box<Expr>, name: String },

    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },

    Unary { op: UnaryOp, operand: Box<Expr> },

    /// `expr as Type`
    Cast { expr: Box<Expr>, ty: TypeRef },
}

/// Literal text exactly as the front end scanned it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Literal {
    /// Digits with an optional `0x`/`0b` prefix; the sign is separate.
    Integer { digits: String, negative: bool },
    Float { text: String, negative: bool },
    Bool(bool),
    Char(String),
    Str(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Shl,
    Shr,
    BitAnd,
    BitOr,
    BitXor,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    And,
    Or,
}

/// Operand requirements shared by a group of binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorClass {
    Arithmetic,
    Bitwise,
    Equality,
    Ordering,
    Logical,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
            BinaryOp::BitAnd => "&",
            BinaryOp::BitOr => "|",
            BinaryOp::BitXor => "^",
            BinaryOp::Eq => "==",
            BinaryOp::NotEq => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::LtEq => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::GtEq => ">=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
        }
    }

    pub fn class(self) -> OperatorClass {
        match self {
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => {
                OperatorClass::Arithmetic
            }
            BinaryOp::Shl
            | BinaryOp::Shr
            | BinaryOp::BitAnd
            | BinaryOp::BitOr
            | BinaryOp::BitXor => {
                OperatorClass::Bitwise
            }
            BinaryOp::Eq | BinaryOp::NotEq => OperatorClass::Equality,
            BinaryOp::Lt | BinaryOp::LtEq | BinaryOp::Gt | BinaryOp::GtEq => {
                OperatorClass::Ordering
            }
            BinaryOp::And | BinaryOp::Or => OperatorClass::Logical,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnaryOp {
    /// `-x`
    Neg,
    /// `!x`
    Not,
    /// `++x`
    Inc,
    /// `--x`
    Dec,
}

impl UnaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOp::Neg => "-",
            UnaryOp::Not => "!",
            UnaryOp::Inc => "++",
            UnaryOp::Dec => "--",
        }
    }
}
