pub mod printer;

use serde::Serialize;

use crate::scanner::token::Span;

/// Top-level program: a list of statements.
#[derive(Debug, Clone, Serialize)]
pub struct Program {
    pub statements: Vec<Stmt>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum Stmt {
    Expression(ExprStmt),
    Assign(AssignStmt),
    CompoundAssign(CompoundAssignStmt),
    Print(PrintStmt),
    Exit(ExitStmt),
    If(IfStmt),
    While(WhileStmt),
}

#[derive(Debug, Clone, Serialize)]
pub struct ExprStmt {
    pub expression: Expr,
    pub span: Span,
}

/// `a = 1`, `a = b = 1` and `a, b = b, a`.
///
/// Each entry of `targets` is one `=`-separated target list; all lists have
/// the same arity as `values` (or `values` holds a single expression and
/// every list a single name).
#[derive(Debug, Clone, Serialize)]
pub struct AssignStmt {
    pub targets: Vec<Vec<String>>,
    pub values: Vec<Expr>,
    pub span: Span,
}

/// `x += 1` and friends.
#[derive(Debug, Clone, Serialize)]
pub struct CompoundAssignStmt {
    pub name: String,
    pub operator: BinaryOp,
    pub value: Expr,
    pub span: Span,
}

#[derive(Debug, Clone, Serialize)]
pub struct PrintStmt {
    pub expression: Expr,
    pub span: Span,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExitStmt {
    pub value: Option<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, Serialize)]
pub struct IfStmt {
    pub condition: Expr,
    pub then_branch: Vec<Stmt>,
    pub else_branch: Option<Vec<Stmt>>,
    pub span: Span,
}

#[derive(Debug, Clone, Serialize)]
pub struct WhileStmt {
    pub condition: Expr,
    pub body: Vec<Stmt>,
    pub span: Span,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum Expr {
    Binary(BinaryExpr),
    Unary(UnaryExpr),
    Literal(LiteralExpr),
    Grouping(GroupingExpr),
    Variable(VariableExpr),
    Logical(LogicalExpr),
}

impl Expr {
    pub fn span(&self) -> Span {
        match self {
            Self::Binary(e) => e.span,
            Self::Unary(e) => e.span,
            Self::Literal(e) => e.span,
            Self::Grouping(e) => e.span,
            Self::Variable(e) => e.span,
            Self::Logical(e) => e.span,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BinaryExpr {
    pub left: Box<Expr>,
    pub operator: BinaryOp,
    pub right: Box<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
pub enum BinaryOp {
    #[strum(serialize = "+")]
    Add,
    #[strum(serialize = "-")]
    Subtract,
    #[strum(serialize = "*")]
    Multiply,
    #[strum(serialize = "/")]
    Divide,
    #[strum(serialize = "%")]
    Remainder,
    #[strum(serialize = "==")]
    Equal,
    #[strum(serialize = "!=")]
    NotEqual,
    #[strum(serialize = "<")]
    Less,
    #[strum(serialize = "<=")]
    LessEqual,
    #[strum(serialize = ">")]
    Greater,
    #[strum(serialize = ">=")]
    GreaterEqual,
}

#[derive(Debug, Clone, Serialize)]
pub struct UnaryExpr {
    pub operator: UnaryOp,
    pub operand: Box<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
pub enum UnaryOp {
    #[strum(serialize = "-")]
    Negate,
    #[strum(serialize = "!")]
    Not,
}

#[derive(Debug, Clone, Serialize)]
pub struct LiteralExpr {
    pub value: LiteralValue,
    pub span: Span,
}

#[derive(Debug, Clone, Serialize)]
pub enum LiteralValue {
    Integer(i64),
    Float(f64),
    String(String),
    Bool(bool),
    Nil,
}

#[derive(Debug, Clone, Serialize)]
pub struct GroupingExpr {
    pub expression: Box<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, Serialize)]
pub struct VariableExpr {
    pub name: String,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum LogicalOp {
    And,
    Or,
}

#[derive(Debug, Clone, Serialize)]
pub struct LogicalExpr {
    pub left: Box<Expr>,
    pub operator: LogicalOp,
    pub right: Box<Expr>,
    pub span: Span,
}
