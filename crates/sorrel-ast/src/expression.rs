//! Expression AST types.

use core::fmt;

use crate::position::Position;
use crate::query::{DeleteExpr, InsertExpr, QueryExpr, TransactionExpr, UpdateExpr};
use crate::statement::Block;

/// Prefix operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrefixOp {
    /// Arithmetic negation (`-`)
    Neg,
    /// Logical not (`!`)
    Not,
}

impl PrefixOp {
    /// Returns the source representation of the operator.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Neg => "-",
            Self::Not => "!",
        }
    }
}

impl fmt::Display for PrefixOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Infix operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InfixOp {
    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,
    Mod,

    // Comparison
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,

    // Logical
    And,
    Or,
}

impl InfixOp {
    /// Returns the source representation of the operator.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Mod => "%",
            Self::Eq => "==",
            Self::NotEq => "!=",
            Self::Lt => "<",
            Self::LtEq => "<=",
            Self::Gt => ">",
            Self::GtEq => ">=",
            Self::And => "&&",
            Self::Or => "||",
        }
    }
}

impl fmt::Display for InfixOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The body of a `for` expression.
///
/// `for` either executes a block per element or applies a function to each
/// element; the parser distinguishes the two forms.
#[derive(Debug, Clone, PartialEq)]
pub enum ForBody {
    /// `for (x in xs) { ... }`
    Block(Block),
    /// `for (xs, fn(x) { ... })`
    Apply(Box<Expr>),
}

/// An expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Integer literal.
    Integer { value: i64, pos: Position },
    /// Float literal.
    Float { value: f64, pos: Position },
    /// String literal.
    Str { value: String, pos: Position },
    /// Boolean literal.
    Boolean { value: bool, pos: Position },
    /// `null` literal.
    Null { pos: Position },
    /// Array literal.
    Array { elements: Vec<Expr>, pos: Position },
    /// Dictionary literal; entry order is source order.
    Dictionary {
        entries: Vec<(String, Expr)>,
        pos: Position,
    },
    /// A name reference.
    Identifier { name: String, pos: Position },
    /// Prefix operator application.
    Prefix {
        op: PrefixOp,
        right: Box<Expr>,
        pos: Position,
    },
    /// Infix operator application.
    Infix {
        op: InfixOp,
        left: Box<Expr>,
        right: Box<Expr>,
        pos: Position,
    },
    /// `if (cond) { ... } else { ... }`
    If {
        condition: Box<Expr>,
        consequence: Block,
        alternative: Option<Block>,
        pos: Position,
    },
    /// Function literal.
    Function {
        params: Vec<String>,
        body: Block,
        pos: Position,
    },
    /// Function call.
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
        pos: Position,
    },
    /// Index access (`xs[i]`, `d["k"]`).
    Index {
        object: Box<Expr>,
        index: Box<Expr>,
        pos: Position,
    },
    /// Property access (`d.key`).
    Dot {
        object: Box<Expr>,
        property: String,
        pos: Position,
    },
    /// Method call (`recv.name(args)`).
    MethodCall {
        receiver: Box<Expr>,
        method: String,
        args: Vec<Expr>,
        pos: Position,
    },
    /// Inclusive integer range (`a..b`), direction-aware.
    Range {
        start: Box<Expr>,
        end: Box<Expr>,
        pos: Position,
    },
    /// `for` loop over an iterable.
    For {
        /// Loop bindings: one name for element iteration, two for
        /// key/value iteration over dictionaries.
        bindings: Vec<String>,
        iterable: Box<Expr>,
        body: ForBody,
        pos: Position,
    },
    /// `skip` — discard the current loop iteration's output.
    Skip { pos: Position },
    /// `stop` — terminate the nearest loop with its accumulated output.
    Stop { pos: Position },
    /// `try expr` — intercepts catchable errors.
    Try { inner: Box<Expr>, pos: Position },
    /// `check cond else value` — gates continuation of the enclosing body.
    Check {
        condition: Box<Expr>,
        fallback: Box<Expr>,
        pos: Position,
    },
    /// `@query(...)` expression.
    Query(QueryExpr),
    /// `@insert(...)` expression.
    Insert(InsertExpr),
    /// `@update(...)` expression.
    Update(UpdateExpr),
    /// `@delete(...)` expression.
    Delete(DeleteExpr),
    /// `@transaction { ... }` expression.
    Transaction(TransactionExpr),
}

impl Expr {
    /// Returns the source position of the expression.
    #[must_use]
    pub fn pos(&self) -> Position {
        match self {
            Self::Integer { pos, .. }
            | Self::Float { pos, .. }
            | Self::Str { pos, .. }
            | Self::Boolean { pos, .. }
            | Self::Null { pos }
            | Self::Array { pos, .. }
            | Self::Dictionary { pos, .. }
            | Self::Identifier { pos, .. }
            | Self::Prefix { pos, .. }
            | Self::Infix { pos, .. }
            | Self::If { pos, .. }
            | Self::Function { pos, .. }
            | Self::Call { pos, .. }
            | Self::Index { pos, .. }
            | Self::Dot { pos, .. }
            | Self::MethodCall { pos, .. }
            | Self::Range { pos, .. }
            | Self::For { pos, .. }
            | Self::Skip { pos }
            | Self::Stop { pos }
            | Self::Try { pos, .. }
            | Self::Check { pos, .. } => *pos,
            Self::Query(q) => q.pos,
            Self::Insert(i) => i.pos,
            Self::Update(u) => u.pos,
            Self::Delete(d) => d.pos,
            Self::Transaction(t) => t.pos,
        }
    }
}
