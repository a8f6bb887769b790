//! # sorrel-ast
//!
//! AST node types for the sorrel scripting language, as produced by the
//! parser and consumed by the evaluator.
//!
//! The node family splits into three groups:
//! - Statements and blocks (`Stmt`, `Block`, `Program`)
//! - General expressions (`Expr`): literals, operators, control flow,
//!   functions, indexing and method calls
//! - The query family (`QueryExpr`, `InsertExpr`, `UpdateExpr`,
//!   `DeleteExpr`, `TransactionExpr`) with its sub-nodes for conditions,
//!   CTEs, sub-queries, computed fields and eager-load relation paths
//!
//! Every node carries a [`Position`] used in error reporting.

pub mod expression;
pub mod position;
pub mod query;
pub mod statement;

pub use expression::{Expr, ForBody, InfixOp, PrefixOp};
pub use position::Position;
pub use query::{
    AggregateFunc, BatchSpec, CommonTableExpr, CompareOp, ComputedField, Condition, Correlation,
    DeleteExpr, InsertExpr, JoinOn, Logic, OrderDirection, OrderField, Projection, QueryExpr,
    QueryTerminal, RelationPath, SubQuerySpec, TransactionExpr, UpdateExpr,
};
pub use statement::{Block, Program, Stmt};
