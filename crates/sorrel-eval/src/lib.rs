//! # sorrel-eval
//!
//! The tree-walking evaluator of the sorrel scripting language: a
//! recursive walk over the AST with signal-based control flow, a method
//! dispatch system presenting a uniform polymorphic API over every value
//! kind, and execution of the inline query DSL through the compiler and
//! binding layer of `sorrel-query`.

pub mod dispatch;
pub mod evaluator;
mod query_exec;

pub use dispatch::{call_method, known_methods, register_special, Registry};
pub use evaluator::Evaluator;
