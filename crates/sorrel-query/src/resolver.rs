//! The expression-evaluation seam between compiler and evaluator.

use sorrel_ast::Expr;
use sorrel_runtime::{Env, Result, Value};

/// Evaluates embedded expressions (condition values, limits, offsets,
/// insert/update values) against an environment. Implemented by the
/// evaluator; the compiler stays ignorant of evaluation.
pub trait ValueResolver {
    /// Evaluates an expression to a plain value.
    fn resolve(&mut self, expr: &Expr, env: &Env) -> Result<Value>;
}
