//! UPDATE compilation.

use sorrel_ast::{Condition, Projection};
use sorrel_runtime::{Env, Result, RuntimeError, SqlValue, TableBinding};

use crate::compiled::{CompiledQuery, Params};
use crate::cond::{compile_conditions, QueryScope};
use crate::ident::check_identifier;
use crate::insert::render_returning;
use crate::resolver::ValueResolver;

/// Compiles an UPDATE. Set parameters bind before condition parameters,
/// matching their order in the SQL text. An update without SET columns is
/// rejected.
pub fn compile_update(
    binding: &TableBinding,
    sets: &[(String, SqlValue)],
    conditions: &[Condition],
    returning: Option<&Projection>,
    resolver: &mut dyn ValueResolver,
    env: &Env,
) -> Result<CompiledQuery> {
    let table = binding.table.as_str();
    check_identifier(table)?;
    if sets.is_empty() {
        return Err(RuntimeError::query_syntax("update needs at least one SET column"));
    }

    let mut params = Params::new();
    let mut assignments = Vec::with_capacity(sets.len());
    for (column, value) in sets {
        check_identifier(column)?;
        let placeholder = params.push(value.clone());
        assignments.push(format!("{column} = {placeholder}"));
    }

    let mut sql = format!("UPDATE {table} SET {}", assignments.join(", "));

    if !conditions.is_empty() {
        let refs: Vec<&Condition> = conditions.iter().collect();
        let scope = QueryScope::default();
        let compiled = compile_conditions(&refs, table, &scope, &mut params, resolver, env)?;
        sql.push_str(" WHERE ");
        sql.push_str(&compiled);
    }

    sql.push_str(&render_returning(returning)?);

    tracing::debug!(sql = %sql, "compiled update");
    Ok(CompiledQuery::new(sql, params.into_values()))
}
