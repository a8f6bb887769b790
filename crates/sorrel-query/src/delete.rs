//! DELETE compilation, soft-delete aware.

use sorrel_ast::{Condition, Projection};
use sorrel_runtime::{Env, Result, TableBinding};

use crate::compiled::{CompiledQuery, Params};
use crate::cond::{compile_conditions, QueryScope};
use crate::ident::check_identifier;
use crate::insert::render_returning;
use crate::resolver::ValueResolver;

/// Compiles a DELETE. With a soft-delete column configured, the statement
/// becomes an UPDATE stamping the column with the current datetime and
/// filtering already-deleted rows; otherwise rows are removed.
pub fn compile_delete(
    binding: &TableBinding,
    conditions: &[Condition],
    returning: Option<&Projection>,
    resolver: &mut dyn ValueResolver,
    env: &Env,
) -> Result<CompiledQuery> {
    let table = binding.table.as_str();
    check_identifier(table)?;

    let mut params = Params::new();
    let mut sql;
    let mut where_parts = Vec::new();

    if let Some(column) = &binding.soft_delete {
        check_identifier(column)?;
        sql = format!("UPDATE {table} SET {column} = datetime('now')");
        where_parts.push(format!("{column} IS NULL"));
    } else {
        sql = format!("DELETE FROM {table}");
    }

    if !conditions.is_empty() {
        let refs: Vec<&Condition> = conditions.iter().collect();
        let scope = QueryScope::default();
        where_parts.push(compile_conditions(&refs, table, &scope, &mut params, resolver, env)?);
    }

    if !where_parts.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&where_parts.join(" AND "));
    }

    sql.push_str(&render_returning(returning)?);

    tracing::debug!(sql = %sql, "compiled delete");
    Ok(CompiledQuery::new(sql, params.into_values()))
}
