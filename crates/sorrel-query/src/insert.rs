//! INSERT compilation.

use sorrel_ast::Projection;
use sorrel_runtime::{Result, RuntimeError, SqlValue};

use crate::compiled::{CompiledQuery, Params};
use crate::ident::check_identifier;

/// Renders an optional `RETURNING` suffix.
pub(crate) fn render_returning(projection: Option<&Projection>) -> Result<String> {
    match projection {
        None => Ok(String::new()),
        Some(Projection::All) => Ok(" RETURNING *".to_string()),
        Some(Projection::Columns(columns)) => {
            for column in columns {
                check_identifier(column)?;
            }
            Ok(format!(" RETURNING {}", columns.join(", ")))
        }
    }
}

/// Compiles a single-row INSERT, optionally upserting on conflict keys.
///
/// With conflict keys, non-key columns update from `EXCLUDED`; when every
/// inserted column is a key the conflict degrades to `DO NOTHING`.
pub fn compile_insert(
    table: &str,
    columns: &[String],
    values: Vec<SqlValue>,
    conflict_keys: &[String],
    returning: Option<&Projection>,
) -> Result<CompiledQuery> {
    check_identifier(table)?;
    if columns.is_empty() {
        return Err(RuntimeError::query_syntax("insert needs at least one column"));
    }
    if columns.len() != values.len() {
        return Err(RuntimeError::internal(format!(
            "insert column/value mismatch: {} columns, {} values",
            columns.len(),
            values.len()
        )));
    }
    for column in columns {
        check_identifier(column)?;
    }

    let mut params = Params::new();
    let placeholders: Vec<String> = values.into_iter().map(|v| params.push(v)).collect();

    let mut sql = format!(
        "INSERT INTO {table} ({}) VALUES ({})",
        columns.join(", "),
        placeholders.join(", ")
    );

    if !conflict_keys.is_empty() {
        for key in conflict_keys {
            check_identifier(key)?;
            if !columns.contains(key) {
                return Err(RuntimeError::query_syntax(format!(
                    "conflict key {key:?} is not an inserted column"
                )));
            }
        }
        let updates: Vec<String> = columns
            .iter()
            .filter(|column| !conflict_keys.contains(column))
            .map(|column| format!("{column} = EXCLUDED.{column}"))
            .collect();
        sql.push_str(&format!(" ON CONFLICT ({})", conflict_keys.join(", ")));
        if updates.is_empty() {
            sql.push_str(" DO NOTHING");
        } else {
            sql.push_str(" DO UPDATE SET ");
            sql.push_str(&updates.join(", "));
        }
    }

    sql.push_str(&render_returning(returning)?);

    tracing::debug!(sql = %sql, "compiled insert");
    Ok(CompiledQuery::new(sql, params.into_values()))
}
