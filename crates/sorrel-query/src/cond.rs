//! Condition and sub-query compilation shared by the statement compilers.

use sorrel_ast::{
    AggregateFunc, CompareOp, Condition, Expr, Logic, OrderField, SubQuerySpec,
};
use sorrel_runtime::{Env, Result, RuntimeError, SqlValue, Value};

use crate::compiled::Params;
use crate::ident::{check_column_ref, check_identifier};
use crate::resolver::ValueResolver;

/// A CTE visible to condition compilation: its name and first projected
/// column, used when lowering a CTE reference to `IN (SELECT ...)`.
#[derive(Debug, Clone)]
pub(crate) struct CteInfo {
    pub name: String,
    pub first_column: Option<String>,
}

/// A correlated computed field visible to condition compilation, so a
/// condition on its alias can be rewritten to an inline sub-query.
pub(crate) struct CorrelatedField {
    pub alias: String,
    pub func: Option<AggregateFunc>,
    pub spec: SubQuerySpec,
}

/// Names resolvable inside a condition beyond plain columns.
#[derive(Default)]
pub(crate) struct QueryScope {
    pub ctes: Vec<CteInfo>,
    pub correlated: Vec<CorrelatedField>,
}

impl QueryScope {
    fn cte(&self, name: &str) -> Option<&CteInfo> {
        self.ctes.iter().find(|cte| cte.name == name)
    }

    fn correlated(&self, alias: &str) -> Option<&CorrelatedField> {
        self.correlated.iter().find(|field| field.alias == alias)
    }
}

/// Compiles a condition list into one SQL fragment, joining adjacent
/// conditions with their connectives (AND by default) and parenthesising
/// each condition when any OR appears.
pub(crate) fn compile_conditions(
    conditions: &[&Condition],
    table: &str,
    scope: &QueryScope,
    params: &mut Params,
    resolver: &mut dyn ValueResolver,
    env: &Env,
) -> Result<String> {
    let mut parts = Vec::with_capacity(conditions.len());
    for cond in conditions {
        parts.push((cond.logic(), compile_condition(cond, table, scope, params, resolver, env)?));
    }
    Ok(join_parts(parts))
}

/// Joins pre-compiled condition fragments; the first connective is
/// ignored.
pub(crate) fn join_parts(parts: Vec<(Logic, String)>) -> String {
    let wrap = parts.len() > 1 && parts.iter().skip(1).any(|(logic, _)| *logic == Logic::Or);
    let mut sql = String::new();
    for (i, (logic, part)) in parts.iter().enumerate() {
        if i > 0 {
            sql.push(' ');
            sql.push_str(logic.as_sql());
            sql.push(' ');
        }
        if wrap && !is_wrapped(part) {
            sql.push('(');
            sql.push_str(part);
            sql.push(')');
        } else {
            sql.push_str(part);
        }
    }
    sql
}

fn is_wrapped(part: &str) -> bool {
    part.starts_with('(') && part.ends_with(')')
}

fn compile_condition(
    condition: &Condition,
    table: &str,
    scope: &QueryScope,
    params: &mut Params,
    resolver: &mut dyn ValueResolver,
    env: &Env,
) -> Result<String> {
    match condition {
        Condition::Group { conditions, .. } => {
            let refs: Vec<&Condition> = conditions.iter().collect();
            let inner = compile_conditions(&refs, table, scope, params, resolver, env)?;
            Ok(format!("({inner})"))
        }
        Condition::Compare {
            column, op, value, ..
        } => compile_compare(column, *op, value.as_deref(), table, scope, params, resolver, env),
    }
}

#[allow(clippy::too_many_arguments)]
fn compile_compare(
    column: &str,
    op: CompareOp,
    value: Option<&Expr>,
    table: &str,
    scope: &QueryScope,
    params: &mut Params,
    resolver: &mut dyn ValueResolver,
    env: &Env,
) -> Result<String> {
    // A condition on a correlated computed field inlines the sub-query on
    // the left-hand side.
    if let Some(field) = scope.correlated(column) {
        let sub = compile_subquery(
            &field.spec,
            field.func,
            Some(table),
            scope,
            params,
            resolver,
            env,
        )?;
        let value = value.ok_or_else(|| {
            RuntimeError::query_syntax(format!("condition on {column:?} needs a value"))
        })?;
        let resolved = resolver.resolve(value, env)?;
        let placeholder = params.push(SqlValue::from_value(&resolved)?);
        return Ok(format!("({sub}) {} {placeholder}", op.as_sql()));
    }

    check_column_ref(column)?;

    if !op.takes_value() {
        return Ok(format!("{column} {}", op.as_sql()));
    }
    let value = value.ok_or_else(|| {
        RuntimeError::query_syntax(format!("condition on {column:?} needs a value"))
    })?;

    // A right-hand reference to a CTE name lowers to a membership probe
    // against the CTE's first projected column.
    if let Expr::Identifier { name, .. } = value {
        if let Some(cte) = scope.cte(name) {
            let keyword = match op {
                CompareOp::Eq | CompareOp::In => "IN",
                CompareOp::NotEq | CompareOp::NotIn => "NOT IN",
                _ => {
                    return Err(RuntimeError::query_syntax(format!(
                        "operator {op} cannot take CTE {name:?} as its value"
                    )))
                }
            };
            let projected = cte.first_column.as_deref().unwrap_or("*");
            return Ok(format!(
                "{column} {keyword} (SELECT {projected} FROM {})",
                cte.name
            ));
        }
    }

    let resolved = resolver.resolve(value, env)?;

    match op {
        CompareOp::In | CompareOp::NotIn => {
            let items = match resolved {
                Value::Array(items) => items,
                other => vec![other],
            };
            if items.is_empty() {
                // Empty membership never (or always) matches.
                return Ok(match op {
                    CompareOp::In => "1 = 0".to_string(),
                    _ => "1 = 1".to_string(),
                });
            }
            let mut placeholders = Vec::with_capacity(items.len());
            for item in &items {
                placeholders.push(params.push(SqlValue::from_value(item)?));
            }
            Ok(format!(
                "{column} {} ({})",
                op.as_sql(),
                placeholders.join(", ")
            ))
        }
        _ => {
            let placeholder = params.push(SqlValue::from_value(&resolved)?);
            Ok(format!("{column} {} {placeholder}", op.as_sql()))
        }
    }
}

/// Compiles a mini-SELECT used as a CTE body or as a correlated
/// sub-query. `func` overrides the projection with an aggregate;
/// `outer_table` enables the correlation predicate.
pub(crate) fn compile_subquery(
    spec: &SubQuerySpec,
    func: Option<AggregateFunc>,
    outer_table: Option<&str>,
    scope: &QueryScope,
    params: &mut Params,
    resolver: &mut dyn ValueResolver,
    env: &Env,
) -> Result<String> {
    check_identifier(&spec.table)?;
    for column in &spec.columns {
        check_identifier(column)?;
    }

    let projection = match func {
        Some(agg) => {
            let target = spec.columns.first().map_or("*", String::as_str);
            format!("{}({target})", agg.as_sql())
        }
        None if spec.columns.is_empty() => "*".to_string(),
        None => spec.columns.join(", "),
    };

    let mut sql = format!("SELECT {projection} FROM {}", spec.table);

    let mut parts = Vec::new();
    if !spec.conditions.is_empty() {
        let refs: Vec<&Condition> = spec.conditions.iter().collect();
        // Correlated fields never nest; only CTEs stay visible inside.
        let inner_scope = QueryScope {
            ctes: scope.ctes.clone(),
            correlated: Vec::new(),
        };
        parts.push(compile_conditions(
            &refs,
            &spec.table,
            &inner_scope,
            params,
            resolver,
            env,
        )?);
    }
    if let (Some(correlation), Some(outer)) = (&spec.correlate, outer_table) {
        check_identifier(&correlation.inner_column)?;
        check_identifier(&correlation.outer_column)?;
        parts.push(format!(
            "{} = {outer}.{}",
            correlation.inner_column, correlation.outer_column
        ));
    }
    if !parts.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&parts.join(" AND "));
    }

    if !spec.order_by.is_empty() {
        sql.push_str(" ORDER BY ");
        sql.push_str(&render_order_by(&spec.order_by)?);
    }
    if let Some(limit) = spec.limit {
        sql.push_str(&format!(" LIMIT {limit}"));
    }

    Ok(sql)
}

/// Renders an ORDER BY list, gating every column.
pub(crate) fn render_order_by(fields: &[OrderField]) -> Result<String> {
    let mut parts = Vec::with_capacity(fields.len());
    for field in fields {
        check_column_ref(&field.column)?;
        parts.push(format!("{} {}", field.column, field.direction.as_sql()));
    }
    Ok(parts.join(", "))
}
