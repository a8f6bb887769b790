//! SELECT compilation from query expressions.

use sorrel_ast::{
    AggregateFunc, CommonTableExpr, Condition, ComputedField, Projection, QueryExpr,
    QueryTerminal,
};
use sorrel_runtime::{Env, Result, RuntimeError, TableBinding};

use crate::compiled::{CompiledQuery, Params};
use crate::cond::{
    compile_conditions, compile_subquery, render_order_by, CorrelatedField, CteInfo, QueryScope,
};
use crate::ident::{check_column_ref, check_identifier};
use crate::resolver::ValueResolver;

/// Compiles a query expression against a binding into parameterised SQL.
///
/// Parameters number `$1..$n` in SQL text order: CTE bodies first, then
/// projected sub-queries, then WHERE, then HAVING.
pub fn compile_select(
    binding: &TableBinding,
    query: &QueryExpr,
    resolver: &mut dyn ValueResolver,
    env: &Env,
) -> Result<CompiledQuery> {
    let table = binding.table.as_str();
    check_identifier(table)?;

    let mut params = Params::new();
    let mut sql = String::new();

    let scope = build_scope(&query.ctes, &query.computed)?;
    let aggregate_aliases: Vec<&str> = query
        .computed
        .iter()
        .filter_map(|field| match field {
            ComputedField::Aggregate { alias, .. } => Some(alias.as_str()),
            _ => None,
        })
        .collect();

    compile_with_clause(&query.ctes, &scope, &mut sql, &mut params, resolver, env)?;

    // Projection.
    let has_joins = query
        .computed
        .iter()
        .any(|field| matches!(field, ComputedField::Join { .. }));
    match query.terminal {
        QueryTerminal::Count => sql.push_str(&format!("SELECT COUNT(*) FROM {table}")),
        QueryTerminal::Exists => sql.push_str(&format!("SELECT 1 FROM {table}")),
        _ => {
            let mut columns = Vec::new();
            match &query.projection {
                Projection::All => {
                    columns.push(if has_joins {
                        format!("{table}.*")
                    } else {
                        "*".to_string()
                    });
                }
                Projection::Columns(names) => {
                    for name in names {
                        check_column_ref(name)?;
                        columns.push(name.clone());
                    }
                }
            }
            for field in &query.computed {
                match field {
                    ComputedField::Aggregate {
                        alias,
                        func,
                        column,
                    } => {
                        check_identifier(alias)?;
                        if column != "*" {
                            check_identifier(column)?;
                        } else if *func != AggregateFunc::Count {
                            return Err(RuntimeError::query_syntax(format!(
                                "{}(*) is only valid for count",
                                func.as_sql()
                            )));
                        }
                        columns.push(format!("{}({column}) AS {alias}", func.as_sql()));
                    }
                    ComputedField::SubQuery { alias, func, sub } => {
                        check_identifier(alias)?;
                        let inner = compile_subquery(
                            sub,
                            *func,
                            Some(table),
                            &scope,
                            &mut params,
                            resolver,
                            env,
                        )?;
                        columns.push(format!("({inner}) AS {alias}"));
                    }
                    ComputedField::Join {
                        alias, columns: join_columns, ..
                    } => {
                        if join_columns.is_empty() {
                            columns.push(format!("{alias}.*"));
                        } else {
                            for column in join_columns {
                                check_identifier(column)?;
                                columns.push(format!("{alias}.{column}"));
                            }
                        }
                    }
                }
            }
            sql.push_str("SELECT ");
            sql.push_str(&columns.join(", "));
            sql.push_str(&format!(" FROM {table}"));
        }
    }

    // Join sub-queries multiply rows.
    for field in &query.computed {
        if let ComputedField::Join {
            alias, table: join_table, on, ..
        } = field
        {
            check_identifier(alias)?;
            check_identifier(join_table)?;
            let mut on_parts = Vec::with_capacity(on.len());
            for join_on in on {
                check_identifier(&join_on.outer_column)?;
                check_identifier(&join_on.inner_column)?;
                on_parts.push(format!(
                    "{alias}.{} = {table}.{}",
                    join_on.inner_column, join_on.outer_column
                ));
            }
            sql.push_str(&format!(
                " JOIN {join_table} {alias} ON {}",
                on_parts.join(" AND ")
            ));
        }
    }

    // WHERE / HAVING split: conditions on aggregate aliases go to HAVING;
    // everything else (correlated aliases included, rewritten inline)
    // stays in WHERE.
    let mut where_conditions: Vec<&Condition> = Vec::new();
    let mut having_conditions: Vec<&Condition> = Vec::new();
    for condition in &query.conditions {
        match condition {
            Condition::Compare { column, .. }
                if aggregate_aliases.contains(&column.as_str()) =>
            {
                having_conditions.push(condition);
            }
            _ => where_conditions.push(condition),
        }
    }

    let mut where_sql = String::new();
    if let Some(column) = &binding.soft_delete {
        check_identifier(column)?;
        where_sql.push_str(&format!("{column} IS NULL"));
    }
    if !where_conditions.is_empty() {
        let compiled =
            compile_conditions(&where_conditions, table, &scope, &mut params, resolver, env)?;
        if where_sql.is_empty() {
            where_sql = compiled;
        } else {
            where_sql.push_str(" AND ");
            where_sql.push_str(&compiled);
        }
    }
    if !where_sql.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&where_sql);
    }

    if !query.group_by.is_empty() {
        for column in &query.group_by {
            check_column_ref(column)?;
        }
        sql.push_str(" GROUP BY ");
        sql.push_str(&query.group_by.join(", "));
    }

    if !having_conditions.is_empty() {
        let compiled =
            compile_conditions(&having_conditions, table, &scope, &mut params, resolver, env)?;
        sql.push_str(" HAVING ");
        sql.push_str(&compiled);
    }

    if !query.order_by.is_empty() {
        sql.push_str(" ORDER BY ");
        sql.push_str(&render_order_by(&query.order_by)?);
    }

    let limit = resolve_bound(query.limit.as_deref(), "limit", resolver, env)?;
    let offset = resolve_bound(query.offset.as_deref(), "offset", resolver, env)?;
    match (limit, query.terminal) {
        (Some(n), _) => sql.push_str(&format!(" LIMIT {n}")),
        // The one-row terminal implies LIMIT 1; count and exists probe on
        // their own terms.
        (None, QueryTerminal::One) => sql.push_str(" LIMIT 1"),
        _ => {}
    }
    if let Some(n) = offset {
        sql.push_str(&format!(" OFFSET {n}"));
    }

    if query.terminal == QueryTerminal::ToSql {
        tracing::debug!(sql = %sql, params = params.len(), "rendered select for toSQL");
    } else {
        tracing::debug!(sql = %sql, params = params.len(), "compiled select");
    }
    Ok(CompiledQuery::new(sql, params.into_values()))
}

fn build_scope(ctes: &[CommonTableExpr], computed: &[ComputedField]) -> Result<QueryScope> {
    let mut scope = QueryScope::default();
    for cte in ctes {
        check_identifier(&cte.name)?;
        scope.ctes.push(CteInfo {
            name: cte.name.clone(),
            first_column: cte.query.columns.first().cloned(),
        });
    }
    for field in computed {
        if let ComputedField::SubQuery { alias, func, sub } = field {
            scope.correlated.push(CorrelatedField {
                alias: alias.clone(),
                func: *func,
                spec: sub.clone(),
            });
        }
    }
    Ok(scope)
}

fn compile_with_clause(
    ctes: &[CommonTableExpr],
    scope: &QueryScope,
    sql: &mut String,
    params: &mut Params,
    resolver: &mut dyn ValueResolver,
    env: &Env,
) -> Result<()> {
    if ctes.is_empty() {
        return Ok(());
    }
    sql.push_str("WITH ");
    for (i, cte) in ctes.iter().enumerate() {
        if i > 0 {
            sql.push_str(", ");
        }
        // Earlier CTEs stay visible inside later bodies.
        let visible = QueryScope {
            ctes: scope.ctes[..i].to_vec(),
            correlated: Vec::new(),
        };
        let body = compile_subquery(&cte.query, None, None, &visible, params, resolver, env)?;
        sql.push_str(&format!("{} AS ({body})", cte.name));
    }
    sql.push(' ');
    Ok(())
}

fn resolve_bound(
    expr: Option<&sorrel_ast::Expr>,
    what: &str,
    resolver: &mut dyn ValueResolver,
    env: &Env,
) -> Result<Option<i64>> {
    let Some(expr) = expr else {
        return Ok(None);
    };
    let value = resolver.resolve(expr, env)?;
    match value.as_int() {
        Some(n) if n >= 0 => Ok(Some(n)),
        Some(n) => Err(RuntimeError::bad_value(format!("{what} must not be negative, got {n}"))),
        None => Err(RuntimeError::bad_value(format!(
            "{what} must be an integer, got {}",
            value.type_name()
        ))),
    }
}
