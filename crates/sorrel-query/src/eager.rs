//! Eager loading of relations after a query's main result.
//!
//! Each relation path walks the schema's relation map: has-many fetches
//! child rows per primary row keyed on the foreign key, belongs-to fetches
//! one parent row keyed on the row's foreign-key field. Nested paths
//! recurse into the loaded relation. A target table with no known schema
//! still loads, but deeper segments degrade to nothing rather than error.

use std::rc::Rc;

use sorrel_ast::{Condition, RelationPath};
use sorrel_runtime::{
    database::row_to_dict, Dict, Env, RelationKind, Result, RuntimeError, Schema, SqlValue,
    TableBinding, Value,
};

use crate::compiled::Params;
use crate::cond::{compile_conditions, render_order_by, QueryScope};
use crate::ident::check_identifier;
use crate::resolver::ValueResolver;

/// Resolves a table name to its schema; relations into tables without a
/// visible binding return `None` and degrade gracefully.
pub trait SchemaLookup {
    /// Returns the schema bound to a table, when one is visible.
    fn schema_for_table(&self, table: &str) -> Option<Rc<Schema>>;
}

/// A lookup that knows no schemas.
pub struct NoSchemas;

impl SchemaLookup for NoSchemas {
    fn schema_for_table(&self, _table: &str) -> Option<Rc<Schema>> {
        None
    }
}

/// Loads every relation path into the given rows, in place.
#[allow(clippy::too_many_arguments)]
pub fn load_relations(
    binding: &TableBinding,
    rows: &mut [Dict],
    paths: &[RelationPath],
    lookup: &dyn SchemaLookup,
    resolver: &mut dyn ValueResolver,
    env: &Env,
) -> Result<()> {
    for path in paths {
        if path.path.is_empty() {
            continue;
        }
        load_path(binding, binding.schema.clone(), rows, path, 0, lookup, resolver, env)?;
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn load_path(
    binding: &TableBinding,
    schema: Option<Rc<Schema>>,
    rows: &mut [Dict],
    path: &RelationPath,
    depth: usize,
    lookup: &dyn SchemaLookup,
    resolver: &mut dyn ValueResolver,
    env: &Env,
) -> Result<()> {
    let Some(schema) = schema else {
        // No schema, no relation map: degrade instead of erroring.
        return Ok(());
    };
    let name = &path.path[depth];
    let relation = schema
        .relation(name)
        .ok_or_else(|| RuntimeError::unknown_relation(&schema.name, name))?
        .clone();

    let target_schema = lookup.schema_for_table(&relation.target_table);
    let mut target = binding.sibling(&relation.target_table);
    if let Some(target_schema) = &target_schema {
        target.schema = Some(target_schema.clone());
    }

    let leaf = depth + 1 == path.path.len();
    let target_pk = target.primary_key().to_string();

    for row in rows.iter_mut() {
        let loaded = match relation.kind {
            RelationKind::BelongsTo => {
                let fk_value = row.get(&relation.foreign_key).cloned();
                match fk_value {
                    None | Some(Value::Null) => Value::Null,
                    Some(key) => {
                        let mut parent = fetch_related(
                            &target,
                            &target_pk,
                            &key,
                            leaf.then_some(path),
                            true,
                            resolver,
                            env,
                        )?;
                        match parent.pop() {
                            Some(mut dict) => {
                                if !leaf {
                                    load_path(
                                        &target,
                                        target_schema.clone(),
                                        std::slice::from_mut(&mut dict),
                                        path,
                                        depth + 1,
                                        lookup,
                                        resolver,
                                        env,
                                    )?;
                                }
                                Value::Dict(dict)
                            }
                            None => Value::Null,
                        }
                    }
                }
            }
            RelationKind::HasMany => {
                let key = row.get(&schema.primary_key).cloned();
                match key {
                    None | Some(Value::Null) => Value::Array(Vec::new()),
                    Some(key) => {
                        let mut children = fetch_related(
                            &target,
                            &relation.foreign_key,
                            &key,
                            leaf.then_some(path),
                            false,
                            resolver,
                            env,
                        )?;
                        if !leaf {
                            load_path(
                                &target,
                                target_schema.clone(),
                                &mut children,
                                path,
                                depth + 1,
                                lookup,
                                resolver,
                                env,
                            )?;
                        }
                        Value::Array(children.into_iter().map(Value::Dict).collect())
                    }
                }
            }
        };
        row.insert(name.clone(), loaded);
    }
    Ok(())
}

/// Fetches related rows keyed on one column value, applying the path's
/// filter, ordering and per-record limit at the leaf.
fn fetch_related(
    target: &TableBinding,
    key_column: &str,
    key: &Value,
    extras: Option<&RelationPath>,
    single: bool,
    resolver: &mut dyn ValueResolver,
    env: &Env,
) -> Result<Vec<Dict>> {
    check_identifier(&target.table)?;
    check_identifier(key_column)?;

    let mut params = Params::new();
    let mut where_parts = Vec::new();
    if let Some(column) = &target.soft_delete {
        check_identifier(column)?;
        where_parts.push(format!("{column} IS NULL"));
    }
    let placeholder = params.push(SqlValue::from_value(key)?);
    where_parts.push(format!("{key_column} = {placeholder}"));

    if let Some(extras) = extras {
        if !extras.conditions.is_empty() {
            let refs: Vec<&Condition> = extras.conditions.iter().collect();
            let scope = QueryScope::default();
            where_parts.push(compile_conditions(
                &refs,
                &target.table,
                &scope,
                &mut params,
                resolver,
                env,
            )?);
        }
    }

    let mut sql = format!(
        "SELECT * FROM {} WHERE {}",
        target.table,
        where_parts.join(" AND ")
    );
    if let Some(extras) = extras {
        if !extras.order_by.is_empty() {
            sql.push_str(" ORDER BY ");
            sql.push_str(&render_order_by(&extras.order_by)?);
        }
    }
    if single {
        sql.push_str(" LIMIT 1");
    } else if let Some(limit) = extras.and_then(|extras| extras.limit) {
        sql.push_str(&format!(" LIMIT {limit}"));
    }

    tracing::debug!(sql = %sql, "eager relation fetch");
    let rows = target.db.query(&sql, &params.into_values())?;
    Ok(rows.into_iter().map(row_to_dict).collect())
}
