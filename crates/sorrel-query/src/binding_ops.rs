//! Read and write operations over a table binding.
//!
//! Every read funnels through one query builder, so `to_sql` returns
//! exactly the SQL a read would execute; soft-delete filtering and
//! identifier gating apply uniformly. Reads over a schema-bound table
//! produce trusted records; writes validate before touching the database.

use indexmap::IndexMap;
use sorrel_ast::{AggregateFunc, OrderField};
use sorrel_runtime::{
    database::row_to_dict, Dict, Record, Result, RuntimeError, SqlRow, SqlValue, TableBinding,
    TableValue, Value,
};

use crate::compiled::{CompiledQuery, Params};
use crate::ident::check_identifier;
use crate::insert::compile_insert;
use crate::options::{parse_query_options, QueryOptions};

/// Read methods answerable by `to_sql`.
const READ_METHODS: &[&str] = &[
    "all", "where", "first", "last", "find", "findBy", "count", "exists", "sum", "avg", "min",
    "max",
];

enum ReadShape {
    Many,
    One,
    Count,
    Exists,
    Aggregate(AggregateFunc),
}

/// The operations a binding value answers to.
pub trait BindingOps {
    /// Executes a read method (`all`, `where`, `find`, ...) by name.
    fn read(&self, method: &str, args: &[Value]) -> Result<Value>;

    /// Returns `{sql, params}` for the read the named method would run,
    /// without executing it.
    fn to_sql(&self, method: &str, args: &[Value]) -> Result<Value>;

    /// Inserts a row, filling auto-id fields and validating against the
    /// schema; returns the stored row as a trusted record.
    fn insert(&self, data: &Dict) -> Result<Value>;

    /// Updates the row with the given primary key; supplied fields are
    /// validated against the schema first.
    fn update(&self, pk: &Value, sets: &Dict) -> Result<Value>;

    /// Upserts a row on the primary key.
    fn save(&self, data: &Dict) -> Result<Value>;

    /// Deletes the row with the given primary key; with a soft-delete
    /// column configured the row is stamped instead. Returns the affected
    /// row count.
    fn delete(&self, pk: &Value) -> Result<Value>;
}

impl BindingOps for TableBinding {
    fn read(&self, method: &str, args: &[Value]) -> Result<Value> {
        let (compiled, shape) = build_read(self, method, args)?;
        tracing::debug!(table = %self.table, method, sql = %compiled.sql, "binding read");
        match shape {
            ReadShape::Many => {
                let rows = self.db.query(&compiled.sql, &compiled.params)?;
                Ok(Value::Table(Box::new(TableValue::from_db_rows(
                    rows.into_iter().map(row_to_dict).collect(),
                    self.schema.clone(),
                ))))
            }
            ReadShape::One => {
                let row = self.db.query_row(&compiled.sql, &compiled.params)?;
                Ok(row.map_or(Value::Null, |row| row_value(self, row)))
            }
            ReadShape::Count => {
                let row = self.db.query_row(&compiled.sql, &compiled.params)?;
                let count = row
                    .and_then(|row| row.values().next().and_then(Value::as_int))
                    .unwrap_or(0);
                Ok(Value::Int(count))
            }
            ReadShape::Exists => {
                let row = self.db.query_row(&compiled.sql, &compiled.params)?;
                Ok(Value::Bool(row.is_some()))
            }
            ReadShape::Aggregate(_) => {
                let row = self.db.query_row(&compiled.sql, &compiled.params)?;
                Ok(row
                    .and_then(|row| row.values().next().cloned())
                    .unwrap_or(Value::Null))
            }
        }
    }

    fn to_sql(&self, method: &str, args: &[Value]) -> Result<Value> {
        if !READ_METHODS.contains(&method) {
            return Err(RuntimeError::query_syntax(format!(
                "toSQL is only available for read methods, not {method:?}"
            ))
            .with_hint(format!("read methods: {}", READ_METHODS.join(", "))));
        }
        let (compiled, _) = build_read(self, method, args)?;
        Ok(Value::Dict(compiled.to_dict()))
    }

    fn insert(&self, data: &Dict) -> Result<Value> {
        let (compiled, filled) = prepare_insert(self, data, &[], None)?;
        self.db.execute(&compiled.sql, &compiled.params)?;
        tracing::debug!(table = %self.table, "inserted row");

        self.read("find", &[stored_pk(self, &filled)?])
    }

    fn update(&self, pk: &Value, sets: &Dict) -> Result<Value> {
        if sets.is_empty() {
            return Err(RuntimeError::query_syntax("update needs at least one SET column"));
        }
        if let Some(schema) = &self.schema {
            let errors = schema.validate_partial(sets);
            if !errors.is_empty() {
                return Err(validation_error(errors));
            }
        }

        let pk_column = self.primary_key().to_string();
        check_identifier(&self.table)?;
        check_identifier(&pk_column)?;

        let mut params = Params::new();
        let mut assignments = Vec::new();
        for (column, value) in sets.visible() {
            check_identifier(column)?;
            let placeholder = params.push(SqlValue::from_value(value)?);
            assignments.push(format!("{column} = {placeholder}"));
        }

        let mut where_parts = Vec::new();
        if let Some(column) = &self.soft_delete {
            check_identifier(column)?;
            where_parts.push(format!("{column} IS NULL"));
        }
        let placeholder = params.push(SqlValue::from_value(pk)?);
        where_parts.push(format!("{pk_column} = {placeholder}"));

        let sql = format!(
            "UPDATE {} SET {} WHERE {}",
            self.table,
            assignments.join(", "),
            where_parts.join(" AND ")
        );
        self.db.execute(&sql, &params.into_values())?;
        tracing::debug!(table = %self.table, "updated row");

        self.read("find", &[pk.clone()])
    }

    fn save(&self, data: &Dict) -> Result<Value> {
        let mut data = data.clone();
        fill_auto_ids(self, &mut data);
        validate_full(self, &data)?;

        let pk_column = self.primary_key().to_string();
        let (columns, values) = row_params(&data)?;
        let has_pk = data
            .get(&pk_column)
            .is_some_and(|value| !value.is_null());

        let compiled = if has_pk && columns.len() == 1 {
            // Nothing to update besides the key itself.
            check_identifier(&self.table)?;
            check_identifier(&pk_column)?;
            let mut params = Params::new();
            let placeholder = params.push(
                values
                    .into_iter()
                    .next()
                    .unwrap_or(SqlValue::Null),
            );
            CompiledQuery::new(
                format!(
                    "INSERT OR REPLACE INTO {} ({pk_column}) VALUES ({placeholder})",
                    self.table
                ),
                params.into_values(),
            )
        } else if has_pk {
            compile_insert(
                &self.table,
                &columns,
                values,
                std::slice::from_ref(&pk_column),
                None,
            )?
        } else {
            compile_insert(&self.table, &columns, values, &[], None)?
        };

        self.db.execute(&compiled.sql, &compiled.params)?;
        tracing::debug!(table = %self.table, "saved row");

        self.read("find", &[stored_pk(self, &data)?])
    }

    fn delete(&self, pk: &Value) -> Result<Value> {
        let pk_column = self.primary_key().to_string();
        check_identifier(&self.table)?;
        check_identifier(&pk_column)?;

        let mut params = Params::new();
        let placeholder = params.push(SqlValue::from_value(pk)?);
        let sql = match &self.soft_delete {
            Some(column) => {
                check_identifier(column)?;
                format!(
                    "UPDATE {} SET {column} = datetime('now') WHERE {column} IS NULL AND {pk_column} = {placeholder}",
                    self.table
                )
            }
            None => format!(
                "DELETE FROM {} WHERE {pk_column} = {placeholder}",
                self.table
            ),
        };
        let affected = self.db.execute(&sql, &params.into_values())?;
        tracing::debug!(table = %self.table, affected, "deleted row");
        Ok(Value::Int(affected as i64))
    }
}

/// Prepares one evaluated row for insertion: fills auto-id fields,
/// validates against the bound schema, and compiles the INSERT with
/// optional upsert keys and returning projection. Returns the compiled
/// statement together with the filled row.
pub fn prepare_insert(
    binding: &TableBinding,
    data: &Dict,
    conflict_keys: &[String],
    returning: Option<&sorrel_ast::Projection>,
) -> Result<(CompiledQuery, Dict)> {
    let mut data = data.clone();
    fill_auto_ids(binding, &mut data);
    validate_full(binding, &data)?;
    let (columns, values) = row_params(&data)?;
    let compiled = compile_insert(&binding.table, &columns, values, conflict_keys, returning)?;
    Ok((compiled, data))
}

/// Builds the validation error carried when a schema rejects a row.
#[must_use]
pub fn validation_failure(errors: IndexMap<String, Vec<String>>) -> RuntimeError {
    validation_error(errors)
}

// ---------------------------------------------------------------------
// Read building

fn build_read(
    binding: &TableBinding,
    method: &str,
    args: &[Value],
) -> Result<(CompiledQuery, ReadShape)> {
    let pk = binding.primary_key().to_string();
    match method {
        "all" => {
            let options = parse_query_options(args.first())?;
            build_query(binding, None, &options, None, ReadShape::Many)
        }
        "where" => {
            let conditions = dict_arg(args, 0, "where")?;
            let options = parse_query_options(args.get(1))?;
            build_query(binding, Some(conditions), &options, None, ReadShape::Many)
        }
        "first" => {
            let conditions = opt_dict_arg(args, 0, "first")?;
            build_query(
                binding,
                conditions,
                &QueryOptions::default(),
                Some(OrderField::asc(&pk)),
                ReadShape::One,
            )
        }
        "last" => {
            let conditions = opt_dict_arg(args, 0, "last")?;
            build_query(
                binding,
                conditions,
                &QueryOptions::default(),
                Some(OrderField::desc(&pk)),
                ReadShape::One,
            )
        }
        "find" => {
            let value = arg(args, 0, "find")?;
            let conditions = Dict::from_pairs([(pk, value.clone())]);
            build_query(
                binding,
                Some(&conditions),
                &QueryOptions::default(),
                None,
                ReadShape::One,
            )
        }
        "findBy" => {
            let column = str_arg(args, 0, "findBy")?;
            let value = arg(args, 1, "findBy")?;
            let conditions = Dict::from_pairs([(column.to_string(), value.clone())]);
            build_query(
                binding,
                Some(&conditions),
                &QueryOptions::default(),
                None,
                ReadShape::One,
            )
        }
        "count" => {
            let conditions = opt_dict_arg(args, 0, "count")?;
            build_query(
                binding,
                conditions,
                &QueryOptions::default(),
                None,
                ReadShape::Count,
            )
        }
        "exists" => {
            let conditions = opt_dict_arg(args, 0, "exists")?;
            build_query(
                binding,
                conditions,
                &QueryOptions::default(),
                None,
                ReadShape::Exists,
            )
        }
        "sum" | "avg" | "min" | "max" => {
            let func = match method {
                "sum" => AggregateFunc::Sum,
                "avg" => AggregateFunc::Avg,
                "min" => AggregateFunc::Min,
                _ => AggregateFunc::Max,
            };
            let column = str_arg(args, 0, method)?;
            check_identifier(column)?;
            let conditions = opt_dict_arg(args, 1, method)?;
            build_aggregate(binding, func, column, conditions)
        }
        other => Err(RuntimeError::undefined_method("binding", other)),
    }
}

fn build_query(
    binding: &TableBinding,
    conditions: Option<&Dict>,
    options: &QueryOptions,
    default_order: Option<OrderField>,
    shape: ReadShape,
) -> Result<(CompiledQuery, ReadShape)> {
    check_identifier(&binding.table)?;

    let mut params = Params::new();
    let mut where_parts = Vec::new();
    if let Some(column) = &binding.soft_delete {
        check_identifier(column)?;
        where_parts.push(format!("{column} IS NULL"));
    }
    if let Some(conditions) = conditions {
        where_parts.extend(conditions_sql(conditions, &mut params)?);
    }

    let mut sql = match &shape {
        ReadShape::Many | ReadShape::One => {
            format!("SELECT {} FROM {}", options.projection(), binding.table)
        }
        ReadShape::Count => format!("SELECT COUNT(*) FROM {}", binding.table),
        ReadShape::Exists => format!("SELECT 1 FROM {}", binding.table),
        ReadShape::Aggregate(_) => {
            return Err(RuntimeError::internal("aggregates use build_aggregate"))
        }
    };

    if !where_parts.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&where_parts.join(" AND "));
    }

    let order_by = if options.order_by.is_empty() {
        default_order.into_iter().collect()
    } else {
        options.order_by.clone()
    };
    if !order_by.is_empty() && matches!(shape, ReadShape::Many | ReadShape::One) {
        let rendered: Vec<String> = order_by
            .iter()
            .map(|field| format!("{} {}", field.column, field.direction.as_sql()))
            .collect();
        sql.push_str(" ORDER BY ");
        sql.push_str(&rendered.join(", "));
    }

    match (&shape, options.limit) {
        (ReadShape::Many | ReadShape::Exists, Some(limit)) => {
            sql.push_str(&format!(" LIMIT {limit}"));
        }
        (ReadShape::One, _) => sql.push_str(" LIMIT 1"),
        _ => {}
    }
    if let (ReadShape::Many, Some(offset)) = (&shape, options.offset) {
        sql.push_str(&format!(" OFFSET {offset}"));
    }

    Ok((CompiledQuery::new(sql, params.into_values()), shape))
}

fn build_aggregate(
    binding: &TableBinding,
    func: AggregateFunc,
    column: &str,
    conditions: Option<&Dict>,
) -> Result<(CompiledQuery, ReadShape)> {
    check_identifier(&binding.table)?;

    let mut params = Params::new();
    let mut where_parts = Vec::new();
    if let Some(soft) = &binding.soft_delete {
        check_identifier(soft)?;
        where_parts.push(format!("{soft} IS NULL"));
    }
    if let Some(conditions) = conditions {
        where_parts.extend(conditions_sql(conditions, &mut params)?);
    }

    let mut sql = format!("SELECT {}({column}) FROM {}", func.as_sql(), binding.table);
    if !where_parts.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&where_parts.join(" AND "));
    }

    Ok((
        CompiledQuery::new(sql, params.into_values()),
        ReadShape::Aggregate(func),
    ))
}

/// Renders an equality condition per dictionary entry: null matches with
/// `IS NULL`, arrays with `IN`.
fn conditions_sql(conditions: &Dict, params: &mut Params) -> Result<Vec<String>> {
    let mut parts = Vec::new();
    for (column, value) in conditions.visible() {
        check_identifier(column)?;
        match value {
            Value::Null => parts.push(format!("{column} IS NULL")),
            Value::Array(items) => {
                if items.is_empty() {
                    parts.push("1 = 0".to_string());
                    continue;
                }
                let mut placeholders = Vec::with_capacity(items.len());
                for item in items {
                    placeholders.push(params.push(SqlValue::from_value(item)?));
                }
                parts.push(format!("{column} IN ({})", placeholders.join(", ")));
            }
            other => {
                let placeholder = params.push(SqlValue::from_value(other)?);
                parts.push(format!("{column} = {placeholder}"));
            }
        }
    }
    Ok(parts)
}

// ---------------------------------------------------------------------
// Write helpers

fn fill_auto_ids(binding: &TableBinding, data: &mut Dict) {
    let Some(schema) = &binding.schema else {
        return;
    };
    for (name, def) in &schema.fields {
        let Some(strategy) = def.auto else { continue };
        let missing = matches!(data.get(name), None | Some(Value::Null));
        if missing {
            if let Some(id) = strategy.generate() {
                data.insert(name.clone(), Value::Str(id));
            }
        }
    }
}

fn validate_full(binding: &TableBinding, data: &Dict) -> Result<()> {
    let Some(schema) = &binding.schema else {
        return Ok(());
    };
    let errors = schema.validate(data);
    if errors.is_empty() {
        Ok(())
    } else {
        Err(validation_error(errors))
    }
}

fn validation_error(errors: IndexMap<String, Vec<String>>) -> RuntimeError {
    let data: IndexMap<String, String> = errors
        .into_iter()
        .map(|(field, messages)| (field, messages.join("; ")))
        .collect();
    RuntimeError::validation("record failed validation").with_data(data)
}

fn row_params(data: &Dict) -> Result<(Vec<String>, Vec<SqlValue>)> {
    let mut columns = Vec::new();
    let mut values = Vec::new();
    for (column, value) in data.visible() {
        columns.push(column.clone());
        values.push(SqlValue::from_value(value)?);
    }
    Ok((columns, values))
}

/// The primary-key value a freshly written row can be read back by: the
/// supplied or generated key, or the driver's last insert rowid.
fn stored_pk(binding: &TableBinding, data: &Dict) -> Result<Value> {
    match data.get(binding.primary_key()) {
        Some(value) if !value.is_null() => Ok(value.clone()),
        _ => Ok(Value::Int(binding.db.last_insert_id()?)),
    }
}

/// Wraps one result row: a trusted record under a schema, a plain
/// dictionary otherwise.
fn row_value(binding: &TableBinding, row: SqlRow) -> Value {
    let dict = row_to_dict(row);
    match &binding.schema {
        Some(schema) => Value::Record(Box::new(Record::trusted(schema.clone(), dict))),
        None => Value::Dict(dict),
    }
}

// ---------------------------------------------------------------------
// Argument helpers

fn arg<'a>(args: &'a [Value], index: usize, method: &str) -> Result<&'a Value> {
    args.get(index).ok_or_else(|| {
        RuntimeError::bad_argument(format!("{method} is missing argument {}", index + 1))
    })
}

fn str_arg<'a>(args: &'a [Value], index: usize, method: &str) -> Result<&'a str> {
    arg(args, index, method)?.as_str().ok_or_else(|| {
        RuntimeError::bad_argument(format!("{method} argument {} must be a string", index + 1))
    })
}

fn dict_arg<'a>(args: &'a [Value], index: usize, method: &str) -> Result<&'a Dict> {
    match arg(args, index, method)? {
        Value::Dict(dict) => Ok(dict),
        other => Err(RuntimeError::bad_argument(format!(
            "{method} argument {} must be a dictionary, got {}",
            index + 1,
            other.type_name()
        ))),
    }
}

fn opt_dict_arg<'a>(args: &'a [Value], index: usize, method: &str) -> Result<Option<&'a Dict>> {
    match args.get(index) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Dict(dict)) => Ok(Some(dict)),
        Some(other) => Err(RuntimeError::bad_argument(format!(
            "{method} argument {} must be a dictionary, got {}",
            index + 1,
            other.type_name()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::FakeDb;
    use sorrel_runtime::{FieldDef, FieldType, IdStrategy, Schema};
    use std::rc::Rc;

    fn binding(db: Rc<FakeDb>) -> TableBinding {
        TableBinding::new(db, "posts")
    }

    fn soft_binding(db: Rc<FakeDb>) -> TableBinding {
        binding(db).with_soft_delete("deleted_at")
    }

    fn schema_binding(db: Rc<FakeDb>) -> TableBinding {
        let schema = Schema::new("Post", "posts")
            .field(
                "id",
                FieldDef::new(FieldType::Int).auto(IdStrategy::AutoIncrement),
            )
            .field("title", FieldDef::new(FieldType::Text).required());
        binding(db).with_schema(Rc::new(schema))
    }

    fn row(pairs: &[(&str, Value)]) -> SqlRow {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_all_plain() {
        let db = Rc::new(FakeDb::new());
        db.queue_rows(vec![row(&[("id", Value::Int(1))])]);
        let result = binding(db.clone()).read("all", &[]).unwrap();
        assert_eq!(db.recorded_sql(), vec!["SELECT * FROM posts"]);
        match result {
            Value::Table(table) => {
                assert!(table.from_db);
                assert_eq!(table.len(), 1);
            }
            other => panic!("expected table, got {other:?}"),
        }
    }

    #[test]
    fn test_where_with_options() {
        let db = Rc::new(FakeDb::new());
        db.queue_rows(vec![]);
        let conditions = Dict::from_pairs([(
            "status".to_string(),
            Value::Str("published".to_string()),
        )]);
        let options = Value::Dict(Dict::from_pairs([
            ("orderBy".to_string(), Value::Str("-created_at".to_string())),
            ("limit".to_string(), Value::Int(10)),
        ]));
        binding(db.clone())
            .read("where", &[Value::Dict(conditions), options])
            .unwrap();
        assert_eq!(
            db.recorded_sql(),
            vec!["SELECT * FROM posts WHERE status = $1 ORDER BY created_at DESC LIMIT 10"]
        );
        assert_eq!(
            db.calls.borrow()[0].1,
            vec![SqlValue::Text("published".to_string())]
        );
    }

    #[test]
    fn test_soft_delete_filters_reads() {
        let db = Rc::new(FakeDb::new());
        db.queue_rows(vec![]);
        soft_binding(db.clone()).read("all", &[]).unwrap();
        assert_eq!(
            db.recorded_sql(),
            vec!["SELECT * FROM posts WHERE deleted_at IS NULL"]
        );
    }

    #[test]
    fn test_find_limits_to_one() {
        let db = Rc::new(FakeDb::new());
        db.queue_rows(vec![]);
        let result = binding(db.clone()).read("find", &[Value::Int(7)]).unwrap();
        assert_eq!(result, Value::Null);
        assert_eq!(
            db.recorded_sql(),
            vec!["SELECT * FROM posts WHERE id = $1 LIMIT 1"]
        );
    }

    #[test]
    fn test_first_and_last_order_by_pk() {
        let db = Rc::new(FakeDb::new());
        db.queue_rows(vec![]);
        db.queue_rows(vec![]);
        let b = binding(db.clone());
        b.read("first", &[]).unwrap();
        b.read("last", &[]).unwrap();
        assert_eq!(
            db.recorded_sql(),
            vec![
                "SELECT * FROM posts ORDER BY id ASC LIMIT 1",
                "SELECT * FROM posts ORDER BY id DESC LIMIT 1",
            ]
        );
    }

    #[test]
    fn test_count_and_exists() {
        let db = Rc::new(FakeDb::new());
        db.queue_rows(vec![row(&[("COUNT(*)", Value::Int(3))])]);
        db.queue_rows(vec![row(&[("1", Value::Int(1))])]);
        let b = binding(db.clone());
        assert_eq!(b.read("count", &[]).unwrap(), Value::Int(3));
        assert_eq!(b.read("exists", &[]).unwrap(), Value::Bool(true));
        assert_eq!(
            db.recorded_sql(),
            vec![
                "SELECT COUNT(*) FROM posts",
                "SELECT 1 FROM posts",
            ]
        );
    }

    #[test]
    fn test_aggregates() {
        let db = Rc::new(FakeDb::new());
        db.queue_rows(vec![row(&[("SUM(views)", Value::Int(42))])]);
        let result = binding(db.clone())
            .read("sum", &[Value::Str("views".to_string())])
            .unwrap();
        assert_eq!(result, Value::Int(42));
        assert_eq!(db.recorded_sql(), vec!["SELECT SUM(views) FROM posts"]);
    }

    #[test]
    fn test_to_sql_matches_read() {
        let db = Rc::new(FakeDb::new());
        db.queue_rows(vec![]);
        let b = soft_binding(db.clone());
        let conditions = Value::Dict(Dict::from_pairs([(
            "status".to_string(),
            Value::Str("draft".to_string()),
        )]));

        let dict = match b.to_sql("where", &[conditions.clone()]).unwrap() {
            Value::Dict(dict) => dict,
            other => panic!("expected dict, got {other:?}"),
        };
        b.read("where", &[conditions]).unwrap();

        let executed = &db.calls.borrow()[0];
        assert_eq!(dict.get("sql"), Some(&Value::Str(executed.0.clone())));
        assert_eq!(
            dict.get("params"),
            Some(&Value::Array(vec![Value::Str("draft".to_string())]))
        );
    }

    #[test]
    fn test_to_sql_rejects_writes() {
        let db = Rc::new(FakeDb::new());
        let err = binding(db).to_sql("insert", &[]).unwrap_err();
        assert_eq!(err.code, "SYN-0001");
    }

    #[test]
    fn test_insert_validates_against_schema() {
        let db = Rc::new(FakeDb::new());
        let data = Dict::new();
        let err = schema_binding(db).insert(&data).unwrap_err();
        assert_eq!(err.code, "VAL-0001");
        assert!(err.data.unwrap().contains_key("title"));
    }

    #[test]
    fn test_insert_reads_back_by_last_insert_id() {
        let db = Rc::new(FakeDb::new());
        db.last_id.set(9);
        db.queue_rows(vec![row(&[
            ("id", Value::Int(9)),
            ("title", Value::Str("Hi".to_string())),
        ])]);
        let data = Dict::from_pairs([("title".to_string(), Value::Str("Hi".to_string()))]);
        let result = schema_binding(db.clone()).insert(&data).unwrap();

        let sql = db.recorded_sql();
        assert_eq!(sql[0], "INSERT INTO posts (title) VALUES ($1)");
        assert_eq!(sql[1], "SELECT * FROM posts WHERE id = $1 LIMIT 1");
        assert_eq!(db.calls.borrow()[1].1, vec![SqlValue::Int(9)]);

        match result {
            Value::Record(record) => assert!(record.is_valid()),
            other => panic!("expected trusted record, got {other:?}"),
        }
    }

    #[test]
    fn test_save_upserts_on_primary_key() {
        let db = Rc::new(FakeDb::new());
        db.queue_rows(vec![row(&[("id", Value::Int(1))])]);
        let data = Dict::from_pairs([
            ("id".to_string(), Value::Int(1)),
            ("title".to_string(), Value::Str("Hi".to_string())),
        ]);
        schema_binding(db.clone()).save(&data).unwrap();
        assert_eq!(
            db.recorded_sql()[0],
            "INSERT INTO posts (id, title) VALUES ($1, $2) \
             ON CONFLICT (id) DO UPDATE SET title = EXCLUDED.title"
        );
    }

    #[test]
    fn test_save_pk_only_uses_insert_or_replace() {
        let db = Rc::new(FakeDb::new());
        db.queue_rows(vec![row(&[("id", Value::Int(1))])]);
        let data = Dict::from_pairs([("id".to_string(), Value::Int(1))]);
        binding(db.clone()).save(&data).unwrap();
        assert_eq!(
            db.recorded_sql()[0],
            "INSERT OR REPLACE INTO posts (id) VALUES ($1)"
        );
    }

    #[test]
    fn test_delete_soft_stamps() {
        let db = Rc::new(FakeDb::new());
        let result = soft_binding(db.clone()).delete(&Value::Int(3)).unwrap();
        assert_eq!(result, Value::Int(1));
        assert_eq!(
            db.recorded_sql(),
            vec![
                "UPDATE posts SET deleted_at = datetime('now') \
                 WHERE deleted_at IS NULL AND id = $1"
            ]
        );
    }

    #[test]
    fn test_delete_hard_removes() {
        let db = Rc::new(FakeDb::new());
        binding(db.clone()).delete(&Value::Int(3)).unwrap();
        assert_eq!(db.recorded_sql(), vec!["DELETE FROM posts WHERE id = $1"]);
    }

    #[test]
    fn test_update_validates_supplied_fields_only() {
        let db = Rc::new(FakeDb::new());
        db.queue_rows(vec![row(&[("id", Value::Int(1))])]);
        // `title` is required but not supplied; partial validation passes.
        let sets = Dict::from_pairs([("id".to_string(), Value::Int(1))]);
        assert!(schema_binding(db.clone()).update(&Value::Int(1), &sets).is_ok());

        // A supplied field of the wrong type still fails.
        let bad = Dict::from_pairs([("title".to_string(), Value::Int(5))]);
        let err = schema_binding(db).update(&Value::Int(1), &bad).unwrap_err();
        assert_eq!(err.code, "VAL-0001");
    }

    #[test]
    fn test_unsafe_condition_column_rejected() {
        let db = Rc::new(FakeDb::new());
        let conditions = Value::Dict(Dict::from_pairs([(
            "status; --".to_string(),
            Value::Int(1),
        )]));
        let err = binding(db).read("where", &[conditions]).unwrap_err();
        assert_eq!(err.code, "VAL-0002");
    }
}
