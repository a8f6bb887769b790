//! Schema, record and table methods.

use sorrel_runtime::{Dict, RuntimeError, Value};

use super::Registry;

pub(super) fn build_schema() -> Registry {
    let mut registry = Registry::new("schema");

    registry.register("name", "0", "schema name", |_, recv, _, _| match recv {
        Value::Schema(schema) => Ok(Value::Str(schema.name.clone())),
        _ => Err(RuntimeError::internal("schema registry got a non-schema receiver")),
    });

    registry.register("table", "0", "backing table name", |_, recv, _, _| match recv {
        Value::Schema(schema) => Ok(Value::Str(schema.table.clone())),
        _ => Err(RuntimeError::internal("schema registry got a non-schema receiver")),
    });

    registry.register("fields", "0", "field names to type names", |_, recv, _, _| {
        match recv {
            Value::Schema(schema) => Ok(Value::Dict(Dict::from_pairs(
                schema.fields.iter().map(|(name, def)| {
                    (name.clone(), Value::Str(def.field_type.name().to_string()))
                }),
            ))),
            _ => Err(RuntimeError::internal("schema registry got a non-schema receiver")),
        }
    });

    registry.register("validate", "1", "validate a dictionary", |_, recv, args, _| {
        let Value::Schema(schema) = recv else {
            return Err(RuntimeError::internal("schema registry got a non-schema receiver"));
        };
        let Value::Dict(data) = &args[0] else {
            return Err(RuntimeError::bad_argument("argument 1 must be a dictionary"));
        };
        Ok(errors_dict(&schema.validate(data)))
    });

    registry
}

fn errors_dict(errors: &indexmap::IndexMap<String, Vec<String>>) -> Value {
    Value::Dict(Dict::from_pairs(errors.iter().map(|(field, messages)| {
        (
            field.clone(),
            Value::Array(messages.iter().cloned().map(Value::Str).collect()),
        )
    })))
}

pub(super) fn build_record() -> Registry {
    let mut registry = Registry::new("record");

    registry.register("isValid", "0", "validated with no errors", |_, recv, _, _| {
        match recv {
            Value::Record(record) => Ok(Value::Bool(record.is_valid())),
            _ => Err(RuntimeError::internal("record registry got a non-record receiver")),
        }
    });

    registry.register("errors", "0", "per-field validation errors", |_, recv, _, _| {
        match recv {
            Value::Record(record) => Ok(errors_dict(&record.errors)),
            _ => Err(RuntimeError::internal("record registry got a non-record receiver")),
        }
    });

    registry.register("data", "0", "the underlying dictionary", |_, recv, _, _| {
        match recv {
            Value::Record(record) => Ok(Value::Dict(record.data.clone())),
            _ => Err(RuntimeError::internal("record registry got a non-record receiver")),
        }
    });

    registry.register("validate", "0", "revalidated copy", |_, recv, _, _| match recv {
        Value::Record(record) => {
            let mut out = record.clone();
            out.validate();
            Ok(Value::Record(out))
        }
        _ => Err(RuntimeError::internal("record registry got a non-record receiver")),
    });

    registry.register("get", "1", "field value or null", |_, recv, args, _| {
        let Value::Record(record) = recv else {
            return Err(RuntimeError::internal("record registry got a non-record receiver"));
        };
        let key = args[0]
            .as_str()
            .ok_or_else(|| RuntimeError::bad_argument("argument 1 must be a string"))?;
        Ok(record.data.get(key).cloned().unwrap_or(Value::Null))
    });

    registry.register("schema", "0", "the bound schema", |_, recv, _, _| match recv {
        Value::Record(record) => Ok(Value::Schema(record.schema.clone())),
        _ => Err(RuntimeError::internal("record registry got a non-record receiver")),
    });

    registry.register("toJSON", "0", "JSON text of the data", |_, recv, _, _| {
        Ok(Value::Str(recv.to_json().to_string()))
    });

    registry
}

pub(super) fn build_table() -> Registry {
    let mut registry = Registry::new("table");

    registry.register("rows", "0", "rows as dictionaries", |_, recv, _, _| match recv {
        Value::Table(table) => Ok(Value::Array(
            table.rows.iter().cloned().map(Value::Dict).collect(),
        )),
        _ => Err(RuntimeError::internal("table registry got a non-table receiver")),
    });

    registry.register("columns", "0", "column names", |_, recv, _, _| match recv {
        Value::Table(table) => Ok(Value::Array(
            table.columns.iter().cloned().map(Value::Str).collect(),
        )),
        _ => Err(RuntimeError::internal("table registry got a non-table receiver")),
    });

    registry.register("length", "0", "row count", |_, recv, _, _| match recv {
        Value::Table(table) => Ok(Value::Int(table.len() as i64)),
        _ => Err(RuntimeError::internal("table registry got a non-table receiver")),
    });

    registry.register("first", "0", "first row or null", |_, recv, _, _| match recv {
        Value::Table(table) => Ok(table
            .rows
            .first()
            .cloned()
            .map_or(Value::Null, Value::Dict)),
        _ => Err(RuntimeError::internal("table registry got a non-table receiver")),
    });

    registry.register("last", "0", "last row or null", |_, recv, _, _| match recv {
        Value::Table(table) => Ok(table
            .rows
            .last()
            .cloned()
            .map_or(Value::Null, Value::Dict)),
        _ => Err(RuntimeError::internal("table registry got a non-table receiver")),
    });

    registry.register("toJSON", "0", "JSON text of the rows", |_, recv, _, _| {
        Ok(Value::Str(recv.to_json().to_string()))
    });

    registry
}
