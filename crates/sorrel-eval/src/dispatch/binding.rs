//! Table binding methods, delegating to the query layer.

use sorrel_query::BindingOps;
use sorrel_runtime::{Dict, Result, RuntimeError, TableBinding, Value};

use super::Registry;

fn binding(receiver: &Value) -> Result<&TableBinding> {
    match receiver {
        Value::Binding(binding) => Ok(binding),
        _ => Err(RuntimeError::internal("binding registry got a non-binding receiver")),
    }
}

/// A row argument: a dictionary, or a record's data.
fn row_arg(args: &[Value], index: usize) -> Result<Dict> {
    match &args[index] {
        Value::Dict(dict) => Ok(dict.clone()),
        Value::Record(record) => Ok(record.data.clone()),
        other => Err(RuntimeError::bad_argument(format!(
            "argument {} must be a dictionary or record, got {}",
            index + 1,
            other.type_name()
        ))),
    }
}

pub(super) fn build() -> Registry {
    let mut registry = Registry::new("binding");

    // Reads delegate to BindingOps::read by name, so toSQL reproduces
    // them exactly.
    registry.register("all", "0-1", "every visible row", |_, recv, args, _| {
        binding(recv)?.read("all", args)
    });

    registry.register("where", "1-2", "rows matching equality conditions", |_, recv, args, _| {
        binding(recv)?.read("where", args)
    });

    registry.register("first", "0-1", "first row by primary key", |_, recv, args, _| {
        binding(recv)?.read("first", args)
    });

    registry.register("last", "0-1", "last row by primary key", |_, recv, args, _| {
        binding(recv)?.read("last", args)
    });

    registry.register("find", "1", "row by primary key", |_, recv, args, _| {
        binding(recv)?.read("find", args)
    });

    registry.register("findBy", "2", "row by one column value", |_, recv, args, _| {
        binding(recv)?.read("findBy", args)
    });

    registry.register("exists", "0-1", "whether any row matches", |_, recv, args, _| {
        binding(recv)?.read("exists", args)
    });

    registry.register("count", "0-1", "matching row count", |_, recv, args, _| {
        binding(recv)?.read("count", args)
    });

    registry.register("sum", "1-2", "column sum", |_, recv, args, _| {
        binding(recv)?.read("sum", args)
    });

    registry.register("avg", "1-2", "column average", |_, recv, args, _| {
        binding(recv)?.read("avg", args)
    });

    registry.register("min", "1-2", "column minimum", |_, recv, args, _| {
        binding(recv)?.read("min", args)
    });

    registry.register("max", "1-2", "column maximum", |_, recv, args, _| {
        binding(recv)?.read("max", args)
    });

    registry.register("insert", "1", "insert a validated row", |_, recv, args, _| {
        binding(recv)?.insert(&row_arg(args, 0)?)
    });

    registry.register("update", "2", "update a row by primary key", |_, recv, args, _| {
        binding(recv)?.update(&args[0], &row_arg(args, 1)?)
    });

    registry.register("save", "1", "upsert a row on the primary key", |_, recv, args, _| {
        binding(recv)?.save(&row_arg(args, 0)?)
    });

    registry.register("delete", "1", "delete (or stamp) a row by primary key", |_, recv, args, _| {
        binding(recv)?.delete(&args[0])
    });

    registry.register("toSQL", "1+", "SQL a read method would execute", |_, recv, args, _| {
        let method = args[0].as_str().ok_or_else(|| {
            RuntimeError::bad_argument("argument 1 must be a read method name")
        })?;
        binding(recv)?.to_sql(method, &args[1..])
    });

    registry
}
