//! Dictionary methods. Every view filters internal `__` keys.

use std::rc::Rc;

use sorrel_runtime::{Dict, Record, Result, RuntimeError, Value};

use super::Registry;

fn dict(receiver: &Value) -> Result<&Dict> {
    match receiver {
        Value::Dict(dict) => Ok(dict),
        _ => Err(RuntimeError::internal("dictionary registry got a non-dictionary receiver")),
    }
}

fn dict_arg<'a>(args: &'a [Value], index: usize) -> Result<&'a Dict> {
    match &args[index] {
        Value::Dict(dict) => Ok(dict),
        other => Err(RuntimeError::bad_argument(format!(
            "argument {} must be a dictionary, got {}",
            index + 1,
            other.type_name()
        ))),
    }
}

fn str_arg<'a>(args: &'a [Value], index: usize) -> Result<&'a str> {
    args[index]
        .as_str()
        .ok_or_else(|| RuntimeError::bad_argument(format!("argument {} must be a string", index + 1)))
}

pub(super) fn build() -> Registry {
    let mut registry = Registry::new("dictionary");

    registry.register("length", "0", "visible entry count", |_, recv, _, _| {
        Ok(Value::Int(dict(recv)?.len() as i64))
    });

    registry.register("keys", "0", "visible keys in order", |_, recv, _, _| {
        Ok(Value::Array(
            dict(recv)?.keys().into_iter().map(Value::Str).collect(),
        ))
    });

    registry.register("values", "0", "visible values in order", |_, recv, _, _| {
        Ok(Value::Array(dict(recv)?.values()))
    });

    registry.register(
        "entries",
        "0-2",
        "entries as dictionaries, with optional key/value names",
        |_, recv, args, _| {
            let key_name = match args.first() {
                Some(_) => str_arg(args, 0)?.to_string(),
                None => "key".to_string(),
            };
            let value_name = match args.get(1) {
                Some(_) => str_arg(args, 1)?.to_string(),
                None => "value".to_string(),
            };
            let entries: Vec<Value> = dict(recv)?
                .visible()
                .map(|(key, value)| {
                    Value::Dict(Dict::from_pairs([
                        (key_name.clone(), Value::Str(key.clone())),
                        (value_name.clone(), value.clone()),
                    ]))
                })
                .collect();
            Ok(Value::Array(entries))
        },
    );

    registry.register("has", "1", "key presence test", |_, recv, args, _| {
        Ok(Value::Bool(dict(recv)?.contains_key(str_arg(args, 0)?)))
    });

    registry.register("get", "1-2", "value at a key, with optional default", |_, recv, args, _| {
        let fallback = args.get(1).cloned().unwrap_or(Value::Null);
        Ok(dict(recv)?
            .get(str_arg(args, 0)?)
            .cloned()
            .unwrap_or(fallback))
    });

    registry.register("set", "2", "copy with one entry replaced", |_, recv, args, _| {
        let mut out = dict(recv)?.clone();
        out.insert(str_arg(args, 0)?.to_string(), args[1].clone());
        Ok(Value::Dict(out))
    });

    registry.register("remove", "1", "copy without one key", |_, recv, args, _| {
        let mut out = dict(recv)?.clone();
        out.remove(str_arg(args, 0)?);
        Ok(Value::Dict(out))
    });

    registry.register("merge", "1", "copy with another dictionary merged in", |_, recv, args, _| {
        Ok(Value::Dict(dict(recv)?.merge(dict_arg(args, 0)?)))
    });

    registry.register("intersect", "1", "keys present in both", |_, recv, args, _| {
        Ok(Value::Dict(dict(recv)?.intersect(dict_arg(args, 0)?)))
    });

    registry.register("subtract", "1", "keys absent from the other", |_, recv, args, _| {
        Ok(Value::Dict(dict(recv)?.subtract(dict_arg(args, 0)?)))
    });

    registry.register("toJSON", "0", "JSON text, internal keys dropped", |_, recv, _, _| {
        Ok(Value::Str(recv.to_json().to_string()))
    });

    registry.register("as", "1", "bind to a schema and validate", |_, recv, args, _| {
        let schema = match &args[0] {
            Value::Schema(schema) => Rc::clone(schema),
            other => {
                return Err(RuntimeError::bad_argument(format!(
                    "argument 1 must be a schema, got {}",
                    other.type_name()
                )))
            }
        };
        let mut record = Record::from_input(schema, dict(recv)?.clone());
        record.validate();
        Ok(Value::Record(Box::new(record)))
    });

    registry
}
