//! String methods. Lengths and indices are in characters, not bytes.

use sorrel_runtime::{Result, RuntimeError, Value};

use super::Registry;

fn text(receiver: &Value) -> Result<&str> {
    receiver
        .as_str()
        .ok_or_else(|| RuntimeError::internal("string registry got a non-string receiver"))
}

fn str_arg<'a>(args: &'a [Value], index: usize) -> Result<&'a str> {
    args[index]
        .as_str()
        .ok_or_else(|| RuntimeError::bad_argument(format!("argument {} must be a string", index + 1)))
}

fn int_arg(args: &[Value], index: usize) -> Result<i64> {
    args[index].as_int().ok_or_else(|| {
        RuntimeError::bad_argument(format!("argument {} must be an integer", index + 1))
    })
}

/// Clamps a possibly negative slice bound into `0..=len`.
fn slice_bound(bound: i64, len: usize) -> usize {
    let len = len as i64;
    let idx = if bound < 0 { len + bound } else { bound };
    idx.clamp(0, len) as usize
}

pub(super) fn build() -> Registry {
    let mut registry = Registry::new("string");

    registry.register("length", "0", "character count", |_, recv, _, _| {
        Ok(Value::Int(text(recv)?.chars().count() as i64))
    });

    registry.register("toUpper", "0", "uppercase copy", |_, recv, _, _| {
        Ok(Value::Str(text(recv)?.to_uppercase()))
    });

    registry.register("toLower", "0", "lowercase copy", |_, recv, _, _| {
        Ok(Value::Str(text(recv)?.to_lowercase()))
    });

    registry.register("trim", "0", "strip surrounding whitespace", |_, recv, _, _| {
        Ok(Value::Str(text(recv)?.trim().to_string()))
    });

    registry.register("split", "1", "split on a separator", |_, recv, args, _| {
        let text = text(recv)?;
        let separator = str_arg(args, 0)?;
        let parts: Vec<Value> = if separator.is_empty() {
            text.chars().map(|c| Value::Str(c.to_string())).collect()
        } else {
            text.split(separator)
                .map(|part| Value::Str(part.to_string()))
                .collect()
        };
        Ok(Value::Array(parts))
    });

    registry.register("contains", "1", "substring test", |_, recv, args, _| {
        Ok(Value::Bool(text(recv)?.contains(str_arg(args, 0)?)))
    });

    registry.register("startsWith", "1", "prefix test", |_, recv, args, _| {
        Ok(Value::Bool(text(recv)?.starts_with(str_arg(args, 0)?)))
    });

    registry.register("endsWith", "1", "suffix test", |_, recv, args, _| {
        Ok(Value::Bool(text(recv)?.ends_with(str_arg(args, 0)?)))
    });

    registry.register("replace", "2", "replace every occurrence", |_, recv, args, _| {
        Ok(Value::Str(
            text(recv)?.replace(str_arg(args, 0)?, str_arg(args, 1)?),
        ))
    });

    registry.register("repeat", "1", "repeat the text", |_, recv, args, _| {
        let times = int_arg(args, 0)?;
        if times < 0 {
            return Err(RuntimeError::bad_value("repeat count must not be negative"));
        }
        Ok(Value::Str(text(recv)?.repeat(times as usize)))
    });

    registry.register("reverse", "0", "reversed characters", |_, recv, _, _| {
        Ok(Value::Str(text(recv)?.chars().rev().collect()))
    });

    registry.register("chars", "0", "characters as an array", |_, recv, _, _| {
        Ok(Value::Array(
            text(recv)?
                .chars()
                .map(|c| Value::Str(c.to_string()))
                .collect(),
        ))
    });

    registry.register("indexOf", "1", "character index of a substring, -1 when absent", |_, recv, args, _| {
        let text = text(recv)?;
        let needle = str_arg(args, 0)?;
        let index = text
            .find(needle)
            .map_or(-1, |byte| text[..byte].chars().count() as i64);
        Ok(Value::Int(index))
    });

    registry.register("slice", "1-2", "substring by character bounds", |_, recv, args, _| {
        let chars: Vec<char> = text(recv)?.chars().collect();
        let start = slice_bound(int_arg(args, 0)?, chars.len());
        let end = match args.get(1) {
            Some(_) => slice_bound(int_arg(args, 1)?, chars.len()),
            None => chars.len(),
        };
        let out: String = if start < end {
            chars[start..end].iter().collect()
        } else {
            String::new()
        };
        Ok(Value::Str(out))
    });

    registry.register("toInt", "0", "parse as integer", |_, recv, _, _| {
        let text = text(recv)?;
        text.trim()
            .parse::<i64>()
            .map(Value::Int)
            .map_err(|_| RuntimeError::format(format!("cannot parse {text:?} as an integer")))
    });

    registry.register("toFloat", "0", "parse as float", |_, recv, _, _| {
        let text = text(recv)?;
        text.trim()
            .parse::<f64>()
            .map(Value::Float)
            .map_err(|_| RuntimeError::format(format!("cannot parse {text:?} as a float")))
    });

    registry
}
