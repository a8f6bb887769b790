//! Array methods, including the function-taking combinators.

use std::rc::Rc;

use sorrel_runtime::{collections, ordering::compare, FunctionValue, Result, RuntimeError, Value};

use super::Registry;
use crate::evaluator::Evaluator;

fn items(receiver: &Value) -> Result<&Vec<Value>> {
    match receiver {
        Value::Array(items) => Ok(items),
        _ => Err(RuntimeError::internal("array registry got a non-array receiver")),
    }
}

fn func_arg(args: &[Value], index: usize) -> Result<Rc<FunctionValue>> {
    match &args[index] {
        Value::Function(func) => Ok(func.clone()),
        other => Err(RuntimeError::bad_argument(format!(
            "argument {} must be a function, got {}",
            index + 1,
            other.type_name()
        ))),
    }
}

fn array_arg<'a>(args: &'a [Value], index: usize) -> Result<&'a Vec<Value>> {
    match &args[index] {
        Value::Array(items) => Ok(items),
        other => Err(RuntimeError::bad_argument(format!(
            "argument {} must be an array, got {}",
            index + 1,
            other.type_name()
        ))),
    }
}

fn int_arg(args: &[Value], index: usize) -> Result<i64> {
    args[index].as_int().ok_or_else(|| {
        RuntimeError::bad_argument(format!("argument {} must be an integer", index + 1))
    })
}

/// Applies an element callback with one or two parameters (element, or
/// element and index).
fn apply_element(
    ev: &mut Evaluator,
    func: &Rc<FunctionValue>,
    element: &Value,
    index: usize,
) -> Result<Value> {
    let args = match func.params.len() {
        1 => vec![element.clone()],
        2 => vec![element.clone(), Value::Int(index as i64)],
        n => {
            return Err(RuntimeError::bad_argument(format!(
                "element callback takes one or two parameters, has {n}"
            )))
        }
    };
    ev.apply_function(func, args, None)
}

fn slice_bound(bound: i64, len: usize) -> usize {
    let len = len as i64;
    let idx = if bound < 0 { len + bound } else { bound };
    idx.clamp(0, len) as usize
}

pub(super) fn build() -> Registry {
    let mut registry = Registry::new("array");

    registry.register("length", "0", "element count", |_, recv, _, _| {
        Ok(Value::Int(items(recv)?.len() as i64))
    });

    registry.register("first", "0", "first element or null", |_, recv, _, _| {
        Ok(items(recv)?.first().cloned().unwrap_or(Value::Null))
    });

    registry.register("last", "0", "last element or null", |_, recv, _, _| {
        Ok(items(recv)?.last().cloned().unwrap_or(Value::Null))
    });

    registry.register("push", "1", "copy with an element appended", |_, recv, args, _| {
        let mut out = items(recv)?.clone();
        out.push(args[0].clone());
        Ok(Value::Array(out))
    });

    registry.register("concat", "1", "copy with another array appended", |_, recv, args, _| {
        let mut out = items(recv)?.clone();
        out.extend(array_arg(args, 0)?.iter().cloned());
        Ok(Value::Array(out))
    });

    registry.register("map", "1", "transform each element", |ev, recv, args, _| {
        let func = func_arg(args, 0)?;
        let mut out = Vec::with_capacity(items(recv)?.len());
        for (index, element) in items(recv)?.iter().enumerate() {
            out.push(apply_element(ev, &func, element, index)?);
        }
        Ok(Value::Array(out))
    });

    registry.register("filter", "1", "keep elements passing a test", |ev, recv, args, _| {
        let func = func_arg(args, 0)?;
        let mut out = Vec::new();
        for (index, element) in items(recv)?.iter().enumerate() {
            if apply_element(ev, &func, element, index)?.is_truthy() {
                out.push(element.clone());
            }
        }
        Ok(Value::Array(out))
    });

    registry.register("reduce", "2", "fold with an accumulator", |ev, recv, args, _| {
        let func = func_arg(args, 0)?;
        let mut acc = args[1].clone();
        for element in items(recv)? {
            acc = ev.apply_function(&func, vec![acc, element.clone()], None)?;
        }
        Ok(acc)
    });

    registry.register("sort", "0", "stable sort under the value order", |_, recv, _, _| {
        let mut out = items(recv)?.clone();
        collections::sort_values(&mut out);
        Ok(Value::Array(out))
    });

    registry.register("sortBy", "1", "stable sort by a key function", |ev, recv, args, _| {
        let func = func_arg(args, 0)?;
        let elements = items(recv)?.clone();
        let mut keys = Vec::with_capacity(elements.len());
        for (index, element) in elements.iter().enumerate() {
            keys.push(apply_element(ev, &func, element, index)?);
        }
        Ok(Value::Array(collections::sort_by_keys(elements, keys)))
    });

    registry.register("reverse", "0", "reversed copy", |_, recv, _, _| {
        let mut out = items(recv)?.clone();
        out.reverse();
        Ok(Value::Array(out))
    });

    registry.register("contains", "1", "membership test", |_, recv, args, _| {
        Ok(Value::Bool(items(recv)?.contains(&args[0])))
    });

    registry.register("indexOf", "1", "index of an element, -1 when absent", |_, recv, args, _| {
        let index = items(recv)?
            .iter()
            .position(|item| item == &args[0])
            .map_or(-1, |i| i as i64);
        Ok(Value::Int(index))
    });

    registry.register("join", "0-1", "concatenate canonical texts", |_, recv, args, _| {
        let separator = match args.first() {
            Some(Value::Str(s)) => s.clone(),
            Some(other) => {
                return Err(RuntimeError::bad_argument(format!(
                    "separator must be a string, got {}",
                    other.type_name()
                )))
            }
            None => String::new(),
        };
        let parts: Vec<String> = items(recv)?.iter().map(Value::to_string).collect();
        Ok(Value::Str(parts.join(&separator)))
    });

    registry.register("unique", "0", "deduplicated copy, order preserved", |_, recv, _, _| {
        Ok(Value::Array(collections::union(items(recv)?, &[])))
    });

    registry.register("union", "1", "set union", |_, recv, args, _| {
        Ok(Value::Array(collections::union(items(recv)?, array_arg(args, 0)?)))
    });

    registry.register("intersect", "1", "set intersection", |_, recv, args, _| {
        Ok(Value::Array(collections::intersect(
            items(recv)?,
            array_arg(args, 0)?,
        )))
    });

    registry.register("subtract", "1", "set subtraction", |_, recv, args, _| {
        Ok(Value::Array(collections::subtract(
            items(recv)?,
            array_arg(args, 0)?,
        )))
    });

    registry.register("chunk", "1", "split into chunks of at most n", |_, recv, args, _| {
        Ok(Value::Array(collections::chunk(items(recv)?, int_arg(args, 0)?)?))
    });

    registry.register("repeat", "1", "contents repeated n times", |_, recv, args, _| {
        Ok(Value::Array(collections::repeat(items(recv)?, int_arg(args, 0)?)))
    });

    registry.register("slice", "1-2", "sub-array by bounds", |_, recv, args, _| {
        let elements = items(recv)?;
        let start = slice_bound(int_arg(args, 0)?, elements.len());
        let end = match args.get(1) {
            Some(_) => slice_bound(int_arg(args, 1)?, elements.len()),
            None => elements.len(),
        };
        let out = if start < end {
            elements[start..end].to_vec()
        } else {
            Vec::new()
        };
        Ok(Value::Array(out))
    });

    registry.register("sum", "0", "numeric sum", |_, recv, _, _| {
        let elements = items(recv)?;
        let mut int_sum: i64 = 0;
        let mut float_sum = 0.0;
        let mut saw_float = false;
        for element in elements {
            match element {
                Value::Int(n) => int_sum += n,
                Value::Float(f) => {
                    saw_float = true;
                    float_sum += f;
                }
                other => {
                    return Err(RuntimeError::type_mismatch(format!(
                        "cannot sum {}",
                        other.type_name()
                    )))
                }
            }
        }
        if saw_float {
            Ok(Value::Float(float_sum + int_sum as f64))
        } else {
            Ok(Value::Int(int_sum))
        }
    });

    registry.register("min", "0", "smallest element or null", |_, recv, _, _| {
        Ok(items(recv)?
            .iter()
            .min_by(|a, b| compare(a, b))
            .cloned()
            .unwrap_or(Value::Null))
    });

    registry.register("max", "0", "largest element or null", |_, recv, _, _| {
        Ok(items(recv)?
            .iter()
            .max_by(|a, b| compare(a, b))
            .cloned()
            .unwrap_or(Value::Null))
    });

    registry.register("flatten", "0", "one level of nesting removed", |_, recv, _, _| {
        let mut out = Vec::new();
        for element in items(recv)? {
            match element {
                Value::Array(inner) => out.extend(inner.iter().cloned()),
                other => out.push(other.clone()),
            }
        }
        Ok(Value::Array(out))
    });

    registry
}
