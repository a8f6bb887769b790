//! Integer, float, boolean and null methods.

use sorrel_runtime::{Result, RuntimeError, Value};

use super::Registry;

fn int(receiver: &Value) -> Result<i64> {
    match receiver {
        Value::Int(n) => Ok(*n),
        _ => Err(RuntimeError::internal("integer registry got a non-integer receiver")),
    }
}

fn float(receiver: &Value) -> Result<f64> {
    match receiver {
        Value::Float(f) => Ok(*f),
        _ => Err(RuntimeError::internal("float registry got a non-float receiver")),
    }
}

pub(super) fn build_integer() -> Registry {
    let mut registry = Registry::new("integer");

    registry.register("abs", "0", "absolute value", |_, recv, _, _| {
        Ok(Value::Int(int(recv)?.abs()))
    });

    registry.register("toFloat", "0", "as a float", |_, recv, _, _| {
        Ok(Value::Float(int(recv)? as f64))
    });

    registry.register("toString", "0", "decimal text", |_, recv, _, _| {
        Ok(Value::Str(int(recv)?.to_string()))
    });

    registry
}

pub(super) fn build_float() -> Registry {
    let mut registry = Registry::new("float");

    registry.register("abs", "0", "absolute value", |_, recv, _, _| {
        Ok(Value::Float(float(recv)?.abs()))
    });

    registry.register("floor", "0", "round toward negative infinity", |_, recv, _, _| {
        Ok(Value::Float(float(recv)?.floor()))
    });

    registry.register("ceil", "0", "round toward positive infinity", |_, recv, _, _| {
        Ok(Value::Float(float(recv)?.ceil()))
    });

    registry.register("round", "0-1", "round, optionally to n digits", |_, recv, args, _| {
        let value = float(recv)?;
        match args.first() {
            None => Ok(Value::Float(value.round())),
            Some(digits) => {
                let digits = digits.as_int().ok_or_else(|| {
                    RuntimeError::bad_argument("digit count must be an integer")
                })?;
                if !(0..=12).contains(&digits) {
                    return Err(RuntimeError::bad_value("digit count must be between 0 and 12"));
                }
                let factor = 10_f64.powi(digits as i32);
                Ok(Value::Float((value * factor).round() / factor))
            }
        }
    });

    registry.register("toInt", "0", "truncate to an integer", |_, recv, _, _| {
        Ok(Value::Int(float(recv)? as i64))
    });

    registry.register("toString", "0", "decimal text", |_, recv, _, _| {
        Ok(Value::Str(float(recv)?.to_string()))
    });

    registry
}

pub(super) fn build_boolean() -> Registry {
    let mut registry = Registry::new("boolean");

    registry.register("toString", "0", "true or false", |_, recv, _, _| match recv {
        Value::Bool(b) => Ok(Value::Str(b.to_string())),
        _ => Err(RuntimeError::internal("boolean registry got a non-boolean receiver")),
    });

    registry
}

pub(super) fn build_null() -> Registry {
    let mut registry = Registry::new("null");

    registry.register("toString", "0", "the text null", |_, _, _, _| {
        Ok(Value::Str("null".to_string()))
    });

    registry
}
