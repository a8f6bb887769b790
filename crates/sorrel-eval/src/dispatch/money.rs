//! Money methods.

use sorrel_runtime::{Money, Result, RuntimeError, Value};

use super::Registry;

fn money(receiver: &Value) -> Result<&Money> {
    match receiver {
        Value::Money(money) => Ok(money),
        _ => Err(RuntimeError::internal("money registry got a non-money receiver")),
    }
}

pub(super) fn build() -> Registry {
    let mut registry = Registry::new("money");

    registry.register("amount", "0", "amount in minor units", |_, recv, _, _| {
        Ok(Value::Int(money(recv)?.amount))
    });

    registry.register("currency", "0", "currency code", |_, recv, _, _| {
        Ok(Value::Str(money(recv)?.currency.clone()))
    });

    registry.register("scale", "0", "decimal scale", |_, recv, _, _| {
        Ok(Value::Int(i64::from(money(recv)?.scale)))
    });

    registry.register("decimal", "0", "amount as a float", |_, recv, _, _| {
        let money = money(recv)?;
        Ok(Value::Float(
            money.amount as f64 / 10_f64.powi(money.scale as i32),
        ))
    });

    registry.register("format", "0", "canonical text", |_, recv, _, _| {
        Ok(Value::Str(money(recv)?.to_string()))
    });

    registry
}
