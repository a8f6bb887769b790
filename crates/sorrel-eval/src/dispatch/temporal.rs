//! Datetime and duration methods.

use chrono::{DateTime, Datelike, SecondsFormat, Timelike, Utc};
use sorrel_runtime::{Duration, Result, RuntimeError, Value};

use super::Registry;

fn datetime(receiver: &Value) -> Result<DateTime<Utc>> {
    match receiver {
        Value::Datetime(dt) => Ok(*dt),
        _ => Err(RuntimeError::internal("datetime registry got a non-datetime receiver")),
    }
}

fn duration(receiver: &Value) -> Result<Duration> {
    match receiver {
        Value::Duration(d) => Ok(*d),
        _ => Err(RuntimeError::internal("duration registry got a non-duration receiver")),
    }
}

pub(super) fn build_datetime() -> Registry {
    let mut registry = Registry::new("datetime");

    registry.register("year", "0", "calendar year", |_, recv, _, _| {
        Ok(Value::Int(i64::from(datetime(recv)?.year())))
    });

    registry.register("month", "0", "calendar month (1-12)", |_, recv, _, _| {
        Ok(Value::Int(i64::from(datetime(recv)?.month())))
    });

    registry.register("day", "0", "day of month", |_, recv, _, _| {
        Ok(Value::Int(i64::from(datetime(recv)?.day())))
    });

    registry.register("hour", "0", "hour of day", |_, recv, _, _| {
        Ok(Value::Int(i64::from(datetime(recv)?.hour())))
    });

    registry.register("minute", "0", "minute of hour", |_, recv, _, _| {
        Ok(Value::Int(i64::from(datetime(recv)?.minute())))
    });

    registry.register("second", "0", "second of minute", |_, recv, _, _| {
        Ok(Value::Int(i64::from(datetime(recv)?.second())))
    });

    registry.register("timestamp", "0", "seconds since the epoch", |_, recv, _, _| {
        Ok(Value::Int(datetime(recv)?.timestamp()))
    });

    registry.register("iso", "0", "RFC 3339 text", |_, recv, _, _| {
        Ok(Value::Str(
            datetime(recv)?.to_rfc3339_opts(SecondsFormat::Secs, true),
        ))
    });

    registry.register("format", "1", "strftime-style formatting", |_, recv, args, _| {
        let pattern = args[0]
            .as_str()
            .ok_or_else(|| RuntimeError::bad_argument("format pattern must be a string"))?;
        Ok(Value::Str(datetime(recv)?.format(pattern).to_string()))
    });

    registry
}

pub(super) fn build_duration() -> Registry {
    let mut registry = Registry::new("duration");

    registry.register("seconds", "0", "total seconds", |_, recv, _, _| {
        Ok(Value::Int(duration(recv)?.secs))
    });

    registry.register("minutes", "0", "total whole minutes", |_, recv, _, _| {
        Ok(Value::Int(duration(recv)?.secs / 60))
    });

    registry.register("hours", "0", "total whole hours", |_, recv, _, _| {
        Ok(Value::Int(duration(recv)?.secs / 3600))
    });

    registry
}
