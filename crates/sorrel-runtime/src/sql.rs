//! SQL parameter values.
//!
//! Everything user-supplied flows into SQL through positional parameters
//! carrying one of these variants; no runtime value is ever spliced into
//! SQL text. Conversion from the value universe is lossy only for kinds
//! that have no sensible column representation, which are rejected.

use std::fmt;

use chrono::SecondsFormat;

use crate::error::{Result, RuntimeError};
use crate::value::Value;

/// A value bound to a positional SQL parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    /// NULL.
    Null,
    /// Boolean.
    Bool(bool),
    /// Integer.
    Int(i64),
    /// Float.
    Float(f64),
    /// Text.
    Text(String),
}

impl SqlValue {
    /// Converts a runtime value to a parameter value.
    ///
    /// Datetimes bind as RFC 3339 text, durations as whole seconds, money
    /// as its canonical text, arrays and dictionaries as JSON text.
    /// Functions, schemas, tables and bindings have no column
    /// representation and are rejected.
    pub fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Null => Ok(Self::Null),
            Value::Bool(b) => Ok(Self::Bool(*b)),
            Value::Int(n) => Ok(Self::Int(*n)),
            Value::Float(f) => Ok(Self::Float(*f)),
            Value::Str(s) => Ok(Self::Text(s.clone())),
            Value::Datetime(dt) => Ok(Self::Text(dt.to_rfc3339_opts(SecondsFormat::Secs, true))),
            Value::Duration(d) => Ok(Self::Int(d.secs)),
            Value::Money(m) => Ok(Self::Text(m.to_string())),
            Value::Array(_) | Value::Dict(_) => Ok(Self::Text(value.to_json().to_string())),
            Value::Record(r) => Ok(Self::Text(
                Value::Dict(r.data.clone()).to_json().to_string(),
            )),
            Value::Function(_) | Value::Schema(_) | Value::Table(_) | Value::Binding(_) => {
                Err(RuntimeError::bad_argument(format!(
                    "cannot bind a {} as a query parameter",
                    value.type_name()
                )))
            }
        }
    }

    /// Converts a column value back to a runtime value.
    #[must_use]
    pub fn into_value(self) -> Value {
        match self {
            Self::Null => Value::Null,
            Self::Bool(b) => Value::Bool(b),
            Self::Int(n) => Value::Int(n),
            Self::Float(f) => Value::Float(f),
            Self::Text(s) => Value::Str(s),
        }
    }
}

impl fmt::Display for SqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("NULL"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(n) => write!(f, "{n}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Text(s) => write!(f, "{s:?}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dict::Dict;
    use crate::value::Money;

    #[test]
    fn test_scalar_conversions() {
        assert_eq!(SqlValue::from_value(&Value::Int(3)).unwrap(), SqlValue::Int(3));
        assert_eq!(SqlValue::from_value(&Value::Null).unwrap(), SqlValue::Null);
        assert_eq!(
            SqlValue::from_value(&Value::Str("hi".to_string())).unwrap(),
            SqlValue::Text("hi".to_string())
        );
    }

    #[test]
    fn test_money_binds_as_canonical_text() {
        let v = Value::Money(Money::new(1234, "USD", 2));
        assert_eq!(
            SqlValue::from_value(&v).unwrap(),
            SqlValue::Text("12.34 USD".to_string())
        );
    }

    #[test]
    fn test_collections_bind_as_json() {
        let v = Value::Array(vec![Value::Int(1), Value::Int(2)]);
        assert_eq!(
            SqlValue::from_value(&v).unwrap(),
            SqlValue::Text("[1,2]".to_string())
        );

        let d = Value::Dict(Dict::from_pairs([("a".to_string(), Value::Int(1))]));
        assert_eq!(
            SqlValue::from_value(&d).unwrap(),
            SqlValue::Text("{\"a\":1}".to_string())
        );
    }

    #[test]
    fn test_unbindable_kinds_rejected() {
        let schema = Value::Schema(std::rc::Rc::new(crate::schema::Schema::new("S", "s")));
        assert!(SqlValue::from_value(&schema).is_err());
    }
}
