//! The runtime value universe.
//!
//! Every value the evaluator produces is one of the tagged variants below.
//! Datetime, duration and money are proper variants rather than tagged
//! dictionaries; the `__type` dictionary shim survives only as a dispatch
//! registration point for collaborator modules.

use std::fmt;
use std::rc::Rc;

use chrono::{DateTime, SecondsFormat, Utc};
use sorrel_ast::{Block, Position};

use crate::binding::TableBinding;
use crate::dict::Dict;
use crate::env::Env;
use crate::error::{Result, RuntimeError};
use crate::record::Record;
use crate::schema::Schema;
use crate::table::TableValue;

/// A user function: parameter list, body and the captured environment.
///
/// The environment is captured by reference; mutation in the enclosing
/// frame is observable inside the function.
#[derive(Debug, Clone)]
pub struct FunctionValue {
    /// Parameter names.
    pub params: Vec<String>,
    /// Function body.
    pub body: Block,
    /// Captured environment.
    pub env: Env,
    /// Definition site.
    pub pos: Position,
}

/// An amount of money: integer minor units, currency code and the
/// power-of-ten scale placing the implicit decimal point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Money {
    /// Amount in minor units.
    pub amount: i64,
    /// ISO currency code.
    pub currency: String,
    /// Power-of-ten scale; `1234` at scale 2 is `12.34`.
    pub scale: u32,
}

impl Money {
    /// Creates a money value.
    #[must_use]
    pub fn new(amount: i64, currency: impl Into<String>, scale: u32) -> Self {
        Self {
            amount,
            currency: currency.into(),
            scale,
        }
    }

    /// Amount as minor units scaled to the given scale, widened to avoid
    /// overflow during cross-scale comparison.
    #[must_use]
    fn scaled_to(&self, scale: u32) -> i128 {
        let diff = scale.saturating_sub(self.scale);
        i128::from(self.amount) * 10_i128.pow(diff)
    }

    /// Compares two amounts of the same currency across scales.
    #[must_use]
    pub fn cmp_amount(&self, other: &Self) -> std::cmp::Ordering {
        let scale = self.scale.max(other.scale);
        self.scaled_to(scale).cmp(&other.scaled_to(scale))
    }

    /// Adds two money values; the currencies must match.
    pub fn checked_add(&self, other: &Self) -> Result<Self> {
        self.combine(other, |a, b| a + b)
    }

    /// Subtracts two money values; the currencies must match.
    pub fn checked_sub(&self, other: &Self) -> Result<Self> {
        self.combine(other, |a, b| a - b)
    }

    fn combine(&self, other: &Self, op: impl Fn(i128, i128) -> i128) -> Result<Self> {
        if self.currency != other.currency {
            return Err(RuntimeError::type_mismatch(format!(
                "cannot combine {} and {}",
                self.currency, other.currency
            )));
        }
        let scale = self.scale.max(other.scale);
        let amount = op(self.scaled_to(scale), other.scaled_to(scale));
        let amount = i64::try_from(amount)
            .map_err(|_| RuntimeError::bad_value("money amount out of range"))?;
        Ok(Self::new(amount, self.currency.clone(), scale))
    }

    /// Renders the amount as a decimal string without the currency code.
    #[must_use]
    pub fn decimal_string(&self) -> String {
        if self.scale == 0 {
            return self.amount.to_string();
        }
        let divisor = 10_i64.pow(self.scale);
        let sign = if self.amount < 0 { "-" } else { "" };
        let abs = self.amount.unsigned_abs();
        let whole = abs / divisor.unsigned_abs();
        let frac = abs % divisor.unsigned_abs();
        format!(
            "{sign}{whole}.{frac:0width$}",
            width = self.scale as usize
        )
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.decimal_string(), self.currency)
    }
}

/// A duration, stored as whole seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Duration {
    /// Length in seconds; may be negative.
    pub secs: i64,
}

impl Duration {
    /// Creates a duration from seconds.
    #[must_use]
    pub const fn from_secs(secs: i64) -> Self {
        Self { secs }
    }

    /// Creates a duration from minutes.
    #[must_use]
    pub const fn from_minutes(minutes: i64) -> Self {
        Self { secs: minutes * 60 }
    }

    /// Creates a duration from hours.
    #[must_use]
    pub const fn from_hours(hours: i64) -> Self {
        Self { secs: hours * 3600 }
    }
}

impl fmt::Display for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}s", self.secs)
    }
}

/// A runtime value.
#[derive(Debug, Clone)]
pub enum Value {
    /// The null sentinel.
    Null,
    /// 64-bit signed integer.
    Int(i64),
    /// 64-bit IEEE float.
    Float(f64),
    /// Boolean.
    Bool(bool),
    /// UTF-8 text; `length` is the character count.
    Str(String),
    /// Ordered sequence.
    Array(Vec<Value>),
    /// Insertion-ordered dictionary.
    Dict(Dict),
    /// User function with captured environment.
    Function(Rc<FunctionValue>),
    /// Money amount.
    Money(Money),
    /// Point in time.
    Datetime(DateTime<Utc>),
    /// Length of time.
    Duration(Duration),
    /// A DSL schema object.
    Schema(Rc<Schema>),
    /// A dictionary paired with a schema.
    Record(Box<Record>),
    /// A batch of rows with an optional schema.
    Table(Box<TableValue>),
    /// A schema-bound facade over a database table.
    Binding(TableBinding),
}

impl Value {
    /// Returns the kind name reported by `type()`.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Int(_) => "integer",
            Self::Float(_) => "float",
            Self::Bool(_) => "boolean",
            Self::Str(_) => "string",
            Self::Array(_) => "array",
            Self::Dict(_) => "dictionary",
            Self::Function(_) => "function",
            Self::Money(_) => "money",
            Self::Datetime(_) => "datetime",
            Self::Duration(_) => "duration",
            Self::Schema(_) => "schema",
            Self::Record(_) => "record",
            Self::Table(_) => "table",
            Self::Binding(_) => "binding",
        }
    }

    /// Null and `false` are falsy; everything else is truthy.
    #[must_use]
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Self::Null | Self::Bool(false))
    }

    /// Returns whether the value is the null sentinel.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Numeric view of integers and floats.
    #[must_use]
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Int(n) => Some(*n as f64),
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Integer view; floats with a fractional part are rejected.
    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(*n),
            Self::Float(f) if f.fract() == 0.0 => Some(*f as i64),
            _ => None,
        }
    }

    /// String view of string values.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Converts the value to JSON. Internal `__` dictionary keys are
    /// filtered; functions and bindings render as null.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Null | Self::Function(_) | Self::Binding(_) => serde_json::Value::Null,
            Self::Int(n) => serde_json::Value::from(*n),
            Self::Float(f) => serde_json::Number::from_f64(*f)
                .map_or(serde_json::Value::Null, serde_json::Value::Number),
            Self::Bool(b) => serde_json::Value::from(*b),
            Self::Str(s) => serde_json::Value::from(s.clone()),
            Self::Array(items) => {
                serde_json::Value::Array(items.iter().map(Value::to_json).collect())
            }
            Self::Dict(d) => serde_json::Value::Object(
                d.visible()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
            Self::Money(m) => serde_json::json!({
                "amount": m.amount,
                "currency": m.currency,
                "scale": m.scale,
            }),
            Self::Datetime(dt) => {
                serde_json::Value::from(dt.to_rfc3339_opts(SecondsFormat::Secs, true))
            }
            Self::Duration(d) => serde_json::json!({ "seconds": d.secs }),
            Self::Schema(s) => serde_json::Value::from(s.name.clone()),
            Self::Record(r) => Self::Dict(r.data.clone()).to_json(),
            Self::Table(t) => serde_json::Value::Array(
                t.rows
                    .iter()
                    .map(|row| Self::Dict(row.clone()).to_json())
                    .collect(),
            ),
        }
    }

    /// Builds a value from JSON. Whole numbers become integers.
    #[must_use]
    pub fn from_json(json: &serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(*b),
            serde_json::Value::Number(n) => n
                .as_i64()
                .map_or_else(|| Self::Float(n.as_f64().unwrap_or(0.0)), Self::Int),
            serde_json::Value::String(s) => Self::Str(s.clone()),
            serde_json::Value::Array(items) => {
                Self::Array(items.iter().map(Self::from_json).collect())
            }
            serde_json::Value::Object(map) => Self::Dict(Dict::from_pairs(
                map.iter().map(|(k, v)| (k.clone(), Self::from_json(v))),
            )),
        }
    }
}

impl fmt::Display for Value {
    /// The canonical text representation: used by string conversion and as
    /// the deduplication key of array set operations.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Int(n) => write!(f, "{n}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Str(s) => f.write_str(s),
            Self::Array(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Self::Dict(d) => {
                f.write_str("{")?;
                for (i, (k, v)) in d.visible().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{k}: {v}")?;
                }
                f.write_str("}")
            }
            Self::Function(func) => write!(f, "fn({})", func.params.join(", ")),
            Self::Money(m) => write!(f, "{m}"),
            Self::Datetime(dt) => f.write_str(&dt.to_rfc3339_opts(SecondsFormat::Secs, true)),
            Self::Duration(d) => write!(f, "{d}"),
            Self::Schema(s) => write!(f, "schema({})", s.name),
            Self::Record(r) => write!(f, "{}", Self::Dict(r.data.clone())),
            Self::Table(t) => write!(f, "table({}, {} rows)", t.name(), t.rows.len()),
            Self::Binding(b) => write!(f, "binding({})", b.table),
        }
    }
}

impl PartialEq for Value {
    /// Equality across numeric kinds is by mathematical value; money
    /// equality requires matching currency; functions compare by identity.
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a == b,
            (Self::Int(a), Self::Float(b)) | (Self::Float(b), Self::Int(a)) => *a as f64 == *b,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Str(a), Self::Str(b)) => a == b,
            (Self::Array(a), Self::Array(b)) => a == b,
            (Self::Dict(a), Self::Dict(b)) => a == b,
            (Self::Function(a), Self::Function(b)) => Rc::ptr_eq(a, b),
            (Self::Money(a), Self::Money(b)) => {
                a.currency == b.currency && a.cmp_amount(b).is_eq()
            }
            (Self::Datetime(a), Self::Datetime(b)) => a == b,
            (Self::Duration(a), Self::Duration(b)) => a == b,
            (Self::Schema(a), Self::Schema(b)) => a.name == b.name,
            (Self::Record(a), Self::Record(b)) => {
                a.schema.name == b.schema.name && a.data == b.data
            }
            (Self::Table(a), Self::Table(b)) => a.rows == b.rows && a.columns == b.columns,
            (Self::Binding(a), Self::Binding(b)) => {
                a.table == b.table && a.soft_delete == b.soft_delete
            }
            _ => false,
        }
    }
}
