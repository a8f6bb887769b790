//! Runtime errors with stable codes.
//!
//! Errors are ordinary values flowing through `Result`; there is no
//! separate exception channel. Every error carries a class, a stable code
//! string (`TYPE-0001`, `VAL-0002`, ...), a message, optional hints and an
//! optional source position. Classes partition into catchable and fatal;
//! `try` intercepts only catchable errors.

use indexmap::IndexMap;
use sorrel_ast::Position;
use thiserror::Error;

/// Error classes, keyed to the stable code prefixes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// `TYPE-xxxx` — type mismatch.
    Type,
    /// `VAL-xxxx` — validation failure.
    Validation,
    /// `INDEX-xxxx` — bounds violation.
    Index,
    /// `REF-xxxx` — undefined binding or relation.
    Reference,
    /// `SYN-xxxx` — malformed query expression.
    QuerySyntax,
    /// `DB-xxxx` — database failure.
    Database,
    /// `LOOP-xxxx` — for-expression misuse.
    Loop,
    /// `IO-xxxx` — filesystem failure.
    Io,
    /// `FMT-xxxx` — parse/format failure.
    Format,
    /// `UNDEF-xxxx` — unknown name or method.
    Undefined,
    /// `SERIALIZE-xxxx` — serialisation failure.
    Serialize,
    /// `DESERIALIZE-xxxx` — deserialisation failure.
    Deserialize,
    /// `INTERNAL-xxxx` — evaluator invariant violation.
    Internal,
}

impl ErrorClass {
    /// Returns whether `try` may intercept errors of this class.
    ///
    /// Serialisation and internal errors are fatal; everything else is
    /// user-recoverable.
    #[must_use]
    pub const fn is_catchable(&self) -> bool {
        !matches!(self, Self::Internal | Self::Serialize | Self::Deserialize)
    }

    /// Returns the stable code prefix for this class.
    #[must_use]
    pub const fn prefix(&self) -> &'static str {
        match self {
            Self::Type => "TYPE",
            Self::Validation => "VAL",
            Self::Index => "INDEX",
            Self::Reference => "REF",
            Self::QuerySyntax => "SYN",
            Self::Database => "DB",
            Self::Loop => "LOOP",
            Self::Io => "IO",
            Self::Format => "FMT",
            Self::Undefined => "UNDEF",
            Self::Serialize => "SERIALIZE",
            Self::Deserialize => "DESERIALIZE",
            Self::Internal => "INTERNAL",
        }
    }
}

/// A runtime error.
#[derive(Debug, Clone, Error)]
#[error("[{code}] {message}")]
pub struct RuntimeError {
    /// Error class.
    pub class: ErrorClass,
    /// Stable code, e.g. `TYPE-0001`.
    pub code: &'static str,
    /// Human-readable message.
    pub message: String,
    /// Optional hints, e.g. a "did you mean" suggestion.
    pub hints: Vec<String>,
    /// Optional structured data, e.g. a per-field validation error map.
    pub data: Option<IndexMap<String, String>>,
    /// Source position, when known.
    pub pos: Option<Position>,
}

impl RuntimeError {
    /// Creates an error with the given class and code.
    #[must_use]
    pub fn new(class: ErrorClass, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            class,
            code,
            message: message.into(),
            hints: Vec::new(),
            data: None,
            pos: None,
        }
    }

    /// Attaches a source position; the first position wins.
    #[must_use]
    pub fn at(mut self, pos: Position) -> Self {
        if self.pos.is_none() && pos.is_known() {
            self.pos = Some(pos);
        }
        self
    }

    /// Appends a hint.
    #[must_use]
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hints.push(hint.into());
        self
    }

    /// Attaches a structured data map.
    #[must_use]
    pub fn with_data(mut self, data: IndexMap<String, String>) -> Self {
        self.data = Some(data);
        self
    }

    /// Returns whether `try` may intercept this error.
    #[must_use]
    pub fn is_catchable(&self) -> bool {
        self.class.is_catchable()
    }

    // Constructors for the codes the evaluator and compiler emit.

    /// `TYPE-0001` — unsupported operand or receiver type.
    #[must_use]
    pub fn type_mismatch(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::Type, "TYPE-0001", message)
    }

    /// `TYPE-0002` — a non-function value was called.
    #[must_use]
    pub fn not_a_function(type_name: &str) -> Self {
        Self::new(
            ErrorClass::Type,
            "TYPE-0002",
            format!("not a function: {type_name}"),
        )
    }

    /// `TYPE-0003` — an argument had the wrong type.
    #[must_use]
    pub fn bad_argument(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::Type, "TYPE-0003", message)
    }

    /// `TYPE-0004` — a method was called with the wrong argument count.
    #[must_use]
    pub fn arity(method: &str, expected: &str, actual: usize) -> Self {
        Self::new(
            ErrorClass::Type,
            "TYPE-0004",
            format!("{method} expects {expected} argument(s), got {actual}"),
        )
    }

    /// `VAL-0001` — schema validation failed.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::Validation, "VAL-0001", message)
    }

    /// `VAL-0002` — an identifier is unsafe to splice into SQL.
    #[must_use]
    pub fn invalid_identifier(name: &str, reason: &str) -> Self {
        Self::new(
            ErrorClass::Validation,
            "VAL-0002",
            format!("invalid identifier {name:?}: {reason}"),
        )
    }

    /// `VAL-0003` — division or modulo by zero.
    #[must_use]
    pub fn division_by_zero() -> Self {
        Self::new(ErrorClass::Validation, "VAL-0003", "division by zero")
    }

    /// `VAL-0004` — an argument value was out of range.
    #[must_use]
    pub fn bad_value(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::Validation, "VAL-0004", message)
    }

    /// `INDEX-0001` — index out of bounds.
    #[must_use]
    pub fn out_of_bounds(index: i64, len: usize) -> Self {
        Self::new(
            ErrorClass::Index,
            "INDEX-0001",
            format!("index {index} out of bounds for length {len}"),
        )
    }

    /// `REF-0001` — undefined identifier.
    #[must_use]
    pub fn undefined_identifier(name: &str) -> Self {
        Self::new(
            ErrorClass::Reference,
            "REF-0001",
            format!("identifier not found: {name}"),
        )
    }

    /// `REF-0002` — unknown relation name.
    #[must_use]
    pub fn unknown_relation(schema: &str, relation: &str) -> Self {
        Self::new(
            ErrorClass::Reference,
            "REF-0002",
            format!("schema {schema} has no relation {relation:?}"),
        )
    }

    /// `SYN-0001` — malformed query expression.
    #[must_use]
    pub fn query_syntax(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::QuerySyntax, "SYN-0001", message)
    }

    /// `DB-0001` — driver-level database failure.
    #[must_use]
    pub fn database(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::Database, "DB-0001", message)
    }

    /// `DB-0002` — transaction state violation.
    #[must_use]
    pub fn transaction(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::Database, "DB-0002", message)
    }

    /// `LOOP-0001` — `for` over a non-iterable value.
    #[must_use]
    pub fn not_iterable(type_name: &str) -> Self {
        Self::new(
            ErrorClass::Loop,
            "LOOP-0001",
            format!("cannot iterate over {type_name}"),
        )
    }

    /// `LOOP-0002` — malformed `for` expression.
    #[must_use]
    pub fn loop_misuse(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::Loop, "LOOP-0002", message)
    }

    /// `IO-0001` — filesystem failure.
    #[must_use]
    pub fn io(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::Io, "IO-0001", message)
    }

    /// `FMT-0001` — parse or format failure.
    #[must_use]
    pub fn format(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::Format, "FMT-0001", message)
    }

    /// `UNDEF-0001` — unknown method for a receiver kind.
    #[must_use]
    pub fn undefined_method(type_name: &str, method: &str) -> Self {
        Self::new(
            ErrorClass::Undefined,
            "UNDEF-0001",
            format!("undefined method {method:?} for {type_name}"),
        )
    }

    /// `SERIALIZE-0001` — serialisation failure (fatal).
    #[must_use]
    pub fn serialize(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::Serialize, "SERIALIZE-0001", message)
    }

    /// `DESERIALIZE-0001` — deserialisation failure (fatal).
    #[must_use]
    pub fn deserialize(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::Deserialize, "DESERIALIZE-0001", message)
    }

    /// `INTERNAL-0001` — evaluator invariant violation (fatal).
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::Internal, "INTERNAL-0001", message)
    }
}

/// Result type alias for runtime operations.
pub type Result<T> = std::result::Result<T, RuntimeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_code() {
        let err = RuntimeError::type_mismatch("cannot add string and integer");
        assert_eq!(err.to_string(), "[TYPE-0001] cannot add string and integer");
    }

    #[test]
    fn test_catchable_partition() {
        assert!(RuntimeError::type_mismatch("x").is_catchable());
        assert!(RuntimeError::validation("x").is_catchable());
        assert!(RuntimeError::database("x").is_catchable());
        assert!(RuntimeError::undefined_method("string", "frob").is_catchable());
        assert!(RuntimeError::not_iterable("integer").is_catchable());
        assert!(!RuntimeError::internal("x").is_catchable());
        assert!(!RuntimeError::serialize("x").is_catchable());
        assert!(!RuntimeError::deserialize("x").is_catchable());
    }

    #[test]
    fn test_at_keeps_first_position() {
        let err = RuntimeError::validation("x")
            .at(Position::new(1, 2))
            .at(Position::new(9, 9));
        assert_eq!(err.pos, Some(Position::new(1, 2)));
    }

    #[test]
    fn test_code_prefix_matches_class() {
        let err = RuntimeError::undefined_identifier("foo");
        assert!(err.code.starts_with(err.class.prefix()));
    }
}
