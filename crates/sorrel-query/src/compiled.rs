//! Compiled SQL with its positional parameters.

use sorrel_runtime::{Dict, SqlValue, Value};

/// Parameter accumulator producing `$1..$n` placeholders in push order.
#[derive(Debug, Default)]
pub struct Params {
    values: Vec<SqlValue>,
}

impl Params {
    /// Creates an empty accumulator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds a value, returning its placeholder.
    pub fn push(&mut self, value: SqlValue) -> String {
        self.values.push(value);
        format!("${}", self.values.len())
    }

    /// Number of bound parameters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns whether no parameters are bound.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Finishes accumulation.
    #[must_use]
    pub fn into_values(self) -> Vec<SqlValue> {
        self.values
    }
}

/// A compiled statement: SQL text plus the parameters it binds.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledQuery {
    /// SQL text with `$1..$n` placeholders.
    pub sql: String,
    /// Bound parameters, positionally.
    pub params: Vec<SqlValue>,
}

impl CompiledQuery {
    /// Creates a compiled statement.
    #[must_use]
    pub fn new(sql: String, params: Vec<SqlValue>) -> Self {
        Self { sql, params }
    }

    /// Renders the `{sql, params}` dictionary returned by `toSQL`.
    #[must_use]
    pub fn to_dict(&self) -> Dict {
        Dict::from_pairs([
            ("sql".to_string(), Value::Str(self.sql.clone())),
            (
                "params".to_string(),
                Value::Array(
                    self.params
                        .iter()
                        .map(|p| p.clone().into_value())
                        .collect(),
                ),
            ),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholders_are_positional() {
        let mut params = Params::new();
        assert_eq!(params.push(SqlValue::Int(1)), "$1");
        assert_eq!(params.push(SqlValue::Text("x".to_string())), "$2");
        assert_eq!(params.into_values().len(), 2);
    }

    #[test]
    fn test_to_dict_shape() {
        let compiled = CompiledQuery::new(
            "SELECT * FROM t WHERE a = $1".to_string(),
            vec![SqlValue::Int(7)],
        );
        let dict = compiled.to_dict();
        assert_eq!(
            dict.get("sql"),
            Some(&Value::Str("SELECT * FROM t WHERE a = $1".to_string()))
        );
        assert_eq!(dict.get("params"), Some(&Value::Array(vec![Value::Int(7)])));
    }
}
