//! Query option parsing for binding reads.
//!
//! Every binding read accepts an options dictionary of the shape
//! `{orderBy, select, limit, offset}`. All identifier handling funnels
//! through here so no unvalidated name reaches SQL text.

use sorrel_ast::OrderField;
use sorrel_runtime::{Result, RuntimeError, Value};

use crate::ident::check_column_ref;

const KNOWN_KEYS: &[&str] = &["orderBy", "select", "limit", "offset"];

/// Parsed, identifier-gated read options.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryOptions {
    /// Ordering; a `-` prefix in the source spec means descending.
    pub order_by: Vec<OrderField>,
    /// Projected columns; `None` means `*`.
    pub select: Option<Vec<String>>,
    /// Row limit.
    pub limit: Option<i64>,
    /// Row offset.
    pub offset: Option<i64>,
}

impl QueryOptions {
    /// Returns the projection as SQL text.
    #[must_use]
    pub fn projection(&self) -> String {
        self.select
            .as_ref()
            .map_or_else(|| "*".to_string(), |columns| columns.join(", "))
    }
}

/// Parses an order spec: `"name"` ascending, `"-name"` descending.
fn parse_order_field(spec: &str) -> Result<OrderField> {
    let field = spec
        .strip_prefix('-')
        .map_or_else(|| OrderField::asc(spec), OrderField::desc);
    check_column_ref(&field.column)?;
    Ok(field)
}

/// Parses the options value of a binding read. `None` and null mean no
/// options; anything but a dictionary is rejected, as is an unknown key.
pub fn parse_query_options(options: Option<&Value>) -> Result<QueryOptions> {
    let dict = match options {
        None | Some(Value::Null) => return Ok(QueryOptions::default()),
        Some(Value::Dict(dict)) => dict,
        Some(other) => {
            return Err(RuntimeError::bad_argument(format!(
                "query options must be a dictionary, got {}",
                other.type_name()
            )))
        }
    };

    let mut parsed = QueryOptions::default();
    for (key, value) in dict.visible() {
        match key.as_str() {
            "orderBy" => {
                parsed.order_by = match value {
                    Value::Str(spec) => vec![parse_order_field(spec)?],
                    Value::Array(items) => {
                        let mut fields = Vec::with_capacity(items.len());
                        for item in items {
                            let spec = item.as_str().ok_or_else(|| {
                                RuntimeError::bad_argument("orderBy entries must be strings")
                            })?;
                            fields.push(parse_order_field(spec)?);
                        }
                        fields
                    }
                    other => {
                        return Err(RuntimeError::bad_argument(format!(
                            "orderBy must be a string or array, got {}",
                            other.type_name()
                        )))
                    }
                };
            }
            "select" => {
                let columns = match value {
                    Value::Str(column) => vec![column.clone()],
                    Value::Array(items) => {
                        let mut columns = Vec::with_capacity(items.len());
                        for item in items {
                            let column = item.as_str().ok_or_else(|| {
                                RuntimeError::bad_argument("select entries must be strings")
                            })?;
                            columns.push(column.to_string());
                        }
                        columns
                    }
                    other => {
                        return Err(RuntimeError::bad_argument(format!(
                            "select must be a string or array, got {}",
                            other.type_name()
                        )))
                    }
                };
                for column in &columns {
                    check_column_ref(column)?;
                }
                parsed.select = Some(columns);
            }
            "limit" => parsed.limit = Some(non_negative_int(value, "limit")?),
            "offset" => parsed.offset = Some(non_negative_int(value, "offset")?),
            other => {
                return Err(RuntimeError::bad_value(format!("unknown query option {other:?}"))
                    .with_hint(format!("valid options: {}", KNOWN_KEYS.join(", "))));
            }
        }
    }
    Ok(parsed)
}

fn non_negative_int(value: &Value, what: &str) -> Result<i64> {
    match value.as_int() {
        Some(n) if n >= 0 => Ok(n),
        _ => Err(RuntimeError::bad_value(format!(
            "{what} must be a non-negative integer"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sorrel_ast::OrderDirection;
    use sorrel_runtime::Dict;

    fn options(pairs: &[(&str, Value)]) -> Value {
        Value::Dict(Dict::from_pairs(
            pairs.iter().map(|(k, v)| ((*k).to_string(), v.clone())),
        ))
    }

    #[test]
    fn test_empty_options() {
        assert_eq!(parse_query_options(None).unwrap(), QueryOptions::default());
        assert_eq!(
            parse_query_options(Some(&Value::Null)).unwrap(),
            QueryOptions::default()
        );
    }

    #[test]
    fn test_order_by_prefix() {
        let opts = parse_query_options(Some(&options(&[(
            "orderBy",
            Value::Str("-created_at".to_string()),
        )])))
        .unwrap();
        assert_eq!(opts.order_by.len(), 1);
        assert_eq!(opts.order_by[0].column, "created_at");
        assert_eq!(opts.order_by[0].direction, OrderDirection::Desc);
    }

    #[test]
    fn test_select_and_bounds() {
        let opts = parse_query_options(Some(&options(&[
            (
                "select",
                Value::Array(vec![
                    Value::Str("id".to_string()),
                    Value::Str("name".to_string()),
                ]),
            ),
            ("limit", Value::Int(10)),
            ("offset", Value::Int(20)),
        ])))
        .unwrap();
        assert_eq!(opts.projection(), "id, name");
        assert_eq!(opts.limit, Some(10));
        assert_eq!(opts.offset, Some(20));
    }

    #[test]
    fn test_unknown_key_rejected() {
        let err = parse_query_options(Some(&options(&[("sort", Value::Str("x".to_string()))])))
            .unwrap_err();
        assert_eq!(err.code, "VAL-0004");
        assert!(err.hints[0].contains("orderBy"));
    }

    #[test]
    fn test_unsafe_identifier_rejected() {
        let err = parse_query_options(Some(&options(&[(
            "orderBy",
            Value::Str("name; DROP TABLE x".to_string()),
        )])))
        .unwrap_err();
        assert_eq!(err.code, "VAL-0002");
    }

    #[test]
    fn test_negative_limit_rejected() {
        let err =
            parse_query_options(Some(&options(&[("limit", Value::Int(-1))]))).unwrap_err();
        assert_eq!(err.code, "VAL-0004");
    }
}
