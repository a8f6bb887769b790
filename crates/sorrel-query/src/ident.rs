//! Identifier safety for SQL fragments.
//!
//! Any user-controllable name spliced into SQL as text (table names,
//! column names, ORDER BY / GROUP BY columns, upsert keys, join aliases,
//! soft-delete columns) passes through this gate at compile time. Values
//! never take this path; they flow through positional parameters.

use once_cell::sync::Lazy;
use regex::Regex;
use sorrel_runtime::{Result, RuntimeError};

static IDENT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]{0,63}$").unwrap());

// SQL reserved words rejected as identifiers even when they match the
// shape regex. Matching is case-insensitive.
const RESERVED: &[&str] = &[
    "ADD", "ALL", "ALTER", "AND", "AS", "ASC", "BEGIN", "BETWEEN", "BY", "CASE", "CAST", "CHECK",
    "COLLATE", "COLUMN", "COMMIT", "CONSTRAINT", "CREATE", "CROSS", "CURRENT", "DEFAULT",
    "DELETE", "DESC", "DISTINCT", "DROP", "ELSE", "END", "ESCAPE", "EXCEPT", "EXISTS", "FOREIGN",
    "FROM", "FULL", "GROUP", "HAVING", "IN", "INDEX", "INNER", "INSERT", "INTERSECT", "INTO",
    "IS", "JOIN", "KEY", "LEFT", "LIKE", "LIMIT", "NATURAL", "NOT", "NULL", "OFFSET", "ON", "OR",
    "ORDER", "OUTER", "PRIMARY", "REFERENCES", "RETURNING", "RIGHT", "ROLLBACK", "SELECT", "SET",
    "TABLE", "THEN", "TO", "TRANSACTION", "UNION", "UNIQUE", "UPDATE", "USING", "VALUES", "WHEN",
    "WHERE", "WITH",
];

/// Validates a single SQL identifier.
pub fn check_identifier(name: &str) -> Result<()> {
    if !IDENT_RE.is_match(name) {
        return Err(RuntimeError::invalid_identifier(
            name,
            "must start with a letter or underscore and contain only letters, digits and underscores (max 64)",
        ));
    }
    let upper = name.to_ascii_uppercase();
    if RESERVED.binary_search(&upper.as_str()).is_ok() {
        return Err(RuntimeError::invalid_identifier(name, "is a reserved SQL keyword"));
    }
    Ok(())
}

/// Validates a column reference that may be qualified (`alias.column`).
pub fn check_column_ref(name: &str) -> Result<()> {
    match name.split_once('.') {
        Some((qualifier, column)) => {
            check_identifier(qualifier)?;
            check_identifier(column)
        }
        None => check_identifier(name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reserved_list_is_sorted() {
        // binary_search above depends on it.
        let mut sorted = RESERVED.to_vec();
        sorted.sort_unstable();
        assert_eq!(sorted, RESERVED);
    }

    #[test]
    fn test_valid_identifiers() {
        assert!(check_identifier("users").is_ok());
        assert!(check_identifier("_private").is_ok());
        assert!(check_identifier("created_at2").is_ok());
    }

    #[test]
    fn test_shape_violations() {
        assert!(check_identifier("").is_err());
        assert!(check_identifier("1abc").is_err());
        assert!(check_identifier("users; DROP TABLE x").is_err());
        assert!(check_identifier("na-me").is_err());
        assert!(check_identifier(&"a".repeat(65)).is_err());
        assert!(check_identifier(&"a".repeat(64)).is_ok());
    }

    #[test]
    fn test_reserved_words_rejected() {
        assert!(check_identifier("select").is_err());
        assert!(check_identifier("SELECT").is_err());
        assert!(check_identifier("Where").is_err());
        assert!(check_identifier("selection").is_ok());
    }

    #[test]
    fn test_qualified_column_refs() {
        assert!(check_column_ref("posts.id").is_ok());
        assert!(check_column_ref("posts.select").is_err());
        assert!(check_column_ref("a.b.c").is_err());
    }
}
