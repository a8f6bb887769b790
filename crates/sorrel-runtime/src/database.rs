//! The driver-agnostic database interface.
//!
//! The compiler emits SQLite-compatible SQL with positional `$1..$n`
//! placeholders; a driver implements this trait to execute it. Rows come
//! back as ordered column/value maps and are iterated eagerly, so no
//! cursor outlives a call. At most one transaction is active per
//! connection; nesting is a runtime error raised by the caller.

use indexmap::IndexMap;

use crate::dict::Dict;
use crate::error::Result;
use crate::sql::SqlValue;
use crate::value::Value;

/// One result row: column name to value, in projection order.
pub type SqlRow = IndexMap<String, Value>;

/// Converts a result row into a runtime dictionary.
#[must_use]
pub fn row_to_dict(row: SqlRow) -> Dict {
    Dict::from_pairs(row)
}

/// A database connection usable by the binding layer.
pub trait Database {
    /// Executes a statement, returning the affected row count.
    fn execute(&self, sql: &str, params: &[SqlValue]) -> Result<u64>;

    /// Runs a query, returning every row eagerly.
    fn query(&self, sql: &str, params: &[SqlValue]) -> Result<Vec<SqlRow>>;

    /// Runs a query, returning the first row when any.
    fn query_row(&self, sql: &str, params: &[SqlValue]) -> Result<Option<SqlRow>> {
        Ok(self.query(sql, params)?.into_iter().next())
    }

    /// Begins a transaction.
    fn begin(&self) -> Result<()>;

    /// Commits the active transaction.
    fn commit(&self) -> Result<()>;

    /// Rolls back the active transaction.
    fn rollback(&self) -> Result<()>;

    /// Returns whether a transaction is active.
    fn in_transaction(&self) -> bool;

    /// Returns the rowid assigned by the most recent insert.
    fn last_insert_id(&self) -> Result<i64>;
}
