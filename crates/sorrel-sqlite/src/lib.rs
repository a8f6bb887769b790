//! # sorrel-sqlite
//!
//! A `rusqlite`-backed implementation of the sorrel [`Database`] trait.
//!
//! The compiler emits `$1..$n` placeholders in first-appearance order, so
//! positional binding by index lines up with SQLite's parameter numbering.
//! Rows are drained eagerly; no cursor outlives a call. One transaction
//! may be active at a time, tracked on the connection.

use std::cell::Cell;
use std::path::Path;

use rusqlite::types::ValueRef;
use rusqlite::Connection;
use sorrel_runtime::{Database, Result, RuntimeError, SqlRow, SqlValue, Value};

/// A SQLite connection implementing [`Database`].
pub struct SqliteDatabase {
    conn: Connection,
    in_tx: Cell<bool>,
}

impl SqliteDatabase {
    /// Opens a database file, creating it when absent.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path).map_err(db_err)?;
        Ok(Self {
            conn,
            in_tx: Cell::new(false),
        })
    }

    /// Opens a fresh in-memory database.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(db_err)?;
        Ok(Self {
            conn,
            in_tx: Cell::new(false),
        })
    }

    /// Runs a batch of semicolon-separated statements, for schema setup.
    pub fn execute_batch(&self, sql: &str) -> Result<()> {
        self.conn.execute_batch(sql).map_err(db_err)
    }
}

fn db_err(err: rusqlite::Error) -> RuntimeError {
    RuntimeError::database(err.to_string())
}

fn bind_value(param: &SqlValue) -> rusqlite::types::Value {
    match param {
        SqlValue::Null => rusqlite::types::Value::Null,
        SqlValue::Bool(b) => rusqlite::types::Value::Integer(i64::from(*b)),
        SqlValue::Int(n) => rusqlite::types::Value::Integer(*n),
        SqlValue::Float(f) => rusqlite::types::Value::Real(*f),
        SqlValue::Text(s) => rusqlite::types::Value::Text(s.clone()),
    }
}

fn column_value(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(n) => Value::Int(n),
        ValueRef::Real(f) => Value::Float(f),
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
            Value::Str(String::from_utf8_lossy(bytes).into_owned())
        }
    }
}

impl Database for SqliteDatabase {
    fn execute(&self, sql: &str, params: &[SqlValue]) -> Result<u64> {
        tracing::trace!(sql, "execute");
        let affected = self
            .conn
            .execute(sql, rusqlite::params_from_iter(params.iter().map(bind_value)))
            .map_err(db_err)?;
        Ok(affected as u64)
    }

    fn query(&self, sql: &str, params: &[SqlValue]) -> Result<Vec<SqlRow>> {
        tracing::trace!(sql, "query");
        let mut stmt = self.conn.prepare(sql).map_err(db_err)?;
        let columns: Vec<String> = stmt.column_names().iter().map(ToString::to_string).collect();

        let mut rows = stmt
            .query(rusqlite::params_from_iter(params.iter().map(bind_value)))
            .map_err(db_err)?;

        let mut out = Vec::new();
        while let Some(row) = rows.next().map_err(db_err)? {
            let mut record = SqlRow::new();
            for (index, name) in columns.iter().enumerate() {
                let value = row.get_ref(index).map_err(db_err)?;
                record.insert(name.clone(), column_value(value));
            }
            out.push(record);
        }
        Ok(out)
    }

    fn begin(&self) -> Result<()> {
        if self.in_tx.get() {
            return Err(RuntimeError::transaction("a transaction is already active"));
        }
        self.conn.execute_batch("BEGIN").map_err(db_err)?;
        self.in_tx.set(true);
        Ok(())
    }

    fn commit(&self) -> Result<()> {
        if !self.in_tx.get() {
            return Err(RuntimeError::transaction("no active transaction to commit"));
        }
        self.conn.execute_batch("COMMIT").map_err(db_err)?;
        self.in_tx.set(false);
        Ok(())
    }

    fn rollback(&self) -> Result<()> {
        if !self.in_tx.get() {
            return Err(RuntimeError::transaction("no active transaction to roll back"));
        }
        self.conn.execute_batch("ROLLBACK").map_err(db_err)?;
        self.in_tx.set(false);
        Ok(())
    }

    fn in_transaction(&self) -> bool {
        self.in_tx.get()
    }

    fn last_insert_id(&self) -> Result<i64> {
        Ok(self.conn.last_insert_rowid())
    }
}
