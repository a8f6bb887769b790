//! Test doubles shared by the unit tests of this crate.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;

use sorrel_runtime::{Database, Result, SqlRow, SqlValue};

/// A database double recording every statement and replaying queued rows.
#[derive(Default)]
pub(crate) struct FakeDb {
    pub calls: RefCell<Vec<(String, Vec<SqlValue>)>>,
    pub queued_rows: RefCell<VecDeque<Vec<SqlRow>>>,
    pub in_tx: Cell<bool>,
    pub last_id: Cell<i64>,
}

impl FakeDb {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queue_rows(&self, rows: Vec<SqlRow>) {
        self.queued_rows.borrow_mut().push_back(rows);
    }

    pub fn recorded_sql(&self) -> Vec<String> {
        self.calls.borrow().iter().map(|(sql, _)| sql.clone()).collect()
    }
}

impl Database for FakeDb {
    fn execute(&self, sql: &str, params: &[SqlValue]) -> Result<u64> {
        self.calls
            .borrow_mut()
            .push((sql.to_string(), params.to_vec()));
        Ok(1)
    }

    fn query(&self, sql: &str, params: &[SqlValue]) -> Result<Vec<SqlRow>> {
        self.calls
            .borrow_mut()
            .push((sql.to_string(), params.to_vec()));
        Ok(self.queued_rows.borrow_mut().pop_front().unwrap_or_default())
    }

    fn begin(&self) -> Result<()> {
        self.in_tx.set(true);
        Ok(())
    }

    fn commit(&self) -> Result<()> {
        self.in_tx.set(false);
        Ok(())
    }

    fn rollback(&self) -> Result<()> {
        self.in_tx.set(false);
        Ok(())
    }

    fn in_transaction(&self) -> bool {
        self.in_tx.get()
    }

    fn last_insert_id(&self) -> Result<i64> {
        Ok(self.last_id.get())
    }
}

/// A resolver evaluating literal expressions and environment lookups,
/// enough for compiler tests without the full evaluator.
pub(crate) struct LiteralResolver;

impl crate::resolver::ValueResolver for LiteralResolver {
    fn resolve(
        &mut self,
        expr: &sorrel_ast::Expr,
        env: &sorrel_runtime::Env,
    ) -> Result<sorrel_runtime::Value> {
        use sorrel_ast::Expr;
        use sorrel_runtime::{RuntimeError, Value};
        match expr {
            Expr::Integer { value, .. } => Ok(Value::Int(*value)),
            Expr::Float { value, .. } => Ok(Value::Float(*value)),
            Expr::Str { value, .. } => Ok(Value::Str(value.clone())),
            Expr::Boolean { value, .. } => Ok(Value::Bool(*value)),
            Expr::Null { .. } => Ok(Value::Null),
            Expr::Array { elements, .. } => {
                let mut items = Vec::with_capacity(elements.len());
                for element in elements {
                    items.push(self.resolve(element, env)?);
                }
                Ok(Value::Array(items))
            }
            Expr::Identifier { name, .. } => env
                .get(name)
                .ok_or_else(|| RuntimeError::undefined_identifier(name)),
            other => Err(RuntimeError::internal(format!(
                "literal resolver cannot evaluate {other:?}"
            ))),
        }
    }
}
