//! Shared test doubles for the integration suites.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

use sorrel_query::ValueResolver;
use sorrel_runtime::{Database, Env, Result, RuntimeError, SqlRow, SqlValue, TableBinding, Value};

/// A database double recording every statement and replaying queued rows.
#[derive(Default)]
pub struct FakeDb {
    pub calls: RefCell<Vec<(String, Vec<SqlValue>)>>,
    pub queued_rows: RefCell<VecDeque<Vec<SqlRow>>>,
    pub in_tx: Cell<bool>,
    pub last_id: Cell<i64>,
}

impl FakeDb {
    pub fn new() -> Self {
        Self::default()
    }

    #[allow(dead_code)]
    pub fn queue_rows(&self, rows: Vec<SqlRow>) {
        self.queued_rows.borrow_mut().push_back(rows);
    }

    #[allow(dead_code)]
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

/// Builds a binding over the fake database.
pub fn fake_binding(table: &str) -> (Rc<FakeDb>, TableBinding) {
    let db = Rc::new(FakeDb::new());
    let binding = TableBinding::new(db.clone(), table);
    (db, binding)
}

/// A resolver evaluating literal expressions and environment lookups,
/// enough for compiler tests without the full evaluator.
pub struct LiteralResolver;

impl ValueResolver for LiteralResolver {
    fn resolve(&mut self, expr: &sorrel_ast::Expr, env: &Env) -> Result<Value> {
        use sorrel_ast::Expr;
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
