//! Execution of the query-family expressions.
//!
//! The evaluator resolves the source expression to a table binding,
//! hands the node to the compiler (serving as its [`ValueResolver`] for
//! embedded expressions), executes the compiled SQL through the binding's
//! database handle, shapes the result by terminal, and finally runs the
//! eager-load plan.

use std::rc::Rc;

use sorrel_ast::{
    DeleteExpr, Expr, InsertExpr, Projection, QueryExpr, QueryTerminal, TransactionExpr,
    UpdateExpr,
};
use sorrel_query::{
    compile_delete, compile_select, compile_update, eager, prepare_insert, validation_failure,
    ValueResolver,
};
use sorrel_runtime::{
    database::row_to_dict, Dict, Env, Flow, Result, RuntimeError, Schema, SqlValue, TableBinding,
    Value,
};

use crate::evaluator::Evaluator;

impl ValueResolver for Evaluator {
    fn resolve(&mut self, expr: &Expr, env: &Env) -> Result<Value> {
        match self.eval_expr(expr, env)? {
            Flow::Value(value) => Ok(value),
            _ => Err(RuntimeError::internal(
                "control-flow signal inside a query expression",
            )),
        }
    }
}

/// Schema lookup over the bindings visible in the environment: eager
/// loading finds the schema of a relation's target table through the
/// binding bound to it, and degrades when none is in scope.
struct EnvSchemas {
    bindings: Vec<TableBinding>,
}

impl eager::SchemaLookup for EnvSchemas {
    fn schema_for_table(&self, table: &str) -> Option<Rc<Schema>> {
        self.bindings
            .iter()
            .find(|binding| binding.table == table)
            .and_then(|binding| binding.schema.clone())
    }
}

/// The `RETURNING` projection a write effectively uses: the explicit one,
/// or `*` when the terminal wants rows back.
fn effective_returning(
    explicit: Option<&Projection>,
    terminal: QueryTerminal,
) -> Option<Projection> {
    match (explicit, terminal) {
        (Some(projection), _) => Some(projection.clone()),
        (None, QueryTerminal::Many | QueryTerminal::One) => Some(Projection::All),
        _ => None,
    }
}

fn shape_write_result(terminal: QueryTerminal, total: u64, rows: Vec<Dict>) -> Value {
    match terminal {
        QueryTerminal::Many => Value::Array(rows.into_iter().map(Value::Dict).collect()),
        QueryTerminal::One => rows
            .into_iter()
            .next()
            .map_or(Value::Null, Value::Dict),
        QueryTerminal::Count => Value::Int(total as i64),
        _ => Value::Null,
    }
}

fn reject_to_sql(terminal: QueryTerminal, what: &str) -> Result<()> {
    if terminal == QueryTerminal::ToSql {
        return Err(RuntimeError::query_syntax(format!(
            "{what} does not support toSQL"
        )));
    }
    Ok(())
}

impl Evaluator {
    fn resolve_binding(&mut self, expr: &Expr, env: &Env, what: &str) -> Result<TableBinding> {
        match self.resolve(expr, env)? {
            Value::Binding(binding) => Ok(binding),
            other => Err(RuntimeError::type_mismatch(format!(
                "{what} target must be a table binding, got {}",
                other.type_name()
            ))
            .at(expr.pos())),
        }
    }

    fn load_query_relations(
        &mut self,
        binding: &TableBinding,
        rows: &mut [Dict],
        query: &QueryExpr,
        env: &Env,
    ) -> Result<()> {
        if query.relations.is_empty() || rows.is_empty() {
            return Ok(());
        }
        let lookup = EnvSchemas {
            bindings: env.visible_bindings(),
        };
        eager::load_relations(binding, rows, &query.relations, &lookup, self, env)
    }

    pub(crate) fn eval_query(&mut self, query: &QueryExpr, env: &Env) -> Result<Value> {
        let binding = self.resolve_binding(&query.source, env, "query")?;
        let compiled = compile_select(&binding, query, self, env)?;
        if let Some(log) = env.dev_log() {
            log.emit("query", &compiled.sql);
        }

        match query.terminal {
            QueryTerminal::ToSql => Ok(Value::Dict(compiled.to_dict())),
            QueryTerminal::Execute => {
                binding.db.execute(&compiled.sql, &compiled.params)?;
                Ok(Value::Null)
            }
            QueryTerminal::Count => {
                let row = binding.db.query_row(&compiled.sql, &compiled.params)?;
                let count = row
                    .and_then(|row| row.values().next().and_then(Value::as_int))
                    .unwrap_or(0);
                Ok(Value::Int(count))
            }
            QueryTerminal::Exists => {
                let row = binding.db.query_row(&compiled.sql, &compiled.params)?;
                Ok(Value::Bool(row.is_some()))
            }
            QueryTerminal::Many => {
                let mut rows: Vec<Dict> = binding
                    .db
                    .query(&compiled.sql, &compiled.params)?
                    .into_iter()
                    .map(row_to_dict)
                    .collect();
                self.load_query_relations(&binding, &mut rows, query, env)?;
                Ok(Value::Array(rows.into_iter().map(Value::Dict).collect()))
            }
            QueryTerminal::One => {
                let row = binding.db.query_row(&compiled.sql, &compiled.params)?;
                match row {
                    None => Ok(Value::Null),
                    Some(row) => {
                        let mut rows = vec![row_to_dict(row)];
                        self.load_query_relations(&binding, &mut rows, query, env)?;
                        Ok(rows.into_iter().next().map_or(Value::Null, Value::Dict))
                    }
                }
            }
        }
    }

    pub(crate) fn eval_insert(&mut self, insert: &InsertExpr, env: &Env) -> Result<Value> {
        reject_to_sql(insert.terminal, "insert")?;
        let binding = self.resolve_binding(&insert.target, env, "insert")?;
        let returning = effective_returning(insert.returning.as_ref(), insert.terminal);

        let mut total: u64 = 0;
        let mut rows: Vec<Dict> = Vec::new();

        match &insert.batch {
            None => {
                self.run_insert_row(&binding, insert, env, returning.as_ref(), &mut total, &mut rows)?;
            }
            Some(batch) => {
                let source = self.resolve(&batch.source, env)?;
                let items: Vec<Value> = match source {
                    Value::Array(items) => items,
                    Value::Table(table) => {
                        table.rows.into_iter().map(Value::Dict).collect()
                    }
                    other => {
                        return Err(RuntimeError::not_iterable(other.type_name()).at(insert.pos))
                    }
                };
                for (index, item) in items.into_iter().enumerate() {
                    let scope = env.enclosed();
                    scope.set(batch.binding.clone(), item);
                    if let Some(index_binding) = &batch.index_binding {
                        scope.set(index_binding.clone(), Value::Int(index as i64));
                    }
                    self.run_insert_row(
                        &binding,
                        insert,
                        &scope,
                        returning.as_ref(),
                        &mut total,
                        &mut rows,
                    )?;
                }
            }
        }

        Ok(shape_write_result(insert.terminal, total, rows))
    }

    fn run_insert_row(
        &mut self,
        binding: &TableBinding,
        insert: &InsertExpr,
        env: &Env,
        returning: Option<&Projection>,
        total: &mut u64,
        rows: &mut Vec<Dict>,
    ) -> Result<()> {
        let mut data = Dict::new();
        for (column, expr) in &insert.values {
            data.insert(column.clone(), self.resolve(expr, env)?);
        }
        let (compiled, _filled) =
            prepare_insert(binding, &data, &insert.conflict_keys, returning)?;

        if returning.is_some() {
            let returned = binding.db.query(&compiled.sql, &compiled.params)?;
            *total += returned.len() as u64;
            rows.extend(returned.into_iter().map(row_to_dict));
        } else {
            *total += binding.db.execute(&compiled.sql, &compiled.params)?;
        }
        Ok(())
    }

    pub(crate) fn eval_update(&mut self, update: &UpdateExpr, env: &Env) -> Result<Value> {
        reject_to_sql(update.terminal, "update")?;
        let binding = self.resolve_binding(&update.target, env, "update")?;

        let mut sets = Vec::with_capacity(update.sets.len());
        let mut set_dict = Dict::new();
        for (column, expr) in &update.sets {
            let value = self.resolve(expr, env)?;
            set_dict.insert(column.clone(), value.clone());
            sets.push((column.clone(), SqlValue::from_value(&value)?));
        }
        if let Some(schema) = &binding.schema {
            let errors = schema.validate_partial(&set_dict);
            if !errors.is_empty() {
                return Err(validation_failure(errors).at(update.pos));
            }
        }

        let returning = effective_returning(update.returning.as_ref(), update.terminal);
        let compiled = compile_update(
            &binding,
            &sets,
            &update.conditions,
            returning.as_ref(),
            self,
            env,
        )?;

        self.run_write(&binding, update.terminal, &compiled, returning.is_some())
    }

    pub(crate) fn eval_delete(&mut self, delete: &DeleteExpr, env: &Env) -> Result<Value> {
        reject_to_sql(delete.terminal, "delete")?;
        let binding = self.resolve_binding(&delete.target, env, "delete")?;

        let returning = effective_returning(delete.returning.as_ref(), delete.terminal);
        let compiled = compile_delete(
            &binding,
            &delete.conditions,
            returning.as_ref(),
            self,
            env,
        )?;

        self.run_write(&binding, delete.terminal, &compiled, returning.is_some())
    }

    fn run_write(
        &mut self,
        binding: &TableBinding,
        terminal: QueryTerminal,
        compiled: &sorrel_query::CompiledQuery,
        wants_rows: bool,
    ) -> Result<Value> {
        if wants_rows {
            let returned = binding.db.query(&compiled.sql, &compiled.params)?;
            let total = returned.len() as u64;
            let rows = returned.into_iter().map(row_to_dict).collect();
            Ok(shape_write_result(terminal, total, rows))
        } else {
            let total = binding.db.execute(&compiled.sql, &compiled.params)?;
            Ok(shape_write_result(terminal, total, Vec::new()))
        }
    }

    pub(crate) fn eval_transaction(
        &mut self,
        tx: &TransactionExpr,
        env: &Env,
    ) -> Result<Flow> {
        let db = env
            .visible_bindings()
            .first()
            .map(|binding| binding.db.clone())
            .ok_or_else(|| {
                RuntimeError::transaction("no database handle in scope for transaction")
                    .at(tx.pos)
            })?;
        if db.in_transaction() {
            return Err(
                RuntimeError::transaction("a transaction is already active; nesting is not supported")
                    .at(tx.pos),
            );
        }

        db.begin()?;
        tracing::debug!("transaction begun");

        let scope = env.enclosed();
        let mut last = Value::Null;
        for stmt in &tx.statements {
            match self.eval_stmt(stmt, &scope) {
                Ok(Flow::Value(value)) => last = value,
                Ok(signal) => {
                    // Signals are not failures: the work so far stands.
                    db.commit()?;
                    tracing::debug!("transaction committed on signal");
                    return Ok(signal);
                }
                Err(err) => {
                    if let Err(rollback_err) = db.rollback() {
                        tracing::warn!(error = %rollback_err, "rollback failed");
                    }
                    tracing::debug!(error = %err, "transaction rolled back");
                    return Err(err);
                }
            }
        }

        db.commit()?;
        tracing::debug!("transaction committed");
        Ok(Flow::val(last))
    }
}
