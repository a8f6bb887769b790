//! The recursive AST evaluator.
//!
//! `eval_expr` walks one node and returns a [`Flow`]: a value, or one of
//! the control signals (`return`, `skip`, `stop`, `check`). Errors
//! propagate unchanged through `?`; `try` is the only interception point
//! and it takes catchable classes only.

use std::cmp::Ordering;
use std::rc::Rc;

use sorrel_ast::{Expr, ForBody, InfixOp, Position, PrefixOp, Program, Stmt};
use sorrel_runtime::{
    collections, ordering::compare, Dict, Duration, Env, Flow, FunctionValue, Result,
    RuntimeError, Value,
};

use crate::dispatch;

/// Unwraps a value flow, propagating signals to the caller.
macro_rules! value_of {
    ($flow:expr) => {
        match $flow {
            Flow::Value(value) => value,
            other => return Ok(other),
        }
    };
}

/// The tree-walking evaluator. Stateless besides the recursion itself;
/// all mutable state lives in environments and on the connection.
#[derive(Debug, Default)]
pub struct Evaluator;

impl Evaluator {
    /// Creates an evaluator.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Evaluates a whole program, converting boundary signals to values.
    pub fn eval_program(&mut self, program: &Program, env: &Env) -> Result<Value> {
        Ok(self.eval_body(&program.statements, env)?.into_result_value())
    }

    /// Evaluates one statement.
    pub fn eval_stmt(&mut self, stmt: &Stmt, env: &Env) -> Result<Flow> {
        match stmt {
            Stmt::Let { name, value, .. } => {
                let value = value_of!(self.eval_expr(value, env)?);
                env.set(name.clone(), value);
                Ok(Flow::val(Value::Null))
            }
            Stmt::Return { value, .. } => {
                let value = match value {
                    Some(expr) => value_of!(self.eval_expr(expr, env)?),
                    None => Value::Null,
                };
                Ok(Flow::Return(value))
            }
            Stmt::Expr(expr) => self.eval_expr(expr, env),
        }
    }

    /// Evaluates a statement list with body semantics: expression results
    /// collect, nulls drop, and the body yields its single value or the
    /// collected array. Signals propagate to the caller.
    pub fn eval_body(&mut self, statements: &[Stmt], env: &Env) -> Result<Flow> {
        let mut collected = Vec::new();
        for stmt in statements {
            let is_expr = matches!(stmt, Stmt::Expr(_));
            match self.eval_stmt(stmt, env)? {
                Flow::Value(value) => {
                    if is_expr && !value.is_null() {
                        collected.push(value);
                    }
                }
                other => return Ok(other),
            }
        }
        let result = if collected.is_empty() {
            Value::Null
        } else if collected.len() == 1 {
            collected.remove(0)
        } else {
            Value::Array(collected)
        };
        Ok(Flow::Value(result))
    }

    /// Evaluates one expression.
    pub fn eval_expr(&mut self, expr: &Expr, env: &Env) -> Result<Flow> {
        match expr {
            Expr::Integer { value, .. } => Ok(Flow::val(Value::Int(*value))),
            Expr::Float { value, .. } => Ok(Flow::val(Value::Float(*value))),
            Expr::Str { value, .. } => Ok(Flow::val(Value::Str(value.clone()))),
            Expr::Boolean { value, .. } => Ok(Flow::val(Value::Bool(*value))),
            Expr::Null { .. } => Ok(Flow::val(Value::Null)),

            Expr::Array { elements, .. } => {
                let mut items = Vec::with_capacity(elements.len());
                for element in elements {
                    items.push(value_of!(self.eval_expr(element, env)?));
                }
                Ok(Flow::val(Value::Array(items)))
            }

            // Entries evaluate at construction, in source order.
            Expr::Dictionary { entries, .. } => {
                let mut dict = Dict::new();
                for (key, value_expr) in entries {
                    let value = value_of!(self.eval_expr(value_expr, env)?);
                    dict.insert(key.clone(), value);
                }
                Ok(Flow::val(Value::Dict(dict)))
            }

            Expr::Identifier { name, pos } => match env.get(name) {
                Some(value) => Ok(Flow::val(value)),
                None => {
                    let names = env.visible_names();
                    let candidates: Vec<&str> = names.iter().map(String::as_str).collect();
                    let mut err = RuntimeError::undefined_identifier(name).at(*pos);
                    if let Some(suggestion) = dispatch::closest_name(name, &candidates) {
                        err = err.with_hint(format!("did you mean {suggestion:?}?"));
                    }
                    Err(err)
                }
            },

            Expr::Prefix { op, right, pos } => {
                let right = value_of!(self.eval_expr(right, env)?);
                eval_prefix(*op, right, *pos).map(Flow::val)
            }

            Expr::Infix {
                op, left, right, pos,
            } => self.eval_infix_expr(*op, left, right, env, *pos),

            Expr::If {
                condition,
                consequence,
                alternative,
                ..
            } => {
                let condition = value_of!(self.eval_expr(condition, env)?);
                if condition.is_truthy() {
                    self.eval_body(&consequence.statements, env)
                } else if let Some(alternative) = alternative {
                    self.eval_body(&alternative.statements, env)
                } else {
                    Ok(Flow::val(Value::Null))
                }
            }

            Expr::Function { params, body, pos } => {
                Ok(Flow::val(Value::Function(Rc::new(FunctionValue {
                    params: params.clone(),
                    body: body.clone(),
                    env: env.clone(),
                    pos: *pos,
                }))))
            }

            Expr::Call { callee, args, pos } => {
                let callee = value_of!(self.eval_expr(callee, env)?);
                let func = match callee {
                    Value::Function(func) => func,
                    other => {
                        return Err(RuntimeError::not_a_function(other.type_name()).at(*pos))
                    }
                };
                let mut evaluated = Vec::with_capacity(args.len());
                for arg in args {
                    evaluated.push(value_of!(self.eval_expr(arg, env)?));
                }
                self.apply_function(&func, evaluated, None).map(Flow::val)
            }

            Expr::Index { object, index, pos } => {
                let object = value_of!(self.eval_expr(object, env)?);
                let index = value_of!(self.eval_expr(index, env)?);
                eval_index(&object, &index, *pos).map(Flow::val)
            }

            Expr::Dot {
                object,
                property,
                pos,
            } => {
                let object = value_of!(self.eval_expr(object, env)?);
                match &object {
                    Value::Dict(dict) => {
                        Ok(Flow::val(dict.get(property).cloned().unwrap_or(Value::Null)))
                    }
                    Value::Record(record) => Ok(Flow::val(
                        record.data.get(property).cloned().unwrap_or(Value::Null),
                    )),
                    other => Err(RuntimeError::type_mismatch(format!(
                        "cannot access property {property:?} on {}",
                        other.type_name()
                    ))
                    .at(*pos)),
                }
            }

            Expr::MethodCall {
                receiver,
                method,
                args,
                pos,
            } => {
                let receiver = value_of!(self.eval_expr(receiver, env)?);
                let mut evaluated = Vec::with_capacity(args.len());
                for arg in args {
                    evaluated.push(value_of!(self.eval_expr(arg, env)?));
                }
                dispatch::call_method(self, &receiver, method, &evaluated, env, *pos)
                    .map(Flow::val)
            }

            Expr::Range { start, end, pos } => {
                let start = value_of!(self.eval_expr(start, env)?);
                let end = value_of!(self.eval_expr(end, env)?);
                match (start.as_int(), end.as_int()) {
                    (Some(a), Some(b)) => {
                        Ok(Flow::val(Value::Array(collections::int_range(a, b))))
                    }
                    _ => Err(RuntimeError::type_mismatch(format!(
                        "range endpoints must be integers, got {} and {}",
                        start.type_name(),
                        end.type_name()
                    ))
                    .at(*pos)),
                }
            }

            Expr::For {
                bindings,
                iterable,
                body,
                pos,
            } => self.eval_for(bindings, iterable, body, env, *pos),

            Expr::Skip { .. } => Ok(Flow::Skip),
            Expr::Stop { .. } => Ok(Flow::Stop),

            Expr::Try { inner, .. } => match self.eval_expr(inner, env) {
                Ok(Flow::Value(value)) => Ok(Flow::val(try_dict(value, None))),
                Ok(signal) => Ok(signal),
                Err(err) if err.is_catchable() => {
                    Ok(Flow::val(try_dict(Value::Null, Some(err.message))))
                }
                Err(err) => Err(err),
            },

            Expr::Check {
                condition,
                fallback,
                ..
            } => {
                let condition = value_of!(self.eval_expr(condition, env)?);
                if condition.is_truthy() {
                    Ok(Flow::val(Value::Null))
                } else {
                    let fallback = value_of!(self.eval_expr(fallback, env)?);
                    Ok(Flow::CheckExit(fallback))
                }
            }

            Expr::Query(query) => self.eval_query(query, env).map(Flow::val),
            Expr::Insert(insert) => self.eval_insert(insert, env).map(Flow::val),
            Expr::Update(update) => self.eval_update(update, env).map(Flow::val),
            Expr::Delete(delete) => self.eval_delete(delete, env).map(Flow::val),
            Expr::Transaction(tx) => self.eval_transaction(tx, env),
        }
    }

    /// Applies a user function: arity check, fresh frame over the
    /// captured environment, `this` bound when given, body evaluated with
    /// `return` and `check` converted at the boundary.
    pub fn apply_function(
        &mut self,
        func: &Rc<FunctionValue>,
        args: Vec<Value>,
        this: Option<Value>,
    ) -> Result<Value> {
        if args.len() != func.params.len() {
            return Err(RuntimeError::arity(
                "function",
                &func.params.len().to_string(),
                args.len(),
            )
            .at(func.pos));
        }
        let scope = func.env.enclosed();
        if let Some(this) = this {
            scope.set("this", this);
        }
        for (param, arg) in func.params.iter().zip(args) {
            scope.set(param.clone(), arg);
        }
        Ok(self.eval_body(&func.body.statements, &scope)?.into_result_value())
    }

    fn eval_infix_expr(
        &mut self,
        op: InfixOp,
        left: &Expr,
        right: &Expr,
        env: &Env,
        pos: Position,
    ) -> Result<Flow> {
        // Logical connectives short-circuit.
        if matches!(op, InfixOp::And | InfixOp::Or) {
            let left = value_of!(self.eval_expr(left, env)?);
            let outcome = match op {
                InfixOp::And => {
                    left.is_truthy()
                        && value_of!(self.eval_expr(right, env)?).is_truthy()
                }
                _ => {
                    left.is_truthy()
                        || value_of!(self.eval_expr(right, env)?).is_truthy()
                }
            };
            return Ok(Flow::val(Value::Bool(outcome)));
        }

        let left = value_of!(self.eval_expr(left, env)?);
        let right = value_of!(self.eval_expr(right, env)?);
        eval_infix(op, left, right, pos).map(Flow::val)
    }

    fn eval_for(
        &mut self,
        bindings: &[String],
        iterable: &Expr,
        body: &ForBody,
        env: &Env,
        pos: Position,
    ) -> Result<Flow> {
        let iterated = value_of!(self.eval_expr(iterable, env)?);

        let func = match body {
            ForBody::Apply(expr) => {
                let value = value_of!(self.eval_expr(expr, env)?);
                match value {
                    Value::Function(func) => Some(func),
                    other => {
                        return Err(RuntimeError::not_a_function(other.type_name()).at(pos))
                    }
                }
            }
            ForBody::Block(_) => None,
        };
        let binding_count = func
            .as_ref()
            .map_or(bindings.len(), |func| func.params.len());
        if binding_count == 0 || binding_count > 2 {
            return Err(RuntimeError::loop_misuse("for takes one or two bindings").at(pos));
        }

        let rows = iteration_rows(&iterated, binding_count, pos)?;
        let mut results = Vec::new();

        for row in rows {
            match (&func, body) {
                (Some(func), _) => {
                    let result = self.apply_function(func, row, None)?;
                    if !result.is_null() {
                        results.push(result);
                    }
                }
                (None, ForBody::Block(block)) => {
                    let scope = env.enclosed();
                    for (name, value) in bindings.iter().zip(row) {
                        scope.set(name.clone(), value);
                    }
                    match self.eval_body(&block.statements, &scope)? {
                        Flow::Value(value) => {
                            if !value.is_null() {
                                results.push(value);
                            }
                        }
                        Flow::Skip => {}
                        Flow::Stop => break,
                        other => return Ok(other),
                    }
                }
                (None, ForBody::Apply(_)) => {
                    return Err(RuntimeError::internal("for body resolved to neither form"))
                }
            }
        }

        Ok(Flow::val(Value::Array(results)))
    }
}

/// The rows a `for` iterates, each already shaped to the binding count.
fn iteration_rows(iterated: &Value, bindings: usize, pos: Position) -> Result<Vec<Vec<Value>>> {
    let rows = match iterated {
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                if bindings == 1 {
                    vec![item.clone()]
                } else {
                    vec![item.clone(), Value::Int(i as i64)]
                }
            })
            .collect(),
        // Dictionary iteration follows the key list, skipping internal
        // keys; one binding sees values, two see key and value.
        Value::Dict(dict) => dict
            .visible()
            .map(|(key, value)| {
                if bindings == 1 {
                    vec![value.clone()]
                } else {
                    vec![Value::Str(key.clone()), value.clone()]
                }
            })
            .collect(),
        Value::Str(text) => text
            .chars()
            .enumerate()
            .map(|(i, c)| {
                if bindings == 1 {
                    vec![Value::Str(c.to_string())]
                } else {
                    vec![Value::Str(c.to_string()), Value::Int(i as i64)]
                }
            })
            .collect(),
        Value::Table(table) => table
            .rows
            .iter()
            .enumerate()
            .map(|(i, row)| {
                if bindings == 1 {
                    vec![Value::Dict(row.clone())]
                } else {
                    vec![Value::Dict(row.clone()), Value::Int(i as i64)]
                }
            })
            .collect(),
        other => return Err(RuntimeError::not_iterable(other.type_name()).at(pos)),
    };
    Ok(rows)
}

fn try_dict(result: Value, error: Option<String>) -> Value {
    Value::Dict(Dict::from_pairs([
        ("result".to_string(), result),
        (
            "error".to_string(),
            error.map_or(Value::Null, Value::Str),
        ),
    ]))
}

fn eval_prefix(op: PrefixOp, right: Value, pos: Position) -> Result<Value> {
    match (op, right) {
        (PrefixOp::Neg, Value::Int(n)) => Ok(Value::Int(-n)),
        (PrefixOp::Neg, Value::Float(f)) => Ok(Value::Float(-f)),
        (PrefixOp::Neg, Value::Money(m)) => {
            Ok(Value::Money(sorrel_runtime::Money::new(-m.amount, m.currency, m.scale)))
        }
        (PrefixOp::Neg, Value::Duration(d)) => Ok(Value::Duration(Duration::from_secs(-d.secs))),
        (PrefixOp::Not, Value::Bool(b)) => Ok(Value::Bool(!b)),
        (PrefixOp::Not, Value::Null) => Ok(Value::Bool(true)),
        (op, other) => Err(RuntimeError::type_mismatch(format!(
            "cannot apply {op} to {}",
            other.type_name()
        ))
        .at(pos)),
    }
}

fn eval_infix(op: InfixOp, left: Value, right: Value, pos: Position) -> Result<Value> {
    match op {
        InfixOp::Eq => Ok(Value::Bool(left == right)),
        InfixOp::NotEq => Ok(Value::Bool(left != right)),
        InfixOp::Lt => Ok(Value::Bool(compare(&left, &right) == Ordering::Less)),
        InfixOp::LtEq => Ok(Value::Bool(compare(&left, &right) != Ordering::Greater)),
        InfixOp::Gt => Ok(Value::Bool(compare(&left, &right) == Ordering::Greater)),
        InfixOp::GtEq => Ok(Value::Bool(compare(&left, &right) != Ordering::Less)),
        InfixOp::Add | InfixOp::Sub | InfixOp::Mul | InfixOp::Div | InfixOp::Mod => {
            eval_arithmetic(op, left, right, pos)
        }
        InfixOp::And | InfixOp::Or => {
            Err(RuntimeError::internal("logical connective past short-circuit"))
        }
    }
}

fn eval_arithmetic(op: InfixOp, left: Value, right: Value, pos: Position) -> Result<Value> {
    match (op, &left, &right) {
        // Integer-preserving arithmetic.
        (InfixOp::Add, Value::Int(a), Value::Int(b)) => Ok(Value::Int(a + b)),
        (InfixOp::Sub, Value::Int(a), Value::Int(b)) => Ok(Value::Int(a - b)),
        (InfixOp::Mul, Value::Int(a), Value::Int(b)) => Ok(Value::Int(a * b)),
        (InfixOp::Div, Value::Int(_), Value::Int(0)) | (InfixOp::Mod, Value::Int(_), Value::Int(0)) => {
            Err(RuntimeError::division_by_zero().at(pos))
        }
        (InfixOp::Div, Value::Int(a), Value::Int(b)) => Ok(Value::Int(a / b)),
        (InfixOp::Mod, Value::Int(a), Value::Int(b)) => Ok(Value::Int(a % b)),

        // Mixed numeric arithmetic goes through floats.
        (_, Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => {
            let (a, b) = match (left.as_number(), right.as_number()) {
                (Some(a), Some(b)) => (a, b),
                _ => return Err(RuntimeError::internal("numeric operands lost their numbers")),
            };
            match op {
                InfixOp::Add => Ok(Value::Float(a + b)),
                InfixOp::Sub => Ok(Value::Float(a - b)),
                InfixOp::Mul => Ok(Value::Float(a * b)),
                InfixOp::Div if b == 0.0 => Err(RuntimeError::division_by_zero().at(pos)),
                InfixOp::Div => Ok(Value::Float(a / b)),
                InfixOp::Mod if b == 0.0 => Err(RuntimeError::division_by_zero().at(pos)),
                InfixOp::Mod => Ok(Value::Float(a % b)),
                _ => Err(RuntimeError::internal("non-arithmetic operator in arithmetic")),
            }
        }

        (InfixOp::Add, Value::Str(a), Value::Str(b)) => Ok(Value::Str(format!("{a}{b}"))),
        (InfixOp::Add, Value::Array(a), Value::Array(b)) => {
            let mut out = a.clone();
            out.extend(b.iter().cloned());
            Ok(Value::Array(out))
        }

        (InfixOp::Add, Value::Money(a), Value::Money(b)) => {
            a.checked_add(b).map(Value::Money).map_err(|err| err.at(pos))
        }
        (InfixOp::Sub, Value::Money(a), Value::Money(b)) => {
            a.checked_sub(b).map(Value::Money).map_err(|err| err.at(pos))
        }
        (InfixOp::Mul, Value::Money(m), Value::Int(n))
        | (InfixOp::Mul, Value::Int(n), Value::Money(m)) => Ok(Value::Money(
            sorrel_runtime::Money::new(m.amount * n, m.currency.clone(), m.scale),
        )),
        (InfixOp::Mul, Value::Money(m), Value::Float(f))
        | (InfixOp::Mul, Value::Float(f), Value::Money(m)) => Ok(Value::Money(
            sorrel_runtime::Money::new(
                (m.amount as f64 * f).round() as i64,
                m.currency.clone(),
                m.scale,
            ),
        )),

        (InfixOp::Add, Value::Datetime(dt), Value::Duration(d))
        | (InfixOp::Add, Value::Duration(d), Value::Datetime(dt)) => {
            Ok(Value::Datetime(*dt + chrono::Duration::seconds(d.secs)))
        }
        (InfixOp::Sub, Value::Datetime(dt), Value::Duration(d)) => {
            Ok(Value::Datetime(*dt - chrono::Duration::seconds(d.secs)))
        }
        (InfixOp::Sub, Value::Datetime(a), Value::Datetime(b)) => Ok(Value::Duration(
            Duration::from_secs(a.signed_duration_since(*b).num_seconds()),
        )),
        (InfixOp::Add, Value::Duration(a), Value::Duration(b)) => {
            Ok(Value::Duration(Duration::from_secs(a.secs + b.secs)))
        }
        (InfixOp::Sub, Value::Duration(a), Value::Duration(b)) => {
            Ok(Value::Duration(Duration::from_secs(a.secs - b.secs)))
        }
        (InfixOp::Mul, Value::Duration(d), Value::Int(n))
        | (InfixOp::Mul, Value::Int(n), Value::Duration(d)) => {
            Ok(Value::Duration(Duration::from_secs(d.secs * n)))
        }

        (op, left, right) => Err(RuntimeError::type_mismatch(format!(
            "cannot apply {op} to {} and {}",
            left.type_name(),
            right.type_name()
        ))
        .at(pos)),
    }
}

fn eval_index(object: &Value, index: &Value, pos: Position) -> Result<Value> {
    match (object, index) {
        (Value::Array(items), Value::Int(i)) => {
            let idx = normalize_index(*i, items.len())
                .ok_or_else(|| RuntimeError::out_of_bounds(*i, items.len()).at(pos))?;
            Ok(items[idx].clone())
        }
        (Value::Str(text), Value::Int(i)) => {
            let chars: Vec<char> = text.chars().collect();
            let idx = normalize_index(*i, chars.len())
                .ok_or_else(|| RuntimeError::out_of_bounds(*i, chars.len()).at(pos))?;
            Ok(Value::Str(chars[idx].to_string()))
        }
        (Value::Table(table), Value::Int(i)) => {
            let idx = normalize_index(*i, table.rows.len())
                .ok_or_else(|| RuntimeError::out_of_bounds(*i, table.rows.len()).at(pos))?;
            Ok(Value::Dict(table.rows[idx].clone()))
        }
        (Value::Dict(dict), Value::Str(key)) => {
            Ok(dict.get(key).cloned().unwrap_or(Value::Null))
        }
        (Value::Record(record), Value::Str(key)) => {
            Ok(record.data.get(key).cloned().unwrap_or(Value::Null))
        }
        (object, index) => Err(RuntimeError::type_mismatch(format!(
            "cannot index {} with {}",
            object.type_name(),
            index.type_name()
        ))
        .at(pos)),
    }
}

/// Maps an index, negative counting from the end, into bounds.
fn normalize_index(index: i64, len: usize) -> Option<usize> {
    let len = len as i64;
    let idx = if index < 0 { len + index } else { index };
    (0..len).contains(&idx).then_some(idx as usize)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sorrel_ast::Block;

    fn int(value: i64) -> Expr {
        Expr::Integer {
            value,
            pos: Position::default(),
        }
    }

    fn text(value: &str) -> Expr {
        Expr::Str {
            value: value.to_string(),
            pos: Position::default(),
        }
    }

    fn ident(name: &str) -> Expr {
        Expr::Identifier {
            name: name.to_string(),
            pos: Position::default(),
        }
    }

    fn infix(op: InfixOp, left: Expr, right: Expr) -> Expr {
        Expr::Infix {
            op,
            left: Box::new(left),
            right: Box::new(right),
            pos: Position::default(),
        }
    }

    fn method(receiver: Expr, name: &str, args: Vec<Expr>) -> Expr {
        Expr::MethodCall {
            receiver: Box::new(receiver),
            method: name.to_string(),
            args,
            pos: Position::default(),
        }
    }

    fn function(params: &[&str], body: Vec<Stmt>) -> Expr {
        Expr::Function {
            params: params.iter().map(|s| (*s).to_string()).collect(),
            body: Block::new(body),
            pos: Position::default(),
        }
    }

    fn eval(expr: Expr) -> Result<Value> {
        let mut ev = Evaluator::new();
        let env = Env::new();
        Ok(ev.eval_expr(&expr, &env)?.into_result_value())
    }

    #[test]
    fn test_integer_arithmetic_preserves_integers() {
        assert_eq!(eval(infix(InfixOp::Add, int(2), int(3))).unwrap(), Value::Int(5));
        assert_eq!(eval(infix(InfixOp::Div, int(7), int(2))).unwrap(), Value::Int(3));
        let err = eval(infix(InfixOp::Div, int(1), int(0))).unwrap_err();
        assert_eq!(err.code, "VAL-0003");
    }

    #[test]
    fn test_mixed_numeric_equality() {
        assert_eq!(
            eval(infix(
                InfixOp::Eq,
                int(2),
                Expr::Float {
                    value: 2.0,
                    pos: Position::default()
                }
            ))
            .unwrap(),
            Value::Bool(true)
        );
    }

    #[test]
    fn test_string_concat_and_methods() {
        assert_eq!(
            eval(infix(InfixOp::Add, text("he"), text("llo"))).unwrap(),
            Value::Str("hello".to_string())
        );
        // "hello".split("l") -> ["he", "", "o"]
        assert_eq!(
            eval(method(text("hello"), "split", vec![text("l")])).unwrap(),
            Value::Array(vec![
                Value::Str("he".to_string()),
                Value::Str(String::new()),
                Value::Str("o".to_string()),
            ])
        );
        assert_eq!(
            eval(method(text("he,,o"), "toUpper", vec![])).unwrap(),
            Value::Str("HE,,O".to_string())
        );
    }

    #[test]
    fn test_map_reduce_pipeline() {
        // [1,2,3].map(fn(x){x*2}).reduce(fn(a,x){a+x}, 0) == 12
        let array = Expr::Array {
            elements: vec![int(1), int(2), int(3)],
            pos: Position::default(),
        };
        let doubled = method(
            array,
            "map",
            vec![function(
                &["x"],
                vec![Stmt::Expr(infix(InfixOp::Mul, ident("x"), int(2)))],
            )],
        );
        let sum = method(
            doubled,
            "reduce",
            vec![
                function(
                    &["a", "x"],
                    vec![Stmt::Expr(infix(InfixOp::Add, ident("a"), ident("x")))],
                ),
                int(0),
            ],
        );
        assert_eq!(eval(sum).unwrap(), Value::Int(12));
    }

    #[test]
    fn test_dictionary_entries_scenario() {
        // {a:1,b:2,c:3}.entries("k","v") has length 3; first is {k:"a", v:1}
        let dict = Expr::Dictionary {
            entries: vec![
                ("a".to_string(), int(1)),
                ("b".to_string(), int(2)),
                ("c".to_string(), int(3)),
            ],
            pos: Position::default(),
        };
        let entries = eval(method(dict, "entries", vec![text("k"), text("v")])).unwrap();
        let Value::Array(items) = entries else {
            panic!("expected array");
        };
        assert_eq!(items.len(), 3);
        let Value::Dict(first) = &items[0] else {
            panic!("expected dict");
        };
        assert_eq!(first.get("k"), Some(&Value::Str("a".to_string())));
        assert_eq!(first.get("v"), Some(&Value::Int(1)));
    }

    #[test]
    fn test_range_directions() {
        let down = Expr::Range {
            start: Box::new(int(5)),
            end: Box::new(int(2)),
            pos: Position::default(),
        };
        assert_eq!(
            eval(down).unwrap(),
            Value::Array(vec![
                Value::Int(5),
                Value::Int(4),
                Value::Int(3),
                Value::Int(2)
            ])
        );
        let up = Expr::Range {
            start: Box::new(int(1)),
            end: Box::new(int(3)),
            pos: Position::default(),
        };
        assert_eq!(
            eval(up).unwrap(),
            Value::Array(vec![Value::Int(1), Value::Int(2), Value::Int(3)])
        );
    }

    #[test]
    fn test_closure_captures_environment_by_reference() {
        let mut ev = Evaluator::new();
        let env = Env::new();
        env.set("n", Value::Int(1));
        let func = function(&[], vec![Stmt::Expr(ident("n"))]);
        let Flow::Value(Value::Function(func)) = ev.eval_expr(&func, &env).unwrap() else {
            panic!("expected function");
        };
        env.set("n", Value::Int(42));
        assert_eq!(ev.apply_function(&func, vec![], None).unwrap(), Value::Int(42));
    }

    #[test]
    fn test_for_skip_and_stop() {
        // for (x in [1,2,3,4,5]) {
        //   if (x == 2) { skip }
        //   if (x == 4) { stop }
        //   x
        // }
        // skip drops 2's output; stop at 4 emits what accumulated so far.
        let mut ev = Evaluator::new();
        let env = Env::new();
        env.set(
            "xs",
            Value::Array(vec![
                Value::Int(1),
                Value::Int(2),
                Value::Int(3),
                Value::Int(4),
                Value::Int(5),
            ]),
        );
        let body = Block::new(vec![
            Stmt::Expr(Expr::If {
                condition: Box::new(infix(InfixOp::Eq, ident("x"), int(2))),
                consequence: Block::new(vec![Stmt::Expr(Expr::Skip {
                    pos: Position::default(),
                })]),
                alternative: None,
                pos: Position::default(),
            }),
            Stmt::Expr(Expr::If {
                condition: Box::new(infix(InfixOp::Eq, ident("x"), int(4))),
                consequence: Block::new(vec![Stmt::Expr(Expr::Stop {
                    pos: Position::default(),
                })]),
                alternative: None,
                pos: Position::default(),
            }),
            Stmt::Expr(ident("x")),
        ]);
        let loop_expr = Expr::For {
            bindings: vec!["x".to_string()],
            iterable: Box::new(ident("xs")),
            body: ForBody::Block(body),
            pos: Position::default(),
        };
        let result = ev.eval_expr(&loop_expr, &env).unwrap().into_result_value();
        assert_eq!(result, Value::Array(vec![Value::Int(1), Value::Int(3)]));
    }

    #[test]
    fn test_for_apply_form() {
        let mut ev = Evaluator::new();
        let env = Env::new();
        env.set("xs", Value::Array(vec![Value::Int(1), Value::Int(2)]));
        let loop_expr = Expr::For {
            bindings: vec![],
            iterable: Box::new(ident("xs")),
            body: ForBody::Apply(Box::new(function(
                &["x"],
                vec![Stmt::Expr(infix(InfixOp::Mul, ident("x"), int(10)))],
            ))),
            pos: Position::default(),
        };
        let result = ev.eval_expr(&loop_expr, &env).unwrap().into_result_value();
        assert_eq!(result, Value::Array(vec![Value::Int(10), Value::Int(20)]));
    }

    #[test]
    fn test_for_over_dictionary_binds_key_value_and_skips_internal() {
        let mut ev = Evaluator::new();
        let env = Env::new();
        env.set(
            "d",
            Value::Dict(Dict::from_pairs([
                ("a".to_string(), Value::Int(1)),
                ("__type".to_string(), Value::Str("x".to_string())),
                ("b".to_string(), Value::Int(2)),
            ])),
        );
        let loop_expr = Expr::For {
            bindings: vec!["k".to_string(), "v".to_string()],
            iterable: Box::new(ident("d")),
            body: ForBody::Block(Block::new(vec![Stmt::Expr(ident("k"))])),
            pos: Position::default(),
        };
        let result = ev.eval_expr(&loop_expr, &env).unwrap().into_result_value();
        assert_eq!(
            result,
            Value::Array(vec![
                Value::Str("a".to_string()),
                Value::Str("b".to_string())
            ])
        );
    }

    #[test]
    fn test_try_intercepts_catchable_errors_only() {
        // try (1/0) -> {result: null, error: "division by zero"}
        let wrapped = eval(Expr::Try {
            inner: Box::new(infix(InfixOp::Div, int(1), int(0))),
            pos: Position::default(),
        })
        .unwrap();
        let Value::Dict(dict) = wrapped else {
            panic!("expected dict");
        };
        assert_eq!(dict.get("result"), Some(&Value::Null));
        assert_eq!(
            dict.get("error"),
            Some(&Value::Str("division by zero".to_string()))
        );

        // Success wraps into {result, error: null}.
        let ok = eval(Expr::Try {
            inner: Box::new(int(5)),
            pos: Position::default(),
        })
        .unwrap();
        let Value::Dict(dict) = ok else {
            panic!("expected dict");
        };
        assert_eq!(dict.get("result"), Some(&Value::Int(5)));
        assert_eq!(dict.get("error"), Some(&Value::Null));
    }

    #[test]
    fn test_check_exits_function_body_with_fallback() {
        // fn(x) { check x > 0 else "negative"; x * 2 } applied to -1.
        let mut ev = Evaluator::new();
        let env = Env::new();
        let func = function(
            &["x"],
            vec![
                Stmt::Expr(Expr::Check {
                    condition: Box::new(infix(InfixOp::Gt, ident("x"), int(0))),
                    fallback: Box::new(text("negative")),
                    pos: Position::default(),
                }),
                Stmt::Expr(infix(InfixOp::Mul, ident("x"), int(2))),
            ],
        );
        let Flow::Value(Value::Function(func)) = ev.eval_expr(&func, &env).unwrap() else {
            panic!("expected function");
        };
        assert_eq!(
            ev.apply_function(&func, vec![Value::Int(-1)], None).unwrap(),
            Value::Str("negative".to_string())
        );
        assert_eq!(
            ev.apply_function(&func, vec![Value::Int(3)], None).unwrap(),
            Value::Int(6)
        );
    }

    #[test]
    fn test_return_short_circuits_body() {
        let mut ev = Evaluator::new();
        let env = Env::new();
        let func = function(
            &[],
            vec![
                Stmt::Return {
                    value: Some(int(1)),
                    pos: Position::default(),
                },
                Stmt::Expr(int(2)),
            ],
        );
        let Flow::Value(Value::Function(func)) = ev.eval_expr(&func, &env).unwrap() else {
            panic!("expected function");
        };
        assert_eq!(ev.apply_function(&func, vec![], None).unwrap(), Value::Int(1));
    }

    #[test]
    fn test_undefined_identifier_suggests_near_miss() {
        let mut ev = Evaluator::new();
        let env = Env::new();
        env.set("counter", Value::Int(1));
        let err = ev.eval_expr(&ident("countr"), &env).unwrap_err();
        assert_eq!(err.code, "REF-0001");
        assert!(err.hints.iter().any(|hint| hint.contains("counter")));
    }

    #[test]
    fn test_unknown_method_lists_names_and_suggests() {
        let err = eval(method(text("x"), "toUper", vec![])).unwrap_err();
        assert_eq!(err.code, "UNDEF-0001");
        assert!(err.hints.iter().any(|hint| hint.contains("toUpper")));
    }

    #[test]
    fn test_method_arity_error() {
        let err = eval(method(text("x"), "split", vec![])).unwrap_err();
        assert_eq!(err.code, "TYPE-0004");
    }

    #[test]
    fn test_universal_type_method() {
        assert_eq!(
            eval(method(int(1), "type", vec![])).unwrap(),
            Value::Str("integer".to_string())
        );
    }

    #[test]
    fn test_dict_callable_member_binds_this() {
        // { n: 2, double: fn() { this.n * 2 } }.double() == 4... the
        // callable member receives the dictionary as `this`.
        let dict = Expr::Dictionary {
            entries: vec![
                ("n".to_string(), int(2)),
                (
                    "double".to_string(),
                    function(
                        &[],
                        vec![Stmt::Expr(infix(
                            InfixOp::Mul,
                            Expr::Dot {
                                object: Box::new(ident("this")),
                                property: "n".to_string(),
                                pos: Position::default(),
                            },
                            int(2),
                        ))],
                    ),
                ),
            ],
            pos: Position::default(),
        };
        assert_eq!(eval(method(dict, "double", vec![])).unwrap(), Value::Int(4));
    }

    #[test]
    fn test_negative_index_counts_from_end() {
        let arr = Expr::Array {
            elements: vec![int(1), int(2), int(3)],
            pos: Position::default(),
        };
        let last = Expr::Index {
            object: Box::new(arr),
            index: Box::new(int(-1)),
            pos: Position::default(),
        };
        assert_eq!(eval(last).unwrap(), Value::Int(3));
    }

    #[test]
    fn test_out_of_bounds_index() {
        let arr = Expr::Array {
            elements: vec![int(1)],
            pos: Position::default(),
        };
        let err = eval(Expr::Index {
            object: Box::new(arr),
            index: Box::new(int(5)),
            pos: Position::default(),
        })
        .unwrap_err();
        assert_eq!(err.code, "INDEX-0001");
    }
}
