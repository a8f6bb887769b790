//! Method dispatch over the value universe.
//!
//! Every value kind owns a registry mapping method names to an entry of
//! `{function, arity shape, help}`. Dispatch finds the receiver's
//! registry, checks arity against the shape, and falls back to a
//! dictionary's own callable members before reporting an unknown method
//! with the registry's names and a fuzzy suggestion.
//!
//! Dictionaries shaped like the legacy tagged forms (a `__type` key, or a
//! characteristic field set such as `{amount, currency}` for money)
//! dispatch through the matching special registry first; collaborator
//! modules register their own tags through [`register_special`].

use std::collections::HashMap;
use std::sync::RwLock;

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use sorrel_ast::Position;
use sorrel_runtime::{Dict, Duration, Env, Money, Result, RuntimeError, Value};

use crate::evaluator::Evaluator;

mod array;
mod binding;
mod dict;
mod money;
mod number;
mod record;
mod string;
mod temporal;

/// A registered method implementation.
pub type MethodFn = fn(&mut Evaluator, &Value, &[Value], &Env) -> Result<Value>;

/// One registry entry.
pub struct MethodEntry {
    /// Implementation.
    pub func: MethodFn,
    /// Compact arity shape: `"0"`, `"1"`, `"0-1"`, `"1-2"`, `"1+"`, ...
    pub arity: &'static str,
    /// Short description, shown by introspection.
    pub help: &'static str,
}

/// The method table of one value kind.
pub struct Registry {
    kind: &'static str,
    methods: IndexMap<&'static str, MethodEntry>,
}

impl Registry {
    /// Creates an empty registry for a kind.
    #[must_use]
    pub fn new(kind: &'static str) -> Self {
        Self {
            kind,
            methods: IndexMap::new(),
        }
    }

    /// Registers a method.
    pub fn register(
        &mut self,
        name: &'static str,
        arity: &'static str,
        help: &'static str,
        func: MethodFn,
    ) {
        self.methods.insert(name, MethodEntry { func, arity, help });
    }

    /// Looks up a method.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&MethodEntry> {
        self.methods.get(name)
    }

    /// Every registered method name, in registration order.
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.methods.keys().copied().collect()
    }

    /// The kind this registry serves.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        self.kind
    }
}

/// Returns whether an argument count satisfies an arity shape.
#[must_use]
pub fn arity_matches(shape: &str, count: usize) -> bool {
    if let Some(min) = shape.strip_suffix('+') {
        return min.parse::<usize>().is_ok_and(|min| count >= min);
    }
    if let Some((low, high)) = shape.split_once('-') {
        let (Ok(low), Ok(high)) = (low.parse::<usize>(), high.parse::<usize>()) else {
            return false;
        };
        return count >= low && count <= high;
    }
    shape.parse::<usize>().is_ok_and(|exact| count == exact)
}

static STRING: Lazy<Registry> = Lazy::new(string::build);
static ARRAY: Lazy<Registry> = Lazy::new(array::build);
static INTEGER: Lazy<Registry> = Lazy::new(number::build_integer);
static FLOAT: Lazy<Registry> = Lazy::new(number::build_float);
static BOOLEAN: Lazy<Registry> = Lazy::new(number::build_boolean);
static NULL: Lazy<Registry> = Lazy::new(number::build_null);
static MONEY: Lazy<Registry> = Lazy::new(money::build);
static DATETIME: Lazy<Registry> = Lazy::new(temporal::build_datetime);
static DURATION: Lazy<Registry> = Lazy::new(temporal::build_duration);
static DICT: Lazy<Registry> = Lazy::new(dict::build);
static SCHEMA: Lazy<Registry> = Lazy::new(record::build_schema);
static RECORD: Lazy<Registry> = Lazy::new(record::build_record);
static TABLE: Lazy<Registry> = Lazy::new(record::build_table);
static BINDING: Lazy<Registry> = Lazy::new(binding::build);
static FUNCTION: Lazy<Registry> = Lazy::new(|| Registry::new("function"));

static SPECIALS: Lazy<RwLock<HashMap<String, &'static Registry>>> =
    Lazy::new(|| RwLock::new(HashMap::new()));

/// Registers a special-dictionary registry under a `__type` tag.
/// Collaborator modules (path, url, request, ...) hook in here at
/// start-up; registries must be leaked statics.
pub fn register_special(tag: impl Into<String>, registry: &'static Registry) {
    if let Ok(mut specials) = SPECIALS.write() {
        specials.insert(tag.into(), registry);
    }
}

/// Returns the registry serving a value kind.
#[must_use]
pub fn registry_for(value: &Value) -> &'static Registry {
    match value {
        Value::Str(_) => &STRING,
        Value::Array(_) => &ARRAY,
        Value::Int(_) => &INTEGER,
        Value::Float(_) => &FLOAT,
        Value::Bool(_) => &BOOLEAN,
        Value::Null => &NULL,
        Value::Money(_) => &MONEY,
        Value::Datetime(_) => &DATETIME,
        Value::Duration(_) => &DURATION,
        Value::Dict(_) => &DICT,
        Value::Schema(_) => &SCHEMA,
        Value::Record(_) => &RECORD,
        Value::Table(_) => &TABLE,
        Value::Binding(_) => &BINDING,
        Value::Function(_) => &FUNCTION,
    }
}

/// Lists the method names a value answers to, for introspection.
#[must_use]
pub fn known_methods(value: &Value) -> Vec<&'static str> {
    registry_for(value).names()
}

/// Recognises a legacy tagged dictionary and lifts it to its variant:
/// `{amount, currency}` to money, `{seconds|minutes|hours}` to duration.
fn lift_special_dict(dict: &Dict) -> Option<Value> {
    match dict.type_tag() {
        Some("money") => lift_money(dict),
        Some("duration") => lift_duration(dict),
        Some(_) => None,
        None => {
            if dict.has_all(&["amount", "currency"]) {
                lift_money(dict)
            } else if dict.has_any(&["seconds", "minutes", "hours"]) {
                lift_duration(dict)
            } else {
                None
            }
        }
    }
}

fn lift_money(dict: &Dict) -> Option<Value> {
    let amount = dict.get("amount").and_then(Value::as_int)?;
    let currency = dict.get("currency").and_then(Value::as_str)?;
    let scale = dict
        .get("scale")
        .and_then(Value::as_int)
        .map_or(2, |n| n.clamp(0, 9) as u32);
    Some(Value::Money(Money::new(amount, currency, scale)))
}

fn lift_duration(dict: &Dict) -> Option<Value> {
    let part = |key: &str| dict.get(key).and_then(Value::as_int).unwrap_or(0);
    let secs = part("seconds") + part("minutes") * 60 + part("hours") * 3600;
    Some(Value::Duration(Duration::from_secs(secs)))
}

/// Dispatches a method call on a receiver.
pub fn call_method(
    ev: &mut Evaluator,
    receiver: &Value,
    method: &str,
    args: &[Value],
    env: &Env,
    pos: Position,
) -> Result<Value> {
    // Universal introspection.
    if method == "type" && args.is_empty() {
        return Ok(Value::Str(receiver.type_name().to_string()));
    }

    // Special dictionaries dispatch before generic dictionary methods.
    if let Value::Dict(dict) = receiver {
        if let Some(tag) = dict.type_tag() {
            let special = SPECIALS.read().ok().and_then(|s| s.get(tag).copied());
            if let Some(registry) = special {
                if let Some(entry) = registry.get(method) {
                    return invoke(ev, registry, entry, method, receiver, args, env, pos);
                }
            }
        }
        if let Some(lifted) = lift_special_dict(dict) {
            let registry = registry_for(&lifted);
            if let Some(entry) = registry.get(method) {
                return invoke(ev, registry, entry, method, &lifted, args, env, pos);
            }
        }
    }

    let registry = registry_for(receiver);
    if let Some(entry) = registry.get(method) {
        return invoke(ev, registry, entry, method, receiver, args, env, pos);
    }

    // A dictionary member holding a function is callable with `this`
    // bound to the receiver.
    if let Value::Dict(dict) = receiver {
        if let Some(Value::Function(func)) = dict.get(method) {
            let func = func.clone();
            return ev.apply_function(&func, args.to_vec(), Some(receiver.clone()));
        }
    }

    Err(unknown_method(registry, receiver, method).at(pos))
}

#[allow(clippy::too_many_arguments)]
fn invoke(
    ev: &mut Evaluator,
    _registry: &Registry,
    entry: &MethodEntry,
    method: &str,
    receiver: &Value,
    args: &[Value],
    env: &Env,
    pos: Position,
) -> Result<Value> {
    if !arity_matches(entry.arity, args.len()) {
        return Err(RuntimeError::arity(method, entry.arity, args.len()).at(pos));
    }
    (entry.func)(ev, receiver, args, env).map_err(|err| err.at(pos))
}

fn unknown_method(registry: &Registry, receiver: &Value, method: &str) -> RuntimeError {
    let names = registry.names();
    let mut err = RuntimeError::undefined_method(receiver.type_name(), method)
        .with_hint(format!("known methods: {}", names.join(", ")));
    if let Some(suggestion) = closest_name(method, &names) {
        err = err.with_hint(format!("did you mean {suggestion:?}?"));
    }
    err
}

/// Picks the closest known name, when it is close enough to be helpful.
#[must_use]
pub fn closest_name<'a>(wanted: &str, names: &[&'a str]) -> Option<&'a str> {
    names
        .iter()
        .map(|name| (strsim::jaro_winkler(wanted, name), *name))
        .filter(|(score, _)| *score > 0.84)
        .max_by(|(a, _), (b, _)| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(_, name)| name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arity_shapes() {
        assert!(arity_matches("0", 0));
        assert!(!arity_matches("0", 1));
        assert!(arity_matches("1", 1));
        assert!(arity_matches("0-1", 0));
        assert!(arity_matches("0-1", 1));
        assert!(!arity_matches("0-1", 2));
        assert!(arity_matches("1-2", 2));
        assert!(arity_matches("1+", 1));
        assert!(arity_matches("1+", 5));
        assert!(!arity_matches("1+", 0));
        assert!(arity_matches("3", 3));
    }

    #[test]
    fn test_closest_name() {
        let names = ["toUpper", "toLower", "split"];
        assert_eq!(closest_name("toUper", &names), Some("toUpper"));
        assert_eq!(closest_name("frobnicate", &names), None);
    }

    #[test]
    fn test_lift_money_dict() {
        let dict = Dict::from_pairs([
            ("amount".to_string(), Value::Int(1200)),
            ("currency".to_string(), Value::Str("EUR".to_string())),
        ]);
        let lifted = lift_special_dict(&dict).unwrap();
        assert_eq!(lifted, Value::Money(Money::new(1200, "EUR", 2)));
    }

    #[test]
    fn test_lift_duration_dict() {
        let dict = Dict::from_pairs([
            ("minutes".to_string(), Value::Int(2)),
            ("seconds".to_string(), Value::Int(5)),
        ]);
        let lifted = lift_special_dict(&dict).unwrap();
        assert_eq!(lifted, Value::Duration(Duration::from_secs(125)));
    }

    #[test]
    fn test_plain_dict_not_lifted() {
        let dict = Dict::from_pairs([("a".to_string(), Value::Int(1))]);
        assert_eq!(lift_special_dict(&dict), None);
    }
}
