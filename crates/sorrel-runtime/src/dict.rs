//! Insertion-ordered dictionaries.
//!
//! The key order of the underlying `IndexMap` is the authoritative
//! iteration order. Keys starting with `__` are internal metadata (for
//! example `__type`) and are filtered from every user-visible view: `keys`,
//! `values`, `entries`, iteration and JSON serialisation.

use indexmap::IndexMap;

use crate::value::Value;

/// Prefix marking internal metadata keys.
pub const INTERNAL_PREFIX: &str = "__";

/// Returns whether a key is internal metadata.
#[must_use]
pub fn is_internal_key(key: &str) -> bool {
    key.starts_with(INTERNAL_PREFIX)
}

/// An insertion-ordered string-keyed dictionary of runtime values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dict {
    entries: IndexMap<String, Value>,
}

impl Dict {
    /// Creates an empty dictionary.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a dictionary from key/value pairs, keeping pair order.
    #[must_use]
    pub fn from_pairs(pairs: impl IntoIterator<Item = (String, Value)>) -> Self {
        Self {
            entries: pairs.into_iter().collect(),
        }
    }

    /// Looks up a key, internal keys included.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    /// Inserts a key/value pair. An existing key keeps its position.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.entries.insert(key.into(), value);
    }

    /// Removes a key, preserving the order of the remaining entries.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.entries.shift_remove(key)
    }

    /// Returns whether the key is present, internal keys included.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Returns the user-visible keys in insertion order.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.visible().map(|(k, _)| k.clone()).collect()
    }

    /// Returns the user-visible values in insertion order.
    #[must_use]
    pub fn values(&self) -> Vec<Value> {
        self.visible().map(|(_, v)| v.clone()).collect()
    }

    /// Iterates the user-visible entries in insertion order.
    pub fn visible(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.entries.iter().filter(|(k, _)| !is_internal_key(k))
    }

    /// Iterates every entry, internal keys included.
    pub fn iter_all(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.entries.iter()
    }

    /// Number of user-visible entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.visible().count()
    }

    /// Returns whether the dictionary has no user-visible entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Reads the `__type` tag, when present and textual.
    #[must_use]
    pub fn type_tag(&self) -> Option<&str> {
        match self.entries.get("__type") {
            Some(Value::Str(tag)) => Some(tag.as_str()),
            _ => None,
        }
    }

    /// Returns whether every given key is present.
    #[must_use]
    pub fn has_all(&self, keys: &[&str]) -> bool {
        keys.iter().all(|k| self.contains_key(k))
    }

    /// Returns whether at least one of the given keys is present.
    #[must_use]
    pub fn has_any(&self, keys: &[&str]) -> bool {
        keys.iter().any(|k| self.contains_key(k))
    }

    /// Keeps only the keys also present in `other` (dictionary
    /// intersection). Internal keys are dropped.
    #[must_use]
    pub fn intersect(&self, other: &Dict) -> Dict {
        Dict::from_pairs(
            self.visible()
                .filter(|(k, _)| other.contains_key(k))
                .map(|(k, v)| (k.clone(), v.clone())),
        )
    }

    /// Removes the keys present in `other` (dictionary subtraction).
    /// Internal keys are dropped.
    #[must_use]
    pub fn subtract(&self, other: &Dict) -> Dict {
        Dict::from_pairs(
            self.visible()
                .filter(|(k, _)| !other.contains_key(k))
                .map(|(k, v)| (k.clone(), v.clone())),
        )
    }

    /// Merges `other` into a copy of `self`; right-hand keys win, and keys
    /// new to `self` append in `other`'s order.
    #[must_use]
    pub fn merge(&self, other: &Dict) -> Dict {
        let mut out = self.clone();
        for (k, v) in other.iter_all() {
            out.insert(k.clone(), v.clone());
        }
        out
    }
}

impl FromIterator<(String, Value)> for Dict {
    fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
        Self::from_pairs(iter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Dict {
        Dict::from_pairs([
            ("a".to_string(), Value::Int(1)),
            ("__type".to_string(), Value::Str("datetime".to_string())),
            ("b".to_string(), Value::Int(2)),
        ])
    }

    #[test]
    fn test_internal_keys_hidden_from_views() {
        let d = sample();
        assert_eq!(d.keys(), vec!["a".to_string(), "b".to_string()]);
        assert_eq!(d.len(), 2);
        assert!(d.contains_key("__type"));
    }

    #[test]
    fn test_insertion_order_preserved() {
        let mut d = Dict::new();
        d.insert("z", Value::Int(1));
        d.insert("a", Value::Int(2));
        d.insert("m", Value::Int(3));
        assert_eq!(d.keys(), vec!["z", "a", "m"]);
    }

    #[test]
    fn test_type_tag() {
        assert_eq!(sample().type_tag(), Some("datetime"));
        assert_eq!(Dict::new().type_tag(), None);
    }

    #[test]
    fn test_intersect_and_subtract() {
        let left = Dict::from_pairs([
            ("a".to_string(), Value::Int(1)),
            ("b".to_string(), Value::Int(2)),
            ("c".to_string(), Value::Int(3)),
        ]);
        let right = Dict::from_pairs([
            ("b".to_string(), Value::Int(9)),
            ("c".to_string(), Value::Int(9)),
        ]);

        assert_eq!(left.intersect(&right).keys(), vec!["b", "c"]);
        assert_eq!(left.subtract(&right).keys(), vec!["a"]);
    }

    #[test]
    fn test_merge_right_wins() {
        let left = Dict::from_pairs([("a".to_string(), Value::Int(1))]);
        let right = Dict::from_pairs([
            ("a".to_string(), Value::Int(9)),
            ("b".to_string(), Value::Int(2)),
        ]);
        let merged = left.merge(&right);
        assert_eq!(merged.get("a"), Some(&Value::Int(9)));
        assert_eq!(merged.keys(), vec!["a", "b"]);
    }
}
