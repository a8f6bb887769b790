//! Collection algorithms over the value universe.
//!
//! Set operations deduplicate by each element's canonical text
//! representation and preserve left-operand order; sorting is stable under
//! the total order of [`crate::ordering`].

use std::collections::HashSet;

use crate::error::{Result, RuntimeError};
use crate::ordering::compare;
use crate::value::Value;

/// Union of two arrays: left elements in order, then right-only elements
/// in order, deduplicated by canonical text.
#[must_use]
pub fn union(left: &[Value], right: &[Value]) -> Vec<Value> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for item in left.iter().chain(right.iter()) {
        if seen.insert(item.to_string()) {
            out.push(item.clone());
        }
    }
    out
}

/// Intersection: left elements also present in right, deduplicated, left
/// order preserved.
#[must_use]
pub fn intersect(left: &[Value], right: &[Value]) -> Vec<Value> {
    let right_keys: HashSet<String> = right.iter().map(Value::to_string).collect();
    let mut seen = HashSet::new();
    left.iter()
        .filter(|item| right_keys.contains(&item.to_string()))
        .filter(|item| seen.insert(item.to_string()))
        .cloned()
        .collect()
}

/// Subtraction: left elements not present in right, deduplicated, left
/// order preserved.
#[must_use]
pub fn subtract(left: &[Value], right: &[Value]) -> Vec<Value> {
    let right_keys: HashSet<String> = right.iter().map(Value::to_string).collect();
    let mut seen = HashSet::new();
    left.iter()
        .filter(|item| !right_keys.contains(&item.to_string()))
        .filter(|item| seen.insert(item.to_string()))
        .cloned()
        .collect()
}

/// Partitions an array into chunks of at most `size` elements.
pub fn chunk(items: &[Value], size: i64) -> Result<Vec<Value>> {
    if size <= 0 {
        return Err(RuntimeError::bad_value(format!(
            "chunk size must be positive, got {size}"
        )));
    }
    Ok(items
        .chunks(size as usize)
        .map(|c| Value::Array(c.to_vec()))
        .collect())
}

/// Repeats the array contents `times` times; non-positive counts yield an
/// empty array.
#[must_use]
pub fn repeat(items: &[Value], times: i64) -> Vec<Value> {
    if times <= 0 {
        return Vec::new();
    }
    let mut out = Vec::with_capacity(items.len() * times as usize);
    for _ in 0..times {
        out.extend_from_slice(items);
    }
    out
}

/// Inclusive integer range, direction-aware: `5..2` yields `[5,4,3,2]`.
#[must_use]
pub fn int_range(start: i64, end: i64) -> Vec<Value> {
    if start <= end {
        (start..=end).map(Value::Int).collect()
    } else {
        (end..=start).rev().map(Value::Int).collect()
    }
}

/// Sorts values in place, stable under the total order.
pub fn sort_values(items: &mut [Value]) {
    items.sort_by(compare);
}

/// Sorts `items` by precomputed keys, stable; `keys` must be parallel to
/// `items`.
#[must_use]
pub fn sort_by_keys(items: Vec<Value>, keys: Vec<Value>) -> Vec<Value> {
    let mut pairs: Vec<(Value, Value)> = keys.into_iter().zip(items).collect();
    pairs.sort_by(|(ka, _), (kb, _)| compare(ka, kb));
    pairs.into_iter().map(|(_, v)| v).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ints(ns: &[i64]) -> Vec<Value> {
        ns.iter().copied().map(Value::Int).collect()
    }

    #[test]
    fn test_union_preserves_left_order() {
        let out = union(&ints(&[3, 1, 3]), &ints(&[2, 1]));
        assert_eq!(out, ints(&[3, 1, 2]));
    }

    #[test]
    fn test_intersect() {
        let out = intersect(&ints(&[1, 2, 3, 2]), &ints(&[2, 3, 9]));
        assert_eq!(out, ints(&[2, 3]));
    }

    #[test]
    fn test_subtract() {
        let out = subtract(&ints(&[1, 2, 3, 1]), &ints(&[2]));
        assert_eq!(out, ints(&[1, 3]));
    }

    #[test]
    fn test_chunk() {
        let out = chunk(&ints(&[1, 2, 3, 4, 5]), 2).unwrap();
        assert_eq!(
            out,
            vec![
                Value::Array(ints(&[1, 2])),
                Value::Array(ints(&[3, 4])),
                Value::Array(ints(&[5])),
            ]
        );
        assert!(chunk(&ints(&[1]), 0).is_err());
    }

    #[test]
    fn test_repeat() {
        assert_eq!(repeat(&ints(&[1, 2]), 2), ints(&[1, 2, 1, 2]));
        assert!(repeat(&ints(&[1]), 0).is_empty());
    }

    #[test]
    fn test_range_directions() {
        assert_eq!(int_range(1, 3), ints(&[1, 2, 3]));
        assert_eq!(int_range(5, 2), ints(&[5, 4, 3, 2]));
        assert_eq!(int_range(4, 4), ints(&[4]));
    }

    #[test]
    fn test_sort_stable() {
        // Int 1 and Float 1.0 compare equal; stability keeps source order.
        let mut items = vec![Value::Float(1.0), Value::Int(1), Value::Int(0)];
        sort_values(&mut items);
        assert_eq!(items, vec![Value::Int(0), Value::Float(1.0), Value::Int(1)]);
    }

    #[test]
    fn test_sort_by_keys_stable() {
        let items = vec![
            Value::Str("bb".to_string()),
            Value::Str("a".to_string()),
            Value::Str("cc".to_string()),
        ];
        let keys = ints(&[2, 1, 2]);
        let out = sort_by_keys(items, keys);
        assert_eq!(
            out,
            vec![
                Value::Str("a".to_string()),
                Value::Str("bb".to_string()),
                Value::Str("cc".to_string()),
            ]
        );
    }
}
