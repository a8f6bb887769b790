//! Total ordering over the value universe.
//!
//! Cross-kind comparison follows the fixed kind order: null < numeric <
//! string < boolean < datetime < duration < money < array < dictionary <
//! other. Integers and floats compare as real numbers; strings compare
//! naturally, with digit runs compared numerically; money of a single
//! currency compares by amount, across currencies by currency code.

use std::cmp::Ordering;

use crate::value::Value;

fn kind_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Int(_) | Value::Float(_) => 1,
        Value::Str(_) => 2,
        Value::Bool(_) => 3,
        Value::Datetime(_) => 4,
        Value::Duration(_) => 5,
        Value::Money(_) => 6,
        Value::Array(_) => 7,
        Value::Dict(_) => 8,
        Value::Function(_)
        | Value::Schema(_)
        | Value::Record(_)
        | Value::Table(_)
        | Value::Binding(_) => 9,
    }
}

/// Compares two strings naturally: digit runs compare as numbers, so
/// `"file2" < "file10"`.
#[must_use]
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();
    let (mut i, mut j) = (0, 0);

    while i < a_chars.len() && j < b_chars.len() {
        let (ca, cb) = (a_chars[i], b_chars[j]);
        if ca.is_ascii_digit() && cb.is_ascii_digit() {
            let a_run: String = a_chars[i..].iter().take_while(|c| c.is_ascii_digit()).collect();
            let b_run: String = b_chars[j..].iter().take_while(|c| c.is_ascii_digit()).collect();
            let a_digits = a_run.trim_start_matches('0');
            let b_digits = b_run.trim_start_matches('0');
            let numeric = a_digits
                .len()
                .cmp(&b_digits.len())
                .then_with(|| a_digits.cmp(b_digits));
            if numeric != Ordering::Equal {
                return numeric;
            }
            i += a_run.len();
            j += b_run.len();
        } else {
            match ca.cmp(&cb) {
                Ordering::Equal => {
                    i += 1;
                    j += 1;
                }
                other => return other,
            }
        }
    }

    // One side exhausted; fall back to full text so "01" and "1" stay
    // distinguishable.
    (a_chars.len() - i).cmp(&(b_chars.len() - j)).then_with(|| a.cmp(b))
}

/// Compares two values under the total order.
#[must_use]
pub fn compare(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Int(x), Value::Int(y)) => x.cmp(y),
        (Value::Int(x), Value::Float(y)) => cmp_f64(*x as f64, *y),
        (Value::Float(x), Value::Int(y)) => cmp_f64(*x, *y as f64),
        (Value::Float(x), Value::Float(y)) => cmp_f64(*x, *y),
        (Value::Str(x), Value::Str(y)) => natural_cmp(x, y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Datetime(x), Value::Datetime(y)) => x.cmp(y),
        (Value::Duration(x), Value::Duration(y)) => x.cmp(y),
        (Value::Money(x), Value::Money(y)) => {
            if x.currency == y.currency {
                x.cmp_amount(y)
            } else {
                x.currency.cmp(&y.currency)
            }
        }
        (Value::Array(xs), Value::Array(ys)) => {
            for (x, y) in xs.iter().zip(ys.iter()) {
                match compare(x, y) {
                    Ordering::Equal => {}
                    other => return other,
                }
            }
            xs.len().cmp(&ys.len())
        }
        (Value::Dict(_), Value::Dict(_)) => a.to_string().cmp(&b.to_string()),
        _ => kind_rank(a).cmp(&kind_rank(b)).then_with(|| {
            a.type_name()
                .cmp(b.type_name())
                .then_with(|| a.to_string().cmp(&b.to_string()))
        }),
    }
}

fn cmp_f64(x: f64, y: f64) -> Ordering {
    x.partial_cmp(&y).unwrap_or(Ordering::Equal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{Duration, Money};

    #[test]
    fn test_kind_order() {
        let null = Value::Null;
        let int = Value::Int(0);
        let string = Value::Str("a".to_string());
        let boolean = Value::Bool(false);
        let array = Value::Array(vec![]);

        assert_eq!(compare(&null, &int), Ordering::Less);
        assert_eq!(compare(&int, &string), Ordering::Less);
        assert_eq!(compare(&string, &boolean), Ordering::Less);
        assert_eq!(compare(&boolean, &array), Ordering::Less);
    }

    #[test]
    fn test_numeric_compare_as_real() {
        assert_eq!(compare(&Value::Int(2), &Value::Float(2.0)), Ordering::Equal);
        assert_eq!(compare(&Value::Float(1.5), &Value::Int(2)), Ordering::Less);
    }

    #[test]
    fn test_natural_string_order() {
        assert_eq!(natural_cmp("file2", "file10"), Ordering::Less);
        assert_eq!(natural_cmp("file10", "file2"), Ordering::Greater);
        assert_eq!(natural_cmp("a", "b"), Ordering::Less);
        assert_eq!(natural_cmp("x1y", "x1y"), Ordering::Equal);
        assert_ne!(natural_cmp("01", "1"), Ordering::Equal);
    }

    #[test]
    fn test_money_cross_currency_falls_back_to_code() {
        let eur = Value::Money(Money::new(100, "EUR", 2));
        let usd = Value::Money(Money::new(1, "USD", 2));
        assert_eq!(compare(&eur, &usd), Ordering::Less);
    }

    #[test]
    fn test_array_lexicographic() {
        let a = Value::Array(vec![Value::Int(1), Value::Int(2)]);
        let b = Value::Array(vec![Value::Int(1), Value::Int(3)]);
        let c = Value::Array(vec![Value::Int(1)]);
        assert_eq!(compare(&a, &b), Ordering::Less);
        assert_eq!(compare(&c, &a), Ordering::Less);
    }

    #[test]
    fn test_transitive_mixed_kinds() {
        let values = [
            Value::Null,
            Value::Int(5),
            Value::Str("z".to_string()),
            Value::Bool(true),
            Value::Duration(Duration::from_secs(1)),
        ];
        for (i, a) in values.iter().enumerate() {
            assert_eq!(compare(a, a), Ordering::Equal);
            for b in &values[i + 1..] {
                assert_eq!(compare(a, b), Ordering::Less);
                assert_eq!(compare(b, a), Ordering::Greater);
            }
        }
    }
}
