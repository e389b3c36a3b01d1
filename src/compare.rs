//! Ordering for `<`, `<=`, `>` and `>=` across mixed value types.
//!
//! * Same type: numbers by magnitude, strings lexicographically,
//!   `false < true`, `nil` equal to `nil`.
//! * Different types: both sides are coerced to numbers (`true` → 1,
//!   `false` → 0, numeric‑looking strings parsed after trimming).
//! * When either side cannot be coerced the operands are *incomparable* and
//!   every ordering operator yields `false`.  This is a soft failure and never
//!   a runtime error, unlike `-`, `*` and `/`, which reject non‑numbers.

use std::cmp::Ordering;

use log::debug;

use crate::value::Value;

/// Best‑effort numeric view of a value.
fn coerce_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => Some(*n),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                None
            } else {
                trimmed.parse::<f64>().ok()
            }
        }
        _ => None,
    }
}

/// `None` means the operands are incomparable.
pub fn compare(left: &Value, right: &Value) -> Option<Ordering> {
    let ordering = match (left, right) {
        (Value::Nil, Value::Nil) => Some(Ordering::Equal),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        (Value::Number(a), Value::Number(b)) => a.partial_cmp(b),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ => match (coerce_number(left), coerce_number(right)) {
            (Some(a), Some(b)) => a.partial_cmp(&b),
            _ => None,
        },
    };

    debug!(
        "Comparing {}({}) with {}({}) => {:?}",
        left.type_name(),
        left,
        right.type_name(),
        right,
        ordering
    );

    ordering
}

pub fn less(left: &Value, right: &Value) -> bool {
    matches!(compare(left, right), Some(Ordering::Less))
}

pub fn less_equal(left: &Value, right: &Value) -> bool {
    matches!(compare(left, right), Some(Ordering::Less | Ordering::Equal))
}

pub fn greater(left: &Value, right: &Value) -> bool {
    matches!(compare(left, right), Some(Ordering::Greater))
}

pub fn greater_equal(left: &Value, right: &Value) -> bool {
    matches!(compare(left, right), Some(Ordering::Greater | Ordering::Equal))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(text: &str) -> Value {
        Value::String(text.to_string())
    }

    #[test]
    fn same_type_compares_natively() {
        assert!(less(&Value::Number(1.0), &Value::Number(2.0)));
        assert!(less(&s("abc"), &s("abd")));
        assert!(less(&Value::Bool(false), &Value::Bool(true)));
        assert!(less_equal(&Value::Nil, &Value::Nil));
        assert!(!less(&Value::Nil, &Value::Nil));
        // "10" < "9" lexicographically, even though both look numeric.
        assert!(less(&s("10"), &s("9")));
    }

    #[test]
    fn numeric_looking_strings_are_coerced() {
        assert!(less(&s("3"), &Value::Number(4.0)));
        assert!(greater(&Value::Number(10.0), &s(" 9.5 ")));
        assert!(greater_equal(&Value::Bool(true), &Value::Number(1.0)));
    }

    #[test]
    fn incomparable_operands_are_always_false() {
        let left = s("abc");
        let right = Value::Number(4.0);
        assert!(!less(&left, &right));
        assert!(!less_equal(&left, &right));
        assert!(!greater(&left, &right));
        assert!(!greater_equal(&left, &right));
        assert!(!less(&Value::Nil, &Value::Number(0.0)));
        assert!(!less(&s(""), &Value::Number(1.0)));
    }

    #[test]
    fn nan_is_unordered() {
        assert!(!less(&Value::Number(f64::NAN), &Value::Number(1.0)));
        assert!(!greater_equal(&Value::Number(f64::NAN), &Value::Number(f64::NAN)));
    }
}
