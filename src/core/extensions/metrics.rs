//! Numeric helpers for sparse analytics data
//!
//! Every accumulator in the report transforms goes through [`safe_number`]
//! and [`safe_divide`], so missing or malformed values count as zero and no
//! NaN or infinity ever reaches a report.

use serde::Serializer;
use serde_json::{Number, Value};

/// Coerces a JSON value to a finite number
///
/// `null`, objects, unparseable strings and non-finite results yield
/// `fallback`. Booleans count as 1/0, blank strings and empty arrays as 0, and
/// a single-element array as its element.
pub fn safe_number(value: &Value, fallback: f64) -> f64 {
    let coerced = match value {
        Value::Null => return fallback,
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                Some(0.0)
            } else {
                trimmed.parse::<f64>().ok()
            }
        }
        Value::Array(items) => match items.as_slice() {
            [] => Some(0.0),
            [single] => return safe_number(single, fallback),
            _ => None,
        },
        Value::Object(_) => None,
    };

    match coerced {
        Some(n) if n.is_finite() => n,
        _ => fallback,
    }
}

/// Like [`safe_number`] for a value that may be absent
pub fn safe_number_opt(value: Option<&Value>, fallback: f64) -> f64 {
    value.map(|v| safe_number(v, fallback)).unwrap_or(fallback)
}

/// `numerator / denominator`, or `fallback` when the denominator is zero
pub fn safe_divide(numerator: f64, denominator: f64, fallback: f64) -> f64 {
    let n = if numerator.is_finite() { numerator } else { 0.0 };
    let d = if denominator.is_finite() { denominator } else { 0.0 };
    if d == 0.0 {
        return fallback;
    }
    n / d
}

/// Rounds half up (towards positive infinity), as report figures expect
pub fn round_half_up(value: f64) -> f64 {
    (value + 0.5).floor()
}

/// JSON truthiness: `null`, `false`, `0` and `""` are falsy
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// JSON number for a figure; integral values are emitted without a fraction
pub fn number_value(value: f64) -> Value {
    if value.fract() == 0.0 && value.abs() < 9.0e15 {
        Value::Number(Number::from(value as i64))
    } else {
        Number::from_f64(value)
            .map(Value::Number)
            .unwrap_or(Value::Number(Number::from(0)))
    }
}

/// serde adapter for [`number_value`]
pub fn serialize_number<S>(value: &f64, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    if value.fract() == 0.0 && value.abs() < 9.0e15 {
        serializer.serialize_i64(*value as i64)
    } else if value.is_finite() {
        serializer.serialize_f64(*value)
    } else {
        serializer.serialize_i64(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use test_case::test_case;

    #[test_case(json!(null), 0.0 ; "null is zero")]
    #[test_case(json!(42), 42.0 ; "integer passes through")]
    #[test_case(json!(2.5), 2.5 ; "float passes through")]
    #[test_case(json!("17"), 17.0 ; "numeric string parses")]
    #[test_case(json!("  "), 0.0 ; "blank string is zero")]
    #[test_case(json!("abc"), 0.0 ; "garbage string falls back")]
    #[test_case(json!("Infinity"), 0.0 ; "non finite string falls back")]
    #[test_case(json!(true), 1.0 ; "true is one")]
    #[test_case(json!([]), 0.0 ; "empty array is zero")]
    #[test_case(json!(["8"]), 8.0 ; "single element array")]
    #[test_case(json!([1, 2]), 0.0 ; "multi element array falls back")]
    #[test_case(json!({"count": 3}), 0.0 ; "object falls back")]
    fn test_safe_number(input: Value, expected: f64) {
        assert_eq!(safe_number(&input, 0.0), expected);
    }

    #[test]
    fn test_safe_number_custom_fallback() {
        assert_eq!(safe_number(&json!(null), 7.0), 7.0);
        assert_eq!(safe_number(&json!("x"), -1.0), -1.0);
        assert_eq!(safe_number_opt(None, 3.0), 3.0);
    }

    #[test_case(10.0, 4.0, 0.0, 2.5 ; "plain division")]
    #[test_case(5.0, 0.0, 0.0, 0.0 ; "zero denominator default fallback")]
    #[test_case(5.0, 0.0, 1.0, 1.0 ; "zero denominator custom fallback")]
    #[test_case(f64::NAN, 2.0, 0.0, 0.0 ; "nan numerator treated as zero")]
    #[test_case(1.0, f64::INFINITY, 9.0, 9.0 ; "infinite denominator treated as zero")]
    fn test_safe_divide(n: f64, d: f64, fallback: f64, expected: f64) {
        let result = safe_divide(n, d, fallback);
        assert!(result.is_finite());
        assert_eq!(result, expected);
    }

    #[test_case(2.5, 3.0 ; "half rounds up")]
    #[test_case(2.49, 2.0 ; "below half rounds down")]
    #[test_case(-2.5, -2.0 ; "negative half rounds towards positive")]
    #[test_case(0.0, 0.0 ; "zero")]
    fn test_round_half_up(input: f64, expected: f64) {
        assert_eq!(round_half_up(input), expected);
    }

    #[test]
    fn test_number_value() {
        assert_eq!(number_value(100.0), json!(100));
        assert_eq!(number_value(0.8), json!(0.8));
        assert_eq!(serde_json::to_string(&number_value(10.0)).unwrap(), "10");
    }

    #[test]
    fn test_is_truthy() {
        assert!(!is_truthy(&json!(null)));
        assert!(!is_truthy(&json!("")));
        assert!(!is_truthy(&json!(0)));
        assert!(is_truthy(&json!("+15551234")));
        assert!(is_truthy(&json!({})));
    }
}
