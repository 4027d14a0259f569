//! Field extraction helpers that never fail.
//!
//! Each helper substitutes a type-appropriate default when the raw value is
//! missing or has the wrong shape, logging the anomaly instead of erroring.

use serde_json::{Map, Value};
use tracing::warn;

/// Short name of a JSON value's type, for log and error messages
pub(crate) fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Render any JSON value as display text. Strings are kept verbatim.
pub(crate) fn display_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        other => other.to_string(),
    }
}

/// String field; absent or null yields `default`
pub(crate) fn string_field(obj: &Map<String, Value>, key: &str, default: &str) -> String {
    match obj.get(key) {
        None | Some(Value::Null) => default.to_string(),
        Some(value) => display_string(value),
    }
}

/// Optional string field; absent, null or empty yields `None`
pub(crate) fn optional_string_field(obj: &Map<String, Value>, key: &str) -> Option<String> {
    match obj.get(key) {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) if s.is_empty() => None,
        Some(value) => Some(display_string(value)),
    }
}

/// Numeric field. Accepts numbers, numeric strings and booleans.
pub(crate) fn f64_field(obj: &Map<String, Value>, key: &str, metric: &str) -> f64 {
    let parsed = match obj.get(key) {
        None => return 0.0,
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        Some(Value::Bool(b)) => Some(if *b { 1.0 } else { 0.0 }),
        Some(_) => None,
    };

    match parsed {
        Some(v) if v.is_finite() => v,
        _ => {
            warn!(metric, field = key, "Invalid score value, defaulting to 0.0");
            0.0
        }
    }
}

/// Boolean field. Accepts booleans, "true"/"false" strings and numbers.
pub(crate) fn bool_field(obj: &Map<String, Value>, key: &str, metric: &str) -> bool {
    match obj.get(key) {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) if s.eq_ignore_ascii_case("true") => true,
        Some(Value::String(s)) if s.eq_ignore_ascii_case("false") => false,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|v| v != 0.0),
        Some(other) => {
            warn!(
                metric,
                field = key,
                kind = value_kind(other),
                "Invalid boolean value, defaulting to false"
            );
            false
        }
    }
}

/// List of strings. A present non-list value becomes a single-element list.
pub(crate) fn string_list(value: Option<&Value>) -> Vec<String> {
    match value {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items.iter().map(display_string).collect(),
        Some(Value::String(s)) if s.is_empty() => Vec::new(),
        Some(scalar) => vec![display_string(scalar)],
    }
}

/// Nested object; anything that is not an object is treated as empty.
pub(crate) fn object_field<'a>(
    obj: &'a Map<String, Value>,
    key: &str,
    metric: &str,
) -> Option<&'a Map<String, Value>> {
    match obj.get(key) {
        None | Some(Value::Null) => None,
        Some(Value::Object(inner)) => Some(inner),
        Some(other) => {
            warn!(
                metric,
                field = key,
                kind = value_kind(other),
                "Expected an object, ignoring field"
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn obj(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_f64_field_variants() {
        let o = obj(json!({"a": 0.5, "b": "0.75", "c": "high", "d": true, "e": [1]}));
        assert_eq!(f64_field(&o, "a", "m"), 0.5);
        assert_eq!(f64_field(&o, "b", "m"), 0.75);
        assert_eq!(f64_field(&o, "c", "m"), 0.0);
        assert_eq!(f64_field(&o, "d", "m"), 1.0);
        assert_eq!(f64_field(&o, "e", "m"), 0.0);
        assert_eq!(f64_field(&o, "missing", "m"), 0.0);
    }

    #[test]
    fn test_f64_field_rejects_non_finite_strings() {
        let o = obj(json!({"s": "NaN", "i": "inf"}));
        assert_eq!(f64_field(&o, "s", "m"), 0.0);
        assert_eq!(f64_field(&o, "i", "m"), 0.0);
    }

    #[test]
    fn test_bool_field_variants() {
        let o = obj(json!({"t": true, "s": "TRUE", "f": "false", "n": 1, "z": 0, "x": "yes"}));
        assert!(bool_field(&o, "t", "m"));
        assert!(bool_field(&o, "s", "m"));
        assert!(!bool_field(&o, "f", "m"));
        assert!(bool_field(&o, "n", "m"));
        assert!(!bool_field(&o, "z", "m"));
        assert!(!bool_field(&o, "x", "m"));
        assert!(!bool_field(&o, "missing", "m"));
    }

    #[test]
    fn test_string_list_wraps_scalars() {
        assert_eq!(string_list(Some(&json!("toxic"))), vec!["toxic"]);
        assert_eq!(string_list(Some(&json!(3))), vec!["3"]);
        assert_eq!(string_list(Some(&json!(["a", 2]))), vec!["a", "2"]);
        assert!(string_list(Some(&json!(null))).is_empty());
        assert!(string_list(Some(&json!(""))).is_empty());
        assert!(string_list(None).is_empty());
    }

    #[test]
    fn test_string_field_stringifies_numbers() {
        let o = obj(json!({"n": 0.8, "s": "x", "z": null}));
        assert_eq!(string_field(&o, "n", "N/A"), "0.8");
        assert_eq!(string_field(&o, "s", "N/A"), "x");
        assert_eq!(string_field(&o, "z", "N/A"), "N/A");
        assert_eq!(string_field(&o, "missing", "N/A"), "N/A");
    }
}
