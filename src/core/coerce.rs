//! Lenient readers over untyped JSON payloads.
//!
//! Upstream ticker APIs disagree on field names and on whether numbers are
//! sent as numbers or strings. These helpers give every lookup the same
//! fallback rules so the normalizers stay declarative.

use serde_json::Value;

/// Follows a dotted path (`"price.change.percent"`) through nested objects.
pub fn lookup<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .try_fold(value, |current, segment| current.as_object()?.get(segment))
}

/// A value that is neither absent nor `null`.
pub fn is_present(value: Option<&Value>) -> bool {
    !matches!(value, None | Some(Value::Null))
}

/// Loose truthiness: empty strings, zero, `false` and `null` are falsy.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// First path whose value is present (not absent, not `null`).
pub fn first_present<'a>(value: &'a Value, paths: &[&str]) -> Option<&'a Value> {
    paths
        .iter()
        .map(|p| lookup(value, p))
        .find(|v| is_present(*v))
        .flatten()
}

/// First path whose value is truthy.
pub fn first_truthy<'a>(value: &'a Value, paths: &[&str]) -> Option<&'a Value> {
    paths
        .iter()
        .filter_map(|p| lookup(value, p))
        .find(|v| is_truthy(v))
}

/// Converts a value to a finite number, or `None` when it is not numeric.
///
/// `null` and blank strings count as zero, booleans as 1/0.
pub fn to_finite(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Null => 0.0,
        Value::Bool(b) => f64::from(u8::from(*b)),
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                0.0
            } else {
                trimmed.parse::<f64>().ok()?
            }
        }
        Value::Array(_) | Value::Object(_) => return None,
    };
    n.is_finite().then_some(n)
}

/// Numeric coercion where anything non-numeric, absent included, becomes 0.
pub fn to_number(value: Option<&Value>) -> f64 {
    value.and_then(to_finite).unwrap_or(0.0)
}

/// Renders scalars as text; containers and `null` yield `None`.
pub fn to_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// First truthy path that renders as text. Truthy containers are skipped
/// in favor of later paths.
pub fn first_text(value: &Value, paths: &[&str]) -> Option<String> {
    paths
        .iter()
        .filter_map(|p| lookup(value, p))
        .filter(|v| is_truthy(v))
        .find_map(to_text)
}

/// JSON type name, for logging payloads of an unexpected shape.
pub fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
