//! Best-effort value coercion for loosely typed device payloads.
//!
//! Devices often send every field as a string, especially over form posts.
//! Nothing here ever fails: a value that cannot be coerced is returned as-is
//! and left for the caller to accept or reject.

use serde_json::{Map, Number, Value};

/// Replace every all-digit string value with the integer it spells.
///
/// Strings that overflow `i64` are kept.
pub fn coerce_digit_strings(payload: &mut Map<String, Value>) {
    for value in payload.values_mut() {
        if let Value::String(s) = value {
            if is_all_digits(s) {
                if let Ok(n) = s.parse::<i64>() {
                    *value = Value::from(n);
                }
            }
        }
    }
}

/// Coerce a measurement to a number.
///
/// Strings containing a decimal point are parsed as floats, anything else as
/// an integer. Numbers pass through untouched.
pub fn coerce_numeric(value: &Value) -> Value {
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            let parsed = if trimmed.contains('.') {
                trimmed
                    .parse::<f64>()
                    .ok()
                    .and_then(Number::from_f64)
                    .map(Value::Number)
            } else {
                trimmed.parse::<i64>().ok().map(Value::from)
            };
            parsed.unwrap_or_else(|| value.clone())
        }
        _ => value.clone(),
    }
}

fn is_all_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}
