//! Value representation for string-only tiers, and value comparison.
//!
//! A string-only tier (`window.localStorage`) cannot hold structured values.
//! Writes go through [`encode_text`]: booleans and numbers use their display
//! form, strings are stored raw, arrays and objects as JSON text. Reads go
//! through [`decode_text`], which recovers the type by inspection.

use bridge_traits::ValueEncoding;
use serde_json::{Number, Value};

use crate::error::{Result, SettingsError};

/// Integers up to 2^53 survive a round trip through `f64` exactly.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

/// Build a JSON number, preferring the integer form for whole values.
///
/// `NaN` and infinities have no JSON representation and become `0`.
pub fn number_value(n: f64) -> Value {
    if !n.is_finite() {
        return Value::from(0);
    }
    if n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER {
        return Value::from(n as i64);
    }
    Number::from_f64(n).map(Value::Number).unwrap_or(Value::from(0))
}

/// Numeric reading of a value, if it has one.
pub fn as_number(value: &Value) -> Option<f64> {
    value.as_f64().filter(|n| n.is_finite())
}

fn format_number(n: &Number) -> String {
    if let Some(i) = n.as_i64() {
        i.to_string()
    } else if let Some(u) = n.as_u64() {
        u.to_string()
    } else {
        // f64 Display never prints a trailing ".0"
        n.as_f64().map(|f| f.to_string()).unwrap_or_default()
    }
}

/// Text form of a value for a string-only tier.
pub fn encode_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => format_number(n),
        Value::Null => "null".to_string(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

/// Value as handed to a backend with the given encoding.
pub fn encode_for(encoding: ValueEncoding, value: &Value) -> Value {
    match encoding {
        ValueEncoding::Native => value.clone(),
        ValueEncoding::Text => Value::String(encode_text(value)),
    }
}

/// Recover a typed value from text stored in a string-only tier.
///
/// - `"true"` / `"false"` become booleans
/// - text starting with `[` or `{` is parsed as JSON
/// - numeric-looking text (trimmed, non-empty) becomes a number
/// - anything else stays a string
///
/// JSON-looking text that fails to parse is reported as
/// [`SettingsError::MalformedValue`]; callers fall back to the raw string.
pub fn decode_text(key: &str, raw: &str) -> Result<Value> {
    match raw {
        "true" => return Ok(Value::Bool(true)),
        "false" => return Ok(Value::Bool(false)),
        _ => {}
    }

    let trimmed = raw.trim();
    if trimmed.starts_with('[') || trimmed.starts_with('{') {
        return serde_json::from_str(trimmed).map_err(|e| SettingsError::MalformedValue {
            key: key.to_string(),
            message: e.to_string(),
        });
    }

    if !trimmed.is_empty() {
        if let Ok(n) = trimmed.parse::<f64>() {
            if n.is_finite() {
                return Ok(number_value(n));
            }
        }
    }

    Ok(Value::String(raw.to_string()))
}

/// Structural equality where numbers compare by value (`5 == 5.0`).
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_f64(), y.as_f64()) {
            (Some(x), Some(y)) => x == y,
            _ => x == y,
        },
        (Value::Array(xs), Value::Array(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| values_equal(x, y))
        }
        (Value::Object(xs), Value::Object(ys)) => {
            xs.len() == ys.len()
                && xs
                    .iter()
                    .all(|(k, x)| ys.get(k).is_some_and(|y| values_equal(x, y)))
        }
        _ => a == b,
    }
}

/// Whether a raw stored value already represents `expected`.
///
/// String-only tiers compare the stored text with the encoding of `expected`
/// so that a representation drift (`"5.0"` for `5`) is also rewritten.
pub fn stored_matches(encoding: ValueEncoding, stored: &Value, expected: &Value) -> bool {
    match encoding {
        ValueEncoding::Native => values_equal(stored, expected),
        ValueEncoding::Text => stored.as_str() == Some(encode_text(expected).as_str()),
    }
}
