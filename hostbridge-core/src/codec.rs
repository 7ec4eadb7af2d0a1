//! Canonical text encoding for [`Value`].
//!
//! JSON, with sorted object keys and integral numbers below 2^53 written
//! without a fraction. Non-finite numbers have no encoding and are rejected
//! with the path of the offending value.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Number;

use crate::error::BridgeError;
use crate::ser;
use crate::value::Value;

/// Largest magnitude at which every integer is exactly representable in an f64.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_992.0;

/// Encode a value to its canonical text form.
pub fn encode(value: &Value) -> Result<String, BridgeError> {
    let json = to_json(value)?;
    serde_json::to_string(&json).map_err(|e| BridgeError::Encoding {
        path: "$".into(),
        reason: e.to_string(),
    })
}

/// Decode canonical text back into a value.
pub fn decode(text: &str) -> Result<Value, serde_json::Error> {
    let json: serde_json::Value = serde_json::from_str(text)?;
    from_json(json)
}

/// Convert to a `serde_json::Value`, rejecting non-finite numbers.
pub fn to_json(value: &Value) -> Result<serde_json::Value, BridgeError> {
    let mut path = String::from("$");
    to_json_at(value, &mut path)
}

fn to_json_at(value: &Value, path: &mut String) -> Result<serde_json::Value, BridgeError> {
    Ok(match value {
        Value::Null => serde_json::Value::Null,
        Value::Bool(b) => serde_json::Value::Bool(*b),
        Value::Number(n) => serde_json::Value::Number(number(*n).ok_or_else(|| {
            BridgeError::Encoding {
                path: path.clone(),
                reason: format!("{n} is not a finite number"),
            }
        })?),
        Value::String(s) => serde_json::Value::String(s.clone()),
        Value::Array(items) => {
            let mut out = Vec::with_capacity(items.len());
            for (i, item) in items.iter().enumerate() {
                let len = path.len();
                path.push_str(&format!("[{i}]"));
                out.push(to_json_at(item, path)?);
                path.truncate(len);
            }
            serde_json::Value::Array(out)
        }
        Value::Object(map) => {
            let mut out = serde_json::Map::new();
            for (key, item) in map {
                let len = path.len();
                push_path_key(path, key);
                out.insert(key.clone(), to_json_at(item, path)?);
                path.truncate(len);
            }
            serde_json::Value::Object(out)
        }
    })
}

fn number(n: f64) -> Option<Number> {
    if !n.is_finite() {
        return None;
    }
    if n.fract() == 0.0 && n.abs() < MAX_SAFE_INTEGER {
        return Some(Number::from(n as i64));
    }
    Number::from_f64(n)
}

/// Append an object key to a `$`-rooted JSON path, quoting keys that are
/// not plain identifiers.
pub fn push_path_key(path: &mut String, key: &str) {
    let plain = !key.is_empty() && key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if plain {
        path.push('.');
        path.push_str(key);
    } else {
        path.push_str(&format!("[{key:?}]"));
    }
}

/// Convert from a `serde_json::Value`.
///
/// Fails only for numbers that have no `f64` form, which serde_json can
/// produce when built with arbitrary precision.
pub fn from_json(json: serde_json::Value) -> Result<Value, serde_json::Error> {
    Ok(match json {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(b),
        serde_json::Value::Number(n) => match n.as_f64() {
            Some(f) => Value::Number(f),
            None => {
                return Err(<serde_json::Error as serde::de::Error>::custom(format!(
                    "number {n} cannot be represented"
                )))
            }
        },
        serde_json::Value::String(s) => Value::String(s),
        serde_json::Value::Array(items) => Value::Array(items.into_iter().map(from_json).collect::<Result<_, _>>()?),
        serde_json::Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| from_json(v).map(|v| (k, v)))
                .collect::<Result<_, _>>()?,
        ),
    })
}

/// Serialize any serde type into a [`Value`].
///
/// Non-finite floats are rejected with their path, as in [`encode`].
pub fn to_value<T: Serialize + ?Sized>(data: &T) -> Result<Value, BridgeError> {
    ser::to_value(data).map_err(|e| BridgeError::Encoding {
        path: e.path.unwrap_or_else(|| "$".into()),
        reason: e.reason,
    })
}

/// Deserialize a [`Value`] into any serde type.
pub fn from_value<T: DeserializeOwned>(value: &Value) -> Result<T, serde_json::Error> {
    let json = to_json(value)
        .map_err(|e| <serde_json::Error as serde::de::Error>::custom(e.to_string()))?;
    serde_json::from_value(json)
}
