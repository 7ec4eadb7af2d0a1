//! Conversion between JS values and [`Value`].
//!
//! Follows what `JSON.stringify` accepts: `undefined` becomes `null` in
//! arrays and drops out of objects, dates become ISO strings. Unlike
//! `JSON.stringify`, functions, symbols and bigints are errors rather than
//! silently skipped, and a cycle is reported with the path where it closes.

use hostbridge_core::codec::push_path_key;
use hostbridge_core::{BridgeError, Value};
use js_sys::{Array, Object};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;

/// Payload of a structured call. An omitted argument (`undefined`) means an
/// empty object; an explicit `null` stays `null`.
pub fn payload_or_default(js: &JsValue) -> Result<Value, BridgeError> {
    if js.is_undefined() {
        return Ok(Value::empty_object());
    }
    to_value(js)
}

pub fn to_value(js: &JsValue) -> Result<Value, BridgeError> {
    let mut path = String::from("$");
    let mut ancestors = Vec::new();
    convert(js, &mut path, &mut ancestors)
}

fn unsupported(path: &str, reason: impl Into<String>) -> BridgeError {
    BridgeError::Encoding {
        path: path.to_owned(),
        reason: reason.into(),
    }
}

fn convert(js: &JsValue, path: &mut String, ancestors: &mut Vec<JsValue>) -> Result<Value, BridgeError> {
    if js.is_undefined() || js.is_null() {
        return Ok(Value::Null);
    }
    if let Some(b) = js.as_bool() {
        return Ok(Value::Bool(b));
    }
    if let Some(n) = js.as_f64() {
        if !n.is_finite() {
            return Err(unsupported(path, format!("{n} is not a finite number")));
        }
        return Ok(Value::Number(n));
    }
    if let Some(s) = js.as_string() {
        return Ok(Value::String(s));
    }
    if js.is_function() {
        return Err(unsupported(path, "functions cannot be encoded"));
    }
    if js.is_symbol() {
        return Err(unsupported(path, "symbols cannot be encoded"));
    }
    if js.is_bigint() {
        return Err(unsupported(path, "bigints cannot be encoded"));
    }
    if let Some(date) = js.dyn_ref::<js_sys::Date>() {
        return Ok(Value::String(String::from(date.to_iso_string())));
    }
    if !js.is_object() {
        let kind = js.js_typeof().as_string().unwrap_or_default();
        return Err(unsupported(path, format!("unsupported value of type {kind}")));
    }

    if ancestors.iter().any(|ancestor| Object::is(ancestor, js)) {
        return Err(unsupported(path, "cyclic structure"));
    }
    ancestors.push(js.clone());
    let converted = if Array::is_array(js) {
        convert_array(js.unchecked_ref::<Array>(), path, ancestors)
    } else {
        convert_object(js.unchecked_ref::<Object>(), path, ancestors)
    };
    ancestors.pop();
    converted
}

fn convert_array(array: &Array, path: &mut String, ancestors: &mut Vec<JsValue>) -> Result<Value, BridgeError> {
    let mut items = Vec::with_capacity(array.length() as usize);
    for (i, item) in array.iter().enumerate() {
        let len = path.len();
        path.push_str(&format!("[{i}]"));
        items.push(convert(&item, path, ancestors)?);
        path.truncate(len);
    }
    Ok(Value::Array(items))
}

fn convert_object(object: &Object, path: &mut String, ancestors: &mut Vec<JsValue>) -> Result<Value, BridgeError> {
    let mut map = std::collections::BTreeMap::new();
    for key in Object::keys(object).iter() {
        let Some(name) = key.as_string() else { continue };
        let item = js_sys::Reflect::get(object, &key)
            .map_err(|_| unsupported(path, format!("property {name:?} could not be read")))?;
        if item.is_undefined() {
            continue;
        }
        let len = path.len();
        push_path_key(path, &name);
        let value = convert(&item, path, ancestors)?;
        path.truncate(len);
        map.insert(name, value);
    }
    Ok(Value::Object(map))
}

pub fn to_js(value: &Value) -> JsValue {
    match value {
        Value::Null => JsValue::NULL,
        Value::Bool(b) => JsValue::from_bool(*b),
        Value::Number(n) => JsValue::from_f64(*n),
        Value::String(s) => JsValue::from_str(s),
        Value::Array(items) => items.iter().map(to_js).collect::<Array>().into(),
        Value::Object(map) => {
            let object = Object::new();
            for (key, item) in map {
                let _ = js_sys::Reflect::set(&object, &JsValue::from_str(key), &to_js(item));
            }
            object.into()
        }
    }
}
