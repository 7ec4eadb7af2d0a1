//! How bridge errors look from JavaScript.
//!
//! Every failure reaches JS as an `Error` whose `name` tells the kinds apart
//! (`TimeoutError`, `TransportError`, ...) and, where a command was
//! involved, a `command` property naming it.

use hostbridge_core::BridgeError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsErrorParts {
    pub name: &'static str,
    pub message: String,
    pub command: Option<String>,
}

impl From<&BridgeError> for JsErrorParts {
    fn from(err: &BridgeError) -> Self {
        Self {
            name: err.kind().label(),
            message: err.to_string(),
            command: err.command().map(str::to_owned),
        }
    }
}

#[cfg(target_arch = "wasm32")]
pub fn to_js_error(err: &BridgeError) -> wasm_bindgen::JsValue {
    use wasm_bindgen::JsValue;

    let parts = JsErrorParts::from(err);
    let error = js_sys::Error::new(&parts.message);
    error.set_name(parts.name);
    if let Some(command) = &parts.command {
        let _ = js_sys::Reflect::set(&error, &JsValue::from_str("command"), &JsValue::from_str(command));
    }
    error.into()
}
