use hostbridge_core::{Transport, TransportFailure, TransportFuture};
use js_sys::{Function, Promise};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;

/// Transport over a JS function `(command, payload) -> Promise<string>`.
///
/// The promise itself correlates the answer with its call, so no ids are
/// put on the wire.
#[derive(Clone)]
pub struct JsTransport {
    invoke: Function,
    this: JsValue,
}

impl JsTransport {
    pub fn new(invoke: Function) -> Self {
        Self {
            invoke,
            this: JsValue::UNDEFINED,
        }
    }

    /// Use the host-provided `window.core.invoke`.
    pub fn from_window() -> Result<Self, JsValue> {
        let window = web_sys::window().ok_or("No window")?;
        let core = js_sys::Reflect::get(&window, &JsValue::from_str("core"))?;
        if core.is_undefined() || core.is_null() {
            return Err(JsValue::from_str("window.core is not defined; is the host bridge installed?"));
        }
        let invoke = js_sys::Reflect::get(&core, &JsValue::from_str("invoke"))?
            .dyn_into::<Function>()
            .map_err(|_| JsValue::from_str("window.core.invoke is not a function"))?;
        Ok(Self { invoke, this: core })
    }
}

impl Transport for JsTransport {
    fn call(&self, command: &str, payload: String) -> TransportFuture {
        // Called now, so host calls happen in issue order.
        let returned = self
            .invoke
            .call2(&self.this, &JsValue::from_str(command), &JsValue::from_str(&payload));

        Box::pin(async move {
            let returned = returned.map_err(|thrown| TransportFailure::Rejected(reason_text(&thrown)))?;
            let settled = JsFuture::from(Promise::resolve(&returned))
                .await
                .map_err(|reason| TransportFailure::Rejected(reason_text(&reason)))?;
            settled.as_string().ok_or_else(|| {
                TransportFailure::Rejected(format!(
                    "host answered with a {} instead of a string",
                    settled.js_typeof().as_string().unwrap_or_default()
                ))
            })
        })
    }
}

/// Text of a thrown value or rejection reason.
fn reason_text(reason: &JsValue) -> String {
    if let Some(text) = reason.as_string() {
        return text;
    }
    if let Some(error) = reason.dyn_ref::<js_sys::Error>() {
        return String::from(error.message());
    }
    js_sys::JSON::stringify(reason)
        .ok()
        .and_then(|s| s.as_string())
        .unwrap_or_else(|| format!("{reason:?}"))
}
