use hostbridge_core::{Bridge, BridgeConfig, BridgeError};
use js_sys::{Function, Promise};
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::future_to_promise;

use crate::convert;
use crate::errors::to_js_error;
use crate::timer::WasmTimer;
use crate::transport::JsTransport;

fn rejected(err: &BridgeError) -> Promise {
    Promise::reject(&to_js_error(err))
}

/// Command bridge exported to JavaScript.
///
/// `timeoutMs` applies to every call; omitted means the default (30 s), 0
/// means calls wait forever.
#[wasm_bindgen]
pub struct WebBridge {
    inner: Bridge<JsTransport>,
}

impl WebBridge {
    fn build(transport: JsTransport, timeout_ms: Option<u32>) -> WebBridge {
        let config = match timeout_ms {
            Some(ms) => BridgeConfig {
                default_timeout_ms: Some(u64::from(ms)),
                ..BridgeConfig::default()
            },
            None => BridgeConfig::default(),
        };
        let inner = Bridge::from_config(transport, &config).with_timer(WasmTimer);
        log::debug!("web bridge ready (timeout {:?})", inner.default_timeout());
        WebBridge { inner }
    }
}

#[wasm_bindgen]
impl WebBridge {
    /// Bridge over `window.core.invoke`.
    #[wasm_bindgen(constructor)]
    pub fn new(timeout_ms: Option<u32>) -> Result<WebBridge, JsValue> {
        Ok(Self::build(JsTransport::from_window()?, timeout_ms))
    }

    /// Bridge over any `(command, payload) => Promise<string>` function.
    #[wasm_bindgen(js_name = withInvoke)]
    pub fn with_invoke(invoke: Function, timeout_ms: Option<u32>) -> WebBridge {
        Self::build(JsTransport::new(invoke), timeout_ms)
    }

    #[wasm_bindgen(getter, js_name = timeoutMs)]
    pub fn timeout_ms(&self) -> Option<f64> {
        self.inner.default_timeout().map(|d| d.as_millis() as f64)
    }

    /// Send a structured payload (`{}` when omitted) and resolve with the
    /// decoded response.
    pub fn invoke(&self, command: &str, payload: JsValue) -> Promise {
        let payload = match convert::payload_or_default(&payload) {
            Ok(value) => value,
            Err(e) => return rejected(&e),
        };
        let call = self.inner.invoke(command, &payload);
        future_to_promise(async move {
            call.await
                .map(|value| convert::to_js(&value))
                .map_err(|e| to_js_error(&e))
        })
    }

    /// Send a structured payload (`{}` when omitted); resolve with
    /// `undefined` once the host has answered, whatever the answer.
    #[wasm_bindgen(js_name = invokeVoid)]
    pub fn invoke_void(&self, command: &str, payload: JsValue) -> Promise {
        let payload = match convert::payload_or_default(&payload) {
            Ok(value) => value,
            Err(e) => return rejected(&e),
        };
        let call = self.inner.invoke_void(command, &payload);
        future_to_promise(async move {
            call.await
                .map(|()| JsValue::UNDEFINED)
                .map_err(|e| to_js_error(&e))
        })
    }

    /// Send raw text (empty when omitted) and resolve with the raw response text.
    #[wasm_bindgen(js_name = invokeText)]
    pub fn invoke_text(&self, command: &str, text: Option<String>) -> Promise {
        let call = self.inner.invoke_text(command, text.as_deref().unwrap_or(""));
        future_to_promise(async move {
            call.await
                .map(|text| JsValue::from_str(&text))
                .map_err(|e| to_js_error(&e))
        })
    }
}
