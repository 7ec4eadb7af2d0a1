//! hostbridge WASM binding
//!
//! Runs the guest half of the bridge in the browser. The embedding host
//! provides `window.core.invoke(command, payload) -> Promise<string>`;
//! [`WebBridge`](bridge::WebBridge) wraps it and exposes `invoke`,
//! `invokeVoid` and `invokeText` to JavaScript.

pub mod errors;

#[cfg(target_arch = "wasm32")]
mod bridge;
#[cfg(target_arch = "wasm32")]
mod convert;
#[cfg(target_arch = "wasm32")]
mod timer;
#[cfg(target_arch = "wasm32")]
mod transport;

#[cfg(target_arch = "wasm32")]
pub use bridge::WebBridge;
#[cfg(target_arch = "wasm32")]
pub use transport::JsTransport;

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

/// Entry point, called when the WASM module loads.
#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();
    // A second init (module loaded twice) keeps the first logger.
    if console_log::init_with_level(log::Level::Info).is_err() {
        log::debug!("console logger already installed");
    }
    log::info!("hostbridge web binding initialized");
}
