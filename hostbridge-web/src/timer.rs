use std::time::Duration;

use futures::future::LocalBoxFuture;
use hostbridge_core::Timer;

/// Browser timer (`setTimeout` underneath) for call deadlines.
#[derive(Debug, Clone, Copy, Default)]
pub struct WasmTimer;

impl Timer for WasmTimer {
    fn sleep(&self, duration: Duration) -> LocalBoxFuture<'static, ()> {
        Box::pin(async move {
            if let Err(e) = wasm_timer::Delay::new(duration).await {
                log::warn!("timer failed, deadline fires early: {e}");
            }
        })
    }
}
