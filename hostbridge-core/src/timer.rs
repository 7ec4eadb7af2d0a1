use std::time::Duration;

use futures::future::LocalBoxFuture;

/// Source of deadlines for per-call timeouts.
///
/// Injected so the bridge stays runtime-agnostic: tokio on native, a
/// browser timer on wasm32.
pub trait Timer {
    fn sleep(&self, duration: Duration) -> LocalBoxFuture<'static, ()>;
}

/// Deadlines from `tokio::time`.
///
/// Outside a tokio runtime there is no timer to arm; the deadline never
/// fires and a warning is logged, so the bridge can still be driven by
/// another executor.
#[cfg(feature = "tokio")]
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioTimer;

#[cfg(feature = "tokio")]
impl Timer for TokioTimer {
    fn sleep(&self, duration: Duration) -> LocalBoxFuture<'static, ()> {
        match tokio::runtime::Handle::try_current() {
            Ok(_) => Box::pin(tokio::time::sleep(duration)),
            Err(_) => {
                log::warn!("no tokio runtime; deadline of {duration:?} will not be enforced");
                Box::pin(futures::future::pending())
            }
        }
    }
}
