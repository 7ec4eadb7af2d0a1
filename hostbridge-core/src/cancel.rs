use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use futures::channel::oneshot;
use futures::future::{self, FutureExt, Shared};

/// Signal a caller can trigger to abandon an outstanding call.
///
/// Clones share state: cancelling any clone cancels all of them. Once
/// cancelled a token stays cancelled.
#[derive(Clone)]
pub struct CancelToken {
    inner: Arc<Inner>,
    signal: Shared<oneshot::Receiver<()>>,
}

struct Inner {
    cancelled: AtomicBool,
    trigger: Mutex<Option<oneshot::Sender<()>>>,
}

impl CancelToken {
    pub fn new() -> Self {
        let (tx, rx) = oneshot::channel();
        Self {
            inner: Arc::new(Inner {
                cancelled: AtomicBool::new(false),
                trigger: Mutex::new(Some(tx)),
            }),
            signal: rx.shared(),
        }
    }

    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::SeqCst);
        let trigger = match self.inner.trigger.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(tx) = trigger {
            let _ = tx.send(());
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Completes once the token is cancelled; pending forever otherwise.
    pub async fn cancelled(&self) {
        if self.signal.clone().await.is_err() {
            future::pending::<()>().await;
        }
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CancelToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancelToken")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_uncancelled() {
        let token = CancelToken::new();
        assert!(!token.is_cancelled());
        assert!(token.cancelled().now_or_never().is_none());
    }

    #[test]
    fn test_cancel_is_shared_by_clones() {
        let token = CancelToken::new();
        let other = token.clone();
        other.cancel();
        assert!(token.is_cancelled());
        assert!(token.cancelled().now_or_never().is_some());
    }

    #[test]
    fn test_cancel_twice_is_harmless() {
        let token = CancelToken::new();
        token.cancel();
        token.cancel();
        assert!(token.is_cancelled());
    }
}
