//! Answers invoke envelopes arriving over a [`HostLink`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures::StreamExt;
use hostbridge_core::config::DEFAULT_MAX_IN_FLIGHT;
use hostbridge_core::{BridgeConfig, Envelope, HostLink};
use tokio::sync::Semaphore;

use crate::dispatcher::{unknown_command, Dispatcher, HostResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServeOptions {
    /// Commands allowed to run at once. Further invokes wait for a slot.
    pub max_in_flight: usize,
}

impl Default for ServeOptions {
    fn default() -> Self {
        Self {
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
        }
    }
}

impl From<&BridgeConfig> for ServeOptions {
    fn from(config: &BridgeConfig) -> Self {
        Self {
            max_in_flight: config.max_in_flight,
        }
    }
}

/// Totals for one `serve` run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ServeStats {
    pub resolved: u64,
    pub rejected: u64,
    /// Envelopes that were not invokes.
    pub ignored: u64,
}

#[derive(Default)]
struct Counters {
    resolved: AtomicU64,
    rejected: AtomicU64,
}

impl Counters {
    fn record(&self, outcome: &HostResult) {
        let counter = if outcome.is_ok() { &self.resolved } else { &self.rejected };
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// Serve `link` until the guest closes it and every accepted command has
/// been answered.
///
/// Each command runs on tokio's blocking pool, so a slow handler never
/// holds up the others. Replies go out as soon as each command finishes,
/// in completion order.
pub async fn serve(dispatcher: Arc<Dispatcher>, link: HostLink, options: ServeOptions) -> ServeStats {
    let HostLink { mut requests, replies } = link;
    let slots = options.max_in_flight.clamp(1, Semaphore::MAX_PERMITS).min(u32::MAX as usize);
    let permits = Arc::new(Semaphore::new(slots));
    let counters = Arc::new(Counters::default());
    let mut ignored = 0;

    while let Some(envelope) = requests.next().await {
        let (id, command, payload) = match envelope {
            Envelope::Invoke { id, command, payload } => (id, command, payload),
            other => {
                log::warn!("[host] ignoring non-invoke envelope (id={})", other.id());
                ignored += 1;
                continue;
            }
        };

        let Ok(permit) = permits.clone().acquire_owned().await else {
            break;
        };
        let dispatcher = dispatcher.clone();
        let replies = replies.clone();
        let counters = counters.clone();

        tokio::spawn(async move {
            let _permit = permit;
            log::debug!("[host] invoke '{command}' (id={id})");
            let outcome = run_handler(&dispatcher, command, payload).await;
            counters.record(&outcome);
            if replies.unbounded_send(Envelope::reply(id, outcome)).is_err() {
                log::debug!("[host] guest went away; dropping reply for id {id}");
            }
        });
    }

    // Every permit back means every spawned command has replied.
    if permits.acquire_many(slots as u32).await.is_err() {
        log::error!("[host] semaphore closed while draining");
    }

    ServeStats {
        resolved: counters.resolved.load(Ordering::Relaxed),
        rejected: counters.rejected.load(Ordering::Relaxed),
        ignored,
    }
}

async fn run_handler(dispatcher: &Dispatcher, command: String, payload: String) -> HostResult {
    let Some(handler) = dispatcher.handler(&command) else {
        log::warn!("[host] unknown command '{command}'");
        return Err(unknown_command(&command));
    };
    match tokio::task::spawn_blocking(move || handler(&payload)).await {
        Ok(outcome) => outcome,
        Err(e) if e.is_panic() => {
            log::error!("[host] handler for '{command}' panicked");
            Err(format!("handler for '{command}' panicked"))
        }
        Err(_) => Err(format!("handler for '{command}' was cancelled")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hostbridge_core::in_process;
    use hostbridge_core::{Bridge, Transport, TransportFailure};
    use std::time::Duration;

    fn dispatcher() -> Arc<Dispatcher> {
        let mut d = Dispatcher::new();
        d.register("echo", |p: &str| Ok(p.to_owned()));
        d.register("fail", |_: &str| Err("nope".to_owned()));
        d.register("panic", |_: &str| -> HostResult { panic!("boom") });
        d.register("sleep", |p: &str| {
            let ms: u64 = p.parse().map_err(|_| "bad ms".to_string())?;
            std::thread::sleep(Duration::from_millis(ms));
            Ok(format!("slept {ms}"))
        });
        Arc::new(d)
    }

    #[tokio::test]
    async fn test_serve_resolves_and_rejects() {
        let (transport, router, link) = in_process();
        tokio::spawn(router.run());
        let host = tokio::spawn(serve(dispatcher(), link, ServeOptions::default()));

        assert_eq!(transport.call("echo", "hi".into()).await, Ok("hi".into()));
        assert_eq!(
            transport.call("fail", String::new()).await,
            Err(TransportFailure::Rejected("nope".into()))
        );
        assert_eq!(
            transport.call("missing", String::new()).await,
            Err(TransportFailure::Rejected("Unknown command: missing".into()))
        );

        drop(transport);
        let stats = host.await.unwrap();
        assert_eq!(stats, ServeStats { resolved: 1, rejected: 2, ignored: 0 });
    }

    #[tokio::test]
    async fn test_handler_panic_becomes_rejection() {
        let (transport, router, link) = in_process();
        tokio::spawn(router.run());
        tokio::spawn(serve(dispatcher(), link, ServeOptions::default()));

        let outcome = transport.call("panic", String::new()).await;
        assert_eq!(
            outcome,
            Err(TransportFailure::Rejected("handler for 'panic' panicked".into()))
        );
    }

    #[tokio::test]
    async fn test_slow_command_does_not_block_fast_one() {
        let (transport, router, link) = in_process();
        tokio::spawn(router.run());
        tokio::spawn(serve(dispatcher(), link, ServeOptions::default()));

        let slow = transport.call("sleep", "300".into());
        let fast = transport.call("echo", "quick".into());
        let first = futures::future::select(slow, fast).await;
        match first {
            futures::future::Either::Right((fast, _)) => assert_eq!(fast, Ok("quick".into())),
            futures::future::Either::Left(_) => panic!("slow command finished first"),
        }
    }

    #[tokio::test]
    async fn test_ignores_non_invoke() {
        let (request_tx, request_rx) = futures::channel::mpsc::unbounded();
        let (reply_tx, _reply_rx) = futures::channel::mpsc::unbounded();
        let link = HostLink {
            requests: request_rx,
            replies: reply_tx,
        };
        request_tx
            .unbounded_send(Envelope::Resolve { id: 1, payload: "x".into() })
            .unwrap();
        drop(request_tx);
        let stats = serve(dispatcher(), link, ServeOptions::default()).await;
        assert_eq!(stats.ignored, 1);
    }

    #[tokio::test]
    async fn test_bridge_over_served_link() {
        let (transport, router, link) = in_process();
        tokio::spawn(router.run());
        tokio::spawn(serve(dispatcher(), link, ServeOptions { max_in_flight: 1 }));

        let bridge = Bridge::new(transport);
        let text = bridge.invoke_text("echo", "raw text").await.unwrap();
        assert_eq!(text, "raw text");
    }

    #[test]
    fn test_options_from_config() {
        let config = BridgeConfig {
            max_in_flight: 3,
            ..Default::default()
        };
        assert_eq!(ServeOptions::from(&config).max_in_flight, 3);
    }
}
