//! Message-link transport with explicit correlation ids.
//!
//! [`ChannelTransport`] turns every call into an [`Envelope::Invoke`] carrying
//! a fresh id and parks the caller in [`PendingCalls`]. [`ResponseRouter`]
//! reads replies in whatever order the host produces them and hands each one
//! to the caller with the matching id.

use std::sync::{Arc, Mutex, MutexGuard};

use futures::channel::mpsc;
use futures::StreamExt;

use crate::envelope::Envelope;
use crate::pending::PendingCalls;
use crate::transport::{Transport, TransportFailure, TransportFuture};

type SharedPending = Arc<Mutex<PendingCalls>>;

fn lock(pending: &SharedPending) -> MutexGuard<'_, PendingCalls> {
    pending.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Host side of an in-process link: invokes arrive on `requests`, answers go to `replies`.
pub struct HostLink {
    pub requests: mpsc::UnboundedReceiver<Envelope>,
    pub replies: mpsc::UnboundedSender<Envelope>,
}

/// Build a connected guest transport, its reply router, and the host end.
///
/// The router must be driven (`router.run()`) for any call to complete.
pub fn in_process() -> (ChannelTransport, ResponseRouter, HostLink) {
    let (request_tx, request_rx) = mpsc::unbounded();
    let (reply_tx, reply_rx) = mpsc::unbounded();
    let (transport, router) = ChannelTransport::connect(request_tx, reply_rx);
    let link = HostLink {
        requests: request_rx,
        replies: reply_tx,
    };
    (transport, router, link)
}

#[derive(Clone)]
pub struct ChannelTransport {
    outbound: mpsc::UnboundedSender<Envelope>,
    pending: SharedPending,
}

impl ChannelTransport {
    pub fn connect(
        outbound: mpsc::UnboundedSender<Envelope>,
        replies: mpsc::UnboundedReceiver<Envelope>,
    ) -> (Self, ResponseRouter) {
        let pending: SharedPending = Arc::new(Mutex::new(PendingCalls::new()));
        let transport = Self {
            outbound,
            pending: pending.clone(),
        };
        let router = ResponseRouter { replies, pending };
        (transport, router)
    }

    /// Number of calls sent and still waiting for an answer.
    pub fn in_flight(&self) -> usize {
        lock(&self.pending).len()
    }
}

impl Transport for ChannelTransport {
    fn call(&self, command: &str, payload: String) -> TransportFuture {
        let (id, rx) = lock(&self.pending).register(command);
        let mut detach = Detach {
            id,
            pending: self.pending.clone(),
            armed: true,
        };

        log::debug!("send '{command}' (id={id})");
        let sent = self.outbound.unbounded_send(Envelope::Invoke {
            id,
            command: command.to_owned(),
            payload,
        });

        Box::pin(async move {
            if sent.is_err() {
                return Err(TransportFailure::Disconnected);
            }
            let outcome = rx.await;
            detach.armed = false;
            outcome.unwrap_or(Err(TransportFailure::Disconnected))
        })
    }
}

/// Removes a call from the registry if its future is dropped before an
/// answer arrives, so the late answer is discarded.
struct Detach {
    id: u32,
    pending: SharedPending,
    armed: bool,
}

impl Drop for Detach {
    fn drop(&mut self) {
        if self.armed && lock(&self.pending).forget(self.id) {
            log::debug!("detached call id {}", self.id);
        }
    }
}

/// Delivers host replies to the callers waiting on them.
pub struct ResponseRouter {
    replies: mpsc::UnboundedReceiver<Envelope>,
    pending: SharedPending,
}

impl ResponseRouter {
    /// Route replies until the host closes its side, then fail whatever is
    /// still waiting with [`TransportFailure::Disconnected`].
    pub async fn run(mut self) {
        while let Some(envelope) = self.replies.next().await {
            self.route(envelope);
        }
        let failed = lock(&self.pending).fail_all(TransportFailure::Disconnected);
        if failed > 0 {
            log::warn!("host link closed with {failed} call(s) unanswered");
        }
    }

    /// Route a single reply. Returns false if it matched no waiting call.
    pub fn route(&self, envelope: Envelope) -> bool {
        let mut pending = lock(&self.pending);
        match envelope {
            Envelope::Resolve { id, payload } => pending.settle(id, Ok(payload)),
            Envelope::Reject { id, message } => pending.settle(id, Err(TransportFailure::Rejected(message))),
            Envelope::Invoke { id, command, .. } => {
                log::warn!("guest ignoring invoke '{command}' (id={id}) from host");
                false
            }
        }
    }

    /// Route a reply received as wire text.
    pub fn route_text(&self, text: &str) -> bool {
        match Envelope::from_text(text) {
            Ok(envelope) => self.route(envelope),
            Err(e) => {
                log::warn!("dropping malformed reply: {e}");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;

    #[test]
    fn test_call_sends_invoke_with_fresh_ids() {
        let (transport, _router, mut link) = in_process();
        let _a = transport.call("add", "{}".into());
        let _b = transport.call("sub", "{}".into());

        let first = link.requests.next().now_or_never().flatten().unwrap();
        let second = link.requests.next().now_or_never().flatten().unwrap();
        assert_eq!(
            first,
            Envelope::Invoke { id: 1, command: "add".into(), payload: "{}".into() }
        );
        assert_eq!(second.id(), 2);
        assert_eq!(transport.in_flight(), 2);
    }

    #[test]
    fn test_route_out_of_order() {
        let (transport, router, _link) = in_process();
        let a = transport.call("add", "{}".into());
        let b = transport.call("sub", "{}".into());

        assert!(router.route(Envelope::Resolve { id: 2, payload: "2".into() }));
        assert!(router.route_text(r#"[1,1,"3"]"#));

        assert_eq!(a.now_or_never(), Some(Ok("3".to_string())));
        assert_eq!(b.now_or_never(), Some(Ok("2".to_string())));
    }

    #[test]
    fn test_reject_maps_to_rejected() {
        let (transport, router, _link) = in_process();
        let call = transport.call("divide", "{}".into());
        router.route(Envelope::Reject { id: 1, message: "Division by zero".into() });
        assert_eq!(
            call.now_or_never(),
            Some(Err(TransportFailure::Rejected("Division by zero".into())))
        );
    }

    #[test]
    fn test_dropped_call_detaches() {
        let (transport, router, _link) = in_process();
        let call = transport.call("slow", "{}".into());
        assert_eq!(transport.in_flight(), 1);
        drop(call);
        assert_eq!(transport.in_flight(), 0);
        assert!(!router.route(Envelope::Resolve { id: 1, payload: "late".into() }));
    }

    #[test]
    fn test_send_after_host_gone() {
        let (transport, _router, link) = in_process();
        drop(link);
        let call = transport.call("echo", "1".into());
        assert_eq!(call.now_or_never(), Some(Err(TransportFailure::Disconnected)));
        assert_eq!(transport.in_flight(), 0);
    }

    #[test]
    fn test_router_end_fails_pending() {
        let (transport, router, link) = in_process();
        let call = transport.call("never", "{}".into());
        drop(link);
        router.run().now_or_never().unwrap();
        assert_eq!(call.now_or_never(), Some(Err(TransportFailure::Disconnected)));
    }

    #[test]
    fn test_malformed_reply_text_ignored() {
        let (_transport, router, _link) = in_process();
        assert!(!router.route_text("garbage"));
        assert!(!router.route(Envelope::Invoke { id: 1, command: "x".into(), payload: String::new() }));
    }
}
