//! Guest-side command bridge.
//!
//! Three invocation modes share one transport:
//!
//! - [`Bridge::invoke`] encodes a [`Value`], calls the host and decodes the answer.
//! - [`Bridge::invoke_void`] encodes and calls, but never looks at the answer.
//! - [`Bridge::invoke_text`] passes raw text both ways.
//!
//! Calls are dispatched eagerly: the transport is called (in issue order)
//! when the method is called, and the returned future only waits for the
//! outcome. Each returned future is independent of the others and of the
//! bridge itself.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::future::{self, FutureExt, LocalBoxFuture};
use futures::{pin_mut, select_biased};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::cancel::CancelToken;
use crate::codec;
use crate::config::BridgeConfig;
use crate::error::BridgeError;
use crate::timer::Timer;
use crate::transport::Transport;
use crate::value::Value;

/// How long a single call may wait for its answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeoutPolicy {
    /// Use the bridge's default timeout.
    #[default]
    Default,
    After(Duration),
    /// Wait forever. An unanswered call never resolves.
    Never,
}

/// Per-call options.
#[derive(Debug, Clone, Default)]
pub struct CallOptions {
    pub timeout: TimeoutPolicy,
    pub cancel: Option<CancelToken>,
}

impl CallOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn timeout(mut self, after: Duration) -> Self {
        self.timeout = TimeoutPolicy::After(after);
        self
    }

    pub fn no_timeout(mut self) -> Self {
        self.timeout = TimeoutPolicy::Never;
        self
    }

    pub fn cancel_with(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }
}

pub struct Bridge<T> {
    transport: T,
    timer: Option<Arc<dyn Timer>>,
    default_timeout: Option<Duration>,
}

impl<T: Transport> Bridge<T> {
    /// Bridge over `transport` with the default configuration.
    ///
    /// With the `tokio` feature a tokio timer is installed; otherwise no
    /// timeouts fire until [`Bridge::with_timer`] is called.
    pub fn new(transport: T) -> Self {
        Self::from_config(transport, &BridgeConfig::default())
    }

    pub fn from_config(transport: T, config: &BridgeConfig) -> Self {
        Self {
            transport,
            timer: default_timer(),
            default_timeout: config.default_timeout(),
        }
    }

    pub fn with_timer(mut self, timer: impl Timer + 'static) -> Self {
        self.timer = Some(Arc::new(timer));
        self
    }

    /// Set the timeout used by calls whose policy is [`TimeoutPolicy::Default`].
    pub fn with_default_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.default_timeout = timeout;
        self
    }

    pub fn default_timeout(&self) -> Option<Duration> {
        self.default_timeout
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    // ── structured ──

    pub fn invoke(&self, command: &str, payload: &Value) -> impl Future<Output = Result<Value, BridgeError>> {
        self.invoke_with(command, payload, &CallOptions::default())
    }

    pub fn invoke_with(
        &self,
        command: &str,
        payload: &Value,
        options: &CallOptions,
    ) -> impl Future<Output = Result<Value, BridgeError>> {
        self.structured_call(command, payload, true, options)
            .map(|result| result.map(Option::unwrap_or_default))
    }

    /// Structured invoke through serde types.
    pub fn invoke_as<Req, Resp>(
        &self,
        command: &str,
        request: &Req,
    ) -> impl Future<Output = Result<Resp, BridgeError>>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned,
    {
        let call = match codec::to_value(request) {
            Ok(payload) => self.structured_call(command, &payload, true, &CallOptions::default()),
            Err(e) => future::ready(Err(e)).boxed_local(),
        };
        let command = command.to_owned();
        async move {
            let value = call.await?.unwrap_or_default();
            codec::from_value(&value).map_err(|e| BridgeError::Decoding {
                command,
                reason: e.to_string(),
            })
        }
    }

    // ── void ──

    pub fn invoke_void(&self, command: &str, payload: &Value) -> impl Future<Output = Result<(), BridgeError>> {
        self.invoke_void_with(command, payload, &CallOptions::default())
    }

    pub fn invoke_void_with(
        &self,
        command: &str,
        payload: &Value,
        options: &CallOptions,
    ) -> impl Future<Output = Result<(), BridgeError>> {
        self.structured_call(command, payload, false, options)
            .map(|result| result.map(|_| ()))
    }

    // ── text ──

    pub fn invoke_text(&self, command: &str, text: &str) -> impl Future<Output = Result<String, BridgeError>> {
        self.invoke_text_with(command, text, &CallOptions::default())
    }

    pub fn invoke_text_with(
        &self,
        command: &str,
        text: &str,
        options: &CallOptions,
    ) -> impl Future<Output = Result<String, BridgeError>> {
        self.dispatch(command, text.to_owned(), options)
    }

    /// Shared path of `invoke` and `invoke_void`. Encodes before anything
    /// else so a bad payload never reaches the host; decodes only when
    /// `await_result` is set.
    fn structured_call(
        &self,
        command: &str,
        payload: &Value,
        await_result: bool,
        options: &CallOptions,
    ) -> LocalBoxFuture<'static, Result<Option<Value>, BridgeError>> {
        let encoded = match codec::encode(payload) {
            Ok(text) => text,
            Err(e) => return future::ready(Err(e)).boxed_local(),
        };
        let response = self.dispatch(command, encoded, options);
        let command = command.to_owned();

        async move {
            let text = response.await?;
            if !await_result {
                return Ok(None);
            }
            codec::decode(&text).map(Some).map_err(|e| BridgeError::Decoding {
                command,
                reason: e.to_string(),
            })
        }
        .boxed_local()
    }

    /// Hand one call to the transport and wait for the first of: the
    /// answer, cancellation, the deadline.
    fn dispatch(
        &self,
        command: &str,
        payload: String,
        options: &CallOptions,
    ) -> LocalBoxFuture<'static, Result<String, BridgeError>> {
        if command.is_empty() {
            return future::ready(Err(BridgeError::EmptyCommand)).boxed_local();
        }
        let cancel = options.cancel.clone();
        if cancel.as_ref().is_some_and(CancelToken::is_cancelled) {
            return future::ready(Err(BridgeError::Cancelled {
                command: command.to_owned(),
            }))
            .boxed_local();
        }

        let timeout = match options.timeout {
            TimeoutPolicy::Default => self.default_timeout,
            TimeoutPolicy::After(after) => Some(after),
            TimeoutPolicy::Never => None,
        };
        let deadline = match (timeout, &self.timer) {
            (Some(after), Some(timer)) => Some((after, timer.sleep(after))),
            (Some(_), None) => {
                log::warn!("no timer installed; '{command}' will wait without a deadline");
                None
            }
            (None, _) => None,
        };

        log::debug!("invoke '{command}' ({} bytes)", payload.len());
        let response = self.transport.call(command, payload);
        let command = command.to_owned();

        async move {
            let after = deadline.as_ref().map_or(Duration::ZERO, |(after, _)| *after);
            let response = response.fuse();
            let cancelled = async {
                match &cancel {
                    Some(token) => token.cancelled().await,
                    None => future::pending::<()>().await,
                }
            }
            .fuse();
            let expired = async {
                match deadline {
                    Some((_, sleep)) => sleep.await,
                    None => future::pending::<()>().await,
                }
            }
            .fuse();
            pin_mut!(response, cancelled, expired);

            select_biased! {
                outcome = response => {
                    outcome.map_err(|failure| BridgeError::transport(&command, failure))
                }
                () = cancelled => {
                    log::debug!("'{command}' cancelled while waiting");
                    Err(BridgeError::Cancelled { command })
                }
                () = expired => {
                    log::warn!("'{command}' timed out after {after:?}");
                    Err(BridgeError::Timeout { command, after })
                }
            }
        }
        .boxed_local()
    }
}

#[cfg(feature = "tokio")]
fn default_timer() -> Option<Arc<dyn Timer>> {
    Some(Arc::new(crate::timer::TokioTimer))
}

#[cfg(not(feature = "tokio"))]
fn default_timer() -> Option<Arc<dyn Timer>> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::in_process;
    use crate::envelope::Envelope;
    use crate::transport::{TransportFailure, TransportFuture};
    use futures::StreamExt;
    use std::cell::RefCell;
    use std::collections::HashMap;

    /// Replays canned answers and records every call it receives.
    #[derive(Default)]
    struct Scripted {
        answers: HashMap<String, Result<String, TransportFailure>>,
        calls: RefCell<Vec<(String, String)>>,
    }

    impl Scripted {
        fn answer(mut self, command: &str, outcome: Result<&str, &str>) -> Self {
            let outcome = outcome
                .map(str::to_owned)
                .map_err(|m| TransportFailure::Rejected(m.to_owned()));
            self.answers.insert(command.to_owned(), outcome);
            self
        }

        fn calls(&self) -> Vec<(String, String)> {
            self.calls.borrow().clone()
        }
    }

    impl Transport for Scripted {
        fn call(&self, command: &str, payload: String) -> TransportFuture {
            self.calls.borrow_mut().push((command.to_owned(), payload));
            match self.answers.get(command) {
                Some(outcome) => future::ready(outcome.clone()).boxed_local(),
                None => future::pending().boxed_local(),
            }
        }
    }

    fn add_payload() -> Value {
        Value::object([("a", Value::from(1)), ("b", Value::from(2))])
    }

    // ── structured ──

    #[tokio::test]
    async fn test_invoke_decodes_response() {
        let bridge = Bridge::new(Scripted::default().answer("config", Ok(r#"{"name":"MyApp","version":"1.0.0"}"#)));
        let value = bridge.invoke("config", &Value::empty_object()).await.unwrap();
        assert_eq!(value.get("name"), Some(&Value::from("MyApp")));
        assert_eq!(bridge.transport().calls(), vec![("config".to_string(), "{}".to_string())]);
    }

    #[tokio::test]
    async fn test_invoke_sends_canonical_payload() {
        let bridge = Bridge::new(Scripted::default().answer("add", Ok("3")));
        let result = bridge.invoke("add", &add_payload()).await.unwrap();
        assert_eq!(result, Value::from(3));
        assert_eq!(bridge.transport().calls()[0].1, r#"{"a":1,"b":2}"#);
    }

    #[tokio::test]
    async fn test_encoding_error_never_reaches_transport() {
        let bridge = Bridge::new(Scripted::default().answer("add", Ok("3")));
        let payload = Value::object([("a", Value::from(f64::NAN))]);

        let err = bridge.invoke("add", &payload).await.unwrap_err();
        assert!(matches!(err, BridgeError::Encoding { .. }));
        let err = bridge.invoke_void("add", &payload).await.unwrap_err();
        assert!(matches!(err, BridgeError::Encoding { .. }));
        assert!(bridge.transport().calls().is_empty());
    }

    #[tokio::test]
    async fn test_decoding_error_is_not_transport_error() {
        let bridge = Bridge::new(Scripted::default().answer("raw", Ok("plain text")));
        let err = bridge.invoke("raw", &Value::Null).await.unwrap_err();
        assert!(matches!(err, BridgeError::Decoding { ref command, .. } if command == "raw"));
    }

    #[tokio::test]
    async fn test_transport_failure_surfaces() {
        let bridge = Bridge::new(Scripted::default().answer("divide", Err("Division by zero")));
        let err = bridge.invoke("divide", &Value::empty_object()).await.unwrap_err();
        assert_eq!(
            err,
            BridgeError::Transport {
                command: "divide".into(),
                source: TransportFailure::Rejected("Division by zero".into()),
            }
        );
    }

    #[tokio::test]
    async fn test_empty_command_rejected_in_every_mode() {
        let bridge = Bridge::new(Scripted::default());
        assert_eq!(bridge.invoke("", &Value::Null).await, Err(BridgeError::EmptyCommand));
        assert_eq!(bridge.invoke_void("", &Value::Null).await, Err(BridgeError::EmptyCommand));
        assert_eq!(bridge.invoke_text("", "x").await, Err(BridgeError::EmptyCommand));
        assert!(bridge.transport().calls().is_empty());
    }

    #[derive(Serialize)]
    struct Divide {
        a: f64,
        b: f64,
    }

    #[tokio::test]
    async fn test_invoke_as_typed() {
        let bridge = Bridge::new(Scripted::default().answer("divide", Ok("2.5")));
        let result: f64 = bridge.invoke_as("divide", &Divide { a: 5.0, b: 2.0 }).await.unwrap();
        assert_eq!(result, 2.5);
        assert_eq!(bridge.transport().calls()[0].1, r#"{"a":5,"b":2}"#);

        let mismatch: Result<String, _> = bridge.invoke_as("divide", &Divide { a: 5.0, b: 2.0 }).await;
        assert!(matches!(mismatch, Err(BridgeError::Decoding { .. })));
    }

    #[tokio::test]
    async fn test_invoke_as_rejects_nan_before_transport() {
        let bridge = Bridge::new(Scripted::default().answer("divide", Ok("1")));
        let result: Result<f64, _> = bridge.invoke_as("divide", &Divide { a: f64::NAN, b: 2.0 }).await;
        match result {
            Err(BridgeError::Encoding { path, .. }) => assert_eq!(path, "$.a"),
            other => panic!("expected encoding error, got {other:?}"),
        }
        assert!(bridge.transport().calls().is_empty());
    }

    // ── void ──

    #[tokio::test]
    async fn test_void_ignores_malformed_response() {
        let bridge = Bridge::new(Scripted::default().answer("log", Ok("<<not json>>")));
        let payload = Value::object([("msg", Value::from("x"))]);
        assert_eq!(bridge.invoke_void("log", &payload).await, Ok(()));
        assert_eq!(bridge.transport().calls()[0].1, r#"{"msg":"x"}"#);
    }

    #[tokio::test]
    async fn test_void_still_reports_transport_failure() {
        let bridge = Bridge::new(Scripted::default().answer("log", Err("disk full")));
        let err = bridge.invoke_void("log", &Value::empty_object()).await.unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Transport);
    }

    // ── text ──

    #[tokio::test]
    async fn test_text_passes_through_unchanged() {
        let bridge = Bridge::new(Scripted::default().answer("echo", Ok("hello")));
        assert_eq!(bridge.invoke_text("echo", "hello").await.unwrap(), "hello");
        assert_eq!(bridge.transport().calls(), vec![("echo".to_string(), "hello".to_string())]);
    }

    #[tokio::test]
    async fn test_text_returns_non_json_verbatim() {
        let bridge = Bridge::new(Scripted::default().answer("blob", Ok("  {broken")));
        assert_eq!(bridge.invoke_text("blob", "").await.unwrap(), "  {broken");
    }

    // ── dispatch order ──

    #[tokio::test]
    async fn test_dispatch_happens_in_issue_order() {
        let bridge = Bridge::new(Scripted::default().answer("a", Ok("1")).answer("b", Ok("2")));
        let first = bridge.invoke_text("a", "");
        let second = bridge.invoke_text("b", "");
        let (b, a) = futures::join!(second, first);
        assert_eq!((a.unwrap(), b.unwrap()), ("1".to_string(), "2".to_string()));
        let order: Vec<String> = bridge.transport().calls().into_iter().map(|(c, _)| c).collect();
        assert_eq!(order, ["a", "b"]);
    }

    // ── executors ──

    #[test]
    fn test_usable_without_tokio_runtime() {
        let bridge = Bridge::new(Scripted::default().answer("add", Ok("3")));
        assert!(bridge.default_timeout().is_some());
        let value = futures::executor::block_on(bridge.invoke("add", &add_payload())).unwrap();
        assert_eq!(value, Value::from(3));
        let text = futures::executor::block_on(bridge.invoke_text("add", "")).unwrap();
        assert_eq!(text, "3");
    }

    // ── correlation ──

    #[tokio::test]
    async fn test_correlation_with_reversed_answers() {
        let (transport, router, mut link) = in_process();
        tokio::spawn(router.run());
        tokio::spawn(async move {
            let mut received = Vec::new();
            while received.len() < 2 {
                match link.requests.next().await {
                    Some(envelope) => received.push(envelope),
                    None => return,
                }
            }
            for envelope in received.into_iter().rev() {
                if let Envelope::Invoke { id, command, .. } = envelope {
                    let answer = if command == "add" { "3" } else { "2" };
                    let _ = link.replies.unbounded_send(Envelope::Resolve { id, payload: answer.into() });
                }
            }
        });

        let bridge = Bridge::new(transport);
        let a = bridge.invoke("add", &add_payload());
        let b = bridge.invoke("sub", &Value::object([("a", Value::from(5)), ("b", Value::from(3))]));
        let (a, b) = futures::join!(a, b);
        assert_eq!(a.unwrap(), Value::from(3));
        assert_eq!(b.unwrap(), Value::from(2));
    }

    // ── timeout ──

    #[tokio::test(start_paused = true)]
    async fn test_unanswered_call_times_out() {
        let bridge = Bridge::new(Scripted::default()).with_default_timeout(Some(Duration::from_secs(5)));
        let err = bridge.invoke("never", &Value::Null).await.unwrap_err();
        assert_eq!(
            err,
            BridgeError::Timeout {
                command: "never".into(),
                after: Duration::from_secs(5),
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_per_call_timeout_overrides_default() {
        let bridge = Bridge::new(Scripted::default()).with_default_timeout(None);
        let options = CallOptions::new().timeout(Duration::from_millis(250));
        let err = bridge.invoke_text_with("never", "", &options).await.unwrap_err();
        assert!(matches!(err, BridgeError::Timeout { after, .. } if after == Duration::from_millis(250)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_timeout_waits() {
        let bridge = Bridge::new(Scripted::default());
        let call = bridge.invoke_with("never", &Value::Null, &CallOptions::new().no_timeout());
        let raced = tokio::time::timeout(Duration::from_secs(3600), call).await;
        assert!(raced.is_err(), "call should still be pending");
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_response_after_timeout_is_discarded() {
        let (transport, router, mut link) = in_process();
        let bridge = Bridge::new(transport).with_default_timeout(Some(Duration::from_millis(100)));

        let err = bridge.invoke("slow", &Value::Null).await.unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Timeout);
        assert_eq!(bridge.transport().in_flight(), 0);

        let envelope = link.requests.next().await.unwrap();
        assert!(!router.route(Envelope::Resolve { id: envelope.id(), payload: "1".into() }));
    }

    // ── cancellation ──

    #[tokio::test]
    async fn test_cancel_while_waiting() {
        let (transport, router, mut link) = in_process();
        let bridge = Bridge::new(transport);
        let token = CancelToken::new();
        let call = bridge.invoke_with("slow", &Value::Null, &CallOptions::new().cancel_with(token.clone()));

        token.cancel();
        let err = call.await.unwrap_err();
        assert_eq!(err, BridgeError::Cancelled { command: "slow".into() });

        let envelope = link.requests.next().await.unwrap();
        assert!(!router.route(Envelope::Resolve { id: envelope.id(), payload: "1".into() }));
    }

    #[tokio::test]
    async fn test_cancelled_token_skips_transport() {
        let bridge = Bridge::new(Scripted::default().answer("echo", Ok("1")));
        let token = CancelToken::new();
        token.cancel();
        let options = CallOptions::new().cancel_with(token);
        let err = bridge.invoke_with("echo", &Value::Null, &options).await.unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Cancelled);
        assert!(bridge.transport().calls().is_empty());
    }

    #[tokio::test]
    async fn test_answer_wins_over_cancel_once_delivered() {
        let bridge = Bridge::new(Scripted::default().answer("echo", Ok("1")));
        let token = CancelToken::new();
        let call = bridge.invoke_with("echo", &Value::Null, &CallOptions::new().cancel_with(token.clone()));
        let value = call.await.unwrap();
        token.cancel();
        assert_eq!(value, Value::from(1));
    }
}
