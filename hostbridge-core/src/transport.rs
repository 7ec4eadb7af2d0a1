//! The single primitive the host exposes to the guest.

use std::rc::Rc;
use std::sync::Arc;

use futures::future::LocalBoxFuture;
use thiserror::Error;

/// Why the transport could not produce a response.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportFailure {
    /// The host ran the command and reported failure.
    #[error("{0}")]
    Rejected(String),
    /// The link to the host went away before an answer arrived.
    #[error("host disconnected")]
    Disconnected,
}

pub type TransportFuture = LocalBoxFuture<'static, Result<String, TransportFailure>>;

/// `(command, payload) -> future<string>`, owned by the host.
///
/// Every accepted call must eventually produce a string or a failure. The
/// bridge never locks or serializes calls through a transport; concurrent
/// calls are independent invocations of `call`.
pub trait Transport {
    fn call(&self, command: &str, payload: String) -> TransportFuture;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn call(&self, command: &str, payload: String) -> TransportFuture {
        (**self).call(command, payload)
    }
}

impl<T: Transport + ?Sized> Transport for Rc<T> {
    fn call(&self, command: &str, payload: String) -> TransportFuture {
        (**self).call(command, payload)
    }
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn call(&self, command: &str, payload: String) -> TransportFuture {
        (**self).call(command, payload)
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn call(&self, command: &str, payload: String) -> TransportFuture {
        (**self).call(command, payload)
    }
}
