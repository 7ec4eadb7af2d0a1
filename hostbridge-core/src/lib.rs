//! hostbridge core
//!
//! Guest-side command bridge for invoking named commands on an embedding
//! native host. Shared between the native host library, the WASM web binding
//! and the CLI.
//!
//! The pieces, bottom-up:
//! - [`Value`] and the canonical JSON [`codec`]
//! - the [`Transport`] primitive the host provides
//! - the wire [`Envelope`] and the correlating [`ChannelTransport`]
//! - [`Bridge`], which offers `invoke`, `invoke_void` and `invoke_text`

pub mod bridge;
pub mod cancel;
pub mod channel;
pub mod codec;
pub mod config;
pub mod envelope;
pub mod error;
pub mod pending;
mod ser;
pub mod timer;
pub mod transport;
pub mod value;

pub use bridge::{Bridge, CallOptions, TimeoutPolicy};
pub use cancel::CancelToken;
pub use channel::{in_process, ChannelTransport, HostLink, ResponseRouter};
pub use config::BridgeConfig;
pub use envelope::{Envelope, EnvelopeError};
pub use error::{BridgeError, ErrorKind};
pub use timer::Timer;
pub use transport::{Transport, TransportFailure, TransportFuture};
pub use value::Value;

#[cfg(feature = "tokio")]
pub use timer::TokioTimer;
