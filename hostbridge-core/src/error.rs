use std::time::Duration;

use thiserror::Error;

use crate::transport::TransportFailure;

/// Everything a bridge call can fail with.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BridgeError {
    /// The payload has no canonical encoding. Raised before the host is contacted.
    #[error("cannot encode payload at {path}: {reason}")]
    Encoding { path: String, reason: String },

    /// The transport primitive reported failure for this call.
    #[error("command '{command}' failed: {source}")]
    Transport {
        command: String,
        #[source]
        source: TransportFailure,
    },

    /// The host answered, but not with valid encoded text.
    #[error("response to '{command}' could not be decoded: {reason}")]
    Decoding { command: String, reason: String },

    #[error("command '{command}' timed out after {after:?}")]
    Timeout { command: String, after: Duration },

    #[error("command '{command}' was cancelled")]
    Cancelled { command: String },

    #[error("command name must not be empty")]
    EmptyCommand,
}

/// Stable, payload-free classification of a [`BridgeError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Encoding,
    Transport,
    Decoding,
    Timeout,
    Cancelled,
    EmptyCommand,
}

impl ErrorKind {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Encoding => "EncodingError",
            Self::Transport => "TransportError",
            Self::Decoding => "DecodingError",
            Self::Timeout => "TimeoutError",
            Self::Cancelled => "CancelledError",
            Self::EmptyCommand => "TypeError",
        }
    }
}

impl BridgeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Encoding { .. } => ErrorKind::Encoding,
            Self::Transport { .. } => ErrorKind::Transport,
            Self::Decoding { .. } => ErrorKind::Decoding,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::Cancelled { .. } => ErrorKind::Cancelled,
            Self::EmptyCommand => ErrorKind::EmptyCommand,
        }
    }

    /// The command this error belongs to, when one was involved.
    pub fn command(&self) -> Option<&str> {
        match self {
            Self::Transport { command, .. }
            | Self::Decoding { command, .. }
            | Self::Timeout { command, .. }
            | Self::Cancelled { command } => Some(command),
            Self::Encoding { .. } | Self::EmptyCommand => None,
        }
    }

    pub(crate) fn transport(command: &str, source: TransportFailure) -> Self {
        Self::Transport {
            command: command.to_owned(),
            source,
        }
    }
}
