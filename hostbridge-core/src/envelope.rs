//! Wire messages exchanged between guest and host over a message link.
//!
//! Each message is a JSON array whose first element is the kind:
//!
//! | kind | layout |
//! |------|--------|
//! | 0 invoke  | `[0, id, command, payload]` |
//! | 1 resolve | `[1, id, payload]` |
//! | 2 reject  | `[2, id, message]` |

use serde_json::json;
use thiserror::Error;

const KIND_INVOKE: u64 = 0;
const KIND_RESOLVE: u64 = 1;
const KIND_REJECT: u64 = 2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Envelope {
    Invoke { id: u32, command: String, payload: String },
    Resolve { id: u32, payload: String },
    Reject { id: u32, message: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnvelopeError {
    #[error("envelope is not valid JSON: {message}")]
    Syntax { message: String },

    #[error("envelope must be a JSON array")]
    NotAnArray,

    #[error("unknown envelope kind: {kind}")]
    UnknownKind { kind: String },

    #[error("envelope of kind {kind} expects {expected} fields, got {actual}")]
    WrongArity { kind: u64, expected: usize, actual: usize },

    #[error("invalid field {index}: expected {expected}")]
    InvalidField { index: usize, expected: &'static str },
}

impl Envelope {
    pub fn id(&self) -> u32 {
        match self {
            Envelope::Invoke { id, .. } | Envelope::Resolve { id, .. } | Envelope::Reject { id, .. } => *id,
        }
    }

    /// Build the reply to an invoke from a handler outcome.
    pub fn reply(id: u32, outcome: Result<String, String>) -> Self {
        match outcome {
            Ok(payload) => Envelope::Resolve { id, payload },
            Err(message) => Envelope::Reject { id, message },
        }
    }

    pub fn to_text(&self) -> String {
        let array = match self {
            Envelope::Invoke { id, command, payload } => json!([KIND_INVOKE, id, command, payload]),
            Envelope::Resolve { id, payload } => json!([KIND_RESOLVE, id, payload]),
            Envelope::Reject { id, message } => json!([KIND_REJECT, id, message]),
        };
        array.to_string()
    }

    pub fn from_text(text: &str) -> Result<Self, EnvelopeError> {
        let json: serde_json::Value = serde_json::from_str(text).map_err(|e| EnvelopeError::Syntax {
            message: e.to_string(),
        })?;
        let fields = json.as_array().ok_or(EnvelopeError::NotAnArray)?;

        let kind = match fields.first() {
            Some(serde_json::Value::Number(n)) => n.as_u64().ok_or_else(|| EnvelopeError::UnknownKind {
                kind: n.to_string(),
            })?,
            Some(other) => {
                return Err(EnvelopeError::UnknownKind {
                    kind: other.to_string(),
                })
            }
            None => return Err(EnvelopeError::InvalidField { index: 0, expected: "kind" }),
        };

        let expected = match kind {
            KIND_INVOKE => 4,
            KIND_RESOLVE | KIND_REJECT => 3,
            _ => return Err(EnvelopeError::UnknownKind { kind: kind.to_string() }),
        };
        if fields.len() != expected {
            return Err(EnvelopeError::WrongArity {
                kind,
                expected,
                actual: fields.len(),
            });
        }

        let id = fields[1]
            .as_u64()
            .and_then(|n| u32::try_from(n).ok())
            .ok_or(EnvelopeError::InvalidField { index: 1, expected: "u32 id" })?;
        let text_at = |index: usize| {
            fields[index]
                .as_str()
                .map(str::to_owned)
                .ok_or(EnvelopeError::InvalidField { index, expected: "string" })
        };

        Ok(match kind {
            KIND_INVOKE => Envelope::Invoke {
                id,
                command: text_at(2)?,
                payload: text_at(3)?,
            },
            KIND_RESOLVE => Envelope::Resolve { id, payload: text_at(2)? },
            _ => Envelope::Reject { id, message: text_at(2)? },
        })
    }
}
