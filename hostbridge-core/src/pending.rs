use std::collections::HashMap;

use futures::channel::oneshot;

use crate::transport::TransportFailure;

pub type Outcome = Result<String, TransportFailure>;

struct Waiting {
    command: String,
    reply: oneshot::Sender<Outcome>,
}

/// Calls that have been sent to the host and are waiting for an answer,
/// keyed by correlation id.
///
/// Ids start at 1, wrap around, never use 0 and never reuse an id that is
/// still in flight.
pub struct PendingCalls {
    next_id: u32,
    waiting: HashMap<u32, Waiting>,
}

impl PendingCalls {
    pub fn new() -> Self {
        Self::starting_at(1)
    }

    pub(crate) fn starting_at(next_id: u32) -> Self {
        Self {
            next_id: next_id.max(1),
            waiting: HashMap::new(),
        }
    }

    /// Allocate an id for `command` and return the receiver its outcome will arrive on.
    pub fn register(&mut self, command: &str) -> (u32, oneshot::Receiver<Outcome>) {
        let id = self.allocate_id();
        let (reply, rx) = oneshot::channel();
        self.waiting.insert(
            id,
            Waiting {
                command: command.to_owned(),
                reply,
            },
        );
        (id, rx)
    }

    fn allocate_id(&mut self) -> u32 {
        loop {
            let id = self.next_id;
            self.next_id = self.next_id.wrapping_add(1).max(1);
            if !self.waiting.contains_key(&id) {
                return id;
            }
        }
    }

    /// Deliver an outcome to the caller waiting on `id`.
    ///
    /// Returns false when nobody is waiting: the call timed out, was
    /// cancelled, or the id was never issued. The outcome is dropped.
    pub fn settle(&mut self, id: u32, outcome: Outcome) -> bool {
        match self.waiting.remove(&id) {
            Some(waiting) => {
                if waiting.reply.send(outcome).is_err() {
                    log::debug!("caller for '{}' (id={id}) went away before its answer", waiting.command);
                }
                true
            }
            None => {
                log::warn!("discarding response for unknown call id {id}");
                false
            }
        }
    }

    /// Stop waiting for `id`; a later response for it is discarded.
    pub fn forget(&mut self, id: u32) -> bool {
        self.waiting.remove(&id).is_some()
    }

    /// Fail every waiting call, e.g. when the link to the host closes.
    pub fn fail_all(&mut self, failure: TransportFailure) -> usize {
        let count = self.waiting.len();
        for (id, waiting) in self.waiting.drain() {
            log::debug!("failing '{}' (id={id}): {failure}", waiting.command);
            let _ = waiting.reply.send(Err(failure.clone()));
        }
        count
    }

    pub fn command(&self, id: u32) -> Option<&str> {
        self.waiting.get(&id).map(|w| w.command.as_str())
    }

    pub fn len(&self) -> usize {
        self.waiting.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waiting.is_empty()
    }
}

impl Default for PendingCalls {
    fn default() -> Self {
        Self::new()
    }
}
