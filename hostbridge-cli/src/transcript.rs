use std::time::Duration;

use chrono::{DateTime, Local};
use hostbridge_core::BridgeError;

// ─── Entries ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Ok(String),
    Failed { kind: &'static str, message: String },
}

impl Outcome {
    pub fn failed(err: &BridgeError) -> Self {
        Self::Failed {
            kind: err.kind().label(),
            message: err.to_string(),
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok(_))
    }
}

#[derive(Debug, Clone)]
pub struct Entry {
    pub timestamp: DateTime<Local>,
    pub call: String,
    pub outcome: Outcome,
    pub elapsed: Duration,
}

impl Entry {
    pub fn render(&self) -> String {
        let result = match &self.outcome {
            Outcome::Ok(text) => format!("-> {text}"),
            Outcome::Failed { kind, message } => format!("!! {kind}: {message}"),
        };
        format!(
            "[{}] {} {} ({} ms)",
            self.timestamp.format("%H:%M:%S%.3f"),
            self.call,
            result,
            self.elapsed.as_millis()
        )
    }
}

// ─── Transcript ──────────────────────────────────────────────────────

/// Completed calls in completion order, oldest dropped past `max_entries`.
pub struct Transcript {
    pub entries: Vec<Entry>,
    max_entries: usize,
}

impl Transcript {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: Vec::new(),
            max_entries,
        }
    }

    pub fn push(&mut self, call: impl Into<String>, outcome: Outcome, elapsed: Duration) {
        if self.entries.len() >= self.max_entries {
            self.entries.remove(0);
        }
        self.entries.push(Entry {
            timestamp: Local::now(),
            call: call.into(),
            outcome,
            elapsed,
        });
    }

    pub fn failures(&self) -> usize {
        self.entries.iter().filter(|e| !e.outcome.is_ok()).count()
    }

    pub fn lines(&self) -> impl Iterator<Item = String> + '_ {
        self.entries.iter().map(Entry::render)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push() {
        let mut t = Transcript::new(10);
        t.push("add", Outcome::Ok("3".into()), Duration::from_millis(2));
        assert_eq!(t.entries.len(), 1);
        assert_eq!(t.entries[0].call, "add");
        assert_eq!(t.failures(), 0);
    }

    #[test]
    fn test_max_entries_eviction() {
        let mut t = Transcript::new(2);
        t.push("a", Outcome::Ok("1".into()), Duration::ZERO);
        t.push("b", Outcome::Ok("2".into()), Duration::ZERO);
        t.push("c", Outcome::Ok("3".into()), Duration::ZERO);
        assert_eq!(t.entries.len(), 2);
        assert_eq!(t.entries[0].call, "b");
        assert_eq!(t.entries[1].call, "c");
    }

    #[test]
    fn test_render_failure() {
        let mut t = Transcript::new(10);
        let err = BridgeError::Cancelled { command: "x".into() };
        t.push("x", Outcome::failed(&err), Duration::from_millis(7));
        let line = t.lines().next().unwrap();
        assert!(line.contains("x !! CancelledError: command 'x' was cancelled (7 ms)"), "{line}");
        assert_eq!(t.failures(), 1);
    }
}
