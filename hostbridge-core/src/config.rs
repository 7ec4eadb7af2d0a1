use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_MAX_IN_FLIGHT: usize = 64;

/// Bridge and host tuning shared by every front end.
///
/// Read from the `[bridge]` table of a config file; every field is optional.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Per-call timeout applied when a call does not set its own.
    /// `None` (or `0` in a file) waits forever.
    pub default_timeout_ms: Option<u64>,
    /// Upper bound on commands a host runs at the same time.
    pub max_in_flight: usize,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            default_timeout_ms: Some(DEFAULT_TIMEOUT_MS),
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
        }
    }
}

impl BridgeConfig {
    pub fn default_timeout(&self) -> Option<Duration> {
        self.default_timeout_ms
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = BridgeConfig::default();
        assert_eq!(cfg.default_timeout(), Some(Duration::from_secs(30)));
        assert_eq!(cfg.max_in_flight, 64);
    }

    #[test]
    fn test_zero_timeout_means_none() {
        let cfg = BridgeConfig {
            default_timeout_ms: Some(0),
            ..Default::default()
        };
        assert_eq!(cfg.default_timeout(), None);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let cfg: BridgeConfig = serde_json::from_str(r#"{"max_in_flight": 4}"#).unwrap();
        assert_eq!(cfg.max_in_flight, 4);
        assert_eq!(cfg.default_timeout_ms, Some(DEFAULT_TIMEOUT_MS));
    }
}
