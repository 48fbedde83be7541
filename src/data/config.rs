//! Data layer settings (the `data:` section of marques.yml)

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Longest delay between two initialization attempts
const MAX_BACKOFF_MS: u64 = 5_000;

/// Data store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Attempts to open all tables before giving up
    pub init_attempts: u32,
    /// Base delay between attempts, doubled after each failure
    pub init_backoff_ms: u64,
    /// Period of the background compactor in seconds, 0 disables it
    pub compaction_interval_secs: u64,
    /// Minimum dead log lines before a table is compacted
    pub compaction_min_dead: usize,
    /// Minimum share of dead lines before a table is compacted
    pub compaction_ratio: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            init_attempts: 5,
            init_backoff_ms: 200,
            compaction_interval_secs: 300,
            compaction_min_dead: 64,
            compaction_ratio: 0.5,
        }
    }
}

impl Config {
    /// Delay to wait after the given (1-based) failed attempt
    pub fn backoff(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(16);
        let millis = self
            .init_backoff_ms
            .saturating_mul(1u64 << shift)
            .min(MAX_BACKOFF_MS);
        Duration::from_millis(millis)
    }
}
