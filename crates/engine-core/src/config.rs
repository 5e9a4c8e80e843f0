use serde::Deserialize;
use std::time::Duration;

/// Batching and progress-logging settings for the database writer.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct WriterConfig {
    /// Rows buffered before one bulk insert.
    pub batch_size: usize,
    /// Row count after which progress is logged.
    pub log_threshold: usize,
    /// Progress is logged every `log_increment` rows past the threshold.
    pub log_increment: usize,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            batch_size: 1000,
            log_threshold: 100_000,
            log_increment: 100_000,
        }
    }
}

/// Retry and pacing settings for the pull client.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PullConfig {
    /// Ledger size at which the client gives up.
    pub max_errors: usize,
    pub error_delay_ms: u64,
    /// Longest server-directed wait that is honored on a 429.
    pub max_retry_after_secs: u64,
    /// Hard ceiling on attempts for one logical request, 429s included.
    pub max_attempts: usize,
    /// Minimum spacing between consecutive calls in an origin run.
    pub min_interval_ms: u64,
}

impl Default for PullConfig {
    fn default() -> Self {
        Self {
            max_errors: 5,
            error_delay_ms: 1000,
            max_retry_after_secs: 300,
            max_attempts: 100,
            min_interval_ms: 20,
        }
    }
}

impl PullConfig {
    pub fn error_delay(&self) -> Duration {
        Duration::from_millis(self.error_delay_ms)
    }

    pub fn max_retry_after(&self) -> Duration {
        Duration::from_secs(self.max_retry_after_secs)
    }

    pub fn min_interval(&self) -> Duration {
        Duration::from_millis(self.min_interval_ms)
    }
}
