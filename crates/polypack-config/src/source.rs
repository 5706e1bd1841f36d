use std::env;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Per-request timeout for source downloads
    pub fetch_timeout_secs: u64,
    /// Retry budget for transient fetch failures
    pub retry_attempts: u32,
    /// Initial backoff between retries, doubled per attempt
    pub retry_backoff_ms: u64,
    /// Fraction of malformed records tolerated before ingestion fails
    pub malformed_tolerance: f64,
}

impl SourceConfig {
    pub fn new() -> Self {
        let fetch_timeout_secs = env::var("SOURCE_FETCH_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(60);

        let retry_attempts = env::var("SOURCE_RETRY_ATTEMPTS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(3);

        let retry_backoff_ms = env::var("SOURCE_RETRY_BACKOFF_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(500);

        let malformed_tolerance = env::var("SOURCE_MALFORMED_TOLERANCE")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(0.5); // half the source may be junk before we give up

        SourceConfig {
            fetch_timeout_secs,
            retry_attempts,
            retry_backoff_ms,
            malformed_tolerance,
        }
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self::new()
    }
}
