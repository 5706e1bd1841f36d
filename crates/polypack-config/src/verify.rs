use std::env;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyConfig {
    /// Minimum fraction of expected entries a store must contain
    pub min_coverage: f64,
    /// Forward round-trip probes sampled from the written store
    pub forward_probes: usize,
    /// Reverse lookup probes sampled from the written store
    pub reverse_probes: usize,
    /// Fraction of failed probes tolerated before the functional check fails
    pub probe_failure_tolerance: f64,
}

impl VerifyConfig {
    pub fn new() -> Self {
        let min_coverage = env::var("VERIFY_MIN_COVERAGE")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(0.5);

        let forward_probes = env::var("VERIFY_FORWARD_PROBES")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(20);

        let reverse_probes = env::var("VERIFY_REVERSE_PROBES")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(20);

        let probe_failure_tolerance = env::var("VERIFY_PROBE_FAILURE_TOLERANCE")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(0.1);

        VerifyConfig {
            min_coverage,
            forward_probes,
            reverse_probes,
            probe_failure_tolerance,
        }
    }
}

impl Default for VerifyConfig {
    fn default() -> Self {
        Self::new()
    }
}
