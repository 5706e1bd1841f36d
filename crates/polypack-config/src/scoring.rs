use std::env;

use serde::{Deserialize, Serialize};

/// Weights for reverse-lookup quality ranking.
///
/// The defaults keep the ordering contract primary > unambiguous > unmarked:
/// a primary bonus always outweighs the capped ambiguity penalty alone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringConfig {
    pub base_score: i32,
    pub primary_bonus: i32,
    /// Deducted once per meaning beyond the first in the source group
    pub ambiguity_penalty: i32,
    pub ambiguity_penalty_cap: i32,
    /// Deducted when the meaning carries a restrictive usage context
    pub restricted_penalty: i32,
    pub restricted_markers: Vec<String>,
}

impl ScoringConfig {
    pub fn new() -> Self {
        let base_score = env::var("SCORE_BASE")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(100);

        let primary_bonus = env::var("SCORE_PRIMARY_BONUS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(30);

        let ambiguity_penalty = env::var("SCORE_AMBIGUITY_PENALTY")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(5);

        let ambiguity_penalty_cap = env::var("SCORE_AMBIGUITY_PENALTY_CAP")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(40);

        let restricted_penalty = env::var("SCORE_RESTRICTED_PENALTY")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(20);

        ScoringConfig {
            base_score,
            primary_bonus,
            ambiguity_penalty,
            ambiguity_penalty_cap,
            restricted_penalty,
            restricted_markers: default_restricted_markers(),
        }
    }

    /// True when a usage context marks a restricted register
    pub fn is_restricted(&self, usage_context: &str) -> bool {
        let ctx = usage_context.to_lowercase();
        self.restricted_markers.iter().any(|m| ctx.contains(m))
    }
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self::new()
    }
}

fn default_restricted_markers() -> Vec<String> {
    [
        "archaic", "obsolete", "dated", "regional", "dialect", "slang", "vulgar", "rare",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}
