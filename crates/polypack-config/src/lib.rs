use serde::{Deserialize, Serialize};

pub mod pipeline;
pub mod scoring;
pub mod source;
pub mod verify;

pub use self::pipeline::PipelineConfig;
pub use self::scoring::ScoringConfig;
pub use self::source::SourceConfig;
pub use self::verify::VerifyConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub source: SourceConfig,
    pub scoring: ScoringConfig,
    pub verify: VerifyConfig,
    pub pipeline: PipelineConfig,
}

impl Config {
    pub fn new() -> Self {
        Config {
            source: SourceConfig::new(),
            scoring: ScoringConfig::new(),
            verify: VerifyConfig::new(),
            pipeline: PipelineConfig::new(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}
