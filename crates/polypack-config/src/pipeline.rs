use std::env;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Directory receiving published stores
    pub output_dir: PathBuf,
    /// Directory for local registry + packaged artifacts
    pub registry_dir: PathBuf,
    /// Registry file name inside `registry_dir`
    pub registry_file: String,
    /// Upper bound on language pairs generated concurrently
    pub max_concurrent_pairs: usize,
}

impl PipelineConfig {
    pub fn new() -> Self {
        let output_dir = env::var("PACK_OUTPUT_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("packs"));

        let registry_dir = env::var("PACK_REGISTRY_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("dist"));

        let registry_file = env::var("PACK_REGISTRY_FILE")
            .unwrap_or_else(|_| "registry.json".to_string());

        let max_concurrent_pairs = env::var("PACK_WORKERS")
            .ok()
            .and_then(|v| v.parse().ok())
            .filter(|&n| n > 0)
            .unwrap_or(2); // each worker holds a full pair in memory

        PipelineConfig {
            output_dir,
            registry_dir,
            registry_file,
            max_concurrent_pairs,
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::new()
    }
}
