use std::fs;
use std::path::Path;

use serde::Deserialize;

use polypack_types::PairSpec;

use crate::error::PipelineError;

/// The set of packs a run may generate, loaded from a JSON catalog file.
#[derive(Debug, Clone, Deserialize)]
pub struct Catalog {
    pub packs: Vec<PairSpec>,
}

impl Catalog {
    pub fn load(path: &Path) -> Result<Self, PipelineError> {
        let raw = fs::read_to_string(path)?;
        let catalog: Catalog = serde_json::from_str(&raw)
            .map_err(|e| PipelineError::Internal(format!("invalid catalog {}: {e}", path.display())))?;
        if catalog.packs.is_empty() {
            return Err(PipelineError::Internal(format!(
                "catalog {} lists no packs",
                path.display()
            )));
        }
        Ok(catalog)
    }

    pub fn find(&self, pair_id: &str) -> Option<&PairSpec> {
        self.packs.iter().find(|p| p.id == pair_id)
    }
}
