use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use polypack_types::PackManifest;

use crate::error::PipelineError;

/// The distribution registry: every published pack, keyed by pack id.
///
/// Lives as pretty-printed JSON so diffs between deployments stay readable.
#[derive(Debug, Serialize, Deserialize)]
pub struct Registry {
    pub version: String,
    pub schema_version: String,
    pub last_updated: DateTime<Utc>,
    pub packs: BTreeMap<String, PackManifest>,
}

impl Registry {
    fn empty() -> Self {
        Self {
            version: "1.0".to_string(),
            schema_version: polypack_store::SCHEMA_VERSION.to_string(),
            last_updated: Utc::now(),
            packs: BTreeMap::new(),
        }
    }

    /// Loads an existing registry, or starts a fresh one when the file is
    /// missing. A present-but-unreadable registry is an error; silently
    /// replacing it would drop every previously published pack.
    pub fn load_or_default(path: &Path) -> Result<Self, PipelineError> {
        if !path.exists() {
            return Ok(Self::empty());
        }
        let raw = fs::read_to_string(path)?;
        serde_json::from_str(&raw)
            .map_err(|e| PipelineError::Publish(format!("corrupt registry {}: {e}", path.display())))
    }

    /// Inserts or replaces the manifest for one pack.
    pub fn upsert(&mut self, manifest: PackManifest) {
        self.last_updated = Utc::now();
        self.packs.insert(manifest.id.clone(), manifest);
    }

    pub fn save(&self, path: &Path) -> Result<(), PipelineError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp = tmp_path(path);
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| PipelineError::Publish(format!("serialize registry: {e}")))?;
        fs::write(&tmp, json)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut os = path.as_os_str().to_os_string();
    os.push(".tmp");
    PathBuf::from(os)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manifest(id: &str) -> PackManifest {
        PackManifest {
            id: id.to_string(),
            name: id.to_string(),
            source_language: "es".to_string(),
            target_language: "en".to_string(),
            version: "1.0.0".to_string(),
            schema_version: "2.0".to_string(),
            total_entries: 10,
            forward_entries: 6,
            reverse_entries: 4,
            size_bytes: 1234,
            checksum: "deadbeef".to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn missing_registry_starts_empty() {
        let dir = tempfile::TempDir::new().unwrap();
        let registry = Registry::load_or_default(&dir.path().join("registry.json")).unwrap();
        assert!(registry.packs.is_empty());
        assert_eq!(registry.schema_version, "2.0");
    }

    #[test]
    fn upsert_save_load_round_trip() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("registry.json");

        let mut registry = Registry::load_or_default(&path).unwrap();
        registry.upsert(manifest("es-en"));
        registry.upsert(manifest("fr-en"));
        registry.save(&path).unwrap();

        let loaded = Registry::load_or_default(&path).unwrap();
        assert_eq!(loaded.packs.len(), 2);
        assert!(loaded.packs.contains_key("es-en"));
    }

    #[test]
    fn upsert_replaces_existing_pack() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("registry.json");

        let mut registry = Registry::load_or_default(&path).unwrap();
        registry.upsert(manifest("es-en"));
        let mut updated = manifest("es-en");
        updated.total_entries = 99;
        registry.upsert(updated);

        assert_eq!(registry.packs.len(), 1);
        assert_eq!(registry.packs["es-en"].total_entries, 99);
        registry.save(&path).unwrap();
        assert!(!dir.path().join("registry.json.tmp").exists());
    }

    #[test]
    fn corrupt_registry_is_an_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("registry.json");
        fs::write(&path, "{not json").unwrap();
        assert!(Registry::load_or_default(&path).is_err());
    }
}
