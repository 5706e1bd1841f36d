use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use polypack_config::PipelineConfig;

use crate::error::PipelineError;
use crate::registry::Registry;
use crate::runner::PackSummary;

/// Deployment target for finished packs.
#[async_trait::async_trait]
pub trait Publisher: Send + Sync {
    /// Makes the artifact and its manifest visible to consumers.
    async fn publish(&self, summary: &PackSummary) -> Result<(), PipelineError>;

    fn name(&self) -> &'static str;
}

/// Publishes into a local distribution directory: copies the artifact and
/// merges the manifest into `registry.json`.
pub struct LocalPublisher {
    registry_dir: PathBuf,
    registry_file: String,
}

impl LocalPublisher {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            registry_dir: config.registry_dir.clone(),
            registry_file: config.registry_file.clone(),
        }
    }

    fn registry_path(&self) -> PathBuf {
        self.registry_dir.join(&self.registry_file)
    }

    /// Checks an already published pack without rebuilding anything: the
    /// registry entry exists, the artifact is present, and its checksum
    /// still matches the manifest.
    pub fn verify_deployment(&self, pair_id: &str) -> Result<(), PipelineError> {
        let registry_path = self.registry_path();
        let registry = Registry::load_or_default(&registry_path)?;
        let manifest = registry.packs.get(pair_id).ok_or_else(|| {
            PipelineError::Internal(format!(
                "pack {pair_id} is not in the registry at {}",
                registry_path.display()
            ))
        })?;

        let artifact = self.registry_dir.join(format!("{pair_id}.sqlite.gz"));
        if !artifact.exists() {
            return Err(PipelineError::Internal(format!(
                "registry lists {pair_id} but {} is missing",
                artifact.display()
            )));
        }
        let checksum = crate::package::sha256_file(&artifact)?;
        if checksum != manifest.checksum {
            return Err(PipelineError::Internal(format!(
                "checksum mismatch for {}: registry has {}, artifact is {checksum}",
                artifact.display(),
                manifest.checksum
            )));
        }

        tracing::info!(
            pack = %pair_id,
            artifact = %artifact.display(),
            "deployment verified"
        );
        Ok(())
    }
}

#[async_trait::async_trait]
impl Publisher for LocalPublisher {
    async fn publish(&self, summary: &PackSummary) -> Result<(), PipelineError> {
        fs::create_dir_all(&self.registry_dir)?;

        let file_name = summary.artifact.path.file_name().ok_or_else(|| {
            PipelineError::Publish(format!(
                "artifact path {} has no file name",
                summary.artifact.path.display()
            ))
        })?;
        let dest = self.registry_dir.join(file_name);
        fs::copy(&summary.artifact.path, &dest)?;

        let registry_path = self.registry_path();
        let mut registry = Registry::load_or_default(&registry_path)?;
        registry.upsert(summary.manifest.clone());
        registry.save(&registry_path)?;

        tracing::info!(
            pack = %summary.pair_id,
            dest = %dest.display(),
            registry = %registry_path.display(),
            "pack published"
        );
        Ok(())
    }

    fn name(&self) -> &'static str {
        "local"
    }
}

/// Retries transient publish failures with doubling backoff. Permanent
/// failures surface immediately.
pub async fn publish_with_retry(
    publisher: &dyn Publisher,
    summary: &PackSummary,
    attempts: u32,
    backoff_ms: u64,
) -> Result<(), PipelineError> {
    let attempts = attempts.max(1);
    let mut backoff = Duration::from_millis(backoff_ms);
    let mut last_err = None;

    for attempt in 1..=attempts {
        match publisher.publish(summary).await {
            Ok(()) => return Ok(()),
            Err(e) if e.is_transient() && attempt < attempts => {
                tracing::warn!(
                    pack = %summary.pair_id,
                    target = publisher.name(),
                    attempt,
                    error = %e,
                    "publish attempt failed"
                );
                last_err = Some(e);
                tokio::time::sleep(backoff).await;
                backoff *= 2;
            }
            Err(e) => return Err(e),
        }
    }
    Err(last_err.unwrap_or_else(|| PipelineError::Publish("no publish attempts made".to_string())))
}
