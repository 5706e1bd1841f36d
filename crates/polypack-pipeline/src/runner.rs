use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use kanal::AsyncSender;
use tokio_util::sync::CancellationToken;

use polypack_config::Config;
use polypack_core::{Lexicon, Normalizer, ReverseIndexBuilder, WordGroupBuilder, assemble};
use polypack_store::{IntegrityVerifier, PackStore, StoreWriter, VerifyReport};
use polypack_types::{PackManifest, PairSpec, Stage, StageEvent};

use crate::error::PipelineError;
use crate::fetch::SourceFetcher;
use crate::package::{PackageInfo, package_store};

/// Artifact version stamped into manifests. Bump on breaking pack changes.
const PACK_VERSION: &str = "1.0.0";

/// Outcome of one successful pair generation.
#[derive(Debug)]
pub struct PackSummary {
    pub pair_id: String,
    pub store_path: PathBuf,
    pub artifact: PackageInfo,
    pub manifest: PackManifest,
    pub report: VerifyReport,
}

/// Drives one language pair through every stage, emitting a progress event
/// after each completed stage and checking for cancellation between them.
pub struct PairRunner {
    config: Arc<Config>,
    fetcher: Arc<dyn SourceFetcher>,
    events: AsyncSender<StageEvent>,
    cancel: CancellationToken,
}

impl PairRunner {
    pub fn new(
        config: Arc<Config>,
        fetcher: Arc<dyn SourceFetcher>,
        events: AsyncSender<StageEvent>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            config,
            fetcher,
            events,
            cancel,
        }
    }

    pub async fn generate(&self, spec: &PairSpec) -> Result<PackSummary, PipelineError> {
        let pair = spec.pair();
        let pair_id = pair.id();
        tracing::info!(pack = %pair_id, source = self.fetcher.name(), "starting generation");

        self.ensure_live("fetch")?;
        let bytes = self.fetcher.fetch(spec).await?;
        self.emit(&pair_id, Stage::Fetch).await;

        // The CPU-heavy stages run on the blocking pool so progress events
        // and cancellation stay responsive.
        self.ensure_live("normalize")?;
        let tolerance = self.config.source.malformed_tolerance;
        let normalize_pair = pair.clone();
        let (records, report) = tokio::task::spawn_blocking(move || {
            let text = String::from_utf8_lossy(&bytes);
            let mut normalizer = Normalizer::new(normalize_pair, tolerance);
            let records: Vec<_> = text
                .lines()
                .filter_map(|line| normalizer.normalize_line(line))
                .collect();
            let report = normalizer.finish()?;
            Ok::<_, PipelineError>((records, report))
        })
        .await
        .map_err(join_error)??;
        tracing::info!(
            pack = %pair_id,
            records = report.total,
            malformed = report.malformed,
            "source normalized"
        );
        self.emit(&pair_id, Stage::Normalize).await;

        self.ensure_live("group")?;
        let drafts = tokio::task::spawn_blocking(move || {
            let mut builder = WordGroupBuilder::new();
            for record in records {
                builder.push(record);
            }
            builder.finish()
        })
        .await
        .map_err(join_error)?;
        self.emit(&pair_id, Stage::Group).await;

        self.ensure_live("assign")?;
        let created_at = Utc::now();
        let assign_pair = pair.clone();
        let (word_groups, meanings) =
            tokio::task::spawn_blocking(move || assemble(&assign_pair, drafts, created_at))
                .await
                .map_err(join_error)??;
        self.emit(&pair_id, Stage::Assign).await;

        self.ensure_live("invert")?;
        let scoring = self.config.scoring.clone();
        let invert_pair = pair.clone();
        let lexicon = tokio::task::spawn_blocking(move || {
            let reverse = ReverseIndexBuilder::new(scoring).build(&word_groups, &meanings, created_at);
            Lexicon::new(invert_pair, word_groups, meanings, reverse)
        })
        .await
        .map_err(join_error)??;
        self.emit(&pair_id, Stage::Invert).await;

        self.ensure_live("write")?;
        let store_path = self.store_path(&pair_id);
        let write_path = store_path.clone();
        tokio::task::spawn_blocking(move || {
            StoreWriter::write(&lexicon, &write_path)?;
            Ok::<_, PipelineError>(())
        })
        .await
        .map_err(join_error)??;
        self.emit(&pair_id, Stage::Write).await;

        self.ensure_live("verify")?;
        let report = self
            .verify_store(store_path.clone(), spec.expected_entries)
            .await?;
        self.emit(&pair_id, Stage::Verify).await;

        self.ensure_live("package")?;
        let package_path = store_path.clone();
        let artifact = tokio::task::spawn_blocking(move || package_store(&package_path))
            .await
            .map_err(join_error)??;
        self.emit(&pair_id, Stage::Package).await;

        let manifest = PackManifest {
            id: pair_id.clone(),
            name: spec.name.clone(),
            source_language: pair.source.clone(),
            target_language: pair.target.clone(),
            version: PACK_VERSION.to_string(),
            schema_version: polypack_store::SCHEMA_VERSION.to_string(),
            total_entries: report.total_entries,
            forward_entries: report.meanings,
            reverse_entries: report.reverse_entries,
            size_bytes: artifact.size_bytes,
            checksum: artifact.checksum.clone(),
            created_at: Utc::now(),
        };

        tracing::info!(
            pack = %pair_id,
            word_groups = report.word_groups,
            total_entries = report.total_entries,
            "generation finished"
        );
        Ok(PackSummary {
            pair_id,
            store_path,
            artifact,
            manifest,
            report,
        })
    }

    /// Re-verifies an already written store without regenerating it.
    pub async fn verify_only(&self, spec: &PairSpec) -> Result<VerifyReport, PipelineError> {
        let store_path = self.store_path(&spec.pair().id());
        if !store_path.exists() {
            return Err(PipelineError::Internal(format!(
                "no store at {}, generate it first",
                store_path.display()
            )));
        }
        self.verify_store(store_path, spec.expected_entries).await
    }

    async fn verify_store(
        &self,
        path: PathBuf,
        expected_entries: u64,
    ) -> Result<VerifyReport, PipelineError> {
        let verify_config = self.config.verify.clone();
        tokio::task::spawn_blocking(move || {
            let store = PackStore::open(&path)?;
            let report = IntegrityVerifier::new(verify_config).verify(&store, expected_entries)?;
            Ok::<_, PipelineError>(report)
        })
        .await
        .map_err(join_error)?
    }

    fn store_path(&self, pair_id: &str) -> PathBuf {
        self.config
            .pipeline
            .output_dir
            .join(format!("{pair_id}.sqlite"))
    }

    fn ensure_live(&self, stage: &'static str) -> Result<(), PipelineError> {
        if self.cancel.is_cancelled() {
            return Err(PipelineError::Cancelled(stage));
        }
        Ok(())
    }

    async fn emit(&self, pair_id: &str, stage: Stage) {
        if let Err(e) = self
            .events
            .send(StageEvent::completed(pair_id, stage))
            .await
        {
            tracing::warn!(pack = %pair_id, error = %e, "progress listener gone");
        }
    }
}

fn join_error(e: tokio::task::JoinError) -> PipelineError {
    PipelineError::Internal(format!("worker task failed: {e}"))
}
