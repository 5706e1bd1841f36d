use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use kanal::AsyncSender;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use polypack_config::Config;
use polypack_types::{PairSpec, StageEvent};

use crate::error::PipelineError;
use crate::fetch::SourceFetcher;
use crate::runner::{PackSummary, PairRunner};

/// Result of one pair within a multi-pack run.
#[derive(Debug)]
pub struct PairOutcome {
    pub pair_id: String,
    pub result: Result<PackSummary, PipelineError>,
}

/// Runs pair generations with bounded concurrency and per-pair exclusion.
///
/// A pair being generated holds an in-process lock on its id; a second
/// request for the same pair fails fast with `PairLocked` instead of racing
/// on the output store.
pub struct PipelinePool {
    config: Arc<Config>,
    fetcher: Arc<dyn SourceFetcher>,
    events: AsyncSender<StageEvent>,
    cancel: CancellationToken,
    active: Arc<Mutex<HashSet<String>>>,
}

impl PipelinePool {
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
            active: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    fn runner(&self) -> PairRunner {
        PairRunner::new(
            Arc::clone(&self.config),
            Arc::clone(&self.fetcher),
            self.events.clone(),
            self.cancel.clone(),
        )
    }

    pub async fn run_one(&self, spec: &PairSpec) -> Result<PackSummary, PipelineError> {
        let _guard = PairLock::acquire(&self.active, &spec.id)?;
        self.runner().generate(spec).await
    }

    pub async fn verify_one(&self, spec: &PairSpec) -> Result<(), PipelineError> {
        let report = self.runner().verify_only(spec).await?;
        tracing::info!(
            pack = %spec.id,
            total_entries = report.total_entries,
            probes_failed = report.probes_failed,
            "store re-verified"
        );
        Ok(())
    }

    /// Generates every spec, at most `max_concurrent_pairs` at a time.
    /// Individual failures are reported per pair, never aborting the run.
    pub async fn run_many(&self, specs: &[PairSpec]) -> Vec<PairOutcome> {
        let run_id = Uuid::new_v4();
        tracing::info!(%run_id, pairs = specs.len(), "starting multi-pack run");

        let semaphore = Arc::new(Semaphore::new(
            self.config.pipeline.max_concurrent_pairs.max(1),
        ));
        let mut handles = Vec::with_capacity(specs.len());

        for spec in specs.iter().cloned() {
            let semaphore = Arc::clone(&semaphore);
            let runner = self.runner();
            let active = Arc::clone(&self.active);
            handles.push(tokio::spawn(async move {
                let pair_id = spec.id.clone();
                let result = match semaphore.acquire().await {
                    Ok(_permit) => match PairLock::acquire(&active, &spec.id) {
                        Ok(_guard) => runner.generate(&spec).await,
                        Err(e) => Err(e),
                    },
                    Err(_) => Err(PipelineError::Cancelled("queue")),
                };
                PairOutcome { pair_id, result }
            }));
        }

        let mut outcomes = Vec::with_capacity(handles.len());
        for handle in handles {
            match handle.await {
                Ok(outcome) => {
                    if let Err(e) = &outcome.result {
                        tracing::error!(
                            %run_id,
                            pack = %outcome.pair_id,
                            category = e.category(),
                            error = %e,
                            "pair generation failed"
                        );
                    }
                    outcomes.push(outcome);
                }
                Err(e) => tracing::error!(%run_id, "pair task panicked: {e}"),
            }
        }

        let succeeded = outcomes.iter().filter(|o| o.result.is_ok()).count();
        tracing::info!(%run_id, succeeded, total = outcomes.len(), "multi-pack run finished");
        outcomes
    }
}

/// Holds the per-pair exclusion entry, releasing it on drop.
struct PairLock {
    active: Arc<Mutex<HashSet<String>>>,
    pair_id: String,
}

impl PairLock {
    fn acquire(
        active: &Arc<Mutex<HashSet<String>>>,
        pair_id: &str,
    ) -> Result<Self, PipelineError> {
        let mut set = active
            .lock()
            .map_err(|_| PipelineError::Internal("pair lock poisoned".to_string()))?;
        if !set.insert(pair_id.to_string()) {
            return Err(PipelineError::PairLocked(pair_id.to_string()));
        }
        Ok(Self {
            active: Arc::clone(active),
            pair_id: pair_id.to_string(),
        })
    }
}

impl Drop for PairLock {
    fn drop(&mut self) {
        if let Ok(mut set) = self.active.lock() {
            set.remove(&self.pair_id);
        }
    }
}
