use polypack_core::{BuildError, SourceQualityError};
use polypack_store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("source fetch failed: {0}")]
    SourceFetch(String),
    // bad input for this pair, not a logic defect; not retryable either
    #[error(transparent)]
    SourceQuality(#[from] SourceQualityError),
    #[error(transparent)]
    Build(#[from] BuildError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("publish failed: {0}")]
    Publish(String),
    #[error("cancelled during {0}")]
    Cancelled(&'static str),
    #[error("pair {0} is already being generated")]
    PairLocked(String),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Internal(String),
}

impl PipelineError {
    /// Transient failures are worth retrying; everything else means the
    /// input or the code is wrong.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            PipelineError::SourceFetch(_) | PipelineError::Publish(_)
        )
    }

    /// Short stable tag for logs and exit reporting.
    pub fn category(&self) -> &'static str {
        match self {
            PipelineError::SourceFetch(_) => "source-fetch",
            PipelineError::SourceQuality(_) => "source-quality",
            PipelineError::Build(_) => "build",
            PipelineError::Store(_) => "store",
            PipelineError::Publish(_) => "publish",
            PipelineError::Cancelled(_) => "cancelled",
            PipelineError::PairLocked(_) => "pair-locked",
            PipelineError::Io(_) => "io",
            PipelineError::Internal(_) => "internal",
        }
    }
}
