pub mod cache;
pub mod reader;
pub mod verify;
pub mod writer;

use polypack_types::VerifyCategory;

pub use cache::{LookupCache, MemoryCache, NoCache};
pub use reader::{ForwardLookup, PackStore, ReverseCandidate};
pub use verify::{IntegrityVerifier, VerifyReport};
pub use writer::StoreWriter;

/// Current on-disk schema version, written into pack metadata.
pub const SCHEMA_VERSION: &str = "2.0";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("{category} verification failed: {detail}")]
    Verification {
        category: VerifyCategory,
        detail: String,
    },
}
