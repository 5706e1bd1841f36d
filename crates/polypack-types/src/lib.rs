pub mod event;
pub mod types;

pub use event::{Stage, StageEvent};
pub use types::{
    InvalidPairId, LanguagePair, Meaning, MeaningId, PackManifest, PairSpec, ReverseLookupEntry,
    VerifyCategory, WordGroup, WordGroupId,
};
