pub mod build;
pub mod group;
pub mod meaning;
pub mod normalize;
pub mod reverse;

pub use build::{BuildError, Lexicon, LexiconBuilder, assemble};
pub use group::{FirstSeen, GroupDraft, LemmaPolicy, RawGloss, WordGroupBuilder};
pub use meaning::{MeaningAssigner, MeaningDraft};
pub use normalize::{IntermediateRecord, NormalizeReport, Normalizer, SourceQualityError};
pub use reverse::ReverseIndexBuilder;
