pub mod catalog;
pub mod error;
pub mod fetch;
pub mod package;
pub mod pool;
pub mod publish;
pub mod registry;
pub mod runner;

pub use catalog::Catalog;
pub use error::PipelineError;
pub use fetch::{FileFetcher, HttpFetcher, SourceFetcher};
pub use package::{PackageInfo, package_store, sha256_file};
pub use pool::{PairOutcome, PipelinePool};
pub use publish::{LocalPublisher, Publisher, publish_with_retry};
pub use registry::Registry;
pub use runner::{PackSummary, PairRunner};
