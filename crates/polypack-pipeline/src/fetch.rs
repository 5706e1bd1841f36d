use std::io::Read;
use std::path::PathBuf;
use std::time::Duration;

use flate2::read::GzDecoder;

use polypack_config::SourceConfig;
use polypack_types::PairSpec;

use crate::error::PipelineError;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Source of raw dump bytes for one pack.
#[async_trait::async_trait]
pub trait SourceFetcher: Send + Sync {
    /// Fetches the raw source dump, already decompressed.
    async fn fetch(&self, spec: &PairSpec) -> Result<Vec<u8>, PipelineError>;

    fn name(&self) -> &'static str;
}

/// Downloads dumps over HTTP with bounded retries and doubling backoff.
pub struct HttpFetcher {
    client: reqwest::Client,
    retry_attempts: u32,
    retry_backoff_ms: u64,
}

impl HttpFetcher {
    pub fn new(config: &SourceConfig) -> Result<Self, PipelineError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.fetch_timeout_secs))
            .build()
            .map_err(|e| PipelineError::SourceFetch(format!("http client: {e}")))?;
        Ok(Self {
            client,
            retry_attempts: config.retry_attempts,
            retry_backoff_ms: config.retry_backoff_ms,
        })
    }

    async fn fetch_once(&self, url: &str) -> Result<Vec<u8>, PipelineError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| PipelineError::SourceFetch(e.to_string()))?;
        let response = response
            .error_for_status()
            .map_err(|e| PipelineError::SourceFetch(e.to_string()))?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| PipelineError::SourceFetch(e.to_string()))?;
        Ok(bytes.to_vec())
    }
}

#[async_trait::async_trait]
impl SourceFetcher for HttpFetcher {
    async fn fetch(&self, spec: &PairSpec) -> Result<Vec<u8>, PipelineError> {
        let url = spec
            .url
            .as_deref()
            .ok_or_else(|| PipelineError::SourceFetch(format!("pack {} has no source url", spec.id)))?;

        let mut backoff = Duration::from_millis(self.retry_backoff_ms);
        let mut last_err = None;
        for attempt in 1..=self.retry_attempts.max(1) {
            match self.fetch_once(url).await {
                Ok(bytes) => return decompress_if_gzipped(bytes),
                Err(e) => {
                    tracing::warn!(pack = %spec.id, attempt, error = %e, "source fetch attempt failed");
                    last_err = Some(e);
                    if attempt < self.retry_attempts.max(1) {
                        tokio::time::sleep(backoff).await;
                        backoff *= 2;
                    }
                }
            }
        }
        Err(last_err
            .unwrap_or_else(|| PipelineError::SourceFetch("no fetch attempts made".to_string())))
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

/// Reads dumps from a local directory: `<id>.jsonl` or `<id>.jsonl.gz`.
pub struct FileFetcher {
    root: PathBuf,
}

impl FileFetcher {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait::async_trait]
impl SourceFetcher for FileFetcher {
    async fn fetch(&self, spec: &PairSpec) -> Result<Vec<u8>, PipelineError> {
        let plain = self.root.join(format!("{}.jsonl", spec.id));
        let gzipped = self.root.join(format!("{}.jsonl.gz", spec.id));

        let path = if plain.exists() {
            plain
        } else if gzipped.exists() {
            gzipped
        } else {
            return Err(PipelineError::SourceFetch(format!(
                "no source dump for {} under {}",
                spec.id,
                self.root.display()
            )));
        };

        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|e| PipelineError::SourceFetch(format!("{}: {e}", path.display())))?;
        decompress_if_gzipped(bytes)
    }

    fn name(&self) -> &'static str {
        "file"
    }
}

fn decompress_if_gzipped(bytes: Vec<u8>) -> Result<Vec<u8>, PipelineError> {
    if bytes.len() < 2 || bytes[..2] != GZIP_MAGIC {
        return Ok(bytes);
    }
    let mut out = Vec::new();
    GzDecoder::new(bytes.as_slice())
        .read_to_end(&mut out)
        .map_err(|e| PipelineError::SourceFetch(format!("gzip decode: {e}")))?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use std::io::Write;

    fn spec(id: &str) -> PairSpec {
        PairSpec {
            id: id.to_string(),
            name: id.to_string(),
            source_language: "es".to_string(),
            target_language: "en".to_string(),
            url: None,
            expected_entries: 0,
        }
    }

    #[tokio::test]
    async fn file_fetcher_reads_plain_dump() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join("es-en.jsonl"), b"line\n").unwrap();

        let bytes = FileFetcher::new(dir.path()).fetch(&spec("es-en")).await.unwrap();
        assert_eq!(bytes, b"line\n");
    }

    #[tokio::test]
    async fn file_fetcher_decompresses_gzipped_dump() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut enc = GzEncoder::new(Vec::new(), Compression::default());
        enc.write_all(b"line\n").unwrap();
        std::fs::write(dir.path().join("es-en.jsonl.gz"), enc.finish().unwrap()).unwrap();

        let bytes = FileFetcher::new(dir.path()).fetch(&spec("es-en")).await.unwrap();
        assert_eq!(bytes, b"line\n");
    }

    #[tokio::test]
    async fn file_fetcher_reports_missing_dump() {
        let dir = tempfile::TempDir::new().unwrap();
        let err = FileFetcher::new(dir.path()).fetch(&spec("es-en")).await.unwrap_err();
        assert!(matches!(err, PipelineError::SourceFetch(_)));
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn http_fetcher_requires_a_url() {
        let fetcher = HttpFetcher::new(&SourceConfig::default()).unwrap();
        let err = fetcher.fetch(&spec("es-en")).await.unwrap_err();
        assert!(matches!(err, PipelineError::SourceFetch(_)));
    }
}
