use std::fs::{self, File};
use std::io::{BufReader, Read, Write};
use std::path::{Path, PathBuf};

use flate2::Compression;
use flate2::write::GzEncoder;
use sha2::{Digest, Sha256};

use crate::error::PipelineError;

/// A packaged, checksummed artifact ready for distribution.
#[derive(Debug, Clone)]
pub struct PackageInfo {
    pub path: PathBuf,
    pub size_bytes: u64,
    pub checksum: String,
}

/// Gzips a written store next to itself and computes its sha256.
///
/// Same publish discipline as the store writer: compress into a `.tmp`
/// sibling, rename when complete.
pub fn package_store(store_path: &Path) -> Result<PackageInfo, PipelineError> {
    let artifact = artifact_path(store_path);
    let tmp = tmp_path(&artifact);

    {
        let mut reader = BufReader::new(File::open(store_path)?);
        let mut encoder = GzEncoder::new(File::create(&tmp)?, Compression::default());
        let mut buf = [0u8; 8192];
        loop {
            let n = reader.read(&mut buf)?;
            if n == 0 {
                break;
            }
            encoder.write_all(&buf[..n])?;
        }
        encoder.finish()?;
    }
    fs::rename(&tmp, &artifact)?;

    let size_bytes = fs::metadata(&artifact)?.len();
    let checksum = sha256_file(&artifact)?;
    tracing::info!(
        artifact = %artifact.display(),
        size_bytes,
        "packaged store artifact"
    );
    Ok(PackageInfo {
        path: artifact,
        size_bytes,
        checksum,
    })
}

pub fn sha256_file(path: &Path) -> Result<String, PipelineError> {
    let mut reader = BufReader::new(File::open(path)?);
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 8192];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

fn artifact_path(store_path: &Path) -> PathBuf {
    let mut os = store_path.as_os_str().to_os_string();
    os.push(".gz");
    PathBuf::from(os)
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut os = path.as_os_str().to_os_string();
    os.push(".tmp");
    PathBuf::from(os)
}
