//! Content fingerprints for change detection
//!
//! A fingerprint pairs the cheap signals (modified time, size) with a SHA256
//! content hash. Checks compare the cheap signals first and only re-hash when
//! the modified time moved, so unchanged files are never read twice.
//!
//! Sources are only ever opened read-only.

use crate::error::{StageError, StageResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::Path;
use tokio::fs::{self, File};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::debug;

/// Read buffer size for streaming hash and copy
const CHUNK_SIZE: usize = 64 * 1024;

/// Change signature recorded when a file was staged
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fingerprint {
    /// SHA256 of the file contents (hex)
    pub content_hash: String,
    /// Modified time at staging
    pub modified: DateTime<Utc>,
    /// Size in bytes at staging
    pub size_bytes: u64,
}

impl Fingerprint {
    /// Two-level equality: matching modified times are trusted, otherwise
    /// the content hashes decide.
    pub fn matches(&self, other: &Fingerprint) -> bool {
        if self.size_bytes != other.size_bytes {
            return false;
        }
        if self.modified == other.modified {
            return true;
        }
        self.content_hash == other.content_hash
    }
}

/// Outcome of checking a recorded fingerprint against the file on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Timestamp and size unchanged
    Unchanged,
    /// Timestamp moved but content hash is identical
    Touched(Fingerprint),
    /// Content differs
    Modified,
    /// File no longer exists
    Missing,
}

impl Verdict {
    /// Whether the staged copy still reflects the source bytes
    pub fn is_current(&self) -> bool {
        matches!(self, Self::Unchanged | Self::Touched(_))
    }
}

fn modified_of(meta: &std::fs::Metadata, path: &Path) -> StageResult<DateTime<Utc>> {
    meta.modified()
        .map(DateTime::<Utc>::from)
        .map_err(|e| StageError::source_read(path, e))
}

/// Compute a full fingerprint by streaming the file through SHA256
pub async fn compute(path: &Path) -> StageResult<Fingerprint> {
    let mut file = File::open(path)
        .await
        .map_err(|e| StageError::source_read(path, e))?;
    let meta = file
        .metadata()
        .await
        .map_err(|e| StageError::source_read(path, e))?;

    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; CHUNK_SIZE];
    loop {
        let n = file
            .read(&mut buf)
            .await
            .map_err(|e| StageError::source_read(path, e))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }

    Ok(Fingerprint {
        content_hash: hex::encode(hasher.finalize()),
        modified: modified_of(&meta, path)?,
        size_bytes: meta.len(),
    })
}

/// Check a recorded fingerprint against the current state of `path`.
///
/// Hashes only when the modified time differs and the size matches.
pub async fn check(recorded: &Fingerprint, path: &Path) -> StageResult<Verdict> {
    let meta = match fs::metadata(path).await {
        Ok(meta) if meta.is_file() => meta,
        Ok(_) => return Ok(Verdict::Missing),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Verdict::Missing),
        Err(e) => return Err(StageError::source_read(path, e)),
    };

    if meta.len() != recorded.size_bytes {
        return Ok(Verdict::Modified);
    }
    if modified_of(&meta, path)? == recorded.modified {
        return Ok(Verdict::Unchanged);
    }

    debug!("Modified time moved for {}, re-hashing", path.display());
    let current = match compute(path).await {
        Ok(fp) => fp,
        Err(StageError::SourceMissing(_)) => return Ok(Verdict::Missing),
        Err(e) => return Err(e),
    };

    if current.content_hash == recorded.content_hash {
        Ok(Verdict::Touched(current))
    } else {
        Ok(Verdict::Modified)
    }
}

/// Copy `source` into `dest`, hashing the bytes as they stream through.
///
/// The returned fingerprint describes exactly the bytes written to `dest`.
/// On error `dest` may hold a partial copy; the caller owns its cleanup.
pub async fn copy_fingerprinted(source: &Path, dest: &Path) -> StageResult<Fingerprint> {
    let mut reader = File::open(source)
        .await
        .map_err(|e| StageError::source_read(source, e))?;
    let meta = reader
        .metadata()
        .await
        .map_err(|e| StageError::source_read(source, e))?;
    let modified = modified_of(&meta, source)?;

    let mut writer = File::create(dest)
        .await
        .map_err(|e| StageError::staging(dest, e))?;

    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; CHUNK_SIZE];
    let mut size_bytes = 0u64;
    loop {
        let n = reader
            .read(&mut buf)
            .await
            .map_err(|e| StageError::source_read(source, e))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
        writer
            .write_all(&buf[..n])
            .await
            .map_err(|e| StageError::staging(dest, e))?;
        size_bytes += n as u64;
    }

    writer.flush().await.map_err(|e| StageError::staging(dest, e))?;
    writer
        .sync_all()
        .await
        .map_err(|e| StageError::staging(dest, e))?;

    Ok(Fingerprint {
        content_hash: hex::encode(hasher.finalize()),
        modified,
        size_bytes,
    })
}
