//! Result types returned by staging operations

use crate::error::{StageError, StageResult};
use crate::session::state::{AllocationMode, SessionState};
use crate::staging::category::Category;
use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::warn;

/// A per-file failure inside a batch operation
#[derive(Debug, Serialize)]
pub struct FileFailure {
    pub path: PathBuf,
    #[serde(serialize_with = "error_message")]
    pub error: StageError,
}

impl FileFailure {
    /// Record a failure, logging path and cause
    pub fn new(path: impl Into<PathBuf>, error: StageError) -> Self {
        let path = path.into();
        warn!("Skipping {}: {}", path.display(), error);
        Self { path, error }
    }
}

fn error_message<S: Serializer>(error: &StageError, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&error.to_string())
}

/// A source path classified by change detection
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct ChangedFile {
    pub source: PathBuf,
    pub category: Category,
}

/// Differences between the recorded fingerprints and the files on disk
#[derive(Debug, Default, Serialize)]
pub struct ChangeReport {
    pub modified: Vec<ChangedFile>,
    pub added: Vec<ChangedFile>,
    pub deleted: Vec<ChangedFile>,
    pub failures: Vec<FileFailure>,
}

impl ChangeReport {
    /// No modified, added or deleted files
    pub fn is_empty(&self) -> bool {
        self.modified.is_empty() && self.added.is_empty() && self.deleted.is_empty()
    }

    /// Number of changed files across all three lists
    pub fn total(&self) -> usize {
        self.modified.len() + self.added.len() + self.deleted.len()
    }

    pub(crate) fn sort(&mut self) {
        self.modified.sort();
        self.added.sort();
        self.deleted.sort();
    }
}

/// One file staged by a directory scan
#[derive(Debug, Clone, Serialize)]
pub struct StagedEntry {
    /// Path relative to the scanned directory
    pub relative: PathBuf,
    pub source: PathBuf,
    pub staged: PathBuf,
}

/// Outcome of staging a directory tree
#[derive(Debug, Default, Serialize)]
pub struct StageDirectoryReport {
    pub staged: Vec<StagedEntry>,
    pub failures: Vec<FileFailure>,
}

/// Outcome of applying a change report
#[derive(Debug, Default, Serialize)]
pub struct ApplyReport {
    /// Staged paths for every re-staged modified or added file
    pub staged: Vec<PathBuf>,
    /// Deleted sources that were untracked
    pub untracked: Vec<PathBuf>,
    pub failures: Vec<FileFailure>,
}

/// A derived file stored in a category with no source counterpart
#[derive(Debug, Clone, Serialize)]
pub struct ResultArtifact {
    pub name: String,
    pub path: PathBuf,
    pub size_bytes: u64,
}

impl ResultArtifact {
    /// Read the artifact contents
    pub async fn content(&self) -> StageResult<Vec<u8>> {
        tokio::fs::read(&self.path)
            .await
            .map_err(|e| StageError::io(format!("reading artifact {}", self.path.display()), e))
    }
}

/// Summary of a session's workspace
#[derive(Debug, Clone, Serialize)]
pub struct SessionInfo {
    pub id: String,
    pub root: PathBuf,
    pub mode: AllocationMode,
    pub state: SessionState,
    pub created_at: DateTime<Utc>,
    pub categories: BTreeMap<Category, PathBuf>,
    pub tracked_count: usize,
    pub artifact_count: usize,
}
