//! Error types for stagecache
//!
//! All modules use `StageResult<T>` as their return type.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for stagecache operations
pub type StageResult<T> = Result<T, StageError>;

/// All errors that can occur in stagecache
#[derive(Error, Debug)]
pub enum StageError {
    // Per-file staging errors
    #[error("Source file missing: {0}")]
    SourceMissing(PathBuf),

    #[error("Staging failed for {path}: {source}")]
    StagingIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot fingerprint {path}: {source}")]
    HashComputation {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // Session errors
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Failed to create session root {path}: {source}")]
    SessionRootCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to create archive directory {path}: {source}")]
    ArchiveRootCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Session {0} has no result artifacts")]
    NoResults(String),

    #[error("Export target not writable: {path}: {source}")]
    ExportTargetUnwritable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Failed to create config directory {path}: {source}")]
    ConfigDirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid path: {path}: {reason}")]
    PathInvalid { path: PathBuf, reason: String },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("{0}")]
    User(String),
}

impl StageError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a staging IO error for a destination path
    pub fn staging(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::StagingIo {
            path: path.into(),
            source,
        }
    }

    /// Map a read failure on a source file, folding NotFound into `SourceMissing`
    pub fn source_read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            Self::SourceMissing(path)
        } else {
            Self::HashComputation { path, source }
        }
    }

    /// Whether this error only affects a single file and a batch may continue
    pub fn is_skippable(&self) -> bool {
        matches!(
            self,
            Self::SourceMissing(_) | Self::HashComputation { .. } | Self::StagingIo { .. }
        )
    }

    /// Whether retrying the same operation later may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::HashComputation { .. } | Self::StagingIo { .. })
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::SessionNotFound(_) => Some("Run: stagecache list"),
            Self::NoResults(_) => Some("Save artifacts with: stagecache artifact save"),
            Self::HashComputation { .. } => Some("The file may be locked by another process"),
            Self::ConfigInvalid { .. } => Some("Run: stagecache config init --force"),
            _ => None,
        }
    }
}
