//! On-disk record of a session's tracked files
//!
//! Lives at `{session_root}/.stagecache-manifest.json`, outside every
//! category directory, and is replaced atomically (write temp, rename).

use crate::error::{StageError, StageResult};
use crate::session::state::AllocationMode;
use crate::staging::category::Category;
use crate::staging::fingerprint::Fingerprint;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// Manifest file name inside the session root
pub const MANIFEST_FILE: &str = ".stagecache-manifest.json";

/// A source file mirrored into the session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedFile {
    /// Original absolute source path
    pub source: PathBuf,
    /// Category the copy lives in
    pub category: Category,
    /// File name of the copy inside the category directory
    pub staged_name: String,
    /// Fingerprint of the bytes that were copied
    pub fingerprint: Fingerprint,
}

/// Serialized session record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    pub id: String,
    pub mode: AllocationMode,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub tracked: Vec<TrackedFile>,
}

impl Manifest {
    /// Manifest path for a session root
    pub fn path(root: &Path) -> PathBuf {
        root.join(MANIFEST_FILE)
    }

    /// Load the manifest from a session root, if one was written
    pub async fn load(root: &Path) -> StageResult<Option<Self>> {
        let path = Self::path(root);
        let content = match fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(StageError::io(
                    format!("reading manifest {}", path.display()),
                    e,
                ))
            }
        };

        let manifest: Manifest = serde_json::from_str(&content)?;
        Ok(Some(manifest))
    }

    /// Move an unreadable manifest aside so the session can start over.
    ///
    /// Returns where the file went, or its original path if it could not be moved.
    pub async fn quarantine(root: &Path) -> PathBuf {
        let path = Self::path(root);
        let aside = root.join(format!(
            "{}.corrupt-{}",
            MANIFEST_FILE,
            Utc::now().format("%Y%m%d_%H%M%S%3f")
        ));
        match fs::rename(&path, &aside).await {
            Ok(()) => aside,
            Err(e) => {
                debug!("Could not move {} aside: {}", path.display(), e);
                path
            }
        }
    }

    /// Write the manifest into a session root
    pub async fn save(&self, root: &Path) -> StageResult<()> {
        let path = Self::path(root);
        let tmp = root.join(format!("{}.tmp", MANIFEST_FILE));

        let content = serde_json::to_string_pretty(self)?;
        fs::write(&tmp, content)
            .await
            .map_err(|e| StageError::io(format!("writing manifest {}", tmp.display()), e))?;
        fs::rename(&tmp, &path)
            .await
            .map_err(|e| StageError::io(format!("replacing manifest {}", path.display()), e))?;

        Ok(())
    }
}
