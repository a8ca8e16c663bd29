//! Export and archival of session result artifacts

use crate::error::{StageError, StageResult};
use crate::staging::{Category, StagingSession};
use chrono::Utc;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};
use uuid::Uuid;

/// Where an archive was written and how many files it holds
#[derive(Debug, Clone, Serialize)]
pub struct ArchiveReport {
    pub dir: PathBuf,
    pub files: usize,
}

/// Copies result artifacts out of a session
#[derive(Debug, Clone)]
pub struct ResultSink {
    archive_root: PathBuf,
}

impl ResultSink {
    /// Create a sink archiving under `archive_root`
    pub fn new(archive_root: impl Into<PathBuf>) -> Self {
        Self {
            archive_root: archive_root.into(),
        }
    }

    pub fn archive_root(&self) -> &Path {
        &self.archive_root
    }

    /// Copy every result artifact into `dest`, returning how many were copied
    pub async fn export(&self, session: &StagingSession, dest: &Path) -> StageResult<usize> {
        let artifacts = session.list_artifacts(Category::Results).await?;
        if artifacts.is_empty() {
            return Err(StageError::NoResults(session.id().to_string()));
        }

        fs::create_dir_all(dest)
            .await
            .map_err(|e| StageError::ExportTargetUnwritable {
                path: dest.to_path_buf(),
                source: e,
            })?;

        for artifact in &artifacts {
            let target = dest.join(&artifact.name);
            fs::copy(&artifact.path, &target)
                .await
                .map_err(|e| StageError::ExportTargetUnwritable {
                    path: target.clone(),
                    source: e,
                })?;
            debug!("Exported {}", target.display());
        }

        info!(
            "Exported {} result(s) from {} to {}",
            artifacts.len(),
            session.id(),
            dest.display()
        );
        Ok(artifacts.len())
    }

    /// Copy result artifacts into `{archive_root}/{id}_{timestamp}_{tag}`.
    ///
    /// The timestamp has millisecond resolution and the random tag keeps two
    /// archives of the same session apart even within one millisecond.
    ///
    /// Returns `None` when there is nothing to archive, including when the
    /// results directory is already gone.
    pub async fn archive(&self, session: &StagingSession) -> StageResult<Option<ArchiveReport>> {
        let artifacts = match session.list_artifacts(Category::Results).await {
            Ok(artifacts) => artifacts,
            Err(StageError::SessionNotFound(_)) => Vec::new(),
            Err(e) => return Err(e),
        };
        if artifacts.is_empty() {
            debug!("No results to archive for {}", session.id());
            return Ok(None);
        }

        let tag = Uuid::new_v4().simple().to_string();
        let dir = self.archive_root.join(format!(
            "{}_{}_{}",
            session.id(),
            Utc::now().format("%Y%m%d_%H%M%S%3f"),
            &tag[..6]
        ));
        fs::create_dir_all(&dir)
            .await
            .map_err(|e| StageError::ArchiveRootCreate {
                path: dir.clone(),
                source: e,
            })?;

        for artifact in &artifacts {
            let target = dir.join(&artifact.name);
            fs::copy(&artifact.path, &target).await.map_err(|e| {
                StageError::io(format!("archiving {}", artifact.path.display()), e)
            })?;
        }

        info!(
            "Archived {} result(s) from {} to {}",
            artifacts.len(),
            session.id(),
            dir.display()
        );
        Ok(Some(ArchiveReport {
            dir,
            files: artifacts.len(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::state::AllocationMode;
    use tempfile::TempDir;

    async fn session_with_results(dir: &TempDir, count: usize) -> StagingSession {
        let mut session = StagingSession::init(
            "session_1700000000000_sink01".to_string(),
            dir.path().join("app").join("session_1700000000000_sink01"),
            AllocationMode::Ephemeral,
        )
        .await
        .unwrap();
        for i in 0..count {
            session
                .save_artifact(
                    Category::Results,
                    &format!("result_{}.json", i),
                    format!("{{\"n\":{}}}", i).as_bytes(),
                )
                .await
                .unwrap();
        }
        session
    }

    #[tokio::test]
    async fn export_copies_results() {
        let dir = TempDir::new().unwrap();
        let session = session_with_results(&dir, 2).await;
        let sink = ResultSink::new(dir.path().join("archive"));
        let dest = dir.path().join("out").join("nested");

        let count = sink.export(&session, &dest).await.unwrap();

        assert_eq!(count, 2);
        assert_eq!(
            std::fs::read(dest.join("result_1.json")).unwrap(),
            b"{\"n\":1}"
        );
    }

    #[tokio::test]
    async fn export_without_results_fails() {
        let dir = TempDir::new().unwrap();
        let session = session_with_results(&dir, 0).await;
        let sink = ResultSink::new(dir.path().join("archive"));

        let err = sink
            .export(&session, &dir.path().join("out"))
            .await
            .unwrap_err();
        assert!(matches!(err, StageError::NoResults(_)));
    }

    #[tokio::test]
    async fn export_from_removed_session_fails() {
        let dir = TempDir::new().unwrap();
        let session = session_with_results(&dir, 1).await;
        std::fs::remove_dir_all(session.root()).unwrap();
        let sink = ResultSink::new(dir.path().join("archive"));

        let err = sink
            .export(&session, &dir.path().join("out"))
            .await
            .unwrap_err();
        assert!(matches!(err, StageError::SessionNotFound(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn export_to_unwritable_target() {
        let dir = TempDir::new().unwrap();
        let session = session_with_results(&dir, 1).await;
        let sink = ResultSink::new(dir.path().join("archive"));

        // A regular file where the destination directory should be
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"").unwrap();

        let err = sink
            .export(&session, &blocker.join("out"))
            .await
            .unwrap_err();
        assert!(matches!(err, StageError::ExportTargetUnwritable { .. }));
    }

    #[tokio::test]
    async fn archive_copies_into_timestamped_dir() {
        let dir = TempDir::new().unwrap();
        let session = session_with_results(&dir, 3).await;
        let sink = ResultSink::new(dir.path().join("archive"));

        let report = sink.archive(&session).await.unwrap().unwrap();

        assert_eq!(report.files, 3);
        assert!(report.dir.starts_with(dir.path().join("archive")));
        let name = report.dir.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("session_1700000000000_sink01_"));
    }

    #[tokio::test]
    async fn repeated_archives_do_not_merge() {
        let dir = TempDir::new().unwrap();
        let session = session_with_results(&dir, 2).await;
        let sink = ResultSink::new(dir.path().join("archive"));

        let first = sink.archive(&session).await.unwrap().unwrap();
        let second = sink.archive(&session).await.unwrap().unwrap();

        assert_ne!(first.dir, second.dir);
        assert_eq!(std::fs::read_dir(sink.archive_root()).unwrap().count(), 2);
        for report in [&first, &second] {
            assert_eq!(std::fs::read_dir(&report.dir).unwrap().count(), 2);
        }
    }

    #[tokio::test]
    async fn archive_empty_is_none() {
        let dir = TempDir::new().unwrap();
        let session = session_with_results(&dir, 0).await;
        let sink = ResultSink::new(dir.path().join("archive"));

        assert!(sink.archive(&session).await.unwrap().is_none());
        assert!(!dir.path().join("archive").exists());
    }
}
