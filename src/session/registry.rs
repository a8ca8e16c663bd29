//! Session creation, lookup, teardown and garbage collection

use crate::audit::{AuditEvent, AuditLog};
use crate::config::Config;
use crate::error::{StageError, StageResult};
use crate::session::sink::{ArchiveReport, ResultSink};
use crate::session::state::{
    ephemeral_id, is_ephemeral_id, AllocationMode, SessionState, PERSISTENT_DIR,
};
use crate::staging::manifest::Manifest;
use crate::staging::{FileFailure, StagingSession};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tokio::fs;
use tracing::{debug, info};

/// Default age after which abandoned ephemeral sessions are collected
pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(24 * 60 * 60);

/// Teardown behaviour
#[derive(Debug, Clone, Copy, Default)]
pub struct TeardownOptions {
    /// Copy results to the archive root before removal
    pub archive: bool,
}

/// Outcome of a teardown
#[derive(Debug, Clone, Serialize)]
pub struct TeardownReport {
    pub id: String,
    pub archive: Option<ArchiveReport>,
    pub state: SessionState,
}

/// Listing entry for a session directory
#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub id: String,
    pub mode: AllocationMode,
    pub root: PathBuf,
    pub last_modified: DateTime<Utc>,
    pub tracked_count: usize,
}

/// Outcome of a garbage collection pass
#[derive(Debug, Default, Serialize)]
pub struct GcReport {
    /// Ids of sessions removed (or that would be, on a dry run)
    pub removed: Vec<String>,
    /// Ephemeral sessions younger than the threshold
    pub kept: usize,
    pub failures: Vec<FileFailure>,
}

/// Creates and tracks session workspaces under one app root
#[derive(Debug, Clone)]
pub struct SessionRegistry {
    app_root: PathBuf,
    sink: ResultSink,
    audit: AuditLog,
}

impl SessionRegistry {
    /// Registry over `app_root`, archiving results under `archive_root`
    pub fn new(app_root: impl Into<PathBuf>, archive_root: impl Into<PathBuf>) -> Self {
        Self {
            app_root: app_root.into(),
            sink: ResultSink::new(archive_root),
            audit: AuditLog::disabled(),
        }
    }

    /// Registry using the configured roots and audit journal
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.staging.app_root(), config.staging.archive_root())
            .with_audit(AuditLog::new(config))
    }

    /// Replace the audit journal
    pub fn with_audit(mut self, audit: AuditLog) -> Self {
        self.audit = audit;
        self
    }

    pub fn app_root(&self) -> &Path {
        &self.app_root
    }

    pub fn sink(&self) -> &ResultSink {
        &self.sink
    }

    /// Create a session. Persistent sessions reopen the shared workspace.
    pub async fn create(&self, mode: AllocationMode) -> StageResult<StagingSession> {
        fs::create_dir_all(&self.app_root)
            .await
            .map_err(|e| StageError::SessionRootCreate {
                path: self.app_root.clone(),
                source: e,
            })?;

        let id = match mode {
            AllocationMode::Persistent => PERSISTENT_DIR.to_string(),
            AllocationMode::Ephemeral => self.unused_ephemeral_id().await,
        };
        let root = self.app_root.join(&id);
        let session = StagingSession::init(id, root, mode).await?;

        info!("Created {} session: {}", mode, session.id());
        self.audit
            .log(
                AuditEvent::SessionCreated,
                &serde_json::json!({
                    "id": session.id(),
                    "mode": mode.to_string(),
                    "root": session.root().display().to_string(),
                }),
            )
            .await;
        Ok(session)
    }

    /// Open an existing session by id
    pub async fn open(&self, id: &str) -> StageResult<StagingSession> {
        let (mode, root) = self.existing_root(id).await?;
        StagingSession::init(id.to_string(), root, mode).await
    }

    /// List session directories under the app root, newest first
    pub async fn list(&self) -> StageResult<Vec<SessionSummary>> {
        let mut summaries = Vec::new();
        for (id, root, modified) in self.session_dirs().await? {
            let mode = if id == PERSISTENT_DIR {
                AllocationMode::Persistent
            } else {
                AllocationMode::Ephemeral
            };
            let tracked_count = match Manifest::load(&root).await {
                Ok(Some(manifest)) => manifest.tracked.len(),
                Ok(None) => 0,
                Err(e) => {
                    debug!("Unreadable manifest in {}: {}", root.display(), e);
                    0
                }
            };
            summaries.push(SessionSummary {
                id,
                mode,
                root,
                last_modified: DateTime::<Utc>::from(modified),
                tracked_count,
            });
        }

        summaries.sort_by(|a, b| b.last_modified.cmp(&a.last_modified));
        Ok(summaries)
    }

    /// Remove ephemeral sessions whose directory is older than `max_age`
    pub async fn collect_garbage(&self, max_age: Duration) -> StageResult<GcReport> {
        self.gc_pass(max_age, false).await
    }

    /// Report which sessions `collect_garbage` would remove, without removing
    pub async fn gc_candidates(&self, max_age: Duration) -> StageResult<GcReport> {
        self.gc_pass(max_age, true).await
    }

    /// Close a session: archive results if requested, then remove its tree
    pub async fn teardown(
        &self,
        mut session: StagingSession,
        options: TeardownOptions,
    ) -> StageResult<TeardownReport> {
        session.begin_close();

        let archive = if options.archive {
            self.sink.archive(&session).await?
        } else {
            None
        };

        remove_tree(session.root()).await?;

        info!("Tore down session: {}", session.id());
        self.audit
            .log(
                AuditEvent::SessionTeardown,
                &serde_json::json!({
                    "id": session.id(),
                    "archived": archive.as_ref().map(|a| a.dir.display().to_string()),
                }),
            )
            .await;

        Ok(TeardownReport {
            id: session.id().to_string(),
            archive,
            state: SessionState::Destroyed,
        })
    }

    /// Tear down a session by id.
    ///
    /// Without archiving, the tree is removed without reading its manifest.
    pub async fn teardown_id(
        &self,
        id: &str,
        options: TeardownOptions,
    ) -> StageResult<TeardownReport> {
        if options.archive {
            let session = self.open(id).await?;
            return self.teardown(session, options).await;
        }

        let (_, root) = self.existing_root(id).await?;
        remove_tree(&root).await?;

        info!("Tore down session: {}", id);
        self.audit
            .log(
                AuditEvent::SessionTeardown,
                &serde_json::json!({ "id": id, "archived": null }),
            )
            .await;

        Ok(TeardownReport {
            id: id.to_string(),
            archive: None,
            state: SessionState::Destroyed,
        })
    }

    /// Export a session's results, recording the export in the audit journal
    pub async fn export(&self, session: &StagingSession, dest: &Path) -> StageResult<usize> {
        let count = self.sink.export(session, dest).await?;
        self.audit
            .log(
                AuditEvent::SessionExported,
                &serde_json::json!({
                    "id": session.id(),
                    "dest": dest.display().to_string(),
                    "count": count,
                }),
            )
            .await;
        Ok(count)
    }

    async fn gc_pass(&self, max_age: Duration, dry_run: bool) -> StageResult<GcReport> {
        let cutoff = SystemTime::now()
            .checked_sub(max_age)
            .unwrap_or(SystemTime::UNIX_EPOCH);
        let mut report = GcReport::default();

        for (id, root, modified) in self.session_dirs().await? {
            if !is_ephemeral_id(&id) {
                continue;
            }
            if modified >= cutoff {
                report.kept += 1;
                continue;
            }

            if dry_run {
                report.removed.push(id);
                continue;
            }

            match remove_tree(&root).await {
                Ok(()) => {
                    info!("Collected abandoned session: {}", id);
                    self.audit
                        .log(AuditEvent::GcRemoved, &serde_json::json!({ "id": id }))
                        .await;
                    report.removed.push(id);
                }
                Err(e) => report.failures.push(FileFailure::new(&root, e)),
            }
        }

        Ok(report)
    }

    /// Session directories (ephemeral ids and `persistent`) with their mtimes
    async fn session_dirs(&self) -> StageResult<Vec<(String, PathBuf, SystemTime)>> {
        let mut entries = match fs::read_dir(&self.app_root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(StageError::io(
                    format!("reading {}", self.app_root.display()),
                    e,
                ))
            }
        };

        let mut dirs = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| StageError::io("reading session entry", e))?
        {
            let id = entry.file_name().to_string_lossy().into_owned();
            if id != PERSISTENT_DIR && !is_ephemeral_id(&id) {
                continue;
            }
            let Ok(meta) = entry.metadata().await else {
                continue;
            };
            if !meta.is_dir() {
                continue;
            }
            let modified = meta.modified().unwrap_or_else(|_| SystemTime::now());
            dirs.push((id, entry.path(), modified));
        }

        Ok(dirs)
    }

    /// Mode and root of an existing session directory
    async fn existing_root(&self, id: &str) -> StageResult<(AllocationMode, PathBuf)> {
        let mode = if id == PERSISTENT_DIR {
            AllocationMode::Persistent
        } else if is_ephemeral_id(id) {
            AllocationMode::Ephemeral
        } else {
            return Err(StageError::SessionNotFound(id.to_string()));
        };

        let root = self.app_root.join(id);
        match fs::metadata(&root).await {
            Ok(meta) if meta.is_dir() => Ok((mode, root)),
            _ => Err(StageError::SessionNotFound(id.to_string())),
        }
    }

    async fn unused_ephemeral_id(&self) -> String {
        loop {
            let id = ephemeral_id();
            if !fs::try_exists(self.app_root.join(&id)).await.unwrap_or(false) {
                return id;
            }
        }
    }
}

/// Remove a directory tree; an already-missing tree is success
async fn remove_tree(root: &Path) -> StageResult<()> {
    match fs::remove_dir_all(root).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!("{} already removed", root.display());
            Ok(())
        }
        Err(e) => Err(StageError::io(format!("removing {}", root.display()), e)),
    }
}
