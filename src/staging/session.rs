//! Staging session: one exclusively owned workspace tree
//!
//! Layout:
//! ```text
//! {root}/
//! ├── input_files/        # staged source copies
//! ├── collected_jsons/
//! ├── fixed_jsons/
//! ├── results/            # result artifacts
//! └── .stagecache-manifest.json
//! ```
//!
//! A fingerprint is recorded only after its copy has been renamed into place,
//! so an interrupted stage leaves the session exactly as it was before.

use crate::error::{StageError, StageResult};
use crate::session::state::{AllocationMode, SessionState};
use crate::staging::category::Category;
use crate::staging::fingerprint::{self, Fingerprint, Verdict};
use crate::staging::manifest::{Manifest, TrackedFile};
use crate::staging::report::{
    ApplyReport, ChangeReport, ChangedFile, FileFailure, ResultArtifact, SessionInfo,
    StageDirectoryReport, StagedEntry,
};
use crate::staging::translate;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;
use walkdir::WalkDir;

/// Suffix marker for in-flight copies
const PARTIAL_MARKER: &str = ".partial-";

type TrackKey = (Category, PathBuf);

/// A session shared between tasks; the mutex serializes writers
pub type SharedSession = Arc<Mutex<StagingSession>>;

/// A staging workspace
#[derive(Debug)]
pub struct StagingSession {
    id: String,
    root: PathBuf,
    mode: AllocationMode,
    state: SessionState,
    created_at: DateTime<Utc>,
    tracked: BTreeMap<TrackKey, TrackedFile>,
}

impl StagingSession {
    /// Create the workspace tree (if needed) and load any existing manifest
    pub(crate) async fn init(id: String, root: PathBuf, mode: AllocationMode) -> StageResult<Self> {
        for dir in std::iter::once(root.clone())
            .chain(Category::all().iter().map(|c| root.join(c.dir_name())))
        {
            fs::create_dir_all(&dir)
                .await
                .map_err(|e| StageError::SessionRootCreate {
                    path: dir.clone(),
                    source: e,
                })?;
        }

        let mut session = Self {
            id,
            root,
            mode,
            state: SessionState::Created,
            created_at: Utc::now(),
            tracked: BTreeMap::new(),
        };

        let manifest = match Manifest::load(&session.root).await {
            Ok(manifest) => manifest,
            Err(StageError::Json(e)) => {
                // Every source re-stages on the next pass
                let aside = Manifest::quarantine(&session.root).await;
                warn!(
                    "Ignoring unreadable manifest for {} ({}), moved to {}",
                    session.id,
                    e,
                    aside.display()
                );
                None
            }
            Err(e) => return Err(e),
        };

        if let Some(manifest) = manifest {
            debug!(
                "Loaded manifest for {} with {} tracked files",
                session.id,
                manifest.tracked.len()
            );
            session.created_at = manifest.created_at;
            session.tracked = manifest
                .tracked
                .into_iter()
                .map(|t| ((t.category, t.source.clone()), t))
                .collect();
            if !session.tracked.is_empty() {
                session.state = SessionState::Active;
            }
        }

        Ok(session)
    }

    /// Wrap the session for use from several tasks
    pub fn into_shared(self) -> SharedSession {
        Arc::new(Mutex::new(self))
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn mode(&self) -> AllocationMode {
        self.mode
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Absolute path of a category directory
    pub fn category_dir(&self, category: Category) -> PathBuf {
        self.root.join(category.dir_name())
    }

    /// Number of tracked source files
    pub fn tracked_count(&self) -> usize {
        self.tracked.len()
    }

    /// All tracked files
    pub fn tracked(&self) -> impl Iterator<Item = &TrackedFile> {
        self.tracked.values()
    }

    /// Staged location of a tracked source
    pub fn staged_path(&self, source: &Path, category: Category) -> Option<PathBuf> {
        self.tracked
            .get(&(category, lookup_key(source)))
            .map(|t| self.category_dir(t.category).join(&t.staged_name))
    }

    /// Source path behind a staged copy
    pub fn source_for(&self, staged: &Path) -> Option<&Path> {
        self.tracked
            .values()
            .find(|t| self.category_dir(t.category).join(&t.staged_name) == staged)
            .map(|t| t.source.as_path())
    }

    /// Recorded fingerprint for a tracked source
    pub fn fingerprint(&self, source: &Path, category: Category) -> Option<&Fingerprint> {
        self.tracked
            .get(&(category, lookup_key(source)))
            .map(|t| &t.fingerprint)
    }

    /// Stage one source file, copying only if it changed since last staged
    pub async fn stage(&mut self, source: &Path, category: Category) -> StageResult<PathBuf> {
        let staged = self.stage_one(source, category).await?;
        self.persist().await?;
        Ok(staged)
    }

    /// Stage every file under `dir`, skipping (and reporting) files that fail
    pub async fn stage_directory(
        &mut self,
        dir: &Path,
        category: Category,
    ) -> StageResult<StageDirectoryReport> {
        self.stage_directory_with(dir, category, |_, _| {}).await
    }

    /// Like [`stage_directory`](Self::stage_directory), calling
    /// `progress(done, total)` after each file
    pub async fn stage_directory_with<F>(
        &mut self,
        dir: &Path,
        category: Category,
        mut progress: F,
    ) -> StageResult<StageDirectoryReport>
    where
        F: FnMut(usize, usize),
    {
        let dir = translate::absolutize(dir)?;
        let dir = dir.as_path();
        let meta = fs::metadata(dir)
            .await
            .map_err(|e| StageError::source_read(dir, e))?;
        if !meta.is_dir() {
            return Err(StageError::PathInvalid {
                path: dir.to_path_buf(),
                reason: "not a directory".to_string(),
            });
        }

        let mut report = StageDirectoryReport::default();
        let (files, walk_errors) = walk_files(dir.to_path_buf()).await?;
        report.failures.extend(walk_errors);

        let total = files.len();
        info!("Staging {} files from {}", total, dir.display());

        for (done, source) in files.into_iter().enumerate() {
            match self.stage_one(&source, category).await {
                Ok(staged) => {
                    let relative = source
                        .strip_prefix(dir)
                        .map(Path::to_path_buf)
                        .unwrap_or_else(|_| source.clone());
                    report.staged.push(StagedEntry {
                        relative,
                        source,
                        staged,
                    });
                }
                Err(e) => report.failures.push(FileFailure::new(source, e)),
            }
            progress(done + 1, total);
        }

        self.persist().await?;
        Ok(report)
    }

    /// Compare tracked fingerprints with the files on disk.
    ///
    /// With `sources`, only those paths are checked and untracked ones are
    /// reported as added to the input category.
    pub async fn detect_changes(&self, sources: Option<&[PathBuf]>) -> ChangeReport {
        self.detect_changes_as(sources, Category::Input).await
    }

    /// Change detection that reports untracked paths as added to `added_category`
    pub async fn detect_changes_as(
        &self,
        sources: Option<&[PathBuf]>,
        added_category: Category,
    ) -> ChangeReport {
        let mut report = ChangeReport::default();

        match sources {
            None => {
                for entry in self.tracked.values() {
                    self.classify(entry, &mut report).await;
                }
            }
            Some(sources) => {
                let mut wanted = HashSet::new();
                for source in sources {
                    match translate::absolutize(source) {
                        Ok(path) => {
                            wanted.insert(path);
                        }
                        Err(e) => report.failures.push(FileFailure::new(source, e)),
                    }
                }
                for source in &wanted {
                    let source = source.as_path();
                    let mut found = false;
                    for entry in self.tracked.values().filter(|t| t.source == source) {
                        found = true;
                        self.classify(entry, &mut report).await;
                    }
                    if !found {
                        match fs::metadata(source).await {
                            Ok(meta) if meta.is_file() => report.added.push(ChangedFile {
                                source: source.to_path_buf(),
                                category: added_category,
                            }),
                            Ok(_) => report.failures.push(FileFailure::new(
                                source,
                                StageError::PathInvalid {
                                    path: source.to_path_buf(),
                                    reason: "not a regular file".to_string(),
                                },
                            )),
                            Err(e) => report
                                .failures
                                .push(FileFailure::new(source, StageError::source_read(source, e))),
                        }
                    }
                }
            }
        }

        report.sort();
        debug!(
            "Change detection for {}: {} modified, {} added, {} deleted",
            self.id,
            report.modified.len(),
            report.added.len(),
            report.deleted.len()
        );
        report
    }

    /// Re-stage modified and added files and untrack deleted ones.
    ///
    /// Applying the same report twice performs no further copies.
    pub async fn apply_changes(&mut self, report: &ChangeReport) -> StageResult<ApplyReport> {
        let mut applied = ApplyReport::default();

        for change in report.modified.iter().chain(report.added.iter()) {
            match self.stage_one(&change.source, change.category).await {
                Ok(staged) => applied.staged.push(staged),
                Err(e) => applied.failures.push(FileFailure::new(&change.source, e)),
            }
        }

        for change in &report.deleted {
            if fs::try_exists(&change.source).await.unwrap_or(false) {
                debug!("{} reappeared, keeping it tracked", change.source.display());
                continue;
            }
            if let Some(entry) = self
                .tracked
                .remove(&(change.category, change.source.clone()))
            {
                let staged = self.category_dir(entry.category).join(&entry.staged_name);
                if let Err(e) = fs::remove_file(&staged).await {
                    if e.kind() != std::io::ErrorKind::NotFound {
                        applied
                            .failures
                            .push(FileFailure::new(&staged, StageError::staging(&staged, e)));
                    }
                }
                applied.untracked.push(entry.source);
            }
        }

        self.persist().await?;
        Ok(applied)
    }

    /// Write a derived artifact into a category directory
    pub async fn save_artifact(
        &mut self,
        category: Category,
        name: &str,
        content: &[u8],
    ) -> StageResult<PathBuf> {
        validate_artifact_name(name)?;

        let path = self.category_dir(category).join(name);
        let partial = partial_path(&path);
        if let Err(e) = fs::write(&partial, content).await {
            let _ = fs::remove_file(&partial).await;
            return Err(StageError::staging(&path, e));
        }
        if let Err(e) = fs::rename(&partial, &path).await {
            let _ = fs::remove_file(&partial).await;
            return Err(StageError::staging(&path, e));
        }

        self.state = SessionState::Active;
        debug!("Saved artifact {} ({} bytes)", path.display(), content.len());
        Ok(path)
    }

    /// Artifacts in a category: regular files that are not staged source copies
    pub async fn list_artifacts(&self, category: Category) -> StageResult<Vec<ResultArtifact>> {
        let dir = self.category_dir(category);
        let staged_names: HashSet<&str> = self
            .tracked
            .values()
            .filter(|t| t.category == category)
            .map(|t| t.staged_name.as_str())
            .collect();

        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StageError::SessionNotFound(self.id.clone()))
            }
            Err(e) => return Err(StageError::io(format!("reading {}", dir.display()), e)),
        };

        let mut artifacts = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| StageError::io(format!("reading {}", dir.display()), e))?
        {
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.contains(PARTIAL_MARKER) || staged_names.contains(name.as_str()) {
                continue;
            }
            let meta = entry
                .metadata()
                .await
                .map_err(|e| StageError::io(format!("inspecting {}", name), e))?;
            if !meta.is_file() {
                continue;
            }
            artifacts.push(ResultArtifact {
                name,
                path: entry.path(),
                size_bytes: meta.len(),
            });
        }

        artifacts.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(artifacts)
    }

    /// Summary of the session
    pub async fn info(&self) -> StageResult<SessionInfo> {
        let artifact_count = self.list_artifacts(Category::Results).await?.len();
        Ok(SessionInfo {
            id: self.id.clone(),
            root: self.root.clone(),
            mode: self.mode,
            state: self.state,
            created_at: self.created_at,
            categories: Category::all()
                .iter()
                .map(|c| (*c, self.category_dir(*c)))
                .collect(),
            tracked_count: self.tracked.len(),
            artifact_count,
        })
    }

    pub(crate) fn begin_close(&mut self) {
        self.state = SessionState::Closing;
    }

    async fn stage_one(&mut self, source: &Path, category: Category) -> StageResult<PathBuf> {
        let source = translate::absolutize(source)?;
        let source = source.as_path();
        let meta = fs::metadata(source)
            .await
            .map_err(|e| StageError::source_read(source, e))?;
        if !meta.is_file() {
            return Err(StageError::PathInvalid {
                path: source.to_path_buf(),
                reason: "not a regular file".to_string(),
            });
        }

        let key = (category, source.to_path_buf());
        let staged = translate::translate(source, &self.category_dir(category));

        if let Some(entry) = self.tracked.get_mut(&key) {
            if fs::try_exists(&staged).await.unwrap_or(false) {
                match fingerprint::check(&entry.fingerprint, source).await? {
                    Verdict::Unchanged => {
                        debug!("Unchanged: {}", source.display());
                        return Ok(staged);
                    }
                    Verdict::Touched(current) => {
                        debug!("Touched without edits: {}", source.display());
                        entry.fingerprint = current;
                        return Ok(staged);
                    }
                    Verdict::Missing => return Err(StageError::SourceMissing(source.to_path_buf())),
                    Verdict::Modified => {}
                }
            }
        }

        let fingerprint = copy_into_place(source, &staged).await?;

        let staged_name = staged
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.tracked.insert(
            key,
            TrackedFile {
                source: source.to_path_buf(),
                category,
                staged_name,
                fingerprint,
            },
        );
        self.state = SessionState::Active;

        debug!("Staged {} -> {}", source.display(), staged.display());
        Ok(staged)
    }

    async fn classify(&self, entry: &TrackedFile, report: &mut ChangeReport) {
        let change = ChangedFile {
            source: entry.source.clone(),
            category: entry.category,
        };

        match fingerprint::check(&entry.fingerprint, &entry.source).await {
            Ok(Verdict::Missing) => report.deleted.push(change),
            Ok(Verdict::Modified) => report.modified.push(change),
            Ok(Verdict::Unchanged | Verdict::Touched(_)) => {
                // A lost staged copy needs re-staging even if the source is intact
                let staged = self.category_dir(entry.category).join(&entry.staged_name);
                if !fs::try_exists(&staged).await.unwrap_or(false) {
                    debug!("Staged copy missing for {}", entry.source.display());
                    report.modified.push(change);
                }
            }
            Err(e) => report.failures.push(FileFailure::new(&entry.source, e)),
        }
    }

    async fn persist(&self) -> StageResult<()> {
        let manifest = Manifest {
            id: self.id.clone(),
            mode: self.mode,
            created_at: self.created_at,
            updated_at: Utc::now(),
            tracked: self.tracked.values().cloned().collect(),
        };
        manifest.save(&self.root).await
    }
}

/// Copy through a sibling temp file and rename it over `staged`
async fn copy_into_place(source: &Path, staged: &Path) -> StageResult<Fingerprint> {
    if let Some(parent) = staged.parent() {
        fs::create_dir_all(parent)
            .await
            .map_err(|e| StageError::staging(parent, e))?;
    }

    let partial = partial_path(staged);
    let result = match fingerprint::copy_fingerprinted(source, &partial).await {
        Ok(fp) => fs::rename(&partial, staged)
            .await
            .map(|_| fp)
            .map_err(|e| StageError::staging(staged, e)),
        Err(e) => Err(e),
    };

    if result.is_err() {
        let _ = fs::remove_file(&partial).await;
    }
    result
}

/// Tracking key for a caller-supplied path
fn lookup_key(source: &Path) -> PathBuf {
    std::path::absolute(source).unwrap_or_else(|_| source.to_path_buf())
}

fn partial_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let tag = Uuid::new_v4().simple().to_string();
    path.with_file_name(format!("{}{}{}", name, PARTIAL_MARKER, &tag[..8]))
}

fn validate_artifact_name(name: &str) -> StageResult<()> {
    let invalid = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains('/')
        || name.contains('\\')
        || name.contains(PARTIAL_MARKER);
    if invalid {
        return Err(StageError::PathInvalid {
            path: PathBuf::from(name),
            reason: "artifact names must be plain file names".to_string(),
        });
    }
    Ok(())
}

/// Collect regular files under `dir` without blocking the runtime
async fn walk_files(dir: PathBuf) -> StageResult<(Vec<PathBuf>, Vec<FileFailure>)> {
    tokio::task::spawn_blocking(move || {
        let mut files = Vec::new();
        let mut failures = Vec::new();
        for entry in WalkDir::new(&dir).follow_links(false).sort_by_file_name() {
            match entry {
                Ok(entry) if entry.file_type().is_dir() => {}
                // Symlinked files stage through the link; anything else is reported
                Ok(entry) if entry.file_type().is_file() || entry.path().is_file() => {
                    files.push(entry.into_path())
                }
                Ok(entry) => {
                    let path = entry.into_path();
                    let error = match std::fs::metadata(&path) {
                        Err(e) => StageError::source_read(&path, e),
                        Ok(meta) if meta.is_dir() => StageError::PathInvalid {
                            path: path.clone(),
                            reason: "symlinked directories are not followed".to_string(),
                        },
                        Ok(_) => StageError::PathInvalid {
                            path: path.clone(),
                            reason: "not a regular file".to_string(),
                        },
                    };
                    failures.push(FileFailure::new(&path, error));
                }
                Err(e) => {
                    let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| dir.clone());
                    let source = e
                        .into_io_error()
                        .unwrap_or_else(|| std::io::Error::other("filesystem loop"));
                    failures.push(FileFailure::new(&path, StageError::source_read(&path, source)));
                }
            }
        }
        (files, failures)
    })
    .await
    .map_err(|e| StageError::io("walking source directory", std::io::Error::other(e)))
}
