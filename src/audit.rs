//! Audit journal for session lifecycle events
//!
//! Appends one JSON object per line to `{state_dir}/audit.log`:
//!
//! ```text
//! {"timestamp":"2026-01-02T03:04:05Z","event":"session.created","data":{"id":"session_..."}}
//! ```

use crate::config::{schema::Config, ConfigManager};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tracing::warn;

/// Lifecycle events recorded in the journal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AuditEvent {
    #[serde(rename = "session.created")]
    SessionCreated,
    #[serde(rename = "session.teardown")]
    SessionTeardown,
    #[serde(rename = "session.exported")]
    SessionExported,
    #[serde(rename = "gc.removed")]
    GcRemoved,
}

impl AuditEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SessionCreated => "session.created",
            Self::SessionTeardown => "session.teardown",
            Self::SessionExported => "session.exported",
            Self::GcRemoved => "gc.removed",
        }
    }
}

impl fmt::Display for AuditEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Serialize)]
struct Entry<'a> {
    timestamp: DateTime<Utc>,
    event: AuditEvent,
    data: &'a serde_json::Value,
}

/// Append-only JSON-lines journal
#[derive(Debug, Clone)]
pub struct AuditLog {
    /// `None` when auditing is off
    path: Option<PathBuf>,
}

impl AuditLog {
    /// Journal at the default state path, honouring `general.audit_log`
    pub fn new(config: &Config) -> Self {
        if config.general.audit_log {
            Self::at(ConfigManager::audit_log_path())
        } else {
            Self::disabled()
        }
    }

    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }

    pub fn disabled() -> Self {
        Self { path: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.path.is_some()
    }

    /// Record an event. Write failures are logged with `warn!` and never
    /// propagate to the operation being recorded.
    pub async fn log(&self, event: AuditEvent, data: &serde_json::Value) {
        let Some(path) = &self.path else {
            return;
        };

        let entry = Entry {
            timestamp: Utc::now(),
            event,
            data,
        };
        let mut line = match serde_json::to_string(&entry) {
            Ok(line) => line,
            Err(e) => {
                warn!("Failed to serialize audit event {}: {}", event, e);
                return;
            }
        };
        line.push('\n');

        if let Err(e) = append(path, &line).await {
            warn!("Failed to write audit log {}: {}", path.display(), e);
        }
    }
}

async fn append(path: &Path, line: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await?;
    file.write_all(line.as_bytes()).await?;
    file.flush().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn writes_json_lines() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("audit.log");
        let audit = AuditLog::at(&path);

        audit
            .log(
                AuditEvent::SessionCreated,
                &serde_json::json!({"id": "session_1700000000000_abc123"}),
            )
            .await;
        audit
            .log(AuditEvent::GcRemoved, &serde_json::json!({}))
            .await;

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<serde_json::Value> = content
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["event"], "session.created");
        assert_eq!(lines[0]["data"]["id"], "session_1700000000000_abc123");
        assert!(lines[0]["timestamp"].is_string());
        assert_eq!(lines[1]["event"], "gc.removed");
    }

    #[tokio::test]
    async fn disabled_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.general.audit_log = false;

        let audit = AuditLog::new(&config);
        assert!(!audit.is_enabled());
        audit
            .log(AuditEvent::SessionTeardown, &serde_json::json!({}))
            .await;
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn unwritable_path_is_not_fatal() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, b"x").unwrap();

        let audit = AuditLog::at(blocker.join("audit.log"));
        audit
            .log(AuditEvent::SessionExported, &serde_json::json!({}))
            .await;
    }

    #[test]
    fn event_names() {
        assert_eq!(AuditEvent::SessionTeardown.to_string(), "session.teardown");
        assert_eq!(
            serde_json::to_value(AuditEvent::SessionExported).unwrap(),
            "session.exported"
        );
    }
}
