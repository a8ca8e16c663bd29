//! Configuration schema for stagecache
//!
//! Configuration is stored at `~/.config/stagecache/config.toml`

use crate::session::state::AllocationMode;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Workspace locations
    pub staging: StagingConfig,

    /// Session defaults
    pub session: SessionConfig,

    /// Garbage collection of abandoned sessions
    pub gc: GcConfig,
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log format: "text" or "json"
    pub log_format: String,

    /// Enable audit logging
    pub audit_log: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_format: "text".to_string(),
            audit_log: true,
        }
    }
}

/// Workspace locations
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StagingConfig {
    /// Directory holding session workspaces (default: `{tmp}/stagecache`)
    pub root: Option<PathBuf>,

    /// Directory receiving archived results (default: `{data_local}/stagecache/archive`)
    pub archive_root: Option<PathBuf>,
}

impl StagingConfig {
    /// Resolved session root directory
    pub fn app_root(&self) -> PathBuf {
        self.root
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("stagecache"))
    }

    /// Resolved archive directory
    pub fn archive_root(&self) -> PathBuf {
        self.archive_root.clone().unwrap_or_else(|| {
            dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("stagecache")
                .join("archive")
        })
    }
}

/// Session configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Allocation mode when neither --session nor --persistent is given
    pub default_mode: AllocationMode,

    /// Archive results before teardown
    pub archive_on_teardown: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            default_mode: AllocationMode::Ephemeral,
            archive_on_teardown: true,
        }
    }
}

/// Garbage collection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GcConfig {
    /// Remove ephemeral sessions untouched for N hours (0 = disabled)
    pub max_age_hours: u32,

    /// Collect garbage before creating a new session
    pub on_create: bool,
}

impl Default for GcConfig {
    fn default() -> Self {
        Self {
            max_age_hours: 24,
            on_create: true,
        }
    }
}
