//! Configuration loading for stagecache
//!
//! Resolution order, later wins:
//! 1. Built-in defaults
//! 2. The TOML file (`--config`, `STAGECACHE_CONFIG`, or the platform config dir)
//! 3. `STAGECACHE_ROOT`, overriding `staging.root`

pub mod schema;

pub use schema::Config;

use crate::error::{StageError, StageResult};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

/// Environment variable overriding `staging.root`
pub const ROOT_ENV: &str = "STAGECACHE_ROOT";

const LOG_FORMATS: &[&str] = &["text", "json"];

/// Locates, reads and writes the configuration file
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    pub fn new() -> Self {
        Self::with_path(Self::default_config_path())
    }

    pub fn with_path(path: PathBuf) -> Self {
        Self { config_path: path }
    }

    /// `{config_dir}/stagecache/config.toml`
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("stagecache")
            .join("config.toml")
    }

    /// Directory for the audit journal
    pub fn state_dir() -> PathBuf {
        dirs::state_dir()
            .or_else(dirs::data_local_dir)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("stagecache")
    }

    pub fn audit_log_path() -> PathBuf {
        Self::state_dir().join("audit.log")
    }

    pub fn path(&self) -> &Path {
        &self.config_path
    }

    /// Load the file (defaults when absent), then apply environment overrides
    pub async fn load(&self) -> StageResult<Config> {
        let mut config = match fs::read_to_string(&self.config_path).await {
            Ok(content) => Self::parse(&self.config_path, &content)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(
                    "No config at {}, using defaults",
                    self.config_path.display()
                );
                Config::default()
            }
            Err(e) => {
                return Err(StageError::io(
                    format!("reading config from {}", self.config_path.display()),
                    e,
                ))
            }
        };

        if let Some(root) = std::env::var_os(ROOT_ENV).filter(|v| !v.is_empty()) {
            debug!("{} overrides staging.root", ROOT_ENV);
            config.staging.root = Some(PathBuf::from(root));
        }

        Ok(config)
    }

    /// Parse and validate TOML content read from `path`
    pub fn parse(path: &Path, content: &str) -> StageResult<Config> {
        let invalid = |reason: String| StageError::ConfigInvalid {
            path: path.to_path_buf(),
            reason,
        };

        let config: Config = toml::from_str(content).map_err(|e| invalid(e.to_string()))?;

        if !LOG_FORMATS.contains(&config.general.log_format.as_str()) {
            return Err(invalid(format!(
                "general.log_format must be one of {}, got {:?}",
                LOG_FORMATS.join("/"),
                config.general.log_format
            )));
        }

        Ok(config)
    }

    /// Write the configuration through a temp file and rename it into place
    pub async fn save(&self, config: &Config) -> StageResult<()> {
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| StageError::ConfigDirCreate {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
        }

        let content = toml::to_string_pretty(config)?;
        let tmp = self.config_path.with_extension("toml.tmp");
        let write = async {
            fs::write(&tmp, content).await?;
            fs::rename(&tmp, &self.config_path).await
        };
        if let Err(e) = write.await {
            let _ = fs::remove_file(&tmp).await;
            return Err(StageError::io(
                format!("writing config to {}", self.config_path.display()),
                e,
            ));
        }

        info!("Configuration saved to {}", self.config_path.display());
        Ok(())
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    #[tokio::test]
    #[serial]
    async fn load_default_when_missing() {
        let temp = TempDir::new().unwrap();
        let manager = ConfigManager::with_path(temp.path().join("nonexistent.toml"));

        let config = manager.load().await.unwrap();
        assert_eq!(config.gc.max_age_hours, 24);
    }

    #[tokio::test]
    #[serial]
    async fn save_and_load_roundtrip() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("config.toml");
        let manager = ConfigManager::with_path(path.clone());

        let mut config = Config::default();
        config.gc.max_age_hours = 6;

        manager.save(&config).await.unwrap();
        let loaded = manager.load().await.unwrap();

        assert_eq!(loaded.gc.max_age_hours, 6);
        assert!(!path.with_extension("toml.tmp").exists());
    }

    #[tokio::test]
    #[serial]
    async fn invalid_file_is_config_invalid() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(&path, "[gc]\nmax_age_hours = \"soon\"").unwrap();

        let err = ConfigManager::with_path(path).load().await.unwrap_err();
        assert!(matches!(err, StageError::ConfigInvalid { .. }));
    }

    #[test]
    fn unknown_log_format_is_rejected() {
        let err = ConfigManager::parse(
            Path::new("config.toml"),
            "[general]\nlog_format = \"xml\"\n",
        )
        .unwrap_err();
        assert!(err.to_string().contains("log_format"));
    }

    #[tokio::test]
    #[serial]
    async fn root_env_overrides_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(&path, "[staging]\nroot = \"/from/file\"\n").unwrap();

        std::env::set_var(ROOT_ENV, "/from/env");
        let loaded = ConfigManager::with_path(path).load().await;
        std::env::remove_var(ROOT_ENV);

        assert_eq!(
            loaded.unwrap().staging.root,
            Some(PathBuf::from("/from/env"))
        );
    }
}
