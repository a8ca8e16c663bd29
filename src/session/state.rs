//! Session identity, allocation mode and lifecycle state

use chrono::Utc;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Directory name of the persistent workspace under the app root
pub const PERSISTENT_DIR: &str = "persistent";

/// Prefix of every ephemeral session directory
pub const EPHEMERAL_PREFIX: &str = "session_";

/// How a session's workspace is allocated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum AllocationMode {
    /// Single-use workspace with a generated id, removed on teardown or GC
    Ephemeral,
    /// Fixed `persistent` workspace reused across runs
    Persistent,
}

impl fmt::Display for AllocationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ephemeral => write!(f, "ephemeral"),
            Self::Persistent => write!(f, "persistent"),
        }
    }
}

/// Session lifecycle: `Created -> Active -> Closing -> Destroyed`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Created,
    Active,
    Closing,
    Destroyed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Created => "created",
            Self::Active => "active",
            Self::Closing => "closing",
            Self::Destroyed => "destroyed",
        };
        write!(f, "{}", name)
    }
}

/// Generate an ephemeral session id: `session_{unixMillis}_{6 lowercase alphanumerics}`
pub fn ephemeral_id() -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!(
        "{}{}_{}",
        EPHEMERAL_PREFIX,
        Utc::now().timestamp_millis(),
        &suffix[..6]
    )
}

/// Check whether a directory name has the ephemeral session id shape
pub fn is_ephemeral_id(name: &str) -> bool {
    let Some(rest) = name.strip_prefix(EPHEMERAL_PREFIX) else {
        return false;
    };
    let Some((millis, suffix)) = rest.split_once('_') else {
        return false;
    };

    !millis.is_empty()
        && millis.chars().all(|c| c.is_ascii_digit())
        && suffix.len() == 6
        && suffix
            .chars()
            .all(|c| c.is_ascii_digit() || c.is_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ephemeral_id_format() {
        let id = ephemeral_id();
        assert!(id.starts_with("session_"));
        assert!(is_ephemeral_id(&id), "bad id: {}", id);

        let suffix = id.rsplit('_').next().unwrap();
        assert_eq!(suffix.len(), 6);
    }

    #[test]
    fn ephemeral_ids_are_unique() {
        assert_ne!(ephemeral_id(), ephemeral_id());
    }

    #[test]
    fn rejects_other_names() {
        assert!(!is_ephemeral_id(PERSISTENT_DIR));
        assert!(!is_ephemeral_id("session_abc_123456"));
        assert!(!is_ephemeral_id("session_1700000000000_ABCDEF"));
        assert!(!is_ephemeral_id("session_1700000000000_abc"));
        assert!(is_ephemeral_id("session_1700000000000_a1b2c3"));
    }

    #[test]
    fn mode_serialize() {
        let json = serde_json::to_string(&AllocationMode::Persistent).unwrap();
        assert_eq!(json, "\"persistent\"");
        assert_eq!(AllocationMode::Ephemeral.to_string(), "ephemeral");
    }
}
