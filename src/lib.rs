//! stagecache - Read-only staging cache
//!
//! Mirrors files from externally owned source trees into isolated session
//! workspaces, detects changes with a timestamp-then-hash check, and keeps a
//! stable mapping between source and staged paths.

pub mod audit;
pub mod cli;
pub mod config;
pub mod error;
pub mod session;
pub mod staging;
pub mod ui;

pub use error::{StageError, StageResult};
pub use session::{AllocationMode, ResultSink, SessionRegistry, TeardownOptions};
pub use staging::{Category, ChangeReport, Fingerprint, StagingSession};
