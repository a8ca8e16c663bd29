//! Read-only staging of source files into session workspaces
//!
//! Source files are mirrored into a session's category directories and
//! fingerprinted so repeated scans only copy what changed.
//!
//! # Safety Model
//!
//! - Sources are opened read-only, never as a write or rename target
//! - Copies land in a temp file first and are renamed into place
//! - A fingerprint is recorded only after its copy is complete
//!
//! # Change Detection
//!
//! | Modified time | Size | Hash | Verdict |
//! |---------------|------|------|---------|
//! | same | same | not read | unchanged |
//! | moved | same | same | touched (unchanged) |
//! | moved | same | differs | modified |
//! | any | differs | not read | modified |
//! | file gone | - | - | deleted |

pub mod category;
pub mod fingerprint;
pub mod manifest;
pub mod report;
pub mod session;
pub mod translate;

pub use category::Category;
pub use fingerprint::{Fingerprint, Verdict};
pub use manifest::TrackedFile;
pub use report::{
    ApplyReport, ChangeReport, ChangedFile, FileFailure, ResultArtifact, SessionInfo,
    StageDirectoryReport, StagedEntry,
};
pub use session::{SharedSession, StagingSession};
