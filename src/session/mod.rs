//! Session management module

pub mod registry;
pub mod sink;
pub mod state;

pub use registry::{
    GcReport, SessionRegistry, SessionSummary, TeardownOptions, TeardownReport, DEFAULT_MAX_AGE,
};
pub use sink::{ArchiveReport, ResultSink};
pub use state::{AllocationMode, SessionState};
