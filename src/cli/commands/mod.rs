//! CLI command implementations

pub mod artifact;
pub mod changes;
pub mod config;
pub mod export;
pub mod gc;
pub mod info;
pub mod list;
pub mod stage;
pub mod teardown;

pub use artifact::execute as artifact;
pub use changes::execute as changes;
pub use config::execute as config;
pub use export::execute as export;
pub use gc::execute as gc;
pub use info::execute as info;
pub use list::execute as list;
pub use stage::execute as stage;
pub use teardown::execute as teardown;

use crate::cli::args::SessionTarget;
use crate::config::Config;
use crate::error::{StageError, StageResult};
use crate::session::{AllocationMode, SessionRegistry};
use crate::staging::StagingSession;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, warn};

/// Open the session a command targets.
///
/// `--session` opens an existing ephemeral session; `--persistent` (or a
/// persistent `session.default_mode`) opens the shared workspace.
pub(crate) async fn open_target(
    registry: &SessionRegistry,
    target: &SessionTarget,
    config: &Config,
) -> StageResult<StagingSession> {
    if let Some(id) = &target.session {
        return registry.open(id).await;
    }
    if target.persistent || config.session.default_mode == AllocationMode::Persistent {
        return registry.create(AllocationMode::Persistent).await;
    }
    Err(StageError::User(
        "No session selected. Pass --session <ID> or --persistent".to_string(),
    ))
}

/// Open the targeted session, or create one in the default mode.
///
/// Returns the session and whether a new ephemeral session was created.
pub(crate) async fn open_or_create(
    registry: &SessionRegistry,
    target: &SessionTarget,
    config: &Config,
) -> StageResult<(StagingSession, bool)> {
    if let Some(id) = &target.session {
        return Ok((registry.open(id).await?, false));
    }

    let mode = if target.persistent {
        AllocationMode::Persistent
    } else {
        config.session.default_mode
    };

    if mode == AllocationMode::Ephemeral && config.gc.on_create && config.gc.max_age_hours > 0 {
        let max_age = hours(config.gc.max_age_hours);
        match registry.collect_garbage(max_age).await {
            Ok(report) if !report.removed.is_empty() => {
                debug!("Collected {} abandoned session(s)", report.removed.len());
            }
            Ok(_) => {}
            Err(e) => warn!("Garbage collection skipped: {}", e),
        }
    }

    let session = registry.create(mode).await?;
    Ok((session, mode == AllocationMode::Ephemeral))
}

pub(crate) fn hours(hours: u32) -> Duration {
    Duration::from_secs(u64::from(hours) * 60 * 60)
}

pub(crate) fn print_json<T: Serialize + ?Sized>(value: &T) -> StageResult<()> {
    let json = serde_json::to_string_pretty(value)?;
    println!("{}", json);
    Ok(())
}
