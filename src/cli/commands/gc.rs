//! GC command - remove abandoned ephemeral sessions

use crate::cli::args::GcArgs;
use crate::config::Config;
use crate::error::StageResult;
use crate::session::SessionRegistry;
use crate::ui::{self, UiContext};

/// Execute the gc command
pub async fn execute(args: GcArgs, registry: &SessionRegistry, config: &Config) -> StageResult<()> {
    let ctx = UiContext::detect();
    let hours = args.hours.unwrap_or(config.gc.max_age_hours);

    if hours == 0 && args.hours.is_none() {
        ui::step_info(&ctx, "Garbage collection disabled (gc.max_age_hours = 0)");
        return Ok(());
    }

    let max_age = super::hours(hours);
    let report = if args.dry_run {
        registry.gc_candidates(max_age).await?
    } else {
        registry.collect_garbage(max_age).await?
    };

    for id in &report.removed {
        if args.dry_run {
            ui::step_info(&ctx, &format!("Would remove {}", id));
        } else {
            ui::step_ok(&ctx, &format!("Removed {}", id));
        }
    }
    for failure in &report.failures {
        ui::step_error_detail(
            &ctx,
            &failure.path.display().to_string(),
            &failure.error.to_string(),
        );
    }

    if report.removed.is_empty() {
        ui::step_info(
            &ctx,
            &format!("No sessions older than {}h ({} kept)", hours, report.kept),
        );
    } else if args.dry_run {
        ui::remark(&ctx, "Dry run, nothing removed");
    }

    Ok(())
}
