//! Teardown command - archive results and remove a session

use crate::cli::args::TeardownArgs;
use crate::config::Config;
use crate::error::{StageError, StageResult};
use crate::session::{SessionRegistry, TeardownOptions};
use crate::ui::{self, TaskSpinner, UiContext};
use console::style;

/// Execute the teardown command
pub async fn execute(
    args: TeardownArgs,
    registry: &SessionRegistry,
    config: &Config,
) -> StageResult<()> {
    if args.target.session.is_none() && !args.target.persistent {
        return Err(StageError::User(
            "Teardown needs an explicit --session <ID> or --persistent".to_string(),
        ));
    }

    let ctx = UiContext::detect().with_auto_yes(args.yes);
    let session = super::open_target(registry, &args.target, config).await?;
    let id = session.id().to_string();

    let prompt = format!("Remove session {} and all staged files?", id);
    if !ui::confirm(&ctx, &prompt, false).await? {
        ui::step_info(&ctx, "Teardown cancelled");
        return Ok(());
    }

    let options = TeardownOptions {
        archive: !args.no_archive && config.session.archive_on_teardown,
    };

    let mut spinner = TaskSpinner::new(&ctx);
    spinner.start(&format!("Tearing down {}...", id));

    let report = match registry.teardown(session, options).await {
        Ok(report) => report,
        Err(e) => {
            spinner.stop_error("Teardown failed");
            return Err(e);
        }
    };

    spinner.stop(&format!("Session {} removed", style(&report.id).cyan()));
    match report.archive {
        Some(archive) => ui::step_ok_detail(
            &ctx,
            &format!("Archived {} result(s)", archive.files),
            &archive.dir.display().to_string(),
        ),
        None if options.archive => ui::remark(&ctx, "No results to archive"),
        None => {}
    }

    Ok(())
}
