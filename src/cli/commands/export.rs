//! Export command - copy result artifacts out of a session

use crate::cli::args::ExportArgs;
use crate::config::Config;
use crate::error::StageResult;
use crate::session::SessionRegistry;
use crate::ui::{self, TaskSpinner, UiContext};

/// Execute the export command
pub async fn execute(
    args: ExportArgs,
    registry: &SessionRegistry,
    config: &Config,
) -> StageResult<()> {
    let ctx = UiContext::detect();
    let session = super::open_target(registry, &args.target, config).await?;

    let mut spinner = TaskSpinner::new(&ctx);
    spinner.start(&format!("Exporting results from {}...", session.id()));

    match registry.export(&session, &args.dest).await {
        Ok(count) => {
            spinner.stop(&format!("Exported {} result(s)", count));
            ui::remark(&ctx, &args.dest.display().to_string());
            Ok(())
        }
        Err(e) => {
            spinner.stop_error("Export failed");
            Err(e)
        }
    }
}
