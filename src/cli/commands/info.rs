//! Info command - show a session's workspace

use crate::cli::args::{InfoArgs, OutputFormat};
use crate::config::Config;
use crate::error::StageResult;
use crate::session::SessionRegistry;
use crate::ui::{self, UiContext};

/// Execute the info command
pub async fn execute(args: InfoArgs, registry: &SessionRegistry, config: &Config) -> StageResult<()> {
    let session = super::open_target(registry, &args.target, config).await?;
    let info = session.info().await?;

    match args.format {
        OutputFormat::Json => super::print_json(&info)?,
        OutputFormat::Plain => println!("{}", info.root.display()),
        OutputFormat::Table => {
            let ctx = UiContext::detect();
            ui::intro(&ctx, &format!("Session {}", info.id));
            ui::key_value(&ctx, "Mode", &info.mode.to_string());
            ui::key_value(&ctx, "State", &info.state.to_string());
            ui::key_value(
                &ctx,
                "Created",
                &info.created_at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
            );
            ui::key_value(&ctx, "Root", &info.root.display().to_string());
            ui::key_value(&ctx, "Tracked files", &info.tracked_count.to_string());
            ui::key_value(&ctx, "Results", &info.artifact_count.to_string());

            ui::section(&ctx, "Categories");
            for (category, dir) in &info.categories {
                ui::key_value(&ctx, &category.to_string(), &dir.display().to_string());
            }
        }
    }

    Ok(())
}
