//! Artifact command - save or list derived files in a session

use crate::cli::args::{ArtifactAction, ArtifactArgs, OutputFormat};
use crate::config::Config;
use crate::error::{StageError, StageResult};
use crate::session::SessionRegistry;
use crate::staging::ResultArtifact;
use crate::ui::{self, UiContext};
use console::style;

/// Execute the artifact command
pub async fn execute(
    args: ArtifactArgs,
    registry: &SessionRegistry,
    config: &Config,
) -> StageResult<()> {
    let ctx = UiContext::detect();

    match args.action {
        ArtifactAction::Save {
            name,
            from,
            category,
            target,
        } => {
            let mut session = super::open_target(registry, &target, config).await?;
            let content = tokio::fs::read(&from)
                .await
                .map_err(|e| StageError::source_read(&from, e))?;
            let path = session.save_artifact(category, &name, &content).await?;
            ui::step_ok_detail(
                &ctx,
                &format!("Saved {} ({} bytes)", name, content.len()),
                &path.display().to_string(),
            );
        }
        ArtifactAction::List {
            category,
            target,
            format,
        } => {
            let session = super::open_target(registry, &target, config).await?;
            let artifacts = session.list_artifacts(category).await?;
            match format {
                OutputFormat::Json => super::print_json(&artifacts)?,
                OutputFormat::Plain => {
                    for artifact in &artifacts {
                        println!("{}", artifact.path.display());
                    }
                }
                OutputFormat::Table => print_table(&ctx, &artifacts),
            }
        }
    }

    Ok(())
}

fn print_table(ctx: &UiContext, artifacts: &[ResultArtifact]) {
    if artifacts.is_empty() {
        ui::step_info(ctx, "No artifacts");
        return;
    }

    println!("{:<48} {:>12}", style("NAME").bold(), style("BYTES").bold());
    for artifact in artifacts {
        println!("{:<48} {:>12}", artifact.name, artifact.size_bytes);
    }
    println!();
    println!("{} artifact(s)", artifacts.len());
}
