//! Stage command - mirror source files into a session

use crate::cli::args::{OutputFormat, StageArgs};
use crate::config::Config;
use crate::error::{StageError, StageResult};
use crate::session::SessionRegistry;
use crate::staging::{translate, Category, FileFailure};
use crate::ui::{self, StageProgress, UiContext};
use console::style;
use serde::Serialize;
use std::path::PathBuf;
use tokio::fs;

#[derive(Debug, Serialize)]
struct StagedFile {
    source: PathBuf,
    staged: PathBuf,
}

#[derive(Debug, Serialize)]
struct StageOutcome {
    session: String,
    category: Category,
    staged: Vec<StagedFile>,
    failures: Vec<FileFailure>,
}

/// Execute the stage command
pub async fn execute(
    args: StageArgs,
    registry: &SessionRegistry,
    config: &Config,
) -> StageResult<()> {
    let ctx = UiContext::detect();
    let (mut session, created) = super::open_or_create(registry, &args.target, config).await?;

    let mut outcome = StageOutcome {
        session: session.id().to_string(),
        category: args.category,
        staged: Vec::new(),
        failures: Vec::new(),
    };

    for path in &args.paths {
        let path = match translate::absolutize(path) {
            Ok(path) => path,
            Err(e) => {
                outcome.failures.push(FileFailure::new(path, e));
                continue;
            }
        };
        let path = path.as_path();
        let is_dir = fs::metadata(path)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false);

        if is_dir {
            let progress = match args.format {
                OutputFormat::Table => StageProgress::new(&ctx, &path.display().to_string()),
                _ => StageProgress::hidden(),
            };
            let report = session
                .stage_directory_with(path, args.category, |done, total| {
                    progress.update(done, total)
                })
                .await;
            progress.finish();

            let report = report?;
            outcome
                .staged
                .extend(report.staged.into_iter().map(|e| StagedFile {
                    source: e.source,
                    staged: e.staged,
                }));
            outcome.failures.extend(report.failures);
            continue;
        }

        match session.stage(path, args.category).await {
            Ok(staged) => outcome.staged.push(StagedFile {
                source: path.to_path_buf(),
                staged,
            }),
            Err(e) if e.is_skippable() => outcome.failures.push(FileFailure::new(path, e)),
            Err(e) => return Err(e),
        }
    }

    match args.format {
        OutputFormat::Json => super::print_json(&outcome)?,
        OutputFormat::Plain => {
            for file in &outcome.staged {
                println!("{}", file.staged.display());
            }
        }
        OutputFormat::Table => print_table(&ctx, &outcome, created),
    }

    if outcome.staged.is_empty() && !outcome.failures.is_empty() {
        return Err(StageError::User(format!(
            "Nothing staged: {} path(s) failed",
            outcome.failures.len()
        )));
    }

    Ok(())
}

fn print_table(ctx: &UiContext, outcome: &StageOutcome, created: bool) {
    ui::intro(ctx, &format!("Staged into {}", outcome.session));

    if !outcome.staged.is_empty() {
        println!(
            "{:<50} {}",
            style("SOURCE").bold(),
            style("STAGED").bold()
        );
        for file in &outcome.staged {
            let staged_name = file
                .staged
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            println!("{:<50} {}", file.source.display(), style(staged_name).dim());
        }
        println!();
    }

    for failure in &outcome.failures {
        ui::step_warn_hint(
            ctx,
            &failure.path.display().to_string(),
            &failure.error.to_string(),
        );
    }

    ui::step_ok(
        ctx,
        &format!(
            "{} file(s) staged into {}",
            outcome.staged.len(),
            outcome.category
        ),
    );

    if created {
        ui::remark(
            ctx,
            &format!("Continue with: --session {}", outcome.session),
        );
    }
}
