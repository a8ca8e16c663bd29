//! Changes command - report (and optionally apply) source changes

use crate::cli::args::{ChangesArgs, OutputFormat};
use crate::config::Config;
use crate::error::StageResult;
use crate::session::SessionRegistry;
use crate::staging::{translate, ApplyReport, ChangeReport, ChangedFile};
use crate::ui::{self, UiContext};
use console::style;
use serde::Serialize;

#[derive(Serialize)]
struct ChangesOutput<'a> {
    session: &'a str,
    changes: &'a ChangeReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    applied: Option<&'a ApplyReport>,
}

/// Execute the changes command
pub async fn execute(
    args: ChangesArgs,
    registry: &SessionRegistry,
    config: &Config,
) -> StageResult<()> {
    let mut session = super::open_target(registry, &args.target, config).await?;

    let paths = args
        .paths
        .iter()
        .map(|p| translate::absolutize(p))
        .collect::<StageResult<Vec<_>>>()?;
    let scope = (!paths.is_empty()).then_some(paths.as_slice());
    let report = session.detect_changes(scope).await;

    let applied = if args.apply && !report.is_empty() {
        Some(session.apply_changes(&report).await?)
    } else {
        None
    };

    match args.format {
        OutputFormat::Json => super::print_json(&ChangesOutput {
            session: session.id(),
            changes: &report,
            applied: applied.as_ref(),
        })?,
        OutputFormat::Plain => print_plain(&report),
        OutputFormat::Table => print_table(session.id(), &report, applied.as_ref()),
    }

    Ok(())
}

fn print_table(id: &str, report: &ChangeReport, applied: Option<&ApplyReport>) {
    let ctx = UiContext::detect();
    ui::intro(&ctx, &format!("Changes in {}", id));

    if report.is_empty() {
        ui::step_info(&ctx, "No changes");
    } else {
        print_group("Modified", &report.modified);
        print_group("Added", &report.added);
        print_group("Deleted", &report.deleted);
        println!();
        println!("{} change(s)", report.total());
    }

    for failure in &report.failures {
        ui::step_warn_hint(
            &ctx,
            &failure.path.display().to_string(),
            &failure.error.to_string(),
        );
    }

    if let Some(applied) = applied {
        for failure in &applied.failures {
            ui::step_error_detail(
                &ctx,
                &failure.path.display().to_string(),
                &failure.error.to_string(),
            );
        }
        ui::step_ok(
            &ctx,
            &format!(
                "Applied: {} re-staged, {} untracked",
                applied.staged.len(),
                applied.untracked.len()
            ),
        );
    }
}

fn print_group(title: &str, files: &[ChangedFile]) {
    if files.is_empty() {
        return;
    }
    println!();
    println!("{} ({})", style(title).bold(), files.len());
    for file in files {
        println!(
            "  {:<10} {}",
            style(file.category.to_string()).dim(),
            file.source.display()
        );
    }
}

fn print_plain(report: &ChangeReport) {
    let groups = [
        ("M", &report.modified),
        ("A", &report.added),
        ("D", &report.deleted),
    ];
    for (marker, files) in groups {
        for file in files {
            println!("{} {}", marker, file.source.display());
        }
    }
}
