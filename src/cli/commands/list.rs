//! List command - show session workspaces

use crate::cli::args::{ListArgs, OutputFormat};
use crate::error::StageResult;
use crate::session::{AllocationMode, SessionRegistry, SessionSummary};
use crate::ui::{self, UiContext};
use console::style;

/// Execute the list command
pub async fn execute(args: ListArgs, registry: &SessionRegistry) -> StageResult<()> {
    let sessions = registry.list().await?;

    if sessions.is_empty() {
        match args.format {
            OutputFormat::Json => println!("[]"),
            OutputFormat::Plain => {}
            OutputFormat::Table => {
                let ctx = UiContext::detect();
                ui::step_info(&ctx, "No sessions");
            }
        }
        return Ok(());
    }

    match args.format {
        OutputFormat::Table => print_table(&sessions),
        OutputFormat::Json => super::print_json(&sessions)?,
        OutputFormat::Plain => print_plain(&sessions),
    }

    Ok(())
}

fn print_table(sessions: &[SessionSummary]) {
    let ctx = UiContext::detect();
    ui::intro(&ctx, "Sessions");

    println!(
        "{:<34} {:<12} {:<18} {:<8}",
        style("ID").bold(),
        style("MODE").bold(),
        style("LAST USED").bold(),
        style("TRACKED").bold()
    );
    println!("{}", "-".repeat(74));

    for session in sessions {
        let mode = match session.mode {
            AllocationMode::Ephemeral => style("ephemeral").cyan(),
            AllocationMode::Persistent => style("persistent").green(),
        };
        let last_used = session.last_modified.format("%Y-%m-%d %H:%M").to_string();

        println!(
            "{:<34} {:<12} {:<18} {:<8}",
            session.id, mode, last_used, session.tracked_count
        );
    }

    println!();
    println!("{} session(s)", sessions.len());
}

fn print_plain(sessions: &[SessionSummary]) {
    for session in sessions {
        println!("{}", session.id);
    }
}
