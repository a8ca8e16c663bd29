//! stagecache - Read-only staging cache
//!
//! CLI entry point that dispatches to subcommands.

use clap::{CommandFactory, Parser};
use console::style;
use stagecache::cli::{commands, Cli, Commands};
use stagecache::config::{Config, ConfigManager};
use stagecache::error::StageResult;
use stagecache::session::SessionRegistry;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> StageResult<()> {
    let cli = Cli::parse();

    if let Commands::Completions { shell } = cli.command {
        clap_complete::generate(
            shell,
            &mut Cli::command(),
            "stagecache",
            &mut std::io::stdout(),
        );
        return Ok(());
    }

    let config_manager = match cli.config {
        Some(ref path) => ConfigManager::with_path(path.clone()),
        None => ConfigManager::new(),
    };

    // An unreadable config still has to be fixable through `config init --force`
    let config = match (config_manager.load().await, &cli.command) {
        (Ok(config), _) => config,
        (Err(e), Commands::Config(_)) => {
            eprintln!("{} {}", style("Warning:").yellow().bold(), e);
            Config::default()
        }
        (Err(e), _) => return Err(e),
    };

    init_logging(cli.verbose, &config);
    debug!("Using config {}", config_manager.path().display());
    stagecache::ui::init_theme();

    let registry = SessionRegistry::from_config(&config);
    debug!("Session root: {}", registry.app_root().display());

    match cli.command {
        Commands::Stage(args) => commands::stage(args, &registry, &config).await,
        Commands::Changes(args) => commands::changes(args, &registry, &config).await,
        Commands::Info(args) => commands::info(args, &registry, &config).await,
        Commands::List(args) => commands::list(args, &registry).await,
        Commands::Artifact(args) => commands::artifact(args, &registry, &config).await,
        Commands::Export(args) => commands::export(args, &registry, &config).await,
        Commands::Teardown(args) => commands::teardown(args, &registry, &config).await,
        Commands::Gc(args) => commands::gc(args, &registry, &config).await,
        Commands::Config(args) => commands::config(args, &config_manager, &config).await,
        Commands::Completions { .. } => unreachable!("completions handled above"),
    }
}

/// 0 = warn, 1 = info, 2+ = debug; `general.log_format = "json"` emits JSON lines
fn init_logging(verbose: u8, config: &Config) {
    let filter = match verbose {
        0 => EnvFilter::new("stagecache=warn"),
        1 => EnvFilter::new("stagecache=info"),
        _ => EnvFilter::new("stagecache=debug"),
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if config.general.log_format == "json" {
        builder.json().init();
    } else {
        builder.with_target(false).without_time().init();
    }
}
