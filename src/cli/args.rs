//! CLI argument definitions using clap derive

use crate::staging::Category;
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use std::path::PathBuf;

/// stagecache - read-only staging cache
///
/// Mirrors source files into isolated session workspaces and tracks
/// content changes between scans. Sources are never written.
#[derive(Parser, Debug)]
#[command(name = "stagecache")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file path
    #[arg(short, long, global = true, env = "STAGECACHE_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Stage files or directories into a session
    Stage(StageArgs),

    /// Detect (and optionally apply) changes since the last stage
    Changes(ChangesArgs),

    /// Show session details
    Info(InfoArgs),

    /// List sessions
    List(ListArgs),

    /// Save or list session artifacts
    Artifact(ArtifactArgs),

    /// Copy result artifacts out of a session
    Export(ExportArgs),

    /// Archive results and remove a session
    Teardown(TeardownArgs),

    /// Remove abandoned ephemeral sessions
    Gc(GcArgs),

    /// Show or edit configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions {
        /// Target shell
        shell: Shell,
    },
}

/// Which session a command operates on
#[derive(Args, Debug, Clone, Default)]
pub struct SessionTarget {
    /// Session id (session_<millis>_<suffix>)
    #[arg(short, long, conflicts_with = "persistent")]
    pub session: Option<String>,

    /// Use the persistent workspace
    #[arg(long)]
    pub persistent: bool,
}

/// Arguments for the stage command
#[derive(Parser, Debug)]
pub struct StageArgs {
    /// Files or directories to stage
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,

    /// Category to stage into
    #[arg(long, value_enum, default_value = "input")]
    pub category: Category,

    #[command(flatten)]
    pub target: SessionTarget,

    /// Output format
    #[arg(short, long, default_value = "table")]
    pub format: OutputFormat,
}

/// Arguments for the changes command
#[derive(Parser, Debug)]
pub struct ChangesArgs {
    /// Limit detection to these source paths (untracked ones count as added)
    pub paths: Vec<PathBuf>,

    #[command(flatten)]
    pub target: SessionTarget,

    /// Re-stage modified and added files
    #[arg(long)]
    pub apply: bool,

    /// Output format
    #[arg(short, long, default_value = "table")]
    pub format: OutputFormat,
}

/// Arguments for the info command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    #[command(flatten)]
    pub target: SessionTarget,

    /// Output format
    #[arg(short, long, default_value = "table")]
    pub format: OutputFormat,
}

/// Arguments for the list command
#[derive(Parser, Debug)]
pub struct ListArgs {
    /// Output format
    #[arg(short, long, default_value = "table")]
    pub format: OutputFormat,
}

/// Arguments for the artifact command
#[derive(Parser, Debug)]
pub struct ArtifactArgs {
    /// Subcommand for artifacts
    #[command(subcommand)]
    pub action: ArtifactAction,
}

/// Artifact subcommands
#[derive(Subcommand, Debug)]
pub enum ArtifactAction {
    /// Save a file as an artifact
    Save {
        /// Artifact name inside the category directory
        #[arg(short, long)]
        name: String,

        /// File whose contents become the artifact
        #[arg(long)]
        from: PathBuf,

        /// Category to save into
        #[arg(long, value_enum, default_value = "results")]
        category: Category,

        #[command(flatten)]
        target: SessionTarget,
    },

    /// List artifacts in a category
    List {
        /// Category to list
        #[arg(long, value_enum, default_value = "results")]
        category: Category,

        #[command(flatten)]
        target: SessionTarget,

        /// Output format
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },
}

/// Arguments for the export command
#[derive(Parser, Debug)]
pub struct ExportArgs {
    /// Destination directory (created if absent)
    #[arg(short, long)]
    pub dest: PathBuf,

    #[command(flatten)]
    pub target: SessionTarget,
}

/// Arguments for the teardown command
#[derive(Parser, Debug)]
pub struct TeardownArgs {
    #[command(flatten)]
    pub target: SessionTarget,

    /// Skip archiving results
    #[arg(long)]
    pub no_archive: bool,

    /// Skip confirmation prompt
    #[arg(short, long)]
    pub yes: bool,
}

/// Arguments for the gc command
#[derive(Parser, Debug)]
pub struct GcArgs {
    /// Remove sessions untouched for N hours (default: from config)
    #[arg(long)]
    pub hours: Option<u32>,

    /// Dry run - show what would be removed
    #[arg(long)]
    pub dry_run: bool,
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Subcommand for config
    #[command(subcommand)]
    pub action: Option<ConfigAction>,
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Initialize default configuration
    Init {
        /// Overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Set a configuration value
    Set {
        /// Configuration key (e.g., gc.max_age_hours)
        key: String,
        /// Value to set
        value: String,
    },
}

/// Output format for listing commands
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table
    Table,
    /// JSON output
    Json,
    /// Simple text (one per line)
    Plain,
}
