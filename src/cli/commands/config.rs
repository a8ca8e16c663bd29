//! Config command - show or edit configuration

use crate::cli::args::{ConfigAction, ConfigArgs};
use crate::config::{Config, ConfigManager};
use crate::error::{StageError, StageResult};
use crate::session::AllocationMode;
use crate::ui::{self, UiContext};
use clap::ValueEnum;
use std::path::PathBuf;

const VALID_KEYS: &[&str] = &[
    "general.log_format",
    "general.audit_log",
    "staging.root",
    "staging.archive_root",
    "session.default_mode",
    "session.archive_on_teardown",
    "gc.max_age_hours",
    "gc.on_create",
];

/// Execute the config command
pub async fn execute(args: ConfigArgs, manager: &ConfigManager, config: &Config) -> StageResult<()> {
    match args.action {
        None | Some(ConfigAction::Show) => show_config(config)?,
        Some(ConfigAction::Path) => println!("{}", manager.path().display()),
        Some(ConfigAction::Init { force }) => init_config(manager, force).await?,
        Some(ConfigAction::Set { key, value }) => set_value(manager, config, &key, &value).await?,
    }

    Ok(())
}

fn show_config(config: &Config) -> StageResult<()> {
    println!("{}", toml::to_string_pretty(config)?);
    Ok(())
}

async fn init_config(manager: &ConfigManager, force: bool) -> StageResult<()> {
    let ctx = UiContext::detect();
    let path = manager.path();

    if path.exists() && !force {
        ui::step_warn_hint(
            &ctx,
            &format!("Config already exists at {}", path.display()),
            "Use --force to overwrite",
        );
        return Ok(());
    }

    manager.save(&Config::default()).await?;
    ui::step_ok_detail(
        &ctx,
        "Configuration initialized",
        &path.display().to_string(),
    );

    Ok(())
}

async fn set_value(
    manager: &ConfigManager,
    config: &Config,
    key: &str,
    value: &str,
) -> StageResult<()> {
    let ctx = UiContext::detect();
    let mut config = config.clone();

    if let Err(e) = apply_value(&mut config, key, value) {
        ui::step_error_detail(&ctx, "Invalid setting", &e.to_string());
        ui::remark(&ctx, &format!("Valid keys: {}", VALID_KEYS.join(", ")));
        return Err(e);
    }

    manager.save(&config).await?;
    ui::step_ok(&ctx, &format!("Set {} = {}", key, value));
    Ok(())
}

fn apply_value(config: &mut Config, key: &str, value: &str) -> StageResult<()> {
    let parts: Vec<&str> = key.split('.').collect();

    match parts.as_slice() {
        ["general", "log_format"] => match value {
            "text" | "json" => config.general.log_format = value.to_string(),
            _ => {
                return Err(StageError::User(format!(
                    "Invalid log format: {}. Use text/json",
                    value
                )))
            }
        },
        ["general", "audit_log"] => config.general.audit_log = parse_bool(value)?,
        ["staging", "root"] => config.staging.root = Some(PathBuf::from(value)),
        ["staging", "archive_root"] => config.staging.archive_root = Some(PathBuf::from(value)),
        ["session", "default_mode"] => {
            config.session.default_mode = AllocationMode::from_str(value, true)
                .map_err(|_| {
                    StageError::User(format!(
                        "Invalid mode: {}. Use ephemeral/persistent",
                        value
                    ))
                })?
        }
        ["session", "archive_on_teardown"] => {
            config.session.archive_on_teardown = parse_bool(value)?
        }
        ["gc", "max_age_hours"] => config.gc.max_age_hours = parse_u32(value)?,
        ["gc", "on_create"] => config.gc.on_create = parse_bool(value)?,
        _ => return Err(StageError::User(format!("Unknown config key: {}", key))),
    }

    Ok(())
}

fn parse_bool(value: &str) -> StageResult<bool> {
    match value.to_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(StageError::User(format!(
            "Invalid boolean value: {}. Use true/false",
            value
        ))),
    }
}

fn parse_u32(value: &str) -> StageResult<u32> {
    value
        .parse()
        .map_err(|_| StageError::User(format!("Invalid number: {}", value)))
}
