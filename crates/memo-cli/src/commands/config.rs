//! Config command handlers

use std::path::PathBuf;

use anyhow::{bail, Context, Result};

use memo_core::Config;

use crate::output::{mask, Output, OutputFormat};

const VALID_KEYS: &str =
    "service_url, parent_note_id, password, data_dir, request_timeout_secs, log_file";

/// Show current configuration
pub fn show(config_path: Option<&PathBuf>, output: &Output) -> Result<()> {
    let config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;
    let password = config.password.as_deref().map(mask);

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "service_url": config.service_url,
                    "parent_note_id": config.parent_note_id,
                    "password": password,
                    "data_dir": config.data_dir,
                    "request_timeout_secs": config.request_timeout_secs,
                    "log_file": config.log_file
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", config.service_url.as_deref().unwrap_or(""));
        }
        OutputFormat::Human => {
            let effective_path = config_path
                .cloned()
                .unwrap_or_else(Config::config_file_path);
            println!("Configuration:");
            println!(
                "  service_url:          {}",
                config.service_url.as_deref().unwrap_or("(not set)")
            );
            println!(
                "  parent_note_id:       {}",
                config.parent_note_id.as_deref().unwrap_or("(not set)")
            );
            println!(
                "  password:             {}",
                password.as_deref().unwrap_or("(not set)")
            );
            println!("  data_dir:             {}", config.data_dir.display());
            println!("  request_timeout_secs: {}", config.request_timeout_secs);
            println!(
                "  log_file:             {}",
                config
                    .log_file
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "(not set)".to_string())
            );
            println!();
            println!("Config file: {}", effective_path.display());
        }
    }

    Ok(())
}

/// Set a configuration value
pub fn set(
    key: String,
    value: String,
    config_path: Option<&PathBuf>,
    output: &Output,
) -> Result<()> {
    let mut config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;

    apply(&mut config, &key, &value)?;

    let save_path = config_path
        .cloned()
        .unwrap_or_else(Config::config_file_path);
    config
        .save_to_path(&save_path)
        .context("Failed to save configuration")?;

    let shown = if key == "password" && !is_clear(&value) {
        mask(&value)
    } else {
        value
    };
    output.success(&format!("Set {} = {}", key, shown));

    Ok(())
}

fn apply(config: &mut Config, key: &str, value: &str) -> Result<()> {
    match key {
        "service_url" => config.service_url = optional(value),
        "parent_note_id" => config.parent_note_id = optional(value),
        "password" => config.password = optional(value),
        "data_dir" => {
            if is_clear(value) {
                bail!("data_dir cannot be cleared");
            }
            config.data_dir = value.into();
        }
        "request_timeout_secs" => {
            config.request_timeout_secs = value
                .trim()
                .parse()
                .context("Invalid value for request_timeout_secs. Use a whole number of seconds.")?;
        }
        "log_file" => config.log_file = optional(value).map(PathBuf::from),
        _ => {
            bail!(
                "Unknown configuration key: '{}'\n\
                 Valid keys: {}",
                key,
                VALID_KEYS
            );
        }
    }
    Ok(())
}

fn is_clear(value: &str) -> bool {
    value.is_empty() || value == "none"
}

fn optional(value: &str) -> Option<String> {
    if is_clear(value) {
        None
    } else {
        Some(value.to_string())
    }
}
