//! trilium-memo CLI
//!
//! Command-line front end for linking selected text to Trilium notes.

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use memo_core::{Config, LinkError};

mod commands;
mod editor;
mod interrupt;
mod output;
mod presenter;
mod selection;

use commands::link::{LinkArgs, Reported};
use output::{Output, OutputFormat};

#[derive(Parser)]
#[command(name = "memo")]
#[command(about = "trilium-memo - Link selected text to notes in Trilium")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Quiet mode - minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Use this config file instead of the default
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in to the note service and store the token
    Login,
    /// Forget the stored token
    Logout,
    /// Show configuration and login state
    Status,
    /// Show or set configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
    /// Find notes matching a selection and optionally add a new one
    Link {
        /// Selected text; read from stdin when absent or "-"
        text: Option<String>,
        /// URL of the page the text was selected on
        #[arg(short, long)]
        url: Option<String>,
        /// Content of the note to add (opens editor if not provided)
        #[arg(short, long)]
        content: Option<String>,
    },
}

#[derive(Subcommand, Clone)]
enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (service_url, parent_note_id, password, data_dir,
        /// request_timeout_secs, log_file)
        key: String,
        /// Configuration value ("none" clears it)
        value: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let output = Output::new(OutputFormat::from_flags(cli.json, cli.quiet));

    match run(cli, &output).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) if e.downcast_ref::<Reported>().is_some() => ExitCode::FAILURE,
        Err(e) if matches!(e.downcast_ref::<LinkError>(), Some(LinkError::Cancelled)) => {
            if output.format == OutputFormat::Human {
                eprintln!("Cancelled");
            }
            ExitCode::from(interrupt::INTERRUPTED_EXIT_CODE)
        }
        Err(e) => {
            if output.is_json() {
                println!(
                    "{}",
                    serde_json::json!({"status": "error", "message": format!("{:#}", e)})
                );
            } else {
                eprintln!("Error: {:#}", e);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli, output: &Output) -> Result<()> {
    let config_path = cli.config.as_ref();

    // Config commands work on the file, before any logging or session setup
    if let Commands::Config { command } = &cli.command {
        return match command.clone() {
            Some(ConfigCommands::Show) | None => commands::config::show(config_path, output),
            Some(ConfigCommands::Set { key, value }) => {
                commands::config::set(key, value, config_path, output)
            }
        };
    }

    let config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;
    init_logging(&config);

    match cli.command {
        Commands::Config { .. } => unreachable!(), // Handled above
        Commands::Login => commands::session::login(&config, output).await,
        Commands::Logout => commands::session::logout(&config, output),
        Commands::Status => commands::status::show(&config, output),
        Commands::Link { text, url, content } => {
            let args = LinkArgs { text, url, content };
            commands::link::link(&config, args, output).await
        }
    }
}

/// Initialize logging (only if MEMO_LOG is set)
///
/// Logs go to `log_file` when configured, otherwise to stderr.
fn init_logging(config: &Config) {
    let Ok(log_level) = std::env::var("MEMO_LOG") else {
        return;
    };

    let env_filter = EnvFilter::new(format!("memo_core={},memo_cli={}", log_level, log_level));

    match &config.log_file {
        Some(log_path) => {
            let log_file = match OpenOptions::new().create(true).append(true).open(log_path) {
                Ok(f) => f,
                Err(e) => {
                    eprintln!("Warning: Could not open log file {:?}: {}", log_path, e);
                    return;
                }
            };

            let _ = tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_ansi(false)
                .with_writer(log_file)
                .try_init();

            info!("Logging initialized to {:?}", log_path);
        }
        None => {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .try_init();
        }
    }
}
