//! Status command handler

use anyhow::{Context, Result};

use memo_core::Config;

use crate::commands::session;
use crate::output::{Output, OutputFormat};

/// Show config completeness and login state
pub fn show(config: &Config, output: &Output) -> Result<()> {
    let sessions = session::manager(config)?;
    let missing = config.credentials().missing_fields();
    let logged_in = sessions
        .current_token()
        .context("Failed to read session")?
        .is_some();
    let logged_in_at = sessions.logged_in_at().context("Failed to read session")?;

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "service_url": config.service_url,
                    "parent_note_id": config.parent_note_id,
                    "configured": missing.is_empty(),
                    "missing": missing,
                    "logged_in": logged_in,
                    "logged_in_at": logged_in_at,
                    "session_store": sessions.store().path()
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", if logged_in { "logged-in" } else { "logged-out" });
        }
        OutputFormat::Human => {
            println!("trilium-memo Status");
            println!("===================");
            println!();
            println!("Service:");
            println!(
                "  URL:         {}",
                config.service_url.as_deref().unwrap_or("(not set)")
            );
            println!(
                "  Parent note: {}",
                config.parent_note_id.as_deref().unwrap_or("(not set)")
            );
            if missing.is_empty() {
                println!("  Config:      complete");
            } else {
                println!("  Config:      missing {}", missing.join(", "));
            }
            println!();
            println!("Session:");
            if logged_in {
                match logged_in_at {
                    Some(at) => println!(
                        "  Logged in since {}",
                        at.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M")
                    ),
                    None => println!("  Logged in"),
                }
            } else {
                println!("  Not logged in. Run `memo login`.");
            }
            println!("  Store:       {}", sessions.store().path().display());
        }
    }

    Ok(())
}
