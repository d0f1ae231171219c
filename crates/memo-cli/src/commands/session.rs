//! Login and logout

use anyhow::{bail, Context, Result};

use memo_core::{AuthError, Config, JsonFileStore, SessionManager};

use crate::output::Output;

/// Session manager backed by the store in the data directory
pub fn manager(config: &Config) -> Result<SessionManager<JsonFileStore>> {
    let store = JsonFileStore::new(config.session_store_path());
    SessionManager::new(store, config.request_timeout()).context("Failed to create HTTP client")
}

/// Log in with the configured credentials
pub async fn login(config: &Config, output: &Output) -> Result<()> {
    let sessions = manager(config)?;
    let credentials = config.credentials();

    output.message(&format!("Logging in to {}...", credentials.service_url));

    match sessions.login(&credentials).await {
        Ok(_) => {
            output.success("Logged in");
            Ok(())
        }
        Err(AuthError::IncompleteConfig { missing }) => {
            let hints: Vec<String> = missing
                .iter()
                .map(|key| format!("  memo config set {} <value>", key))
                .collect();
            bail!(
                "Missing configuration: {}. Set it with:\n{}",
                missing.join(", "),
                hints.join("\n")
            );
        }
        Err(e) => {
            let message = e.status_message();
            Err(anyhow::Error::new(e).context(message))
        }
    }
}

/// Drop the stored token
pub fn logout(config: &Config, output: &Output) -> Result<()> {
    let sessions = manager(config)?;
    let was_logged_in = sessions
        .current_token()
        .context("Failed to read session")?
        .is_some();

    sessions.logout().context("Failed to clear session")?;

    if was_logged_in {
        output.success("Logged out");
    } else {
        output.message("Not logged in");
    }
    Ok(())
}
