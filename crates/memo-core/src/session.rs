//! Auth session management
//!
//! Owns the ETAPI auth token: acquires it with `POST /etapi/auth/login`,
//! persists it in a [`ConfigStore`], hands it out, and drops it on logout.
//!
//! The token is never retried or refreshed here. A 401 from any later call
//! is surfaced to the caller as an expired session.

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::api::endpoint;
use crate::error::{AuthError, StoreError};
use crate::store::ConfigStore;

/// Store key for the auth token
pub const AUTH_TOKEN_KEY: &str = "auth_token";

/// Store key for the time of the last successful login
pub const LOGGED_IN_AT_KEY: &str = "logged_in_at";

/// Login credentials, taken from the application config
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub service_url: String,
    pub parent_note_id: String,
    pub password: String,
}

impl Credentials {
    /// Names of the fields that are empty
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.service_url.trim().is_empty() {
            missing.push("service_url");
        }
        if self.parent_note_id.trim().is_empty() {
            missing.push("parent_note_id");
        }
        if self.password.is_empty() {
            missing.push("password");
        }
        missing
    }
}

// The password must never end up in logs
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("service_url", &self.service_url)
            .field("parent_note_id", &self.parent_note_id)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Opaque token issued by the note service; never empty
#[derive(Clone, PartialEq, Eq)]
pub struct AuthToken(String);

impl AuthToken {
    /// Wrap a token, rejecting empty strings
    pub fn new(token: impl Into<String>) -> Option<Self> {
        let token = token.into();
        if token.is_empty() {
            None
        } else {
            Some(Self(token))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AuthToken(<redacted>)")
    }
}

/// Everything an ETAPI call needs, passed explicitly
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    service_url: String,
    parent_note_id: String,
    token: AuthToken,
}

impl Session {
    pub fn new(
        service_url: impl Into<String>,
        parent_note_id: impl Into<String>,
        token: AuthToken,
    ) -> Self {
        Self {
            service_url: service_url.into(),
            parent_note_id: parent_note_id.into(),
            token,
        }
    }

    pub fn service_url(&self) -> &str {
        &self.service_url
    }

    pub fn parent_note_id(&self) -> &str {
        &self.parent_note_id
    }

    pub fn token(&self) -> &AuthToken {
        &self.token
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginResponse {
    #[serde(default)]
    auth_token: Option<String>,
}

/// Auth session manager
pub struct SessionManager<S> {
    store: S,
    http: reqwest::Client,
}

impl<S: ConfigStore> SessionManager<S> {
    /// Create a manager whose login request gives up after `timeout`
    pub fn new(store: S, timeout: Duration) -> Result<Self, AuthError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AuthError::Unreachable(e.to_string()))?;
        Ok(Self { store, http })
    }

    /// Log in and persist the issued token
    ///
    /// Nothing is stored unless the whole exchange succeeds.
    pub async fn login(&self, credentials: &Credentials) -> Result<AuthToken, AuthError> {
        let missing = credentials.missing_fields();
        if !missing.is_empty() {
            warn!("Login skipped, missing configuration: {}", missing.join(", "));
            return Err(AuthError::IncompleteConfig { missing });
        }

        let url = endpoint(&credentials.service_url, "/etapi/auth/login");
        debug!("POST {}", url);

        let response = self
            .http
            .post(&url)
            .json(&serde_json::json!({ "password": credentials.password }))
            .send()
            .await
            .map_err(|e| {
                warn!("Login request failed: {}", e);
                AuthError::Unreachable(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            warn!("Login rejected with status {}", status.as_u16());
            return Err(AuthError::LoginRejected {
                status: status.as_u16(),
            });
        }

        let body: LoginResponse = response
            .json()
            .await
            .map_err(|e| AuthError::InvalidResponse(e.to_string()))?;

        let token = body
            .auth_token
            .and_then(AuthToken::new)
            .ok_or_else(|| AuthError::InvalidResponse("missing authToken".to_string()))?;

        let mut entries = HashMap::new();
        entries.insert(AUTH_TOKEN_KEY.to_string(), token.as_str().to_string());
        entries.insert(LOGGED_IN_AT_KEY.to_string(), Utc::now().to_rfc3339());
        self.store.set(entries)?;

        info!("Logged in to {}", credentials.service_url);
        Ok(token)
    }

    /// Stored token, without touching the network
    pub fn current_token(&self) -> Result<Option<AuthToken>, StoreError> {
        let mut values = self.store.get(&[AUTH_TOKEN_KEY])?;
        Ok(values.remove(AUTH_TOKEN_KEY).and_then(AuthToken::new))
    }

    /// When the stored token was obtained
    ///
    /// `None` when logged out or when the timestamp is unreadable.
    pub fn logged_in_at(&self) -> Result<Option<DateTime<Utc>>, StoreError> {
        let values = self.store.get(&[LOGGED_IN_AT_KEY])?;
        Ok(values
            .get(LOGGED_IN_AT_KEY)
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc)))
    }

    /// Forget the token; other stored values are kept
    pub fn logout(&self) -> Result<(), StoreError> {
        self.store.remove(&[AUTH_TOKEN_KEY, LOGGED_IN_AT_KEY])?;
        info!("Logged out");
        Ok(())
    }

    /// Session for the given credentials, if a token is stored
    pub fn session(&self, credentials: &Credentials) -> Result<Option<Session>, StoreError> {
        if credentials.service_url.trim().is_empty() || credentials.parent_note_id.trim().is_empty()
        {
            return Ok(None);
        }

        Ok(self.current_token()?.map(|token| {
            Session::new(
                credentials.service_url.clone(),
                credentials.parent_note_id.clone(),
                token,
            )
        }))
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}
