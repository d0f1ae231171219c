//! Error types
//!
//! Every remote failure is converted into one of these kinds at the call
//! site. Each kind carries a short human-readable status message for the
//! presentation layer.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors from the local key-value store
#[derive(Error, Debug, Clone)]
pub enum StoreError {
    /// Failed to read the store file
    #[error("Failed to read '{path}': {details}")]
    Read { path: PathBuf, details: String },

    /// Failed to write the store file
    #[error("Failed to write '{path}': {details}")]
    Write { path: PathBuf, details: String },

    /// Store file is not valid JSON
    #[error("Invalid store format in '{path}': {details}")]
    InvalidFormat { path: PathBuf, details: String },
}

impl StoreError {
    pub(crate) fn read(path: PathBuf, error: io::Error) -> Self {
        StoreError::Read {
            path,
            details: error.to_string(),
        }
    }

    pub(crate) fn write(path: PathBuf, error: io::Error) -> Self {
        StoreError::Write {
            path,
            details: error.to_string(),
        }
    }
}

/// Errors from the auth session manager
#[derive(Error, Debug, Clone)]
pub enum AuthError {
    /// One or more credential fields are empty
    #[error("Incomplete configuration: missing {}", .missing.join(", "))]
    IncompleteConfig { missing: Vec<&'static str> },

    /// The server answered the login with a non-success status
    #[error("Login rejected with HTTP status {status}")]
    LoginRejected { status: u16 },

    /// Transport-level failure (DNS, connection refused, timeout)
    #[error("Note service unreachable: {0}")]
    Unreachable(String),

    /// Successful status but the body did not carry a token
    #[error("Invalid login response: {0}")]
    InvalidResponse(String),

    /// Token could not be persisted
    #[error("Session store error: {0}")]
    Store(#[from] StoreError),
}

impl AuthError {
    /// Short notification text
    pub fn status_message(&self) -> &'static str {
        match self {
            AuthError::IncompleteConfig { .. } => {
                "Login failed: service URL, parent note and password must all be set"
            }
            AuthError::LoginRejected { .. } => "Login failed: the server rejected the password",
            AuthError::Unreachable(_) => "Login failed: the note service is unreachable",
            AuthError::InvalidResponse(_) => "Login failed: unexpected server response",
            AuthError::Store(_) => "Login failed: could not save the session",
        }
    }
}

/// Errors from a single ETAPI request
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// Non-success HTTP status, with the body when it was read
    #[error("Request failed with HTTP status {status}{}", .body.as_deref().map(|b| format!(": {}", b)).unwrap_or_default())]
    RequestFailed { status: u16, body: Option<String> },

    /// HTTP 401: the token is no longer valid
    #[error("Unauthorized: the auth token was rejected")]
    Unauthorized,

    /// No response within the request timeout
    #[error("Request timed out")]
    Timeout,

    /// Transport-level failure
    #[error("Note service unreachable: {0}")]
    Unreachable(String),

    /// Success status with a body that could not be decoded
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl ApiError {
    /// HTTP status, if the server answered
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::RequestFailed { status, .. } => Some(*status),
            ApiError::Unauthorized => Some(401),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            ApiError::Timeout
        } else if error.is_decode() {
            ApiError::InvalidResponse(error.to_string())
        } else {
            ApiError::Unreachable(error.to_string())
        }
    }
}

/// Local validation failures; these never reach the network
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    #[error("No text selected")]
    EmptySelection,

    #[error("Note content cannot be empty")]
    EmptyContent,
}

/// Errors surfaced by the note-linking workflow
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LinkError {
    /// No token (or incomplete configuration) when a session is required
    #[error("Not logged in")]
    NoSession,

    /// The server rejected the token mid-flow
    #[error("Session expired: the server rejected the auth token")]
    SessionExpired,

    #[error("Search failed: {0}")]
    Search(ApiError),

    #[error("Failed to load note content: {0}")]
    Fetch(ApiError),

    #[error("Failed to create note: {0}")]
    Create(ApiError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Transport failure or timeout, in any phase
    #[error("Note service unreachable: {0}")]
    Unreachable(String),

    /// The page context was abandoned
    #[error("Cancelled")]
    Cancelled,

    /// Operation not allowed in the current state
    #[error("Operation not allowed: {0}")]
    InvalidState(&'static str),
}

/// Which request an `ApiError` came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Search,
    Fetch,
    Create,
}

impl LinkError {
    /// Convert a request error from the given phase
    pub fn from_api(phase: Phase, error: ApiError) -> Self {
        match error {
            ApiError::Unauthorized => LinkError::SessionExpired,
            ApiError::Timeout => LinkError::Unreachable("request timed out".to_string()),
            ApiError::Unreachable(details) => LinkError::Unreachable(details),
            other => match phase {
                Phase::Search => LinkError::Search(other),
                Phase::Fetch => LinkError::Fetch(other),
                Phase::Create => LinkError::Create(other),
            },
        }
    }

    /// Short notification text
    pub fn status_message(&self) -> &'static str {
        match self {
            LinkError::NoSession => "Not logged in. Configure the service and run `memo login`.",
            LinkError::SessionExpired => "Session expired. Run `memo login` again.",
            LinkError::Search(_) => "Note search failed",
            LinkError::Fetch(_) => "Failed to load note content",
            LinkError::Create(_) => "Failed to add note",
            LinkError::Validation(ValidationError::EmptySelection) => {
                "Select some text on the page first"
            }
            LinkError::Validation(ValidationError::EmptyContent) => "Note content cannot be empty",
            LinkError::Unreachable(_) => "The note service is unreachable",
            LinkError::Cancelled => "Cancelled",
            LinkError::InvalidState(_) => "That action is not available right now",
        }
    }

    /// Whether a fresh login is the fix
    pub fn needs_login(&self) -> bool {
        matches!(self, LinkError::NoSession | LinkError::SessionExpired)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unauthorized_maps_to_session_expired() {
        for phase in [Phase::Search, Phase::Fetch, Phase::Create] {
            let err = LinkError::from_api(phase, ApiError::Unauthorized);
            assert_eq!(err, LinkError::SessionExpired);
            assert!(err.needs_login());
        }
    }

    #[test]
    fn test_transport_errors_map_to_unreachable() {
        let err = LinkError::from_api(Phase::Fetch, ApiError::Timeout);
        assert!(matches!(err, LinkError::Unreachable(_)));

        let err = LinkError::from_api(
            Phase::Search,
            ApiError::Unreachable("connection refused".to_string()),
        );
        assert_eq!(err, LinkError::Unreachable("connection refused".to_string()));
    }

    #[test]
    fn test_status_errors_keep_phase() {
        let failed = ApiError::RequestFailed {
            status: 400,
            body: Some("bad request".to_string()),
        };
        let err = LinkError::from_api(Phase::Create, failed.clone());
        assert_eq!(err, LinkError::Create(failed));
        assert_eq!(err.status_message(), "Failed to add note");
    }

    #[test]
    fn test_request_failed_display() {
        let with_body = ApiError::RequestFailed {
            status: 400,
            body: Some("bad request".to_string()),
        };
        assert_eq!(
            with_body.to_string(),
            "Request failed with HTTP status 400: bad request"
        );

        let without_body = ApiError::RequestFailed {
            status: 500,
            body: None,
        };
        assert_eq!(without_body.to_string(), "Request failed with HTTP status 500");
        assert_eq!(without_body.status(), Some(500));
    }

    #[test]
    fn test_incomplete_config_display() {
        let err = AuthError::IncompleteConfig {
            missing: vec!["service_url", "password"],
        };
        let msg = err.to_string();
        assert!(msg.contains("service_url, password"));
        assert!(err.status_message().starts_with("Login failed"));
    }
}
