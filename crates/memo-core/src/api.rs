//! ETAPI client
//!
//! Thin, stateless wrapper over the note service's external API. Each call
//! takes the [`Session`] explicitly and is a single request: no retries, no
//! caching.

use std::future::Future;
use std::time::Duration;

use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::{RequestBuilder, Response, StatusCode};
use tracing::{debug, warn};

use crate::error::ApiError;
use crate::models::{
    CreateNoteRequest, CreateNoteResponse, NoteContent, NoteSummary, SearchResponse,
};
use crate::session::Session;

/// Note operations the linking workflow depends on
pub trait NoteApi {
    /// Notes matching `query`, in service order
    fn search_notes(
        &self,
        session: &Session,
        query: &str,
    ) -> impl Future<Output = Result<Vec<NoteSummary>, ApiError>> + Send;

    /// Raw body of a note
    fn get_note_content(
        &self,
        session: &Session,
        note_id: &str,
    ) -> impl Future<Output = Result<NoteContent, ApiError>> + Send;

    /// Create a note and return its summary
    fn create_note(
        &self,
        session: &Session,
        request: &CreateNoteRequest,
    ) -> impl Future<Output = Result<NoteSummary, ApiError>> + Send;
}

/// Join the service base URL and an API path
///
/// A trailing slash on the base is ignored.
pub fn endpoint(service_url: &str, path: &str) -> String {
    format!("{}{}", service_url.trim().trim_end_matches('/'), path)
}

/// HTTP client for ETAPI
#[derive(Debug, Clone)]
pub struct EtapiClient {
    http: reqwest::Client,
}

impl EtapiClient {
    /// Create a client whose requests give up after `timeout`
    pub fn new(timeout: Duration) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("trilium-memo/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ApiError::Unreachable(e.to_string()))?;
        Ok(Self { http })
    }

    fn authorized(&self, builder: RequestBuilder, session: &Session) -> RequestBuilder {
        // ETAPI takes the bare token, no scheme
        builder.header(AUTHORIZATION, session.token().as_str())
    }
}

impl NoteApi for EtapiClient {
    async fn search_notes(
        &self,
        session: &Session,
        query: &str,
    ) -> Result<Vec<NoteSummary>, ApiError> {
        let url = endpoint(session.service_url(), "/etapi/notes");
        debug!("GET {} (search, {} chars)", url, query.chars().count());

        let request = self
            .authorized(self.http.get(&url), session)
            .header(ACCEPT, "application/json")
            .query(&[("search", query)]);
        let response = check_status(request.send().await?, false).await?;

        let body: SearchResponse = response
            .json()
            .await
            .map_err(|e| ApiError::InvalidResponse(e.to_string()))?;
        debug!("Search returned {} result(s)", body.results.len());
        Ok(body.results)
    }

    async fn get_note_content(
        &self,
        session: &Session,
        note_id: &str,
    ) -> Result<NoteContent, ApiError> {
        let path = format!("/etapi/notes/{}/content", urlencoding::encode(note_id));
        let url = endpoint(session.service_url(), &path);
        debug!("GET {}", url);

        let request = self.authorized(self.http.get(&url), session);
        let response = check_status(request.send().await?, false).await?;

        Ok(NoteContent::new(response.text().await?))
    }

    async fn create_note(
        &self,
        session: &Session,
        request: &CreateNoteRequest,
    ) -> Result<NoteSummary, ApiError> {
        let url = endpoint(session.service_url(), "/etapi/create-note");
        debug!("POST {} (parent {})", url, request.parent_note_id);

        let builder = self.authorized(self.http.post(&url), session).json(request);
        let response = check_status(builder.send().await?, true).await?;

        let created: CreateNoteResponse = response
            .json()
            .await
            .map_err(|e| ApiError::InvalidResponse(e.to_string()))?;
        Ok(created.into_note())
    }
}

/// Turn a non-success response into an `ApiError`
///
/// With `read_body`, the response text is kept as a diagnostic.
async fn check_status(response: Response, read_body: bool) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    warn!("{} answered {}", response.url().path(), status.as_u16());

    if status == StatusCode::UNAUTHORIZED {
        return Err(ApiError::Unauthorized);
    }

    let body = if read_body {
        Some(response.text().await.unwrap_or_default())
    } else {
        None
    };

    Err(ApiError::RequestFailed {
        status: status.as_u16(),
        body,
    })
}
