//! Data models for trilium-memo
//!
//! Wire types for the ETAPI endpoints plus the per-interaction page context.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::sanitize;

/// Prefix marking notes created by this tool
pub const TITLE_PREFIX: &str = "TriliumMemo: ";

/// Characters of the selection kept in a note title
pub const TITLE_MAX_CHARS: usize = 20;

/// Characters of new content shown after creation
pub const PREVIEW_MAX_CHARS: usize = 10;

/// Position of new notes within the parent
pub const NOTE_POSITION: i64 = 10;

/// Maximum number of search matches presented
pub const MAX_PRESENTED_MATCHES: usize = 2;

/// The page a selection came from and the selected text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageContext {
    page_url: String,
    selected_text: String,
}

impl PageContext {
    /// Build a context; the text is trimmed and must not be empty
    pub fn new(
        page_url: impl Into<String>,
        selected_text: impl AsRef<str>,
    ) -> Result<Self, ValidationError> {
        let selected_text = selected_text.as_ref().trim();
        if selected_text.is_empty() {
            return Err(ValidationError::EmptySelection);
        }
        Ok(Self {
            page_url: page_url.into(),
            selected_text: selected_text.to_string(),
        })
    }

    pub fn page_url(&self) -> &str {
        &self.page_url
    }

    pub fn selected_text(&self) -> &str {
        &self.selected_text
    }

    /// Title for a note created from this selection
    pub fn note_title(&self) -> String {
        note_title(&self.selected_text)
    }
}

/// A search hit; the body must be fetched separately
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteSummary {
    pub note_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub note_type: Option<String>,

    /// Remaining metadata, kept as returned
    #[serde(flatten)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl NoteSummary {
    pub fn new(note_id: impl Into<String>) -> Self {
        Self {
            note_id: note_id.into(),
            title: None,
            note_type: None,
            metadata: serde_json::Map::new(),
        }
    }
}

/// Body of a note as stored by the service (HTML for text notes)
///
/// The raw body is untrusted; display it through `plain_text` or
/// `sanitized_html`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteContent(String);

impl NoteContent {
    pub fn new(body: impl Into<String>) -> Self {
        Self(body.into())
    }

    pub fn raw(&self) -> &str {
        &self.0
    }

    /// Body with dangerous markup removed
    pub fn sanitized_html(&self) -> String {
        sanitize::clean_html(&self.0)
    }

    /// Text content only, safe for a terminal
    pub fn plain_text(&self) -> String {
        sanitize::html_to_text(&self.0)
    }
}

/// Body of `POST /etapi/create-note`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateNoteRequest {
    pub parent_note_id: String,
    pub title: String,
    #[serde(rename = "type")]
    pub note_type: String,
    pub content: String,
    pub note_position: i64,
}

impl CreateNoteRequest {
    /// A text note under `parent_note_id`
    pub fn text(
        parent_note_id: impl Into<String>,
        title: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            parent_note_id: parent_note_id.into(),
            title: title.into(),
            note_type: "text".to_string(),
            content: content.into(),
            note_position: NOTE_POSITION,
        }
    }
}

/// Response of `GET /etapi/notes?search=`
#[derive(Debug, Default, Deserialize)]
pub(crate) struct SearchResponse {
    #[serde(default)]
    pub results: Vec<NoteSummary>,
}

/// Response of `POST /etapi/create-note`
///
/// The service answers `{ note, branch }`; a bare note is accepted too.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum CreateNoteResponse {
    Wrapped { note: NoteSummary },
    Flat(NoteSummary),
}

impl CreateNoteResponse {
    pub fn into_note(self) -> NoteSummary {
        match self {
            CreateNoteResponse::Wrapped { note } => note,
            CreateNoteResponse::Flat(note) => note,
        }
    }
}

/// Note title derived from the selected text
pub fn note_title(selected_text: &str) -> String {
    format!(
        "{}{}",
        TITLE_PREFIX,
        truncate_chars(selected_text, TITLE_MAX_CHARS)
    )
}

/// Short preview of new note content
pub fn content_preview(content: &str) -> String {
    truncate_chars(content, PREVIEW_MAX_CHARS)
}

/// Keep the first `max_chars` characters, adding "..." if anything was cut
fn truncate_chars(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => format!("{}...", &s[..byte_idx]),
        None => s.to_string(),
    }
}
