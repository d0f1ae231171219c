//! trilium-memo core library
//!
//! Links text selected on a web page to notes in a Trilium server through
//! its ETAPI: log in, search for notes matching the selection, show up to
//! two of them, and create a new note when needed.
//!
//! # Architecture
//!
//! - **Session**: the auth token lives in a [`ConfigStore`]; the
//!   [`SessionManager`] acquires and drops it, and builds an explicit
//!   [`Session`] value for every other call
//! - **API**: [`EtapiClient`] is a stateless HTTP wrapper behind the
//!   [`NoteApi`] trait
//! - **Workflow**: [`NoteLinker`] runs one [`LinkRun`] per selection and
//!   reports every transition to a [`Presenter`]
//!
//! # Quick Start
//!
//! ```text
//! let config = Config::load()?;
//! let sessions = SessionManager::new(JsonFileStore::new(config.session_store_path()), config.request_timeout())?;
//! sessions.login(&config.credentials()).await?;
//!
//! let linker = NoteLinker::new(EtapiClient::new(config.request_timeout())?, presenter);
//! let session = sessions.session(&config.credentials())?;
//! let mut run = linker.begin(session, PageContext::new(url, text)?, CancelSignal::never());
//! run.start().await?;
//! ```
//!
//! # Modules
//!
//! - `config`: Application configuration
//! - `store`: Key-value store for session state
//! - `session`: Credentials, token lifecycle, session value
//! - `api`: ETAPI client
//! - `linker`: Search / present / create workflow
//! - `models`: Wire types and page context
//! - `sanitize`: Escaping for untrusted text
//! - `cancel`: Cancellation of abandoned runs
//! - `error`: Error types

pub mod api;
pub mod cancel;
pub mod config;
pub mod error;
pub mod linker;
pub mod models;
pub mod sanitize;
pub mod session;
pub mod store;

pub use api::{EtapiClient, NoteApi};
pub use cancel::{cancellation, CancelSignal, Canceller};
pub use config::Config;
pub use error::{ApiError, AuthError, LinkError, StoreError, ValidationError};
pub use linker::{
    LinkRun, LinkState, NoteLinker, NoteMatch, Presenter, Selection, SelectionProvider,
};
pub use models::{CreateNoteRequest, NoteContent, NoteSummary, PageContext};
pub use session::{AuthToken, Credentials, Session, SessionManager};
pub use store::{ConfigStore, JsonFileStore, MemoryStore};
