//! Note-linking workflow
//!
//! One [`LinkRun`] drives a single page context through search, review and
//! creation:
//!
//! ```text
//! Idle -> Searching -> Presenting(matches) -> Displaying -> Created
//!                   \-> PromptingCreate ------------------/
//!         (any step) -> Failed
//! ```
//!
//! At most two matches are kept. Their contents are fetched concurrently and
//! one failed fetch never hides the other. `Created` and `Failed` are
//! terminal; a new selection starts a new run.

use futures_util::stream::{FuturesUnordered, StreamExt};
use tracing::{debug, info, warn};

use crate::api::NoteApi;
use crate::cancel::CancelSignal;
use crate::error::{LinkError, Phase, ValidationError};
use crate::models::{
    content_preview, CreateNoteRequest, NoteContent, NoteSummary, PageContext,
    MAX_PRESENTED_MATCHES,
};
use crate::session::Session;

/// Receives the workflow's state transitions; rendering lives behind it
pub trait Presenter {
    fn on_searching(&self, context: &PageContext);

    /// `total` reported by the service, `shown` after the cap
    fn on_results(&self, total: usize, shown: usize);

    /// No match; the user may now supply content for a new note
    fn on_none_found(&self);

    fn on_content_loaded(
        &self,
        index: usize,
        note: &NoteSummary,
        content: Result<&NoteContent, &LinkError>,
    );

    fn on_created(&self, note: &NoteSummary, preview: &str);

    fn on_error(&self, error: &LinkError);
}

impl<P: Presenter + ?Sized> Presenter for &P {
    fn on_searching(&self, context: &PageContext) {
        (**self).on_searching(context)
    }

    fn on_results(&self, total: usize, shown: usize) {
        (**self).on_results(total, shown)
    }

    fn on_none_found(&self) {
        (**self).on_none_found()
    }

    fn on_content_loaded(
        &self,
        index: usize,
        note: &NoteSummary,
        content: Result<&NoteContent, &LinkError>,
    ) {
        (**self).on_content_loaded(index, note, content)
    }

    fn on_created(&self, note: &NoteSummary, preview: &str) {
        (**self).on_created(note, preview)
    }

    fn on_error(&self, error: &LinkError) {
        (**self).on_error(error)
    }
}

/// Raw selection handed over by the host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub url: String,
    pub text: String,
}

/// Host capability yielding the current page and selected text
pub trait SelectionProvider {
    /// `None` when there is no active page
    fn current_selection(&self) -> Option<Selection>;
}

/// A presented match and the outcome of fetching its body
#[derive(Debug, Clone, PartialEq)]
pub struct NoteMatch {
    pub summary: NoteSummary,
    pub content: Result<NoteContent, LinkError>,
}

/// Workflow state of a run
#[derive(Debug, Clone, PartialEq)]
pub enum LinkState {
    Idle,
    Searching,
    /// Matches selected, contents being fetched
    Presenting {
        total: usize,
        matches: Vec<NoteSummary>,
    },
    /// Search found nothing
    PromptingCreate,
    /// Every selected match has a fetch outcome
    Displaying {
        total: usize,
        matches: Vec<NoteMatch>,
    },
    Created(NoteSummary),
    Failed(LinkError),
}

impl LinkState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, LinkState::Created(_) | LinkState::Failed(_))
    }

    /// Whether `create_note` is allowed
    pub fn accepts_new_note(&self) -> bool {
        matches!(
            self,
            LinkState::Presenting { .. } | LinkState::Displaying { .. } | LinkState::PromptingCreate
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            LinkState::Idle => "idle",
            LinkState::Searching => "searching",
            LinkState::Presenting { .. } => "presenting",
            LinkState::PromptingCreate => "prompting_create",
            LinkState::Displaying { .. } => "displaying",
            LinkState::Created(_) => "created",
            LinkState::Failed(_) => "failed",
        }
    }
}

/// Owns the API client and presenter shared by every run
pub struct NoteLinker<A, P> {
    api: A,
    presenter: P,
}

impl<A: NoteApi, P: Presenter> NoteLinker<A, P> {
    pub fn new(api: A, presenter: P) -> Self {
        Self { api, presenter }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn presenter(&self) -> &P {
        &self.presenter
    }

    /// Start a run for an already validated page context
    pub fn begin(
        &self,
        session: Option<Session>,
        context: PageContext,
        cancel: CancelSignal,
    ) -> LinkRun<'_, A, P> {
        LinkRun {
            linker: self,
            session,
            context,
            cancel,
            state: LinkState::Idle,
        }
    }

    /// Start a run for the host's current selection
    ///
    /// An empty or missing selection is reported and no run is created.
    pub fn begin_selection(
        &self,
        provider: &impl SelectionProvider,
        session: Option<Session>,
        cancel: CancelSignal,
    ) -> Result<LinkRun<'_, A, P>, LinkError> {
        let context = provider
            .current_selection()
            .ok_or(ValidationError::EmptySelection)
            .and_then(|s| PageContext::new(s.url, s.text))
            .map_err(|e| {
                let err = LinkError::from(e);
                self.presenter.on_error(&err);
                err
            })?;
        Ok(self.begin(session, context, cancel))
    }
}

/// One page context's pass through the workflow
pub struct LinkRun<'a, A, P> {
    linker: &'a NoteLinker<A, P>,
    session: Option<Session>,
    context: PageContext,
    cancel: CancelSignal,
    state: LinkState,
}

impl<'a, A: NoteApi, P: Presenter> LinkRun<'a, A, P> {
    pub fn state(&self) -> &LinkState {
        &self.state
    }

    pub fn context(&self) -> &PageContext {
        &self.context
    }

    /// Search for notes matching the selection and present the outcome
    ///
    /// Returns once the state is `PromptingCreate`, `Displaying` or `Failed`.
    pub async fn start(&mut self) -> Result<(), LinkError> {
        if !matches!(self.state, LinkState::Idle) {
            return Err(LinkError::InvalidState("run already started"));
        }

        let linker = self.linker;
        let Some(session) = self.session.clone() else {
            return Err(self.fail(LinkError::NoSession));
        };

        self.state = LinkState::Searching;
        linker.presenter.on_searching(&self.context);

        let search = linker
            .api
            .search_notes(&session, self.context.selected_text());
        let results = match self.cancel.run(search).await {
            None => return Err(self.abandon()),
            Some(Err(e)) => return Err(self.fail(LinkError::from_api(Phase::Search, e))),
            Some(Ok(results)) => results,
        };

        if results.is_empty() {
            info!("No notes match the selection");
            self.state = LinkState::PromptingCreate;
            linker.presenter.on_none_found();
            return Ok(());
        }

        let total = results.len();
        let matches: Vec<NoteSummary> = results.into_iter().take(MAX_PRESENTED_MATCHES).collect();
        info!("Found {} note(s), presenting {}", total, matches.len());
        linker.presenter.on_results(total, matches.len());
        self.state = LinkState::Presenting {
            total,
            matches: matches.clone(),
        };

        let mut pending: FuturesUnordered<_> = matches
            .iter()
            .enumerate()
            .map(|(index, note)| {
                let session = &session;
                async move {
                    let result = linker.api.get_note_content(session, &note.note_id).await;
                    (index, result)
                }
            })
            .collect();

        let mut loaded = Vec::with_capacity(matches.len());
        loop {
            let next = match self.cancel.run(pending.next()).await {
                None => {
                    drop(pending);
                    return Err(self.abandon());
                }
                Some(next) => next,
            };
            let Some((index, result)) = next else {
                break;
            };

            let result = result.map_err(|e| LinkError::from_api(Phase::Fetch, e));
            match &result {
                Ok(content) => {
                    debug!("Loaded note {}", matches[index].note_id);
                    linker
                        .presenter
                        .on_content_loaded(index, &matches[index], Ok(content));
                }
                Err(e) => {
                    warn!("Failed to load note {}: {}", matches[index].note_id, e);
                    linker
                        .presenter
                        .on_content_loaded(index, &matches[index], Err(e));
                }
            }
            loaded.push((index, result));
        }
        drop(pending);

        loaded.sort_by_key(|(index, _)| *index);
        let matches = matches
            .into_iter()
            .zip(loaded)
            .map(|(summary, (_, content))| NoteMatch { summary, content })
            .collect();
        self.state = LinkState::Displaying { total, matches };
        Ok(())
    }

    /// Create a note for the selection with user-supplied content
    ///
    /// Empty content and failed requests leave the state unchanged so the
    /// user can try again.
    pub async fn create_note(&mut self, content: &str) -> Result<NoteSummary, LinkError> {
        if !self.state.accepts_new_note() {
            return Err(LinkError::InvalidState("no note can be added in this state"));
        }

        let linker = self.linker;
        let content = content.trim();
        if content.is_empty() {
            return Err(self.report(ValidationError::EmptyContent.into()));
        }

        let Some(session) = self.session.clone() else {
            return Err(self.report(LinkError::NoSession));
        };

        let request = CreateNoteRequest::text(
            session.parent_note_id(),
            self.context.note_title(),
            content,
        );

        match self.cancel.run(linker.api.create_note(&session, &request)).await {
            None => Err(self.abandon()),
            Some(Err(e)) => {
                let err = LinkError::from_api(Phase::Create, e);
                warn!("Note creation failed: {}", err);
                Err(self.report(err))
            }
            Some(Ok(note)) => {
                info!("Created note {} under {}", note.note_id, request.parent_note_id);
                linker.presenter.on_created(&note, &content_preview(content));
                self.state = LinkState::Created(note.clone());
                Ok(note)
            }
        }
    }

    /// Tell the presenter about an error without changing state
    fn report(&self, error: LinkError) -> LinkError {
        self.linker.presenter.on_error(&error);
        error
    }

    /// Move to `Failed` and tell the presenter
    fn fail(&mut self, error: LinkError) -> LinkError {
        warn!("Link run failed: {}", error);
        self.state = LinkState::Failed(error.clone());
        self.report(error)
    }

    /// The page context went stale; nothing more is reported
    fn abandon(&mut self) -> LinkError {
        debug!("Link run cancelled in state {}", self.state.name());
        self.state = LinkState::Failed(LinkError::Cancelled);
        LinkError::Cancelled
    }
}
