//! Link command: search, present, then optionally add a note

use std::fmt;

use anyhow::{Context, Result};
use tracing::debug;

use memo_core::{cancellation, Config, EtapiClient, LinkError, NoteApi, NoteLinker, Presenter};
use memo_core::{LinkRun, LinkState};

use crate::commands::session;
use crate::editor;
use crate::interrupt::Interrupt;
use crate::output::Output;
use crate::presenter::CliPresenter;
use crate::selection::ArgSelection;

const EDITOR_HINT: &str = "Write the content of the new note below.\n\
                           Lines starting with '#:' are ignored. Leave it empty to cancel.";

/// Marks a failure the presenter has already shown
#[derive(Debug)]
pub struct Reported;

impl fmt::Display for Reported {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("error already reported")
    }
}

impl std::error::Error for Reported {}

pub struct LinkArgs {
    pub text: Option<String>,
    pub url: Option<String>,
    pub content: Option<String>,
}

/// Run the link workflow for one selection
pub async fn link(config: &Config, args: LinkArgs, output: &Output) -> Result<()> {
    let sessions = session::manager(config)?;
    let session = sessions
        .session(&config.credentials())
        .context("Failed to read session")?;

    let selection =
        ArgSelection::from_args(args.url, args.text).context("Failed to read selection")?;

    let api = EtapiClient::new(config.request_timeout()).context("Failed to create HTTP client")?;
    let linker = NoteLinker::new(api, CliPresenter::stdio(output.format));

    // Ctrl-C during a request abandons the page context
    let (canceller, signal) = cancellation();
    let interrupt = Interrupt::install(canceller);

    let mut run = linker
        .begin_selection(&selection, session, signal)
        .map_err(|_| Reported)?;

    {
        let _request = interrupt.request();
        run.start().await.map_err(escalate)?;
    }

    match args.content {
        Some(content) => {
            let _request = interrupt.request();
            run.create_note(&content).await.map_err(escalate)?;
        }
        None if output.should_prompt() && editor::is_interactive() => {
            prompt_for_note(&mut run, &interrupt).await?;
        }
        None => debug!("No content given, stopping in state {}", run.state().name()),
    }

    Ok(())
}

/// Ask for note content in the editor until a note is added or the user gives up
async fn prompt_for_note<A: NoteApi, P: Presenter>(
    run: &mut LinkRun<'_, A, P>,
    interrupt: &Interrupt,
) -> Result<()> {
    let question = match run.state() {
        LinkState::PromptingCreate => "Add a new note for this selection?",
        _ => "Add another note for this selection?",
    };
    if !editor::confirm(question)? {
        return Ok(());
    }

    loop {
        let content = {
            let _editing = interrupt.editor();
            editor::compose(EDITOR_HINT)?
        };
        if content.trim().is_empty() {
            println!("Nothing written, no note added.");
            return Ok(());
        }

        let created = {
            let _request = interrupt.request();
            run.create_note(&content).await
        };
        match created {
            Ok(_) => return Ok(()),
            Err(e @ LinkError::Cancelled) => return Err(e.into()),
            Err(e) if e.needs_login() => return Err(Reported.into()),
            Err(_) => {
                // The failure is shown; the content is lost with the temp file
                if !editor::confirm("Try again?")? {
                    return Err(Reported.into());
                }
            }
        }
    }
}

/// Errors the presenter saw are not printed twice
fn escalate(error: LinkError) -> anyhow::Error {
    match error {
        LinkError::Cancelled | LinkError::InvalidState(_) => error.into(),
        _ => Reported.into(),
    }
}
