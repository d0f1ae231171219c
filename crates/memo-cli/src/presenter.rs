//! Terminal presenter for the link workflow
//!
//! Human mode prints note bodies as plain text; JSON mode emits one event
//! object per line, carrying HTML that is escaped or sanitized for hosts
//! that render it. Note bodies and the selection never reach the terminal raw.

use std::io::{self, Write};
use std::sync::Mutex;

use serde_json::json;

use memo_core::sanitize::{escape_html, strip_control};
use memo_core::{LinkError, NoteContent, NoteSummary, PageContext, Presenter};

use crate::output::{truncate, OutputFormat};

/// Width of the selection shown while searching
const SELECTION_PREVIEW_CHARS: usize = 60;

/// Progress goes to `out`, human-readable errors to `err`
pub struct CliPresenter<W: Write = io::Stdout, E: Write = io::Stderr> {
    format: OutputFormat,
    out: Mutex<W>,
    err: Mutex<E>,
}

impl CliPresenter {
    pub fn stdio(format: OutputFormat) -> Self {
        Self::new(format, io::stdout(), io::stderr())
    }
}

impl<W: Write, E: Write> CliPresenter<W, E> {
    pub fn new(format: OutputFormat, out: W, err: E) -> Self {
        Self {
            format,
            out: Mutex::new(out),
            err: Mutex::new(err),
        }
    }

    #[cfg(test)]
    fn into_inner(self) -> (W, E) {
        (into_inner(self.out), into_inner(self.err))
    }

    fn line(&self, text: &str) {
        write_line(&self.out, text);
    }

    fn error_line(&self, text: &str) {
        write_line(&self.err, text);
    }

    fn event(&self, value: serde_json::Value) {
        self.line(&value.to_string());
    }
}

fn write_line(target: &Mutex<impl Write>, text: &str) {
    let mut target = match target.lock() {
        Ok(target) => target,
        Err(poisoned) => poisoned.into_inner(),
    };
    // A closed stdout is not worth failing the run for
    let _ = writeln!(target, "{}", text);
}

#[cfg(test)]
fn into_inner<T>(lock: Mutex<T>) -> T {
    match lock.into_inner() {
        Ok(value) => value,
        Err(poisoned) => poisoned.into_inner(),
    }
}

fn display_title(note: &NoteSummary) -> String {
    match note.title.as_deref() {
        Some(title) if !title.trim().is_empty() => strip_control(title),
        _ => strip_control(&note.note_id),
    }
}

/// Error details embed server text (response bodies, decode errors)
fn error_details(error: &LinkError) -> String {
    strip_control(&error.to_string())
}

impl<W: Write, E: Write> Presenter for CliPresenter<W, E> {
    fn on_searching(&self, context: &PageContext) {
        match self.format {
            OutputFormat::Human => self.line(&format!(
                "Searching notes for \"{}\"...",
                truncate(
                    &strip_control(context.selected_text()).replace('\n', " "),
                    SELECTION_PREVIEW_CHARS
                )
            )),
            OutputFormat::Json => self.event(json!({
                "event": "searching",
                "text": context.selected_text(),
                "text_html": escape_html(context.selected_text()),
                "url": context.page_url(),
            })),
            OutputFormat::Quiet => {}
        }
    }

    fn on_results(&self, total: usize, shown: usize) {
        match self.format {
            OutputFormat::Human => {
                if total > shown {
                    self.line(&format!("Found {} note(s), showing the first {}", total, shown));
                } else {
                    self.line(&format!("Found {} note(s)", total));
                }
            }
            OutputFormat::Json => self.event(json!({
                "event": "results",
                "total": total,
                "shown": shown,
            })),
            OutputFormat::Quiet => {}
        }
    }

    fn on_none_found(&self) {
        match self.format {
            OutputFormat::Human => self.line("No matching notes."),
            OutputFormat::Json => self.event(json!({"event": "none_found"})),
            OutputFormat::Quiet => {}
        }
    }

    fn on_content_loaded(
        &self,
        index: usize,
        note: &NoteSummary,
        content: Result<&NoteContent, &LinkError>,
    ) {
        match self.format {
            OutputFormat::Human => {
                self.line("");
                self.line(&format!("── [{}] {} ──", index + 1, display_title(note)));
                match content {
                    Ok(content) => {
                        let text = content.plain_text();
                        if text.is_empty() {
                            self.line("(empty note)");
                        } else {
                            self.line(&text);
                        }
                    }
                    Err(e) => {
                        self.line(&format!("⚠ {}: {}", e.status_message(), error_details(e)))
                    }
                }
            }
            OutputFormat::Json => {
                let mut event = json!({
                    "event": "content",
                    "index": index,
                    "note": note,
                });
                match content {
                    Ok(content) => event["content"] = json!(content.sanitized_html()),
                    Err(e) => {
                        event["error"] = json!({
                            "message": e.status_message(),
                            "details": e.to_string(),
                        })
                    }
                }
                self.event(event);
            }
            OutputFormat::Quiet => {
                if content.is_ok() {
                    self.line(&strip_control(&note.note_id));
                }
            }
        }
    }

    fn on_created(&self, note: &NoteSummary, preview: &str) {
        match self.format {
            OutputFormat::Human => self.line(&format!(
                "✓ Added note {}: {}",
                strip_control(&note.note_id),
                strip_control(preview)
            )),
            OutputFormat::Json => self.event(json!({
                "event": "created",
                "note": note,
                "preview": preview,
            })),
            OutputFormat::Quiet => self.line(&strip_control(&note.note_id)),
        }
    }

    fn on_error(&self, error: &LinkError) {
        match self.format {
            OutputFormat::Json => self.event(json!({
                "event": "error",
                "message": error.status_message(),
                "details": error.to_string(),
            })),
            OutputFormat::Human => {
                self.error_line(&format!("✗ {}", error.status_message()));
                if !error.needs_login() {
                    self.error_line(&format!("  {}", error_details(error)));
                }
            }
            OutputFormat::Quiet => self.error_line(&format!("✗ {}", error.status_message())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use memo_core::ApiError;

    type TestPresenter = CliPresenter<Vec<u8>, Vec<u8>>;

    fn presenter(format: OutputFormat) -> TestPresenter {
        CliPresenter::new(format, Vec::new(), Vec::new())
    }

    fn output(presenter: TestPresenter) -> String {
        String::from_utf8(presenter.into_inner().0).unwrap()
    }

    fn errors(presenter: TestPresenter) -> String {
        String::from_utf8(presenter.into_inner().1).unwrap()
    }

    fn note(id: &str, title: Option<&str>) -> NoteSummary {
        NoteSummary {
            title: title.map(str::to_string),
            ..NoteSummary::new(id)
        }
    }

    #[test]
    fn test_human_content_is_plain_text() {
        let presenter = presenter(OutputFormat::Human);
        let content = NoteContent::new("<p>Hello <script>alert(1)</script><b>world</b></p>\x1b[31m");
        presenter.on_content_loaded(0, &note("n1", Some("First")), Ok(&content));

        let out = output(presenter);
        assert!(out.contains("── [1] First ──"));
        assert!(out.contains("Hello"));
        assert!(out.contains("world"));
        assert!(!out.contains("<b>"));
        assert!(!out.contains('\x1b'));
    }

    #[test]
    fn test_human_failed_fetch_is_shown_inline() {
        let presenter = presenter(OutputFormat::Human);
        let err = LinkError::Fetch(ApiError::RequestFailed {
            status: 404,
            body: None,
        });
        presenter.on_content_loaded(1, &note("n2", None), Err(&err));

        let out = output(presenter);
        assert!(out.contains("── [2] n2 ──"));
        assert!(out.contains("Failed to load note content"));
    }

    #[test]
    fn test_human_results_mention_cap() {
        let presenter = presenter(OutputFormat::Human);
        presenter.on_results(3, 2);
        presenter.on_results(1, 1);

        let out = output(presenter);
        assert!(out.contains("Found 3 note(s), showing the first 2"));
        assert!(out.contains("Found 1 note(s)\n"));
    }

    #[test]
    fn test_json_events_are_lines() {
        let presenter = presenter(OutputFormat::Json);
        let context = PageContext::new("https://example.com", "a <b> & c").unwrap();
        presenter.on_searching(&context);
        presenter.on_none_found();
        presenter.on_created(&note("new", None), "note body");

        let out = output(presenter);
        let events: Vec<serde_json::Value> = out
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(events.len(), 3);
        assert_eq!(events[0]["event"], "searching");
        assert_eq!(events[0]["text"], "a <b> & c");
        assert_eq!(events[0]["text_html"], "a &lt;b&gt; &amp; c");
        assert_eq!(events[1]["event"], "none_found");
        assert_eq!(events[2]["note"]["noteId"], "new");
        assert_eq!(events[2]["preview"], "note body");
    }

    #[test]
    fn test_json_content_is_sanitized() {
        let presenter = presenter(OutputFormat::Json);
        let content = NoteContent::new(r#"<p onclick="x()">hi</p><script>bad()</script>"#);
        presenter.on_content_loaded(0, &note("n1", None), Ok(&content));

        let out = output(presenter);
        let event: serde_json::Value = serde_json::from_str(out.trim()).unwrap();
        let html = event["content"].as_str().unwrap();
        assert!(html.contains("hi"));
        assert!(!html.contains("script"));
        assert!(!html.contains("onclick"));
    }

    #[test]
    fn test_quiet_prints_ids_only() {
        let presenter = presenter(OutputFormat::Quiet);
        let context = PageContext::new("", "hello").unwrap();
        presenter.on_searching(&context);
        presenter.on_results(2, 2);
        presenter.on_content_loaded(0, &note("n1", None), Ok(&NoteContent::new("x")));
        presenter.on_created(&note("new", None), "body");

        assert_eq!(output(presenter), "n1\nnew\n");
    }

    #[test]
    fn test_human_error_strips_server_escapes() {
        let presenter = presenter(OutputFormat::Human);
        let err = LinkError::Create(ApiError::RequestFailed {
            status: 400,
            body: Some("\x1b]0;owned\x07\x1b[2Jbad".to_string()),
        });
        presenter.on_error(&err);

        let errors = errors(presenter);
        assert!(errors.contains("Failed to add note"));
        assert!(errors.contains("bad"));
        assert!(!errors.contains('\x1b'));
        assert!(!errors.contains('\x07'));
    }

    #[test]
    fn test_human_fetch_error_strips_escapes() {
        let presenter = presenter(OutputFormat::Human);
        let err = LinkError::Fetch(ApiError::InvalidResponse("\x1b[31mred".to_string()));
        presenter.on_content_loaded(0, &note("n1\x1b[2J", None), Err(&err));

        let out = output(presenter);
        assert!(out.contains("red"));
        assert!(!out.contains('\x1b'));
    }

    #[test]
    fn test_errors_go_to_error_writer() {
        let presenter = presenter(OutputFormat::Quiet);
        presenter.on_error(&LinkError::NoSession);

        let (out, err) = presenter.into_inner();
        assert!(out.is_empty());
        assert_eq!(
            String::from_utf8(err).unwrap(),
            format!("✗ {}\n", LinkError::NoSession.status_message())
        );
    }
}
