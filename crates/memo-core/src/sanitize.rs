//! Escaping for untrusted text
//!
//! Selected page text and note bodies both come from outside. Nothing is
//! interpolated into a display surface without going through one of these.

use scraper::{ElementRef, Html};

/// Escape text for insertion into HTML
pub fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// Clean note HTML, keeping only safe tags and attributes
pub fn clean_html(html: &str) -> String {
    ammonia::clean(html)
}

/// Elements whose end starts a new line
const BLOCK_ELEMENTS: &[&str] = &[
    "address", "article", "aside", "blockquote", "dd", "div", "dl", "dt", "figcaption",
    "figure", "footer", "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr", "li", "main",
    "nav", "ol", "p", "pre", "section", "table", "tr", "ul",
];

/// Elements whose text is never shown
const HIDDEN_ELEMENTS: &[&str] = &["script", "style", "template"];

/// Extract the visible text of an HTML fragment
///
/// `br` and block-level elements become newlines; control characters are
/// dropped.
pub fn html_to_text(html: &str) -> String {
    let fragment = Html::parse_fragment(html);
    let mut text = String::new();
    collect_text(fragment.root_element(), &mut text);

    strip_control(text.trim())
}

fn collect_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        if let Some(text) = child.value().as_text() {
            out.push_str(text);
            continue;
        }

        let Some(child) = ElementRef::wrap(child) else {
            continue;
        };
        let name = child.value().name();
        if name == "br" {
            out.push('\n');
        } else if !HIDDEN_ELEMENTS.contains(&name) {
            collect_text(child, out);
            if BLOCK_ELEMENTS.contains(&name) && !out.is_empty() && !out.ends_with('\n') {
                out.push('\n');
            }
        }
    }
}

/// Remove control characters (terminal escapes included) except newline and tab
pub fn strip_control(s: &str) -> String {
    s.chars()
        .filter(|c| !c.is_control() || *c == '\n' || *c == '\t')
        .collect()
}
