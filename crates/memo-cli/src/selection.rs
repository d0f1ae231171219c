//! Selection from the command line
//!
//! Stands in for the browser's current page: the selected text comes from
//! the argument, or from stdin when the argument is absent or `-`.

use std::io::{self, Read};

use memo_core::{Selection, SelectionProvider};

/// Page URL used when none is given
const NO_PAGE_URL: &str = "";

pub struct ArgSelection {
    selection: Option<Selection>,
}

impl ArgSelection {
    pub fn new(url: Option<String>, text: String) -> Self {
        Self {
            selection: Some(Selection {
                url: url.unwrap_or_else(|| NO_PAGE_URL.to_string()),
                text,
            }),
        }
    }

    /// Build from the `TEXT` argument, reading stdin when needed
    pub fn from_args(url: Option<String>, text: Option<String>) -> io::Result<Self> {
        match text {
            Some(text) if text != "-" => Ok(Self::new(url, text)),
            _ => Self::from_reader(url, io::stdin().lock()),
        }
    }

    pub fn from_reader(url: Option<String>, mut reader: impl Read) -> io::Result<Self> {
        let mut text = String::new();
        reader.read_to_string(&mut text)?;
        Ok(Self::new(url, text))
    }
}

impl SelectionProvider for ArgSelection {
    fn current_selection(&self) -> Option<Selection> {
        self.selection.clone()
    }
}
