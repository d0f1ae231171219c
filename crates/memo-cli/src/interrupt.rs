//! Ctrl-C handling for the link command
//!
//! Once tokio owns SIGINT it keeps it for the rest of the process, so every
//! press is dispatched on what the CLI is doing: a request in flight is
//! cancelled, a running editor is left to handle the key itself, and at a
//! prompt (or anywhere else) the process exits.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use memo_core::Canceller;
use tracing::debug;

/// Exit status for a process ended by SIGINT
pub const INTERRUPTED_EXIT_CODE: u8 = 130;

const WAITING: u8 = 0;
const REQUEST: u8 = 1;
const EDITOR: u8 = 2;

/// What a Ctrl-C press does right now
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Exit,
    Cancel,
    Ignore,
}

#[derive(Debug, Clone, Default)]
pub struct Interrupt {
    mode: Arc<AtomicU8>,
}

impl Interrupt {
    /// Take over Ctrl-C; requests are cancelled through `canceller`
    pub fn install(canceller: Canceller) -> Self {
        let interrupt = Self::default();
        let handle = interrupt.clone();

        tokio::spawn(async move {
            while tokio::signal::ctrl_c().await.is_ok() {
                match handle.action() {
                    Action::Cancel => {
                        debug!("Interrupted, cancelling the request in flight");
                        canceller.cancel();
                    }
                    Action::Ignore => {}
                    Action::Exit => {
                        eprintln!();
                        std::process::exit(i32::from(INTERRUPTED_EXIT_CODE));
                    }
                }
            }
        });

        interrupt
    }

    /// Mark a network request as in flight until the guard drops
    pub fn request(&self) -> ModeGuard {
        self.enter(REQUEST)
    }

    /// Mark the editor as running until the guard drops
    pub fn editor(&self) -> ModeGuard {
        self.enter(EDITOR)
    }

    pub fn action(&self) -> Action {
        match self.mode.load(Ordering::SeqCst) {
            REQUEST => Action::Cancel,
            EDITOR => Action::Ignore,
            _ => Action::Exit,
        }
    }

    fn enter(&self, mode: u8) -> ModeGuard {
        let previous = self.mode.swap(mode, Ordering::SeqCst);
        ModeGuard {
            mode: Arc::clone(&self.mode),
            previous,
        }
    }
}

/// Restores the previous mode on drop
#[must_use]
pub struct ModeGuard {
    mode: Arc<AtomicU8>,
    previous: u8,
}

impl Drop for ModeGuard {
    fn drop(&mut self) {
        self.mode.store(self.previous, Ordering::SeqCst);
    }
}
