//! Message types for actor communication.
//!
//! These enums define the protocol between the console's threads.

use crossbeam_channel::Sender;
use std::fmt;

/// A unit of work run on the display thread.
pub type DisplayJob = Box<dyn FnOnce() + Send + 'static>;

/// Commands sent to the display thread.
pub enum DisplayCommand {
    /// Run a job.
    Exec(DisplayJob),

    /// Stop after the jobs queued so far.
    Shutdown,
}

impl fmt::Debug for DisplayCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exec(_) => f.write_str("Exec(..)"),
            Self::Shutdown => f.write_str("Shutdown"),
        }
    }
}

/// Commands sent to the document updater.
#[derive(Debug)]
pub enum UpdaterCommand {
    /// Apply everything in the pending queue.
    Drain,

    /// Apply everything in the pending queue, then acknowledge.
    Flush(Sender<()>),

    /// Stop the updater thread.
    Shutdown,
}

/// Keyboard events from the terminal, reduced to what a console needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyInput {
    /// A printable character.
    Char(char),

    /// Enter/Return key.
    Enter,

    /// Tab key.
    Tab,

    /// Backspace key.
    Backspace,

    /// Paste event (bracketed paste).
    Paste(String),

    /// Esc, Ctrl+C or Ctrl+D.
    Interrupt,

    /// Terminal was resized.
    Resize {
        /// New width in columns.
        width: u16,
        /// New height in rows.
        height: u16,
    },

    /// Keyboard thread encountered an error.
    Error(String),

    /// Keyboard thread is shutting down.
    Shutdown,
}
