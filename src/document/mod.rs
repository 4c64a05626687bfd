//! Document module: the shared text buffer the console writes into.
//!
//! This module contains:
//! - [`Document`]: a rope-backed, char-indexed text buffer
//! - [`DocumentText`]: the read-only view handed to listeners
//! - [`DocumentListener`]: synchronous change notification
//! - [`DocumentEvent`]: a single applied change

#[allow(clippy::module_inception)]
mod document;

pub use document::{
    Document, DocumentEvent, DocumentListener, DocumentText, ListenerId, DEFAULT_LINE_DELIMITERS,
};
