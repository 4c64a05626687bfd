//! Error types for document access and console plumbing.

use std::io;

/// Errors raised by [`Document`](crate::document::Document) operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DocumentError {
    /// A range does not fit inside the document.
    #[error("bad location: offset {offset}, length {length} in a document of length {document_length}")]
    BadLocation {
        /// Start of the requested range.
        offset: usize,
        /// Length of the requested range.
        length: usize,
        /// Document length at the time of the request.
        document_length: usize,
    },
    /// A line index past the last line.
    #[error("bad line: {line} (document has {lines} lines)")]
    BadLine {
        /// Requested line index.
        line: usize,
        /// Number of lines in the document.
        lines: usize,
    },
}

/// Errors raised by the console and its actors.
#[derive(Debug, thiserror::Error)]
pub enum ConsoleError {
    /// Water marks must satisfy `low < high`.
    #[error("invalid water marks: low ({low}) must be less than high ({high})")]
    InvalidWaterMarks {
        /// Requested low water mark.
        low: usize,
        /// Requested high water mark.
        high: usize,
    },
    /// A document operation failed.
    #[error(transparent)]
    Document(#[from] DocumentError),
    /// The OS refused to start an actor thread.
    #[error("failed to spawn {name} thread: {source}")]
    Spawn {
        /// Name of the actor.
        name: &'static str,
        /// Underlying error.
        #[source]
        source: io::Error,
    },
    /// An actor thread is no longer running.
    #[error("{0} thread has shut down")]
    Disconnected(&'static str),
    /// `flush` would wait on the thread it was called from.
    #[error("flush cannot be called from the display thread")]
    FlushOnDisplayThread,
}
