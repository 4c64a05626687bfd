//! # ioconsole
//!
//! A partitioned interactive console buffer.
//!
//! Any number of output streams write into one shared document from any
//! thread while a user types into the same document. The console keeps the
//! document split into typed partitions, hands every completed input line to
//! an input stream, and can bound its history by line count.
//!
//! ## Core Concepts
//!
//! - **Partitions**: contiguous spans attributed to an output stream or to input
//! - **Pending writes**: producers queue output without waiting on the document
//! - **Actor model**: a display thread owns document mutation, an updater
//!   thread drains queued output into it
//! - **Water marks**: past `high` lines, history is trimmed down to `low`
//!
//! ## Example
//!
//! ```rust,ignore
//! use ioconsole::IoConsole;
//! use std::io::Write;
//!
//! let mut console = IoConsole::new()?;
//! let mut out = console.new_output_stream();
//! writeln!(out, "ready")?;
//!
//! let mut input = console.take_input_stream().unwrap();
//! console.type_text("status\n")?;
//! assert_eq!(input.read_line().as_deref(), Some("status\n"));
//! ```

#![warn(missing_docs)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

pub mod actor;
pub mod console;
pub mod document;
pub mod error;
pub mod partition;

use std::sync::{Mutex, MutexGuard, PoisonError};

// Re-exports for convenience
pub use actor::{DisplayHandle, KeyInput, KeyboardActor};
pub use console::{ConsoleConfig, ConsoleInputStream, ConsoleOutputStream, IoConsole};
pub use document::{Document, DocumentEvent, DocumentListener, DocumentText};
pub use error::{ConsoleError, DocumentError};
pub use partition::{ContentType, Partition, PartitionKind, Partitioner, StreamId, WaterMarks};

/// Lock a mutex, recovering the data if another thread panicked holding it.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
