//! Console module: the public face of the crate.
//!
//! This module contains:
//! - [`IoConsole`]: owns the document, partitioner and actor threads
//! - [`ConsoleConfig`]: construction-time settings
//! - [`ConsoleOutputStream`] / [`ConsoleInputStream`]: the byte-level ends

#[allow(clippy::module_inception)]
mod console;
mod streams;

pub use console::{ConsoleConfig, IoConsole};
pub use streams::{ConsoleInputStream, ConsoleOutputStream, InputSender};
