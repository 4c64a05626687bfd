//! Actor Model: the threads behind a console.
//!
//! This module implements a small actor system using crossbeam channels:
//! - **Display Actor**: the only thread that mutates the document
//! - **Updater Actor**: drains queued stream output into the document
//! - **Keyboard Actor**: polls terminal key events for interactive front ends
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐ stream_appended  ┌─────────────┐  Drain   ┌──────────────┐
//! │  Producers   │ ───────────────▶ │ Partitioner │ ───────▶ │   Updater    │
//! └──────────────┘  (pending queue) └─────────────┘          └──────────────┘
//!                                          ▲                        │
//!                                          │ document_changed       │ sync_exec
//!                                          │                        ▼
//!                                   ┌─────────────┐  replace ┌──────────────┐
//!                                   │  Document   │ ◀─────── │   Display    │
//!                                   └─────────────┘          └──────────────┘
//! ```

mod display;
mod keyboard;
mod messages;
mod updater;

pub use display::{DisplayActor, DisplayHandle};
pub use keyboard::{convert_event, KeyboardActor};
pub use messages::{DisplayCommand, DisplayJob, KeyInput, UpdaterCommand};
pub use updater::{UpdaterActor, UpdaterHandle};
