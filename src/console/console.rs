//! IoConsole: the entry point tying document, partitioner and actors together.
//!
//! A console owns a display thread (the only place its document changes)
//! and an updater thread (which moves queued stream output onto the display
//! thread). Producers get [`ConsoleOutputStream`]s; a front end feeds typed
//! text through [`IoConsole::type_text`] or [`IoConsole::handle_key`] and a
//! consumer reads lines from the [`ConsoleInputStream`].

use super::streams::{ConsoleInputStream, ConsoleOutputStream, InputSender};
use crate::actor::{DisplayActor, DisplayHandle, KeyInput, UpdaterActor, UpdaterHandle};
use crate::document::{Document, DEFAULT_LINE_DELIMITERS};
use crate::error::ConsoleError;
use crate::lock;
use crate::partition::{Partition, Partitioner, WaterMarks};
use crossbeam_channel::unbounded;
use std::sync::{Arc, Mutex};
use tracing::debug;
use unicode_segmentation::UnicodeSegmentation;

/// Configuration for an [`IoConsole`].
#[derive(Debug, Clone)]
pub struct ConsoleConfig {
    /// Prefix for thread names and log fields.
    pub name: String,
    /// History bound; `None` keeps everything.
    pub water_marks: Option<WaterMarks>,
    /// Delimiters that complete a line of input.
    pub line_delimiters: Vec<String>,
    /// Text inserted for [`KeyInput::Enter`]. Should be one of
    /// `line_delimiters`, or Enter never completes a line.
    pub enter_delimiter: String,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            name: "ioconsole".to_string(),
            water_marks: None,
            line_delimiters: DEFAULT_LINE_DELIMITERS.iter().map(|d| (*d).to_string()).collect(),
            enter_delimiter: "\n".to_string(),
        }
    }
}

/// An interactive console.
///
/// Dropping the console stops its threads and ends its input stream.
#[derive(Debug)]
pub struct IoConsole {
    /// Configuration.
    config: ConsoleConfig,
    document: Arc<Mutex<Document>>,
    partitioner: Arc<Partitioner>,
    input_sender: Arc<InputSender>,
    input_stream: Option<ConsoleInputStream>,
    /// Actor handles; `None` once joined.
    display_actor: Option<DisplayActor>,
    updater_actor: Option<UpdaterActor>,
    display: DisplayHandle,
    updater: UpdaterHandle,
}

impl IoConsole {
    /// Create a console with default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if an actor thread cannot be spawned.
    pub fn new() -> Result<Self, ConsoleError> {
        Self::with_config(ConsoleConfig::default())
    }

    /// Create a console with custom configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if an actor thread cannot be spawned.
    pub fn with_config(config: ConsoleConfig) -> Result<Self, ConsoleError> {
        let display_actor = DisplayActor::spawn(&config.name)?;
        let display = display_actor.handle();

        // Create channels
        let (updater_tx, updater_rx) = unbounded();
        let (input_tx, input_rx) = unbounded();
        let updater = UpdaterHandle::new(updater_tx);
        let input_sender = Arc::new(InputSender::new(input_tx));

        let partitioner = Partitioner::new(input_sender.clone(), display.clone(), updater.clone());
        let updater_actor = UpdaterActor::spawn(
            &config.name,
            updater_rx,
            &updater,
            Arc::downgrade(&partitioner),
            display.clone(),
        )?;

        let document = Arc::new(Mutex::new(Document::with_delimiters(config.line_delimiters.clone())));
        partitioner.connect(&document);
        partitioner.set_water_marks(config.water_marks);
        debug!(name = %config.name, "console started");

        Ok(Self {
            config,
            document,
            partitioner,
            input_sender,
            input_stream: Some(ConsoleInputStream::new(input_rx)),
            display_actor: Some(display_actor),
            updater_actor: Some(updater_actor),
            display,
            updater,
        })
    }

    /// Get the configuration.
    pub const fn config(&self) -> &ConsoleConfig {
        &self.config
    }

    /// Open a new output stream with its own identity.
    pub fn new_output_stream(&self) -> ConsoleOutputStream {
        ConsoleOutputStream::new(Arc::clone(&self.partitioner))
    }

    /// Take the input stream. Only the first call returns it.
    pub fn take_input_stream(&mut self) -> Option<ConsoleInputStream> {
        self.input_stream.take()
    }

    /// Apply an interactive edit if it only touches the live input.
    ///
    /// Returns whether the edit was applied; edits reaching into history or
    /// past the end are refused.
    ///
    /// # Errors
    ///
    /// Returns an error if the display thread is gone.
    pub fn edit(&self, offset: usize, length: usize, text: &str) -> Result<bool, ConsoleError> {
        let text = text.to_owned();
        self.with_document(move |document, partitioner| -> Result<bool, ConsoleError> {
            if !partitioner.verify_edit(document.length(), offset, length) {
                return Ok(false);
            }
            document.replace(offset, length, &text)?;
            Ok(true)
        })?
    }

    /// Type `text` at the end of the document.
    ///
    /// # Errors
    ///
    /// Returns an error if the display thread is gone.
    pub fn type_text(&self, text: &str) -> Result<(), ConsoleError> {
        if text.is_empty() {
            return Ok(());
        }
        let text = text.to_owned();
        self.with_document(move |document, _| {
            let end = document.length();
            document.replace(end, 0, &text)
        })?
        .map_err(ConsoleError::from)
    }

    /// Delete the last grapheme of the live input.
    ///
    /// Returns `false` if there was nothing to delete.
    ///
    /// # Errors
    ///
    /// Returns an error if the display thread is gone.
    pub fn backspace(&self) -> Result<bool, ConsoleError> {
        self.with_document(|document, partitioner| -> Result<bool, ConsoleError> {
            let end = document.length();
            let start = partitioner.editable_offset(end);
            let live = document.get(start, end - start)?;
            let Some(last) = live.graphemes(true).next_back() else {
                return Ok(false);
            };
            let length = last.chars().count();
            document.replace(end - length, length, "")?;
            Ok(true)
        })?
    }

    /// Apply a key press. Returns `false` for keys a console ignores.
    ///
    /// # Errors
    ///
    /// Returns an error if the display thread is gone.
    pub fn handle_key(&self, key: &KeyInput) -> Result<bool, ConsoleError> {
        match key {
            KeyInput::Char(c) => self.type_text(c.encode_utf8(&mut [0; 4]))?,
            KeyInput::Enter => self.type_text(&self.config.enter_delimiter)?,
            KeyInput::Tab => self.type_text("\t")?,
            KeyInput::Paste(text) => self.type_text(text)?,
            KeyInput::Backspace => return self.backspace(),
            KeyInput::Interrupt
            | KeyInput::Resize { .. }
            | KeyInput::Error(_)
            | KeyInput::Shutdown => return Ok(false),
        }
        Ok(true)
    }

    /// Remove all text, partitions and not-yet-applied output.
    ///
    /// # Errors
    ///
    /// Returns an error if the display thread is gone.
    pub fn clear(&self) -> Result<(), ConsoleError> {
        self.with_document(|document, _| document.set(""))?
            .map_err(ConsoleError::from)
    }

    /// Copy the document text.
    pub fn contents(&self) -> String {
        lock(&self.document).contents()
    }

    /// Set or clear the history bound.
    pub fn set_water_marks(&self, water_marks: Option<WaterMarks>) {
        self.partitioner.set_water_marks(water_marks);
    }

    /// Snapshot of the partitions.
    pub fn partitions(&self) -> Vec<Partition> {
        self.partitioner.partitions()
    }

    /// Wait until all output written so far is in the document and any
    /// trim it triggered has run.
    ///
    /// # Errors
    ///
    /// Returns [`ConsoleError::FlushOnDisplayThread`] on the display thread,
    /// where waiting would deadlock, or an error if an actor is gone.
    pub fn flush(&self) -> Result<(), ConsoleError> {
        if self.display.is_display_thread() {
            return Err(ConsoleError::FlushOnDisplayThread);
        }
        self.updater.flush()?;
        self.display.sync_exec(|| ())
    }

    /// Handle for running work on the display thread.
    pub fn display(&self) -> DisplayHandle {
        self.display.clone()
    }

    /// The partitioner.
    pub const fn partitioner(&self) -> &Arc<Partitioner> {
        &self.partitioner
    }

    /// The document. Edit it only on the display thread.
    pub const fn document(&self) -> &Arc<Mutex<Document>> {
        &self.document
    }

    fn with_document<F, R>(&self, job: F) -> Result<R, ConsoleError>
    where
        F: FnOnce(&mut Document, &Partitioner) -> R + Send + 'static,
        R: Send + 'static,
    {
        let document = Arc::clone(&self.document);
        let partitioner = Arc::clone(&self.partitioner);
        self.display
            .sync_exec(move || job(&mut *lock(&document), partitioner.as_ref()))
    }
}

impl Drop for IoConsole {
    fn drop(&mut self) {
        self.input_sender.close();

        // Joining from the display thread would wait on ourselves.
        let wait = !self.display.is_display_thread();
        if let Some(actor) = self.updater_actor.take() {
            if wait {
                actor.join();
            }
        }
        self.partitioner.disconnect();
        if let Some(actor) = self.display_actor.take() {
            if wait {
                actor.join();
            }
        }
        debug!(name = %self.config.name, "console stopped");
    }
}
