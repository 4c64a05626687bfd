//! Document: a char-indexed text buffer with synchronous change notification.
//!
//! Offsets and lengths are measured in `char`s. Line breaks are `\n`, `\r`
//! and `\r\n` (the latter counting as a single break).

use crate::error::DocumentError;
use ropey::Rope;
use std::fmt;
use std::sync::Arc;

/// Line delimiters recognised when none are configured.
pub const DEFAULT_LINE_DELIMITERS: [&str; 3] = ["\r\n", "\n", "\r"];

/// A change that has just been applied to a document.
///
/// `length` chars starting at `offset` were removed and `text` was inserted
/// in their place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentEvent {
    /// Start of the replaced range.
    pub offset: usize,
    /// Number of chars removed.
    pub length: usize,
    /// Text inserted at `offset`.
    pub text: String,
}

impl DocumentEvent {
    /// Number of chars inserted.
    pub fn inserted_len(&self) -> usize {
        self.text.chars().count()
    }
}

/// Receives every change made to a [`Document`].
///
/// Listeners run synchronously inside [`Document::replace`], after the
/// change has been applied, on whichever thread performed the edit.
pub trait DocumentListener: Send + Sync {
    /// Called after `event` has been applied; `text` is the new content.
    fn document_changed(&self, text: &DocumentText, event: &DocumentEvent);
}

/// Handle returned by [`Document::add_listener`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Read-only view of a document's content.
#[derive(Debug, Clone)]
pub struct DocumentText {
    rope: Rope,
    delimiters: Vec<String>,
}

impl DocumentText {
    /// Length in chars.
    pub fn length(&self) -> usize {
        self.rope.len_chars()
    }

    /// Check if the document holds no text.
    pub fn is_empty(&self) -> bool {
        self.rope.len_chars() == 0
    }

    /// Number of lines. An empty document, or one ending in a line break,
    /// counts the empty last line.
    pub fn number_of_lines(&self) -> usize {
        self.rope.len_lines()
    }

    /// Offset of the first char of `line`.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError::BadLine`] if `line` is not a valid line index.
    pub fn line_offset(&self, line: usize) -> Result<usize, DocumentError> {
        let lines = self.number_of_lines();
        if line >= lines {
            return Err(DocumentError::BadLine { line, lines });
        }
        Ok(self.rope.line_to_char(line))
    }

    /// The delimiters that terminate a line of input.
    pub fn legal_line_delimiters(&self) -> &[String] {
        &self.delimiters
    }

    /// Copy `length` chars starting at `offset`.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError::BadLocation`] if the range is out of bounds.
    pub fn get(&self, offset: usize, length: usize) -> Result<String, DocumentError> {
        self.check_range(offset, length)?;
        Ok(self.rope.slice(offset..offset + length).to_string())
    }

    /// Copy the whole content.
    pub fn contents(&self) -> String {
        self.rope.to_string()
    }

    fn check_range(&self, offset: usize, length: usize) -> Result<(), DocumentError> {
        let document_length = self.length();
        match offset.checked_add(length) {
            Some(end) if end <= document_length => Ok(()),
            _ => Err(DocumentError::BadLocation {
                offset,
                length,
                document_length,
            }),
        }
    }
}

/// A mutable text buffer shared between the console and its front end.
pub struct Document {
    text: DocumentText,
    listeners: Vec<(ListenerId, Arc<dyn DocumentListener>)>,
    next_listener: u64,
}

impl Document {
    /// Create an empty document with the default line delimiters.
    pub fn new() -> Self {
        Self::with_delimiters(DEFAULT_LINE_DELIMITERS.iter().map(|d| (*d).to_owned()).collect())
    }

    /// Create an empty document with custom line delimiters.
    pub fn with_delimiters(delimiters: Vec<String>) -> Self {
        Self {
            text: DocumentText {
                rope: Rope::new(),
                delimiters,
            },
            listeners: Vec::new(),
            next_listener: 0,
        }
    }

    /// Read-only view of the content.
    pub const fn text(&self) -> &DocumentText {
        &self.text
    }

    /// Length in chars.
    pub fn length(&self) -> usize {
        self.text.length()
    }

    /// Number of lines.
    pub fn number_of_lines(&self) -> usize {
        self.text.number_of_lines()
    }

    /// Offset of the first char of `line`.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError::BadLine`] if `line` is not a valid line index.
    pub fn line_offset(&self, line: usize) -> Result<usize, DocumentError> {
        self.text.line_offset(line)
    }

    /// The delimiters that terminate a line of input.
    pub fn legal_line_delimiters(&self) -> &[String] {
        self.text.legal_line_delimiters()
    }

    /// Copy `length` chars starting at `offset`.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError::BadLocation`] if the range is out of bounds.
    pub fn get(&self, offset: usize, length: usize) -> Result<String, DocumentError> {
        self.text.get(offset, length)
    }

    /// Copy the whole content.
    pub fn contents(&self) -> String {
        self.text.contents()
    }

    /// Replace `length` chars at `offset` with `text` and notify listeners.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError::BadLocation`] if the range is out of bounds;
    /// the document is left untouched and no listener is called.
    pub fn replace(&mut self, offset: usize, length: usize, text: &str) -> Result<(), DocumentError> {
        self.text.check_range(offset, length)?;

        if length > 0 {
            self.text.rope.remove(offset..offset + length);
        }
        if !text.is_empty() {
            self.text.rope.insert(offset, text);
        }

        let event = DocumentEvent {
            offset,
            length,
            text: text.to_owned(),
        };
        for (_, listener) in &self.listeners {
            listener.document_changed(&self.text, &event);
        }
        Ok(())
    }

    /// Replace the whole content.
    ///
    /// # Errors
    ///
    /// Never fails in practice; the signature mirrors [`Document::replace`].
    pub fn set(&mut self, text: &str) -> Result<(), DocumentError> {
        let length = self.length();
        self.replace(0, length, text)
    }

    /// Subscribe to changes.
    pub fn add_listener(&mut self, listener: Arc<dyn DocumentListener>) -> ListenerId {
        let id = ListenerId(self.next_listener);
        self.next_listener += 1;
        self.listeners.push((id, listener));
        id
    }

    /// Unsubscribe. Returns `false` if `id` was not registered.
    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(listener_id, _)| *listener_id != id);
        self.listeners.len() != before
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("length", &self.length())
            .field("lines", &self.number_of_lines())
            .field("listeners", &self.listeners.len())
            .finish()
    }
}
