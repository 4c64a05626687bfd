//! Partition: a typed span of the console document.

use std::fmt;

/// Identity of a stream writing to or reading from a console.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StreamId(pub u64);

impl StreamId {
    /// The console's input stream.
    pub const INPUT: Self = Self(0);
}

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "stream#{}", self.0)
    }
}

/// Identity of a partition, unique within one partitioner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PartitionId(pub u64);

/// Content type of a partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentType {
    /// Text typed by the user.
    Input,
    /// Text written by an output stream.
    Output,
}

impl ContentType {
    /// Stable name of the content type.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Input => "ioconsole.input",
            Self::Output => "ioconsole.output",
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What produced a partition, and which stream owns it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PartitionKind {
    /// Typed input, delivered to the given input stream.
    Input(StreamId),
    /// Output written by the given stream.
    Output(StreamId),
}

impl PartitionKind {
    /// The owning stream.
    pub const fn stream(self) -> StreamId {
        match self {
            Self::Input(stream) | Self::Output(stream) => stream,
        }
    }

    /// The content type.
    pub const fn content_type(self) -> ContentType {
        match self {
            Self::Input(_) => ContentType::Input,
            Self::Output(_) => ContentType::Output,
        }
    }
}

/// A contiguous span of the document attributed to one stream.
///
/// Output partitions only track their extent and are always read-only.
/// Input partitions also keep the typed text, so a completed line can be
/// handed to the input stream without reading the document back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    id: PartitionId,
    offset: usize,
    length: usize,
    kind: PartitionKind,
    read_only: bool,
    content: String,
}

impl Partition {
    /// Create an output partition covering `length` chars at `offset`.
    pub(crate) const fn output(id: PartitionId, stream: StreamId, offset: usize, length: usize) -> Self {
        Self {
            id,
            offset,
            length,
            kind: PartitionKind::Output(stream),
            read_only: true,
            content: String::new(),
        }
    }

    /// Create an editable input partition holding `text` at `offset`.
    pub(crate) fn input(id: PartitionId, stream: StreamId, offset: usize, text: &str) -> Self {
        Self {
            id,
            offset,
            length: text.chars().count(),
            kind: PartitionKind::Input(stream),
            read_only: false,
            content: text.to_owned(),
        }
    }

    /// Partition identity.
    pub const fn id(&self) -> PartitionId {
        self.id
    }

    /// Start offset in the document.
    pub const fn offset(&self) -> usize {
        self.offset
    }

    /// Length in chars.
    pub const fn length(&self) -> usize {
        self.length
    }

    /// Offset one past the last char.
    pub const fn end(&self) -> usize {
        self.offset + self.length
    }

    /// Check if the partition covers no text.
    pub const fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Producer and owning stream.
    pub const fn kind(&self) -> PartitionKind {
        self.kind
    }

    /// Content type.
    pub const fn content_type(&self) -> ContentType {
        self.kind.content_type()
    }

    /// Owning stream.
    pub const fn stream(&self) -> StreamId {
        self.kind.stream()
    }

    /// Whether interactive edits may touch this partition.
    pub const fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Typed text of an input partition. Empty for output partitions.
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Check if `offset` lies inside the partition.
    pub const fn contains(&self, offset: usize) -> bool {
        offset >= self.offset && offset < self.end()
    }

    /// An input partition that can still be edited.
    pub const fn is_live_input(&self) -> bool {
        matches!(self.kind, PartitionKind::Input(_)) && !self.read_only
    }

    pub(crate) fn set_offset(&mut self, offset: usize) {
        self.offset = offset;
    }

    pub(crate) fn freeze(&mut self) {
        self.read_only = true;
    }

    /// Grow by `text` at the end.
    pub(crate) fn append(&mut self, text: &str) {
        self.length += text.chars().count();
        if self.tracks_content() {
            self.content.push_str(text);
        }
    }

    /// Insert `text` at `rel` chars from the start.
    pub(crate) fn insert(&mut self, rel: usize, text: &str) {
        debug_assert!(rel <= self.length);
        self.length += text.chars().count();
        if self.tracks_content() {
            let at = byte_index(&self.content, rel);
            self.content.insert_str(at, text);
        }
    }

    /// Remove `len` chars starting `rel` chars from the start.
    pub(crate) fn delete(&mut self, rel: usize, len: usize) {
        debug_assert!(rel + len <= self.length);
        self.length -= len;
        if self.tracks_content() {
            let start = byte_index(&self.content, rel);
            let end = byte_index(&self.content, rel + len);
            self.content.replace_range(start..end, "");
        }
    }

    /// Drop the first `len` chars and move the start forward accordingly.
    pub(crate) fn truncate_front(&mut self, len: usize) {
        self.delete(0, len);
        self.offset += len;
    }

    /// Split at `rel` chars from the start; `self` keeps the head and the
    /// tail is returned under `tail_id`.
    pub(crate) fn split_off(&mut self, rel: usize, tail_id: PartitionId) -> Self {
        debug_assert!(rel <= self.length);
        let content = if self.tracks_content() {
            let at = byte_index(&self.content, rel);
            self.content.split_off(at)
        } else {
            String::new()
        };
        let tail = Self {
            id: tail_id,
            offset: self.offset + rel,
            length: self.length - rel,
            kind: self.kind,
            read_only: self.read_only,
            content,
        };
        self.length = rel;
        tail
    }

    const fn tracks_content(&self) -> bool {
        matches!(self.kind, PartitionKind::Input(_))
    }
}

/// Byte position of the `chars`-th char of `text` (or its end).
fn byte_index(text: &str, chars: usize) -> usize {
    text.char_indices().nth(chars).map_or(text.len(), |(index, _)| index)
}
