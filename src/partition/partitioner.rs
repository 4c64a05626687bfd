//! Partitioner: keeps the console document split into typed partitions.
//!
//! The document changes from two directions:
//!
//! 1. **Stream output**: producers call [`Partitioner::stream_appended`] from
//!    any thread. Text is coalesced into the pending queue and applied at the
//!    end of the document by the updater, one `sync_exec` on the display
//!    thread per chunk. While that replace runs the update flag names the
//!    writing stream, so the change is attributed to it.
//! 2. **Interactive input**: edits made by the user arrive with no update
//!    flag. They grow or shrink input partitions, and once the inserted text
//!    ends with a line delimiter the typed line is handed to the input sink.
//!
//! Lock order is always document, then partition state. The update flag has
//! its own lock so a trim can hold the state lock across its own deletion.

use super::{ContentType, Partition, PartitionId, PartitionKind, PendingWrite, PendingWrites, StreamId};
use crate::actor::{DisplayHandle, UpdaterHandle};
use crate::document::{Document, DocumentEvent, DocumentListener, DocumentText, ListenerId};
use crate::error::ConsoleError;
use crate::lock;
use std::fmt;
use std::mem;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};
use tracing::{debug, warn};

/// Consumer of completed input lines.
pub trait InputSink: Send + Sync {
    /// Called once per completed line, in the order lines were typed.
    fn append_data(&self, text: &str);
}

/// Line-count thresholds bounding the console history.
///
/// Once the document has more than `high` lines, the oldest lines are
/// discarded so that at most `low` remain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaterMarks {
    low: usize,
    high: usize,
}

impl WaterMarks {
    /// Create water marks.
    ///
    /// # Errors
    ///
    /// Returns [`ConsoleError::InvalidWaterMarks`] unless `low < high`.
    pub const fn new(low: usize, high: usize) -> Result<Self, ConsoleError> {
        if low < high {
            Ok(Self { low, high })
        } else {
            Err(ConsoleError::InvalidWaterMarks { low, high })
        }
    }

    /// Lines kept after a trim.
    pub const fn low(self) -> usize {
        self.low
    }

    /// Line count that triggers a trim.
    pub const fn high(self) -> usize {
        self.high
    }
}

/// Programmatic change in progress on the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Update {
    /// Output from this stream is being appended.
    Append(StreamId),
    /// Old history is being discarded.
    Trim,
}

#[derive(Debug, Default)]
struct PartitionState {
    /// Sorted, contiguous, covering the whole document.
    partitions: Vec<Partition>,
    /// Input partitions typed since the last delivered line.
    unflushed: Vec<PartitionId>,
    delimiters: Vec<String>,
    water_marks: Option<WaterMarks>,
    next_id: u64,
}

impl PartitionState {
    fn next_id(&mut self) -> PartitionId {
        let id = PartitionId(self.next_id);
        self.next_id += 1;
        id
    }

    fn reset(&mut self) {
        self.partitions.clear();
        self.unflushed.clear();
    }

    fn index_of(&self, offset: usize) -> Option<usize> {
        let index = self.partitions.partition_point(|p| p.end() <= offset);
        self.partitions
            .get(index)
            .filter(|p| p.contains(offset))
            .map(|_| index)
    }

    fn live_tail(&self) -> Option<&Partition> {
        self.partitions.last().filter(|p| p.is_live_input())
    }

    fn tail_end(&self) -> usize {
        self.partitions.last().map_or(0, Partition::end)
    }

    /// The live input tail, or a fresh empty input partition at the tail.
    fn open_tail(&mut self) -> Partition {
        if let Some(tail) = self.live_tail() {
            return tail.clone();
        }
        let id = self.next_id();
        let partition = Partition::input(id, StreamId::INPUT, self.tail_end(), "");
        self.partitions.push(partition.clone());
        self.unflushed.push(id);
        partition
    }

    fn editable_offset(&self, document_length: usize) -> usize {
        self.live_tail()
            .filter(|p| p.end() == document_length)
            .map_or(document_length, Partition::offset)
    }

    fn append_output(&mut self, stream: StreamId, offset: usize, text: &str) {
        if let Some(last) = self.partitions.last_mut() {
            if last.kind() == PartitionKind::Output(stream) && last.end() == offset {
                last.append(text);
                return;
            }
        }
        let id = self.next_id();
        let length = text.chars().count();
        self.partitions.push(Partition::output(id, stream, offset, length));
    }

    /// Shrink every partition overlapping `[offset, offset + len)`.
    ///
    /// Partitions emptied by the removal are dropped, except live input.
    fn remove_range(&mut self, offset: usize, len: usize) {
        if len == 0 {
            return;
        }
        let end = offset + len;
        let first = self.partitions.partition_point(|p| p.end() <= offset);
        let mut emptied = false;
        for partition in &mut self.partitions[first..] {
            let start = partition.offset();
            if start >= end {
                break;
            }
            let from = offset.max(start) - start;
            let to = end.min(partition.end()) - start;
            partition.delete(from, to - from);
            emptied |= partition.is_empty() && !partition.is_live_input();
        }
        if emptied {
            let mut index = first;
            while index < self.partitions.len() && self.partitions[index].offset() < end {
                if self.partitions[index].is_empty() && !self.partitions[index].is_live_input() {
                    self.partitions.remove(index);
                } else {
                    index += 1;
                }
            }
        }
        self.rebase_from(first);
    }

    /// Insert typed text, extending the live tail when the edit lands in it.
    fn insert_input(&mut self, offset: usize, text: &str) {
        if let Some(tail) = self.partitions.last_mut().filter(|p| p.is_live_input()) {
            if offset >= tail.offset() && offset <= tail.end() {
                let rel = offset - tail.offset();
                tail.insert(rel, text);
                return;
            }
        }

        let index = self.partitions.partition_point(|p| p.offset() < offset);
        if let Some(previous) = index.checked_sub(1) {
            let split = &self.partitions[previous];
            if split.end() > offset {
                let rel = offset - split.offset();
                let live = split.is_live_input();
                let tail_id = self.next_id();
                let tail = self.partitions[previous].split_off(rel, tail_id);
                self.partitions.insert(index, tail);
                if live {
                    self.unflushed.push(tail_id);
                }
            }
        }

        let id = self.next_id();
        self.partitions
            .insert(index, Partition::input(id, StreamId::INPUT, offset, text));
        self.unflushed.push(id);
        self.rebase_from(index + 1);
    }

    fn ends_line(&self, text: &str) -> bool {
        self.delimiters.iter().any(|d| text.ends_with(d.as_str()))
    }

    /// Freeze every unflushed input partition and join their text in order.
    fn take_line(&mut self) -> String {
        let unflushed = mem::take(&mut self.unflushed);
        let mut remaining = unflushed.len();
        let mut pieces = Vec::with_capacity(remaining);
        for partition in self.partitions.iter_mut().rev() {
            if remaining == 0 {
                break;
            }
            if unflushed.contains(&partition.id()) {
                partition.freeze();
                pieces.push(partition.content().to_owned());
                remaining -= 1;
            }
        }
        pieces.reverse();
        pieces.concat()
    }

    /// Move a trim cut back so no input awaiting its line delimiter is lost.
    fn keep_unsubmitted(&self, cut: usize) -> usize {
        self.partitions
            .iter()
            .take_while(|p| p.offset() < cut)
            .find(|p| self.unflushed.contains(&p.id()))
            .map_or(cut, Partition::offset)
    }

    /// Drop everything before `cut` and shift the rest to start at 0.
    fn discard_before(&mut self, cut: usize) {
        let keep = self.partitions.partition_point(|p| p.end() <= cut);
        self.partitions.drain(..keep);
        if let Some(first) = self.partitions.first_mut() {
            if first.offset() < cut {
                first.truncate_front(cut - first.offset());
            }
        }
        for partition in &mut self.partitions {
            partition.set_offset(partition.offset() - cut);
        }
        let partitions = &self.partitions;
        self.unflushed
            .retain(|id| partitions.iter().rev().any(|p| p.id() == *id));
    }

    /// Recompute offsets from `index` on so the list stays contiguous.
    fn rebase_from(&mut self, index: usize) {
        let mut offset = index
            .checked_sub(1)
            .and_then(|previous| self.partitions.get(previous))
            .map_or(0, Partition::end);
        for partition in self.partitions.iter_mut().skip(index) {
            partition.set_offset(offset);
            offset = partition.end();
        }
    }
}

struct Connection {
    document: Weak<Mutex<Document>>,
    listener: ListenerId,
}

/// Maps document ranges to typed partitions.
///
/// Created with [`Partitioner::new`] and attached to a document with
/// [`Partitioner::connect`]; it then observes every change to that document.
pub struct Partitioner {
    me: Weak<Self>,
    state: Mutex<PartitionState>,
    pending: Mutex<PendingWrites>,
    update: Mutex<Option<Update>>,
    connection: Mutex<Option<Connection>>,
    input: Arc<dyn InputSink>,
    display: DisplayHandle,
    updater: UpdaterHandle,
    trim_scheduled: AtomicBool,
    next_stream: AtomicU64,
}

impl Partitioner {
    /// Create a partitioner delivering lines to `input`.
    ///
    /// Buffer trims run on `display`; `updater` is woken whenever stream
    /// output is queued.
    pub fn new(input: Arc<dyn InputSink>, display: DisplayHandle, updater: UpdaterHandle) -> Arc<Self> {
        Arc::new_cyclic(|me| Self {
            me: me.clone(),
            state: Mutex::default(),
            pending: Mutex::default(),
            update: Mutex::new(None),
            connection: Mutex::new(None),
            input,
            display,
            updater,
            trim_scheduled: AtomicBool::new(false),
            next_stream: AtomicU64::new(StreamId::INPUT.0 + 1),
        })
    }

    /// Attach to `document`, dropping any previous state.
    ///
    /// Text already in the document becomes a single read-only output
    /// partition.
    pub fn connect(&self, document: &Arc<Mutex<Document>>) {
        self.disconnect();
        let Some(me) = self.me.upgrade() else {
            return;
        };

        let listener = {
            let mut doc = lock(document);
            let mut state = lock(&self.state);
            state.reset();
            state.delimiters = doc.legal_line_delimiters().to_vec();
            if !doc.text().is_empty() {
                let id = state.next_id();
                let stream = self.allocate_stream();
                state.partitions.push(Partition::output(id, stream, 0, doc.length()));
            }
            drop(state);
            doc.add_listener(me)
        };

        *lock(&self.connection) = Some(Connection {
            document: Arc::downgrade(document),
            listener,
        });
    }

    /// Detach from the document and forget all partitions.
    pub fn disconnect(&self) {
        let connection = lock(&self.connection).take();
        if let Some(connection) = connection {
            if let Some(document) = connection.document.upgrade() {
                lock(&document).remove_listener(connection.listener);
            }
        }
        lock(&self.state).reset();
        lock(&self.pending).clear();
    }

    /// Hand out a fresh output stream identity.
    pub fn allocate_stream(&self) -> StreamId {
        StreamId(self.next_stream.fetch_add(1, Ordering::Relaxed))
    }

    /// Queue output from `stream`. Callable from any thread; never waits on
    /// the document.
    pub fn stream_appended(&self, stream: StreamId, text: &str) {
        if text.is_empty() {
            return;
        }
        lock(&self.pending).push(stream, text);
        self.updater.schedule();
    }

    /// Take every queued write, leaving a fresh queue for producers.
    pub(crate) fn take_pending(&self) -> Vec<PendingWrite> {
        lock(&self.pending).take()
    }

    /// Append one pending write at the end of the document.
    ///
    /// Must run on the display thread. A write taken before the document was
    /// cleared is dropped.
    pub(crate) fn apply_output(&self, write: &PendingWrite) {
        let Some(document) = self.document() else {
            return;
        };
        let mut document = lock(&document);
        if write.generation != lock(&self.pending).generation() {
            debug!(stream = %write.stream, "dropping output written before clear");
            return;
        }
        *lock(&self.update) = Some(Update::Append(write.stream));
        let end = document.length();
        let result = document.replace(end, 0, &write.text);
        *lock(&self.update) = None;
        if let Err(err) = result {
            warn!(%err, stream = %write.stream, "failed to append console output");
        }
    }

    /// The partition covering `offset`.
    ///
    /// At or past the end of the document this is the live input tail,
    /// created empty on first request.
    pub fn get_partition(&self, offset: usize) -> Partition {
        let mut state = lock(&self.state);
        match state.index_of(offset) {
            Some(index) => state.partitions[index].clone(),
            None => state.open_tail(),
        }
    }

    /// Content type at `offset`.
    pub fn content_type(&self, offset: usize) -> ContentType {
        self.get_partition(offset).content_type()
    }

    /// Every content type a partition can have.
    pub const fn legal_content_types() -> [ContentType; 2] {
        [ContentType::Output, ContentType::Input]
    }

    /// Non-empty partitions overlapping `[offset, offset + length)`, in
    /// order. A zero `length` asks for the partition at `offset`.
    pub fn compute_partitioning(&self, offset: usize, length: usize) -> Vec<Partition> {
        let state = lock(&self.state);
        let end = offset.saturating_add(length.max(1));
        let first = state.partitions.partition_point(|p| p.end() <= offset);
        state.partitions[first..]
            .iter()
            .take_while(|p| p.offset() < end)
            .filter(|p| !p.is_empty())
            .cloned()
            .collect()
    }

    /// Snapshot of all partitions.
    pub fn partitions(&self) -> Vec<Partition> {
        lock(&self.state).partitions.clone()
    }

    /// Offset from which interactive edits are allowed.
    pub fn editable_offset(&self, document_length: usize) -> usize {
        lock(&self.state).editable_offset(document_length)
    }

    /// Check an interactive edit before it reaches the document.
    ///
    /// Only the live input at the end of the document may be edited;
    /// anything touching earlier history is rejected.
    pub fn verify_edit(&self, document_length: usize, offset: usize, length: usize) -> bool {
        let editable = self.editable_offset(document_length);
        offset >= editable
            && offset
                .checked_add(length)
                .is_some_and(|end| end <= document_length)
    }

    /// Set or clear the water marks, then re-check the buffer size.
    pub fn set_water_marks(&self, water_marks: Option<WaterMarks>) {
        let populated = {
            let mut state = lock(&self.state);
            state.water_marks = water_marks;
            !state.partitions.is_empty()
        };
        if water_marks.is_some() && populated {
            self.schedule_trim();
        }
    }

    /// Current water marks.
    pub fn water_marks(&self) -> Option<WaterMarks> {
        lock(&self.state).water_marks
    }

    fn document(&self) -> Option<Arc<Mutex<Document>>> {
        lock(&self.connection)
            .as_ref()
            .and_then(|connection| connection.document.upgrade())
    }

    fn input_edited(&self, event: &DocumentEvent) {
        let line = {
            let mut state = lock(&self.state);
            state.remove_range(event.offset, event.length);
            if event.text.is_empty() {
                None
            } else {
                state.insert_input(event.offset, &event.text);
                state.ends_line(&event.text).then(|| state.take_line())
            }
        };
        if let Some(line) = line {
            debug!(chars = line.chars().count(), "delivering input line");
            self.input.append_data(&line);
        }
    }

    fn check_buffer_size(&self, lines: usize) {
        let over = {
            let state = lock(&self.state);
            !state.partitions.is_empty() && state.water_marks.is_some_and(|marks| lines > marks.high)
        };
        if over {
            self.schedule_trim();
        }
    }

    fn schedule_trim(&self) {
        if self.trim_scheduled.swap(true, Ordering::AcqRel) {
            return;
        }
        let me = self.me.clone();
        let scheduled = self.display.async_exec(move || {
            if let Some(partitioner) = me.upgrade() {
                partitioner.trim_buffer();
            }
        });
        if let Err(err) = scheduled {
            self.trim_scheduled.store(false, Ordering::Release);
            warn!(%err, "cannot schedule console trim");
        }
    }

    /// Discard the oldest lines so at most `low` remain. Best effort: a
    /// location error skips this round.
    fn trim_buffer(&self) {
        self.trim_scheduled.store(false, Ordering::Release);
        let Some(document) = self.document() else {
            return;
        };
        let mut document = lock(&document);
        let mut state = lock(&self.state);

        let Some(marks) = state.water_marks else {
            return;
        };
        let lines = document.number_of_lines();
        if lines <= marks.high || state.partitions.is_empty() {
            return;
        }

        let cut = if marks.low == 0 {
            Ok(document.length())
        } else {
            document.line_offset(lines - marks.low)
        };
        let cut = match cut {
            Ok(cut) => state.keep_unsubmitted(cut),
            Err(err) => {
                debug!(%err, "skipping console trim");
                return;
            }
        };
        if cut == 0 {
            return;
        }

        *lock(&self.update) = Some(Update::Trim);
        let result = document.replace(0, cut, "");
        *lock(&self.update) = None;
        if let Err(err) = result {
            debug!(%err, "skipping console trim");
            return;
        }

        state.discard_before(cut);
        if document.text().is_empty() {
            state.reset();
        }
        debug!(
            lines_before = lines,
            lines_after = document.number_of_lines(),
            removed = cut,
            "trimmed console history"
        );
    }
}

impl DocumentListener for Partitioner {
    fn document_changed(&self, text: &DocumentText, event: &DocumentEvent) {
        let update = *lock(&self.update);
        if update == Some(Update::Trim) {
            return;
        }

        if text.is_empty() {
            lock(&self.state).reset();
            lock(&self.pending).clear();
            debug!("console document cleared");
            return;
        }

        if let Some(Update::Append(stream)) = update {
            if !event.text.is_empty() {
                lock(&self.state).append_output(stream, event.offset, &event.text);
            }
        } else {
            self.input_edited(event);
        }

        self.check_buffer_size(text.number_of_lines());
    }
}

impl fmt::Debug for Partitioner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = lock(&self.state);
        f.debug_struct("Partitioner")
            .field("partitions", &state.partitions.len())
            .field("unflushed", &state.unflushed.len())
            .field("water_marks", &state.water_marks)
            .field("pending", &lock(&self.pending).len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::{DisplayActor, UpdaterCommand};
    use crossbeam_channel::{unbounded, Receiver};

    #[derive(Default)]
    struct RecordingSink {
        lines: Mutex<Vec<String>>,
    }

    impl InputSink for RecordingSink {
        fn append_data(&self, text: &str) {
            self.lines.lock().unwrap().push(text.to_owned());
        }
    }

    /// A partitioner wired to a real display thread; stream output is
    /// drained by hand instead of by an updater thread.
    struct Fixture {
        document: Arc<Mutex<Document>>,
        partitioner: Arc<Partitioner>,
        sink: Arc<RecordingSink>,
        display: DisplayActor,
        _updates: Receiver<UpdaterCommand>,
    }

    const A: StreamId = StreamId(1);
    const B: StreamId = StreamId(2);

    impl Fixture {
        fn new() -> Self {
            Self::with_document(Document::new())
        }

        fn with_document(document: Document) -> Self {
            let display = DisplayActor::spawn("test").unwrap();
            let (sender, updates) = unbounded();
            let sink = Arc::new(RecordingSink::default());
            let partitioner = Partitioner::new(sink.clone(), display.handle(), UpdaterHandle::new(sender));
            let document = Arc::new(Mutex::new(document));
            partitioner.connect(&document);
            Self {
                document,
                partitioner,
                sink,
                display,
                _updates: updates,
            }
        }

        fn write(&self, stream: StreamId, text: &str) {
            self.partitioner.stream_appended(stream, text);
            self.drain();
        }

        fn drain(&self) {
            for write in self.partitioner.take_pending() {
                self.partitioner.apply_output(&write);
            }
        }

        fn edit(&self, offset: usize, length: usize, text: &str) {
            self.document.lock().unwrap().replace(offset, length, text).unwrap();
        }

        fn type_text(&self, text: &str) {
            let end = self.len();
            self.edit(end, 0, text);
        }

        fn len(&self) -> usize {
            self.document.lock().unwrap().length()
        }

        fn text(&self) -> String {
            self.document.lock().unwrap().contents()
        }

        fn lines(&self) -> Vec<String> {
            self.sink.lines.lock().unwrap().clone()
        }

        /// Wait for queued display jobs (trims) to finish.
        fn settle(&self) {
            self.display.handle().sync_exec(|| ()).unwrap();
        }

        fn assert_contiguous(&self) {
            let doc = self.document.lock().unwrap();
            let mut offset = 0;
            for partition in self.partitioner.partitions() {
                assert_eq!(partition.offset(), offset, "gap or overlap at {partition:?}");
                if partition.content_type() == ContentType::Input {
                    assert_eq!(doc.get(partition.offset(), partition.length()).unwrap(), partition.content());
                }
                offset = partition.end();
            }
            assert_eq!(offset, doc.length());
        }

        fn summary(&self) -> Vec<(PartitionKind, usize, usize)> {
            self.partitioner
                .partitions()
                .iter()
                .map(|p| (p.kind(), p.offset(), p.length()))
                .collect()
        }
    }

    #[test]
    fn test_output_attributed_to_each_stream() {
        let fx = Fixture::new();
        fx.write(A, "hello ");
        fx.write(B, "world");

        assert_eq!(fx.text(), "hello world");
        assert_eq!(
            fx.summary(),
            vec![(PartitionKind::Output(A), 0, 6), (PartitionKind::Output(B), 6, 5)]
        );
        fx.assert_contiguous();
    }

    #[test]
    fn test_back_to_back_streams_without_drain() {
        let fx = Fixture::new();
        fx.partitioner.stream_appended(A, "a1");
        fx.partitioner.stream_appended(B, "b1");
        fx.partitioner.stream_appended(A, "a2");
        fx.drain();

        assert_eq!(fx.text(), "a1b1a2");
        assert_eq!(
            fx.summary(),
            vec![
                (PartitionKind::Output(A), 0, 2),
                (PartitionKind::Output(B), 2, 2),
                (PartitionKind::Output(A), 4, 2),
            ]
        );
    }

    #[test]
    fn test_coalesced_writes_match_single_write() {
        let many = Fixture::new();
        for piece in ["one ", "two ", "three"] {
            many.partitioner.stream_appended(A, piece);
        }
        assert_eq!(many.partitioner.take_pending().len(), 1);

        let many = Fixture::new();
        for piece in ["one ", "two ", "three"] {
            many.partitioner.stream_appended(A, piece);
        }
        many.drain();

        let single = Fixture::new();
        single.write(A, "one two three");

        assert_eq!(many.text(), single.text());
        assert_eq!(many.summary(), single.summary());

        // Later output from the same stream keeps growing the same partition.
        many.write(A, "!");
        assert_eq!(many.partitioner.partitions().len(), 1);
    }

    #[test]
    fn test_completed_line_is_delivered_once() {
        let fx = Fixture::new();
        fx.type_text("abc");
        assert!(fx.lines().is_empty());

        fx.type_text("def\n");
        assert_eq!(fx.lines(), vec!["abcdef\n".to_owned()]);
        assert!(fx.partitioner.partitions().iter().all(Partition::is_read_only));

        // The flushed span is no longer editable.
        let len = fx.len();
        assert!(!fx.partitioner.verify_edit(len, 0, 1));
        assert!(!fx.partitioner.verify_edit(len, 2, 0));
        assert!(fx.partitioner.verify_edit(len, len, 0));

        fx.type_text("x");
        assert_eq!(fx.lines().len(), 1);
        let tail = fx.partitioner.get_partition(len);
        assert_eq!(tail.content(), "x");
        assert!(!tail.is_read_only());
        fx.assert_contiguous();
    }

    #[test]
    fn test_line_needs_trailing_delimiter() {
        let fx = Fixture::new();
        fx.type_text("a\nb");
        assert!(fx.lines().is_empty());

        fx.type_text("c\r\n");
        assert_eq!(fx.lines(), vec!["a\nbc\r\n".to_owned()]);

        fx.type_text("d");
        fx.type_text("\r");
        assert_eq!(fx.lines(), vec!["a\nbc\r\n".to_owned(), "d\r".to_owned()]);
    }

    #[test]
    fn test_input_interleaved_with_output() {
        let fx = Fixture::new();
        fx.type_text("ls");
        fx.write(A, "[tick]");
        fx.type_text(" -l\n");

        assert_eq!(fx.text(), "ls[tick] -l\n");
        assert_eq!(fx.lines(), vec!["ls -l\n".to_owned()]);
        let kinds: Vec<_> = fx.partitioner.partitions().iter().map(Partition::kind).collect();
        assert_eq!(
            kinds,
            vec![
                PartitionKind::Input(StreamId::INPUT),
                PartitionKind::Output(A),
                PartitionKind::Input(StreamId::INPUT),
            ]
        );
        fx.assert_contiguous();
    }

    #[test]
    fn test_delete_inside_live_input() {
        let fx = Fixture::new();
        fx.write(A, "> ");
        fx.type_text("abcd");
        fx.edit(4, 1, "");

        let tail = fx.partitioner.get_partition(2);
        assert_eq!(tail.content(), "abd");
        assert_eq!(fx.text(), "> abd");
        fx.assert_contiguous();

        fx.type_text("\n");
        assert_eq!(fx.lines(), vec!["abd\n".to_owned()]);
    }

    #[test]
    fn test_insert_inside_live_input() {
        let fx = Fixture::new();
        fx.type_text("ac");
        fx.edit(1, 0, "b");
        assert_eq!(fx.partitioner.partitions().len(), 1);
        assert_eq!(fx.partitioner.get_partition(0).content(), "abc");
        fx.assert_contiguous();
    }

    #[test]
    fn test_edit_gate_protects_history() {
        let fx = Fixture::new();
        fx.write(A, "out\n");
        let len = fx.len();
        assert_eq!(fx.partitioner.editable_offset(len), len);
        assert!(!fx.partitioner.verify_edit(len, 0, 2));
        assert!(fx.partitioner.verify_edit(len, len, 0));
        assert!(!fx.partitioner.verify_edit(len, len, 1));

        fx.type_text("xy");
        let len = fx.len();
        assert_eq!(fx.partitioner.editable_offset(len), 4);
        assert!(fx.partitioner.verify_edit(len, 4, 1));
        assert!(fx.partitioner.verify_edit(len, 5, 1));
        assert!(!fx.partitioner.verify_edit(len, 3, 2));

        // Output after the typed text closes it for editing.
        fx.write(B, "more");
        let len = fx.len();
        assert!(!fx.partitioner.verify_edit(len, 4, 1));
    }

    #[test]
    fn test_unchecked_delete_keeps_partitions_contiguous() {
        let fx = Fixture::new();
        fx.write(A, "aaaa");
        fx.write(B, "bbbb");
        fx.edit(2, 4, "");
        assert_eq!(
            fx.summary(),
            vec![(PartitionKind::Output(A), 0, 2), (PartitionKind::Output(B), 2, 2)]
        );

        fx.edit(0, 2, "");
        assert_eq!(fx.summary(), vec![(PartitionKind::Output(B), 0, 2)]);
        fx.assert_contiguous();
    }

    #[test]
    fn test_insert_inside_history_splits_partition() {
        let fx = Fixture::new();
        fx.write(A, "abcdef");
        fx.edit(3, 0, "XY");

        assert_eq!(fx.text(), "abcXYdef");
        assert_eq!(
            fx.summary(),
            vec![
                (PartitionKind::Output(A), 0, 3),
                (PartitionKind::Input(StreamId::INPUT), 3, 2),
                (PartitionKind::Output(A), 5, 3),
            ]
        );
        fx.assert_contiguous();
    }

    #[test]
    fn test_get_partition_creates_open_tail_once() {
        let fx = Fixture::new();
        fx.write(A, "out");

        let tail = fx.partitioner.get_partition(3);
        assert_eq!(tail.content_type(), ContentType::Input);
        assert_eq!((tail.offset(), tail.length()), (3, 0));

        let again = fx.partitioner.get_partition(3);
        assert_eq!(again.id(), tail.id());
        assert_eq!(fx.partitioner.partitions().len(), 2);

        // Typing fills the open tail rather than starting another partition.
        fx.type_text("z");
        let typed = fx.partitioner.get_partition(3);
        assert_eq!(typed.id(), tail.id());
        assert_eq!(typed.content(), "z");
        fx.assert_contiguous();
    }

    #[test]
    fn test_get_partition_inside_document() {
        let fx = Fixture::new();
        fx.write(A, "abc");
        fx.write(B, "def");

        assert_eq!(fx.partitioner.get_partition(0).stream(), A);
        assert_eq!(fx.partitioner.get_partition(2).stream(), A);
        assert_eq!(fx.partitioner.get_partition(3).stream(), B);
        assert_eq!(fx.partitioner.content_type(4), ContentType::Output);
        assert_eq!(fx.partitioner.partitions().len(), 2);
    }

    #[test]
    fn test_compute_partitioning() {
        let fx = Fixture::new();
        fx.write(A, "aaa");
        fx.write(B, "bbb");
        fx.write(A, "ccc");

        let offsets = |offset, length| -> Vec<usize> {
            fx.partitioner
                .compute_partitioning(offset, length)
                .iter()
                .map(Partition::offset)
                .collect()
        };
        assert_eq!(offsets(0, 9), vec![0, 3, 6]);
        assert_eq!(offsets(2, 3), vec![0, 3]);
        assert_eq!(offsets(3, 3), vec![3]);
        assert_eq!(offsets(4, 0), vec![3]);
        assert_eq!(offsets(8, 5), vec![6]);
        assert!(offsets(9, 0).is_empty());
    }

    #[test]
    fn test_clearing_document_resets_everything() {
        let fx = Fixture::new();
        fx.write(A, "out");
        fx.type_text("in");
        fx.partitioner.stream_appended(B, "queued");

        let len = fx.len();
        fx.edit(0, len, "");
        assert!(fx.partitioner.partitions().is_empty());
        assert!(fx.partitioner.take_pending().is_empty());

        fx.type_text("fresh\n");
        assert_eq!(fx.lines(), vec!["fresh\n".to_owned()]);
        fx.assert_contiguous();
    }

    #[test]
    fn test_trim_keeps_low_water_mark_lines() {
        let fx = Fixture::new();
        fx.partitioner.set_water_marks(Some(WaterMarks::new(10, 20).unwrap()));

        for i in 0..20 {
            fx.write(A, &format!("line {i}\n"));
        }
        fx.settle();

        let doc_lines = fx.document.lock().unwrap().number_of_lines();
        assert!(doc_lines <= 10, "{doc_lines} lines left");
        assert!(fx.text().starts_with("line 11\n"));
        assert!(fx.text().ends_with("line 19\n"));
        fx.assert_contiguous();
    }

    #[test]
    fn test_trim_across_mixed_partitions() {
        let fx = Fixture::new();
        fx.partitioner.set_water_marks(Some(WaterMarks::new(2, 4).unwrap()));

        fx.write(A, "a0\n");
        fx.type_text("typed\n");
        fx.write(B, "b0\nb1");
        fx.write(A, "\na1\n");
        fx.settle();

        assert_eq!(fx.text(), "a1\n");
        assert_eq!(fx.summary(), vec![(PartitionKind::Output(A), 0, 3)]);
        assert_eq!(fx.lines(), vec!["typed\n".to_owned()]);
        fx.assert_contiguous();
    }

    #[test]
    fn test_trim_truncates_straddling_partition() {
        let fx = Fixture::new();
        fx.partitioner.set_water_marks(Some(WaterMarks::new(1, 2).unwrap()));

        fx.write(A, "x");
        fx.write(B, "y\nz\n");
        fx.settle();

        assert_eq!(fx.text(), "");
        assert!(fx.partitioner.partitions().is_empty());

        fx.write(A, "p\n");
        fx.write(B, "q\nr");
        fx.settle();
        assert_eq!(fx.text(), "r");
        assert_eq!(fx.summary(), vec![(PartitionKind::Output(B), 0, 1)]);
    }

    #[test]
    fn test_trim_keeps_unsubmitted_input() {
        let fx = Fixture::new();
        fx.write(A, "x\n");
        fx.type_text("ab\ncd");

        // The line to keep starts inside typed text; the cut backs off to
        // the start of that input instead.
        fx.partitioner.set_water_marks(Some(WaterMarks::new(1, 2).unwrap()));
        fx.settle();
        assert_eq!(fx.text(), "ab\ncd");
        assert_eq!(fx.summary(), vec![(PartitionKind::Input(StreamId::INPUT), 0, 5)]);
        fx.assert_contiguous();

        fx.type_text("\n");
        assert_eq!(fx.lines(), vec!["ab\ncd\n".to_owned()]);
    }

    #[test]
    fn test_trim_waits_for_interleaved_input() {
        let fx = Fixture::new();
        fx.type_text("ab");
        fx.write(A, "\nout\n");
        fx.type_text("cd");

        fx.partitioner.set_water_marks(Some(WaterMarks::new(1, 2).unwrap()));
        fx.settle();
        assert_eq!(fx.text(), "ab\nout\ncd");

        fx.type_text("\n");
        assert_eq!(fx.lines(), vec!["abcd\n".to_owned()]);

        // Once the line is submitted nothing holds the trim back.
        fx.settle();
        assert_eq!(fx.text(), "");
        assert!(fx.partitioner.partitions().is_empty());
    }

    #[test]
    fn test_clear_drops_batch_taken_before_it() {
        let fx = Fixture::new();
        fx.write(A, "shown ");
        fx.partitioner.stream_appended(A, "stale ");
        fx.partitioner.stream_appended(B, "output");
        let batch = fx.partitioner.take_pending();
        assert_eq!(batch.len(), 2);

        // The document is cleared while the batch is still on its way.
        let len = fx.len();
        fx.edit(0, len, "");
        for write in &batch {
            fx.partitioner.apply_output(write);
        }
        assert_eq!(fx.text(), "");
        assert!(fx.partitioner.partitions().is_empty());

        fx.write(B, "fresh");
        assert_eq!(fx.text(), "fresh");
        assert_eq!(fx.summary(), vec![(PartitionKind::Output(B), 0, 5)]);
    }

    #[test]
    fn test_setting_water_marks_rechecks_size() {
        let fx = Fixture::new();
        for i in 0..30 {
            fx.write(A, &format!("{i}\n"));
        }
        assert_eq!(fx.document.lock().unwrap().number_of_lines(), 31);

        fx.partitioner.set_water_marks(Some(WaterMarks::new(5, 10).unwrap()));
        fx.settle();
        assert_eq!(fx.document.lock().unwrap().number_of_lines(), 5);
        assert!(fx.text().starts_with("26\n"));
        fx.assert_contiguous();

        fx.partitioner.set_water_marks(None);
        for i in 0..30 {
            fx.write(A, &format!("{i}\n"));
        }
        fx.settle();
        assert_eq!(fx.document.lock().unwrap().number_of_lines(), 35);
    }

    #[test]
    fn test_water_marks_validation() {
        assert!(WaterMarks::new(5, 5).is_err());
        assert!(WaterMarks::new(6, 5).is_err());
        let marks = WaterMarks::new(0, 1).unwrap();
        assert_eq!((marks.low(), marks.high()), (0, 1));
    }

    #[test]
    fn test_connect_existing_text() {
        let mut document = Document::new();
        document.set("banner\n").unwrap();
        let fx = Fixture::with_document(document);

        let partitions = fx.partitioner.partitions();
        assert_eq!(partitions.len(), 1);
        assert_eq!(partitions[0].content_type(), ContentType::Output);
        assert_eq!(partitions[0].length(), 7);
        fx.assert_contiguous();
    }

    #[test]
    fn test_disconnect_stops_tracking() {
        let fx = Fixture::new();
        fx.write(A, "abc");
        fx.partitioner.disconnect();
        assert!(fx.partitioner.partitions().is_empty());

        fx.type_text("ignored\n");
        assert!(fx.partitioner.partitions().is_empty());
        assert!(fx.lines().is_empty());
    }

    #[test]
    fn test_allocated_streams_are_distinct() {
        let fx = Fixture::new();
        let first = fx.partitioner.allocate_stream();
        let second = fx.partitioner.allocate_stream();
        assert_ne!(first, second);
        assert_ne!(first, StreamId::INPUT);
    }
}
