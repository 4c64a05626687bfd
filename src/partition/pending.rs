//! Pending writes: output waiting to be applied to the document.
//!
//! Producers coalesce into the queue under a short lock; the updater takes
//! the whole queue in one swap, so producers never wait on document work.
//! Clearing the queue starts a new generation, which lets the updater tell
//! a batch it took before the clear from one taken after.

use super::StreamId;
use std::mem;

/// Text written by one stream that has not reached the document yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingWrite {
    /// The stream that wrote the text.
    pub stream: StreamId,
    /// Accumulated text.
    pub text: String,
    /// Queue generation the text was written in.
    pub generation: u64,
}

/// Ordered queue of pending writes, one chunk per run of the same stream.
#[derive(Debug, Default)]
pub struct PendingWrites {
    chunks: Vec<PendingWrite>,
    generation: u64,
}

impl PendingWrites {
    /// Create an empty queue.
    pub const fn new() -> Self {
        Self {
            chunks: Vec::new(),
            generation: 0,
        }
    }

    /// Queue `text` from `stream`.
    ///
    /// Returns `true` if a new chunk was started, `false` if the text was
    /// concatenated onto the last chunk of the same stream.
    pub fn push(&mut self, stream: StreamId, text: &str) -> bool {
        if let Some(last) = self.chunks.last_mut() {
            if last.stream == stream {
                last.text.push_str(text);
                return false;
            }
        }
        self.chunks.push(PendingWrite {
            stream,
            text: text.to_owned(),
            generation: self.generation,
        });
        true
    }

    /// Swap the queue out for an empty one.
    pub fn take(&mut self) -> Vec<PendingWrite> {
        mem::take(&mut self.chunks)
    }

    /// Drop everything queued and start a new generation.
    pub fn clear(&mut self) {
        self.chunks.clear();
        self.generation += 1;
    }

    /// Current generation. Writes taken earlier with an older generation
    /// were written before a clear.
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// Number of chunks queued.
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Check if nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pending_coalesces_same_stream() {
        let mut pending = PendingWrites::new();
        assert!(pending.push(StreamId(1), "a"));
        assert!(!pending.push(StreamId(1), "b"));
        assert!(!pending.push(StreamId(1), "c"));
        assert_eq!(pending.len(), 1);
        assert_eq!(
            pending.take(),
            vec![PendingWrite {
                stream: StreamId(1),
                text: "abc".into(),
                generation: 0,
            }]
        );
    }

    #[test]
    fn test_pending_splits_on_stream_switch() {
        let mut pending = PendingWrites::new();
        pending.push(StreamId(1), "a");
        pending.push(StreamId(2), "b");
        pending.push(StreamId(1), "c");
        pending.push(StreamId(1), "d");

        let chunks = pending.take();
        let summary: Vec<_> = chunks.iter().map(|w| (w.stream.0, w.text.as_str())).collect();
        assert_eq!(summary, vec![(1, "a"), (2, "b"), (1, "cd")]);
    }

    #[test]
    fn test_pending_take_leaves_fresh_queue() {
        let mut pending = PendingWrites::new();
        pending.push(StreamId(1), "a");
        let _ = pending.take();
        assert!(pending.is_empty());

        // A write after the swap starts a new chunk even for the same stream.
        assert!(pending.push(StreamId(1), "b"));
    }

    #[test]
    fn test_pending_clear_starts_new_generation() {
        let mut pending = PendingWrites::new();
        pending.push(StreamId(1), "old");
        let taken = pending.take();
        pending.push(StreamId(2), "dropped");

        pending.clear();
        assert!(pending.is_empty());
        assert_eq!(pending.generation(), 1);
        assert_eq!(taken[0].generation, 0);

        pending.push(StreamId(1), "new");
        assert_eq!(pending.take()[0].generation, 1);
    }
}
