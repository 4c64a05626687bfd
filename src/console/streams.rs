//! Console streams: the byte-level ends of a console.

use crate::lock;
use crate::partition::{InputSink, Partitioner, StreamId};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use std::io;
use std::str;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// An output stream writing into a console.
///
/// Writes are queued and never wait on the document. Bytes are decoded as
/// UTF-8; a sequence split across writes is held back until it completes,
/// and invalid bytes become U+FFFD.
#[derive(Debug)]
pub struct ConsoleOutputStream {
    id: StreamId,
    partitioner: Arc<Partitioner>,
    /// Trailing bytes of an incomplete UTF-8 sequence.
    partial: Vec<u8>,
}

impl ConsoleOutputStream {
    pub(crate) fn new(partitioner: Arc<Partitioner>) -> Self {
        let id = partitioner.allocate_stream();
        Self {
            id,
            partitioner,
            partial: Vec::new(),
        }
    }

    /// Identity of this stream; partitions it writes carry the same id.
    pub const fn id(&self) -> StreamId {
        self.id
    }

    /// Queue `text`.
    pub fn write_str(&mut self, text: &str) {
        self.release_partial();
        self.partitioner.stream_appended(self.id, text);
    }

    /// Decode as much of `partial` as possible, keeping an incomplete tail.
    fn decode(&mut self) -> String {
        let mut text = String::new();
        let mut rest = self.partial.as_slice();
        while !rest.is_empty() {
            match str::from_utf8(rest) {
                Ok(valid) => {
                    text.push_str(valid);
                    rest = &[];
                }
                Err(err) => {
                    let (valid, after) = rest.split_at(err.valid_up_to());
                    text.push_str(&String::from_utf8_lossy(valid));
                    match err.error_len() {
                        Some(len) => {
                            text.push(char::REPLACEMENT_CHARACTER);
                            rest = &after[len..];
                        }
                        None => {
                            rest = after;
                            break;
                        }
                    }
                }
            }
        }
        self.partial = rest.to_vec();
        text
    }

    fn release_partial(&mut self) {
        if !self.partial.is_empty() {
            let text = String::from_utf8_lossy(&self.partial).into_owned();
            self.partial.clear();
            self.partitioner.stream_appended(self.id, &text);
        }
    }
}

impl io::Write for ConsoleOutputStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.partial.extend_from_slice(buf);
        let text = self.decode();
        self.partitioner.stream_appended(self.id, &text);
        Ok(buf.len())
    }

    /// Output is queued as soon as it is written; use
    /// [`IoConsole::flush`](crate::IoConsole::flush) to wait until it is in
    /// the document.
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for ConsoleOutputStream {
    fn drop(&mut self) {
        self.release_partial();
    }
}

/// Feeds completed input lines to a [`ConsoleInputStream`].
#[derive(Debug)]
pub struct InputSender {
    sender: Mutex<Option<Sender<String>>>,
}

impl InputSender {
    /// Create a sender feeding `sender`.
    pub const fn new(sender: Sender<String>) -> Self {
        Self {
            sender: Mutex::new(Some(sender)),
        }
    }

    /// Stop delivering lines; readers see end of input once drained.
    pub fn close(&self) {
        lock(&self.sender).take();
    }
}

impl InputSink for InputSender {
    fn append_data(&self, text: &str) {
        if let Some(sender) = lock(&self.sender).as_ref() {
            let _ = sender.send(text.to_owned());
        }
    }
}

/// The reading end of a console: one string per typed line, delimiter
/// included.
#[derive(Debug)]
pub struct ConsoleInputStream {
    receiver: Receiver<String>,
    /// A line partly consumed through [`io::Read`].
    pending: Vec<u8>,
    position: usize,
}

impl ConsoleInputStream {
    /// Create a stream reading from `receiver`.
    pub const fn new(receiver: Receiver<String>) -> Self {
        Self {
            receiver,
            pending: Vec::new(),
            position: 0,
        }
    }

    /// Block for the next line. `None` once the console is gone.
    pub fn read_line(&mut self) -> Option<String> {
        self.take_pending().or_else(|| self.receiver.recv().ok())
    }

    /// The next line if one is ready.
    pub fn try_read_line(&mut self) -> Option<String> {
        self.take_pending().or_else(|| self.receiver.try_recv().ok())
    }

    /// Wait up to `timeout` for the next line.
    ///
    /// # Errors
    ///
    /// Returns [`RecvTimeoutError::Timeout`] when nothing arrived in time and
    /// [`RecvTimeoutError::Disconnected`] once the console is gone.
    pub fn read_line_timeout(&mut self, timeout: Duration) -> Result<String, RecvTimeoutError> {
        match self.take_pending() {
            Some(line) => Ok(line),
            None => self.receiver.recv_timeout(timeout),
        }
    }

    fn take_pending(&mut self) -> Option<String> {
        if self.position >= self.pending.len() {
            return None;
        }
        let line = String::from_utf8_lossy(&self.pending[self.position..]).into_owned();
        self.pending.clear();
        self.position = 0;
        Some(line)
    }
}

impl io::Read for ConsoleInputStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        if self.position >= self.pending.len() {
            match self.receiver.recv() {
                Ok(line) => {
                    self.pending = line.into_bytes();
                    self.position = 0;
                }
                Err(_) => return Ok(0),
            }
        }
        let available = &self.pending[self.position..];
        let count = available.len().min(buf.len());
        buf[..count].copy_from_slice(&available[..count]);
        self.position += count;
        Ok(count)
    }
}
