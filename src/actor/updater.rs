//! Updater Actor: moves pending stream output into the document.
//!
//! Producers never touch the document. They queue text on the partitioner
//! and wake this thread, which swaps the queue out and applies each chunk
//! through a blocking `sync_exec` on the display thread. Holding the
//! updater back this way keeps output in the order it was written.

use super::display::DisplayHandle;
use super::messages::UpdaterCommand;
use crate::error::ConsoleError;
use crate::partition::Partitioner;
use crossbeam_channel::{bounded, Receiver, Sender};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::thread::{self, JoinHandle};
use tracing::{trace, warn};

/// Cloneable handle for waking the updater.
#[derive(Debug, Clone)]
pub struct UpdaterHandle {
    sender: Sender<UpdaterCommand>,
    /// Set while a drain is queued but not yet started.
    scheduled: Arc<AtomicBool>,
}

impl UpdaterHandle {
    /// Create a handle feeding `sender`.
    pub fn new(sender: Sender<UpdaterCommand>) -> Self {
        Self {
            sender,
            scheduled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Ask for a drain. At most one drain request is outstanding at a time.
    pub fn schedule(&self) {
        if !self.scheduled.swap(true, Ordering::AcqRel) && self.sender.send(UpdaterCommand::Drain).is_err() {
            self.scheduled.store(false, Ordering::Release);
        }
    }

    /// Check if a drain request is waiting.
    pub fn is_scheduled(&self) -> bool {
        self.scheduled.load(Ordering::Acquire)
    }

    /// Drain now and wait until everything queued so far is in the document.
    ///
    /// # Errors
    ///
    /// Returns [`ConsoleError::Disconnected`] if the updater has stopped.
    pub fn flush(&self) -> Result<(), ConsoleError> {
        let (ack_tx, ack_rx) = bounded(1);
        self.sender
            .send(UpdaterCommand::Flush(ack_tx))
            .map_err(|_| ConsoleError::Disconnected("updater"))?;
        ack_rx
            .recv()
            .map_err(|_| ConsoleError::Disconnected("updater"))
    }

    fn shutdown(&self) {
        let _ = self.sender.send(UpdaterCommand::Shutdown);
    }
}

/// Updater actor owning the updater thread.
#[derive(Debug)]
pub struct UpdaterActor {
    /// Handle to the updater thread.
    handle: Option<JoinHandle<()>>,
    updater: UpdaterHandle,
}

impl UpdaterActor {
    /// Spawn the updater thread, named `<name>-updater`.
    ///
    /// `receiver` must be the other end of the channel behind `updater`.
    ///
    /// # Errors
    ///
    /// Returns [`ConsoleError::Spawn`] if the OS refuses the thread.
    pub fn spawn(
        name: &str,
        receiver: Receiver<UpdaterCommand>,
        updater: &UpdaterHandle,
        partitioner: Weak<Partitioner>,
        display: DisplayHandle,
    ) -> Result<Self, ConsoleError> {
        let scheduled = Arc::clone(&updater.scheduled);

        let handle = thread::Builder::new()
            .name(format!("{name}-updater"))
            .spawn(move || Self::run_loop(&receiver, &scheduled, &partitioner, &display))
            .map_err(|source| ConsoleError::Spawn {
                name: "updater",
                source,
            })?;

        Ok(Self {
            handle: Some(handle),
            updater: updater.clone(),
        })
    }

    /// Signal the updater to stop after the commands queued so far.
    pub fn shutdown(&self) {
        self.updater.shutdown();
    }

    /// Stop the updater and wait for it to finish.
    pub fn join(mut self) {
        self.shutdown();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }

    fn run_loop(
        receiver: &Receiver<UpdaterCommand>,
        scheduled: &AtomicBool,
        partitioner: &Weak<Partitioner>,
        display: &DisplayHandle,
    ) {
        for command in receiver {
            match command {
                UpdaterCommand::Drain => {
                    scheduled.store(false, Ordering::Release);
                    Self::drain(partitioner, display);
                }
                UpdaterCommand::Flush(ack) => {
                    Self::drain(partitioner, display);
                    let _ = ack.send(());
                }
                UpdaterCommand::Shutdown => break,
            }
        }
    }

    /// Apply queued output until the queue stays empty.
    fn drain(partitioner: &Weak<Partitioner>, display: &DisplayHandle) {
        let Some(partitioner) = partitioner.upgrade() else {
            return;
        };
        loop {
            let batch = partitioner.take_pending();
            if batch.is_empty() {
                return;
            }
            trace!(chunks = batch.len(), "applying pending output");
            for write in batch {
                let target = Arc::clone(&partitioner);
                if let Err(err) = display.sync_exec(move || target.apply_output(&write)) {
                    warn!(%err, "dropping pending output");
                    return;
                }
            }
        }
    }
}

impl Drop for UpdaterActor {
    fn drop(&mut self) {
        self.shutdown();
    }
}
