//! Display Actor: the single thread that owns document mutation.
//!
//! Every change the console makes to its document, whether stream output
//! being applied or the history being trimmed, runs as a job on this thread.
//! Other threads reach it through a cloneable [`DisplayHandle`].

use super::messages::DisplayCommand;
use crate::error::ConsoleError;
use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use std::thread::{self, JoinHandle, ThreadId};

/// Cloneable handle for scheduling work on the display thread.
#[derive(Debug, Clone)]
pub struct DisplayHandle {
    sender: Sender<DisplayCommand>,
    thread: ThreadId,
}

impl DisplayHandle {
    /// Check if the caller is running on the display thread.
    pub fn is_display_thread(&self) -> bool {
        thread::current().id() == self.thread
    }

    /// Queue `job` and return immediately.
    ///
    /// # Errors
    ///
    /// Returns [`ConsoleError::Disconnected`] if the display thread has
    /// stopped.
    pub fn async_exec<F>(&self, job: F) -> Result<(), ConsoleError>
    where
        F: FnOnce() + Send + 'static,
    {
        self.sender
            .send(DisplayCommand::Exec(Box::new(job)))
            .map_err(|_| ConsoleError::Disconnected("display"))
    }

    /// Run `job` on the display thread and wait for its result.
    ///
    /// Called from the display thread itself, the job runs inline.
    ///
    /// # Errors
    ///
    /// Returns [`ConsoleError::Disconnected`] if the display thread stops
    /// before the job runs.
    pub fn sync_exec<F, R>(&self, job: F) -> Result<R, ConsoleError>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        if self.is_display_thread() {
            return Ok(job());
        }
        let (reply_tx, reply_rx) = bounded(1);
        self.async_exec(move || {
            let _ = reply_tx.send(job());
        })?;
        reply_rx
            .recv()
            .map_err(|_| ConsoleError::Disconnected("display"))
    }

    fn shutdown(&self) {
        let _ = self.sender.send(DisplayCommand::Shutdown);
    }
}

/// Display actor owning the display thread.
#[derive(Debug)]
pub struct DisplayActor {
    /// Handle to the display thread.
    handle: Option<JoinHandle<()>>,
    display: DisplayHandle,
}

impl DisplayActor {
    /// Spawn the display thread, named `<name>-display`.
    ///
    /// # Errors
    ///
    /// Returns [`ConsoleError::Spawn`] if the OS refuses the thread.
    pub fn spawn(name: &str) -> Result<Self, ConsoleError> {
        let (sender, receiver) = unbounded();

        let handle = thread::Builder::new()
            .name(format!("{name}-display"))
            .spawn(move || Self::run_loop(&receiver))
            .map_err(|source| ConsoleError::Spawn {
                name: "display",
                source,
            })?;

        let thread = handle.thread().id();
        Ok(Self {
            handle: Some(handle),
            display: DisplayHandle { sender, thread },
        })
    }

    /// A handle for scheduling work.
    pub fn handle(&self) -> DisplayHandle {
        self.display.clone()
    }

    /// Signal the display thread to stop once queued jobs have run.
    pub fn shutdown(&self) {
        self.display.shutdown();
    }

    /// Stop the display thread and wait for it to finish.
    pub fn join(mut self) {
        self.shutdown();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }

    fn run_loop(receiver: &Receiver<DisplayCommand>) {
        for command in receiver {
            match command {
                DisplayCommand::Exec(job) => job(),
                DisplayCommand::Shutdown => break,
            }
        }
    }
}

impl Drop for DisplayActor {
    fn drop(&mut self) {
        self.shutdown();
    }
}
