//! Keyboard Actor: turns terminal key events into [`KeyInput`].
//!
//! Only a front end that owns a real terminal needs this; the console itself
//! takes keys through [`IoConsole::handle_key`](crate::IoConsole::handle_key).

use super::messages::KeyInput;
use crate::error::ConsoleError;
use crossbeam_channel::Sender;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Reads the terminal on its own thread and forwards usable keys.
#[derive(Debug)]
pub struct KeyboardActor {
    handle: Option<JoinHandle<()>>,
    stop: Arc<AtomicBool>,
}

impl KeyboardActor {
    /// Start forwarding keys to `keys`.
    ///
    /// `poll_timeout` bounds how long a stop request can go unnoticed.
    ///
    /// # Errors
    ///
    /// Returns [`ConsoleError::Spawn`] if the OS refuses the thread.
    pub fn spawn(keys: Sender<KeyInput>, poll_timeout: Duration) -> Result<Self, ConsoleError> {
        let stop = Arc::new(AtomicBool::new(false));
        let thread_stop = Arc::clone(&stop);

        let handle = thread::Builder::new()
            .name("ioconsole-keyboard".to_string())
            .spawn(move || {
                while !thread_stop.load(Ordering::Relaxed) {
                    if !Self::forward_next(&keys, poll_timeout) {
                        return;
                    }
                }
                let _ = keys.send(KeyInput::Shutdown);
            })
            .map_err(|source| ConsoleError::Spawn {
                name: "keyboard",
                source,
            })?;

        Ok(Self {
            handle: Some(handle),
            stop,
        })
    }

    /// Ask the thread to stop; it sends [`KeyInput::Shutdown`] on its way out.
    pub fn shutdown(&self) {
        self.stop.store(true, Ordering::Relaxed);
    }

    /// Stop and wait for the thread.
    pub fn join(mut self) {
        self.shutdown();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }

    /// Forward at most one event. `false` once nobody is listening.
    fn forward_next(keys: &Sender<KeyInput>, poll_timeout: Duration) -> bool {
        let next = match event::poll(poll_timeout) {
            Ok(false) => return true,
            Ok(true) => event::read().map(convert_event),
            Err(err) => Err(err),
        };
        let input = match next {
            Ok(Some(input)) => input,
            Ok(None) => return true,
            Err(err) => KeyInput::Error(err.to_string()),
        };
        keys.send(input).is_ok()
    }
}

impl Drop for KeyboardActor {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Convert a crossterm event; anything a console cannot use maps to `None`.
pub fn convert_event(event: Event) -> Option<KeyInput> {
    match event {
        Event::Key(key) => convert_key(key),
        Event::Paste(text) => Some(KeyInput::Paste(text)),
        Event::Resize(width, height) => Some(KeyInput::Resize { width, height }),
        _ => None,
    }
}

fn convert_key(key: KeyEvent) -> Option<KeyInput> {
    // Only presses; repeats and releases would double the text.
    if key.kind != KeyEventKind::Press {
        return None;
    }

    let control = key.modifiers.contains(KeyModifiers::CONTROL);
    Some(match key.code {
        KeyCode::Char('c' | 'd') if control => KeyInput::Interrupt,
        KeyCode::Char(_) if control => return None,
        KeyCode::Char(c) => KeyInput::Char(c),
        KeyCode::Enter => KeyInput::Enter,
        KeyCode::Tab => KeyInput::Tab,
        KeyCode::Backspace => KeyInput::Backspace,
        KeyCode::Esc => KeyInput::Interrupt,
        _ => return None,
    })
}
