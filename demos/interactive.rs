//! Interactive Demo: a console shared by background producers and the user.
//!
//! Two worker threads stream output while you type. Completed lines are read
//! back from the console's input stream and echoed by a third thread.
//!
//! Type `quit` + Enter, or press Esc / Ctrl+C, to exit.
//! Set `IOCONSOLE_LOG=<file>` to capture tracing output.

use crossbeam_channel::{unbounded, RecvTimeoutError};
use crossterm::{
    cursor,
    event::{DisableBracketedPaste, EnableBracketedPaste},
    execute, queue,
    style::{Print, PrintStyledContent, Stylize},
    terminal::{self, Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen},
};
use ioconsole::{ConsoleConfig, IoConsole, KeyInput, KeyboardActor, WaterMarks};
use std::error::Error;
use std::fs::File;
use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

fn init_logging() -> io::Result<()> {
    if let Some(path) = std::env::var_os("IOCONSOLE_LOG") {
        let file = File::create(path)?;
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .init();
    }
    Ok(())
}

fn render(console: &IoConsole, width: u16, height: u16, out: &mut impl Write) -> io::Result<()> {
    let rows = usize::from(height.saturating_sub(1));
    let contents = console.contents();
    let lines: Vec<&str> = contents.split('\n').collect();
    let visible = &lines[lines.len().saturating_sub(rows)..];

    for row in 0..rows {
        let line = visible.get(row).copied().unwrap_or("");
        let clipped: String = line.chars().take(usize::from(width)).collect();
        queue!(
            out,
            cursor::MoveTo(0, row as u16),
            Clear(ClearType::CurrentLine),
            Print(clipped)
        )?;
    }

    let status = format!(
        " ioconsole | partitions: {} | lines: {} | Esc to quit ",
        console.partitions().len(),
        lines.len()
    );
    let status: String = status.chars().take(usize::from(width)).collect();
    queue!(
        out,
        cursor::MoveTo(0, height.saturating_sub(1)),
        Clear(ClearType::CurrentLine),
        PrintStyledContent(status.black().on_grey())
    )?;

    let last = visible.last().map_or(0, |line| line.chars().count());
    let cursor_row = visible.len().saturating_sub(1);
    queue!(
        out,
        cursor::MoveTo(last.min(usize::from(width)) as u16, cursor_row as u16)
    )?;
    out.flush()
}

fn main() -> Result<(), Box<dyn Error>> {
    init_logging()?;

    let config = ConsoleConfig {
        name: "demo".to_string(),
        water_marks: Some(WaterMarks::new(200, 400)?),
        ..ConsoleConfig::default()
    };
    let mut console = IoConsole::with_config(config)?;
    let mut input = console.take_input_stream().ok_or("input stream already taken")?;
    let running = Arc::new(AtomicBool::new(true));

    // Producers
    let mut producers = Vec::new();
    for (name, period) in [("clock", Duration::from_millis(1000)), ("worker", Duration::from_millis(350))] {
        let mut out = console.new_output_stream();
        let running = Arc::clone(&running);
        producers.push(thread::spawn(move || {
            let start = Instant::now();
            let mut n = 0u64;
            while running.load(Ordering::Relaxed) {
                let _ = writeln!(out, "[{name}] #{n} at {:.1}s", start.elapsed().as_secs_f32());
                n += 1;
                thread::sleep(period);
            }
        }));
    }

    // Echo typed lines back as output
    let mut echo = console.new_output_stream();
    let echo_running = Arc::clone(&running);
    let echo_thread = thread::spawn(move || {
        while let Some(line) = input.read_line() {
            let command = line.trim_end();
            if command == "quit" {
                echo_running.store(false, Ordering::Relaxed);
                break;
            }
            let _ = writeln!(echo, "you typed: {command:?}");
        }
    });

    let (mut width, mut height) = terminal::size()?;
    terminal::enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableBracketedPaste)?;

    let (key_tx, key_rx) = unbounded();
    let keyboard = KeyboardActor::spawn(key_tx, Duration::from_millis(20))?;

    let result = (|| -> Result<(), Box<dyn Error>> {
        while running.load(Ordering::Relaxed) {
            match key_rx.recv_timeout(Duration::from_millis(50)) {
                Ok(KeyInput::Interrupt | KeyInput::Shutdown) => break,
                Ok(KeyInput::Resize { width: w, height: h }) => (width, height) = (w, h),
                Ok(key) => {
                    console.handle_key(&key)?;
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }
            render(&console, width, height, &mut stdout)?;
        }
        Ok(())
    })();

    keyboard.join();
    execute!(stdout, DisableBracketedPaste, LeaveAlternateScreen)?;
    terminal::disable_raw_mode()?;

    running.store(false, Ordering::Relaxed);
    for producer in producers {
        let _ = producer.join();
    }
    drop(console);
    let _ = echo_thread.join();

    result
}
