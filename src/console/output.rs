//! Throttled console output flusher.
//!
//! A dedicated thread wakes every 10 ms, erases the current terminal line,
//! drains the output queue to stdout, and re-draws the prompt followed by
//! the in-progress input line. Log bursts from any number of threads
//! therefore never tear the prompt.

use std::io::Write;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::logging::ConsoleQueue;

pub const FLUSH_INTERVAL: Duration = Duration::from_millis(10);
pub const ERASE_LINE: &str = "\x1b[2K\r";
pub const CLEAR_SCREEN: &str = "\x1b[2J\x1b[H";
pub const PROMPT: &str = "> ";

/// Build one frame: erase, drained output, prompt + input line.
///
/// In raw terminal mode the newline translation normally done by the
/// terminal driver is off, so `\n` is expanded to `\r\n` here.
pub fn render_frame(queue: &ConsoleQueue, raw_mode: bool) -> String {
    let mut frame = String::from(ERASE_LINE);
    for msg in queue.drain() {
        if msg.is_empty() {
            continue;
        }
        if raw_mode {
            frame.push_str(&msg.replace('\n', "\r\n"));
        } else {
            frame.push_str(&msg);
        }
    }
    frame.push_str(PROMPT);
    frame.push_str(&queue.input());
    frame
}

/// Detach the flusher thread.
pub fn spawn_flusher(queue: Arc<ConsoleQueue>, raw_mode: bool) {
    let spawned = thread::Builder::new()
        .name("console-out".to_string())
        .spawn(move || loop {
            thread::sleep(FLUSH_INTERVAL);
            let frame = render_frame(&queue, raw_mode);
            let mut stdout = std::io::stdout();
            let _ = stdout.write_all(frame.as_bytes());
            let _ = stdout.flush();
        });
    if let Err(err) = spawned {
        log::error!("failed to spawn console output thread: {err}");
    }
}
