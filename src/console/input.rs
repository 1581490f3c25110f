//! Console input reader thread.
//!
//! Keys are consumed one event at a time in raw (non-canonical, no-echo)
//! mode; the decoded edits land in the shared input buffer the output
//! flusher re-draws. A console that keeps failing to deliver events (the
//! server running as a background process with no terminal) is declared
//! non-interactive after 50 consecutive failures and the thread exits,
//! leaving output-only mode.

use crossterm::event::{self, Event, KeyEventKind};
use std::sync::Arc;
use std::thread;

use super::Console;

const MAX_READ_FAILURES: u32 = 50;

pub(super) fn spawn_reader(console: Arc<Console>) {
    let spawned = thread::Builder::new()
        .name("console-in".to_string())
        .spawn(move || read_loop(&console));
    if let Err(err) = spawned {
        log::error!("failed to spawn console input thread: {err}");
    }
}

fn read_loop(console: &Console) {
    let mut failures = 0_u32;
    loop {
        match event::read() {
            Ok(Event::Key(key)) if key.kind == KeyEventKind::Press => {
                failures = 0;
                console.handle_key(key);
            }
            Ok(_) => failures = 0,
            Err(_) => {
                failures += 1;
                if failures >= MAX_READ_FAILURES {
                    log::info!(
                        "too many console read failures, this is now assumed to be a background process - console input is now disabled"
                    );
                    break;
                }
            }
        }
    }
}
