//! Log pipeline feeding the interactive console and `Server.log`.
//!
//! All log writers go through the standard `log` facade. The installed
//! [`ConsoleLogger`] formats `[dd/mm/yyyy hh:mm:ss] [LEVEL] <text>\n`
//! (with the current thread's name inside the timestamp brackets when the
//! Debug setting is on), pushes the line onto the shared console output
//! queue, and appends it to `Server.log`. The log file is opened for append
//! on every write so an operator can truncate or rotate it externally at
//! any time.
//!
//! Writing directly to stdout is not allowed anywhere else in the server:
//! the console output flusher owns stdout so the input prompt survives
//! concurrent log bursts (see `console::output`).

use chrono::Local;
use log::{Level, LevelFilter, Log, Metadata, Record};
use parking_lot::Mutex;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::SETTINGS;
use crate::error::ServerResult;

/// Log target reserved for caught script-host panics; rendered as `[EXCEP]`.
pub const EXCEPT_TARGET: &str = "except";

/// Shared console state: pending output lines plus the in-progress input
/// line the flusher re-draws after every drain.
#[derive(Default)]
pub struct ConsoleQueue {
    output: Mutex<Vec<String>>,
    input: Mutex<String>,
}

impl ConsoleQueue {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Enqueue one already-formatted chunk for the flusher.
    pub fn push(&self, msg: String) {
        self.output.lock().push(msg);
    }

    /// Take all pending output, oldest first.
    pub fn drain(&self) -> Vec<String> {
        std::mem::take(&mut *self.output.lock())
    }

    pub fn set_input(&self, line: &str) {
        *self.input.lock() = line.to_string();
    }

    pub fn input(&self) -> String {
        self.input.lock().clone()
    }
}

/// `log::Log` implementation backing the whole server.
pub struct ConsoleLogger {
    queue: Arc<ConsoleQueue>,
    log_file: PathBuf,
    // serializes enqueue + file append so interleaved writers cannot split
    // a line between the two sinks
    sink: Mutex<()>,
}

impl ConsoleLogger {
    /// Install the logger as the global `log` backend.
    pub fn init(queue: Arc<ConsoleQueue>, log_file: PathBuf) -> ServerResult<()> {
        let fresh = std::fs::File::create(&log_file).is_ok();
        let logger = Self {
            queue,
            log_file,
            sink: Mutex::new(()),
        };
        log::set_boxed_logger(Box::new(logger))?;
        log::set_max_level(LevelFilter::Debug);
        if !fresh {
            log::error!("logger file init failed!");
        }
        Ok(())
    }

    fn write(&self, line: String) {
        let _guard = self.sink.lock();
        self.queue.push(line.clone());
        if let Ok(mut file) = OpenOptions::new()
            .append(true)
            .create(true)
            .open(&self.log_file)
        {
            let _ = file.write_all(line.as_bytes());
        }
    }
}

impl Log for ConsoleLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        match metadata.level() {
            Level::Debug | Level::Trace => SETTINGS.debug(),
            _ => true,
        }
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let tag = if record.target() == EXCEPT_TARGET {
            "EXCEP"
        } else {
            level_tag(record.level())
        };
        self.write(format_line(tag, &format!("{}", record.args())));
    }

    fn flush(&self) {}
}

/// Log a caught script-host panic with its thread origin.
pub fn except(msg: &str) {
    log::error!(target: EXCEPT_TARGET, "{msg}");
}

fn level_tag(level: Level) -> &'static str {
    match level {
        Level::Error => "ERROR",
        Level::Warn => "WARN",
        Level::Info => "INFO",
        Level::Debug => "DEBUG",
        Level::Trace => "TRACE",
    }
}

/// Render one log line. The thread name rides inside the timestamp brackets
/// iff the Debug setting is on.
fn format_line(tag: &str, text: &str) -> String {
    let stamp = Local::now().format("%d/%m/%Y %H:%M:%S");
    if SETTINGS.debug() {
        let current = std::thread::current();
        let name = current
            .name()
            .map(str::to_string)
            .unwrap_or_else(|| format!("{:?}", current.id()));
        format!("[{stamp} {name}] [{tag}] {text}\n")
    } else {
        format!("[{stamp}] [{tag}] {text}\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn queue_preserves_order() {
        let queue = ConsoleQueue::new();
        queue.push("a\n".to_string());
        queue.push("b\n".to_string());
        assert_eq!(queue.drain(), vec!["a\n".to_string(), "b\n".to_string()]);
        assert!(queue.drain().is_empty());
    }

    #[test]
    fn input_snapshot_round_trips() {
        let queue = ConsoleQueue::new();
        queue.set_input("abc");
        assert_eq!(queue.input(), "abc");
    }

    #[test]
    #[serial]
    fn line_format_matches_contract() {
        SETTINGS.set_debug(false);
        let line = format_line("INFO", "hello");
        // [dd/mm/yyyy hh:mm:ss] [INFO] hello\n
        assert!(line.starts_with('['));
        assert!(line.contains("] [INFO] hello\n"));
        let stamp = &line[1..line.find(']').unwrap_or(0)];
        assert_eq!(stamp.len(), "dd/mm/yyyy hh:mm:ss".len());
    }

    #[test]
    #[serial]
    fn debug_mode_adds_thread_name() {
        SETTINGS.set_debug(true);
        let line = std::thread::Builder::new()
            .name("tick".to_string())
            .spawn(|| format_line("WARN", "x"))
            .expect("spawn")
            .join()
            .expect("join");
        SETTINGS.set_debug(false);
        assert!(line.contains(" tick] [WARN] x\n"));
    }
}
