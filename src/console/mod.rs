//! Interactive operator console.
//!
//! The console is one more script instance (`is_console = true`, no source
//! file) plus a terminal front-end: a raw-mode input thread with history and
//! a cursor-free redraw model, and a throttled output flusher that batches
//! concurrent log writes (see [`output`]). Because the console is a regular
//! instance, every host API global works identically at the prompt.
//!
//! The literal commands `exit` and `clear`/`cls` are intercepted before the
//! interpreter sees them; everything else is evaluated as script.

pub mod history;
mod input;
pub mod output;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use parking_lot::Mutex;
use std::sync::Arc;

use crate::context::ServerContext;
use crate::logging::ConsoleQueue;
use crate::scripting::instance::ScriptInstance;
use history::History;

struct InputState {
    buffer: String,
    history: History,
}

pub struct Console {
    instance: Arc<ScriptInstance>,
    queue: Arc<ConsoleQueue>,
    state: Mutex<InputState>,
}

impl Console {
    /// Build the console without touching the terminal. Used directly by
    /// tests; the binary goes through [`Console::start`].
    pub fn new(ctx: &Arc<ServerContext>) -> Arc<Self> {
        Arc::new(Self {
            instance: ScriptInstance::console(ctx),
            queue: Arc::clone(&ctx.console),
            state: Mutex::new(InputState {
                buffer: String::new(),
                history: History::new(),
            }),
        })
    }

    /// Set up the terminal and detach the input and output threads.
    ///
    /// Raw-mode failure (no terminal attached, unsupported console) is
    /// logged and non-fatal: output still flows, ANSI control may not.
    pub fn start(ctx: &Arc<ServerContext>) -> Arc<Self> {
        let raw = crossterm::terminal::enable_raw_mode();
        if let Err(err) = &raw {
            log::error!("could not enable raw terminal mode: {err}; console input may not work properly");
        }
        let console = Self::new(ctx);
        input::spawn_reader(Arc::clone(&console));
        output::spawn_flusher(Arc::clone(&ctx.console), raw.is_ok());
        console
    }

    pub fn instance(&self) -> &Arc<ScriptInstance> {
        &self.instance
    }

    /// Apply one key press to the input buffer.
    pub fn handle_key(&self, key: KeyEvent) {
        let mut state = self.state.lock();
        match key.code {
            KeyCode::Enter => {
                if state.buffer.is_empty() {
                    return;
                }
                let command = std::mem::take(&mut state.buffer);
                self.queue.set_input("");
                self.queue.push("\n".to_string());
                // the command may run script for a while; let go of the
                // input state so the redraw keeps working
                drop(state);
                self.handle_command(&command);
                self.state.lock().history.push(command);
                return;
            }
            KeyCode::Backspace => {
                state.buffer.pop();
            }
            KeyCode::Up => {
                if let Some(entry) = state.history.up() {
                    state.buffer = entry;
                }
                state.history.compact();
            }
            KeyCode::Down => {
                if let Some(entry) = state.history.down() {
                    state.buffer = entry;
                }
                state.history.compact();
            }
            KeyCode::Char(c) if key.modifiers.contains(KeyModifiers::CONTROL) => match c {
                // EOT: treated as the exit command
                'd' => {
                    drop(state);
                    self.handle_command("exit");
                    return;
                }
                // FF: clear the screen
                'l' => {
                    self.handle_command("clear");
                    state.buffer.clear();
                }
                _ => {}
            },
            KeyCode::Char(c) if !c.is_control() => {
                state.buffer.push(c);
                let snapshot = state.buffer.clone();
                state.history.set_tentative(snapshot);
            }
            _ => {}
        }
        self.queue.set_input(&state.buffer);
    }

    /// Run one submitted line: intercept the literal console commands, hand
    /// everything else to the script instance.
    pub fn handle_command(&self, command: &str) {
        match command {
            "exit" => {
                let _ = crossterm::terminal::disable_raw_mode();
                std::process::exit(0);
            }
            "clear" | "cls" => self.queue.push(output::CLEAR_SCREEN.to_string()),
            _ => self.instance.execute(command),
        }
    }
}
