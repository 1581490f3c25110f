//! # Convoy Server Core Library
//!
//! This crate is the core of the `convoy` coordination server for a
//! multiplayer driving simulation. Clients connect through an external
//! transport layer and stream vehicle state; this library hosts the part
//! that makes the server programmable: an embedded scripting runtime that
//! loads operator-authored plugins, dispatches named game events to them,
//! and exposes a fixed server API callable from scripts, plus the
//! interactive operator console that evaluates script expressions against
//! the same runtime.
//!
//! ## Crate Structure
//!
//! - **`scripting`**: the plugin runtime. One isolated interpreter per
//!   script (`scripting::instance`), the host API surface installed into
//!   each of them (`scripting::api`), the bounded-wait event dispatcher
//!   (`scripting::dispatcher`), script-owned periodic background tasks
//!   (`scripting::worker`), and the process-wide plugin registry
//!   (`scripting::engine`).
//! - **`console`**: the interactive console. An input thread with history
//!   and a cursor-free redraw model, a throttled output flusher, and one
//!   dedicated script instance so every server API works at the prompt.
//! - **`logging`**: the `log` backend that routes every line through the
//!   console output queue and into `Server.log`.
//! - **`clients`** / **`transport`**: the interfaces of the external
//!   collaborators (connected-client registry, packet sink).
//! - **`config`**: the TOML bootstrap and the process-wide mutable settings
//!   scripts can change at runtime.
//! - **`context`**: the shared wiring handed to every script instance.
//! - **`error`**: the host-level error type.

pub mod clients;
pub mod config;
pub mod console;
pub mod context;
pub mod error;
pub mod logging;
pub mod scripting;
pub mod transport;
