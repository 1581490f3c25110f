//! Custom error types for the server.
//!
//! This module defines the primary error type, `ServerError`, for the host
//! side of the application. Using the `thiserror` crate, it provides a
//! centralized and consistent way to handle the few fallible paths that are
//! allowed to propagate: plugin discovery I/O, configuration parsing, and
//! console/logger setup.
//!
//! Script-side failures are deliberately **not** represented here. Errors
//! never cross the script/host boundary as `Err` values: every boundary call
//! yields either a value or the integer 0, with a logged warning as the side
//! channel (see `scripting::instance`).

use thiserror::Error;

/// Convenience alias for results using the server error type.
pub type ServerResult<T> = std::result::Result<T, ServerError>;

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("Script compile error in {path}: {message}")]
    Compile { path: String, message: String },

    #[error("Logger initialization failed: {0}")]
    Logger(#[from] log::SetLoggerError),

    #[error("Console setup failed: {0}")]
    Console(String),
}
