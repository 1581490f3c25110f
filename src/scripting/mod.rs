//! Embedded operator scripting runtime.

pub(crate) mod api;
pub mod dispatcher;
pub mod engine;
pub mod instance;
pub mod value;
pub mod worker;

pub use dispatcher::{EventScope, AUTH_EVENT};
pub use engine::PluginEngine;
pub use instance::ScriptInstance;
pub use value::{ScriptArgument, ScriptValue};
pub use worker::BackgroundTask;
