//! Shared server state handed to every script instance.

use std::sync::Arc;

use crate::clients::ClientRegistry;
use crate::logging::ConsoleQueue;
use crate::scripting::engine::PluginEngine;
use crate::transport::Transport;

/// Collaborators reachable from the scripting surface.
///
/// One `ServerContext` exists per server process (tests build their own).
/// Host API closures capture it by `Arc`; the context therefore lives as
/// long as any script instance created from it.
pub struct ServerContext {
    pub clients: ClientRegistry,
    pub transport: Arc<dyn Transport>,
    pub plugins: PluginEngine,
    pub console: Arc<ConsoleQueue>,
}

impl ServerContext {
    pub fn new(transport: Arc<dyn Transport>) -> Arc<Self> {
        Self::with_console(ConsoleQueue::new(), transport)
    }

    /// Build a context around an existing console queue (the binary creates
    /// the queue first so the logger can be installed before anything else).
    pub fn with_console(console: Arc<ConsoleQueue>, transport: Arc<dyn Transport>) -> Arc<Self> {
        Arc::new(Self {
            clients: ClientRegistry::new(),
            transport,
            plugins: PluginEngine::new(),
            console,
        })
    }
}
