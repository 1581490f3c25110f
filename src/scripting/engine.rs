//! Process-wide registry of loaded script instances.
//!
//! The engine owns every plugin instance and hands ordered snapshots to the
//! event dispatcher. The interactive console's instance is deliberately not
//! part of the set: it is addressable through the console subsystem but
//! excluded from broadcast dispatch.
//!
//! Plugin discovery: each subdirectory of the plugins directory is one
//! plugin (its name becomes the `plugin_name`), and every `*.rhai` file in
//! it becomes one instance. Directories and files are visited in sorted
//! order so the dispatch order is reproducible across runs.

use parking_lot::RwLock;
use std::path::Path;
use std::sync::Arc;

use crate::context::ServerContext;
use crate::error::ServerResult;
use crate::scripting::dispatcher::{self, EventScope};
use crate::scripting::instance::ScriptInstance;
use crate::scripting::value::{ScriptArgument, ScriptValue};

#[derive(Default)]
pub struct PluginEngine {
    instances: RwLock<Vec<Arc<ScriptInstance>>>,
}

impl PluginEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, instance: Arc<ScriptInstance>) {
        self.instances.write().push(instance);
    }

    pub fn len(&self) -> usize {
        self.instances.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.read().is_empty()
    }

    /// Instances in load order. Iteration order is stable between mutations.
    pub fn snapshot(&self) -> Vec<Arc<ScriptInstance>> {
        self.instances.read().clone()
    }

    /// Server-side dispatch entry point (global scope, no caller).
    pub fn dispatch(&self, event: &str, args: &[ScriptArgument], wait: bool) -> ScriptValue {
        self.dispatch_from(event, EventScope::Global, None, args, wait)
    }

    /// Dispatch on behalf of a specific caller (used by the trigger globals).
    pub fn dispatch_from(
        &self,
        event: &str,
        scope: EventScope,
        caller_plugin: Option<&str>,
        args: &[ScriptArgument],
        wait: bool,
    ) -> ScriptValue {
        dispatcher::dispatch(&self.snapshot(), event, scope, caller_plugin, args, wait)
    }

    /// Scan the plugins directory and load every script found. Returns the
    /// number of instances created. Individual script failures are logged by
    /// the instances themselves and do not abort the scan.
    pub fn load_plugins(&self, dir: &Path, ctx: &Arc<ServerContext>) -> ServerResult<usize> {
        let mut plugin_dirs: Vec<_> = std::fs::read_dir(dir)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_dir())
            .collect();
        plugin_dirs.sort();

        let mut loaded = 0;
        for plugin_dir in plugin_dirs {
            let plugin_name = plugin_dir
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();
            let mut scripts: Vec<_> = std::fs::read_dir(&plugin_dir)?
                .filter_map(|entry| entry.ok())
                .map(|entry| entry.path())
                .filter(|path| path.extension().is_some_and(|ext| ext == "rhai"))
                .collect();
            scripts.sort();
            for script in scripts {
                log::info!("Loading plugin script {}", script.display());
                self.add(ScriptInstance::new(plugin_name.clone(), script, ctx));
                loaded += 1;
            }
        }
        Ok(loaded)
    }

    /// Reload every instance whose source file changed on disk since it was
    /// last executed. Driven by the watcher thread in the binary.
    pub fn poll_reload(&self) {
        for instance in self.snapshot() {
            if instance.source_modified() {
                log::info!("Reloading {}", instance.origin());
                instance.reload();
            }
        }
    }
}
