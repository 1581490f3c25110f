//! Server configuration and process-wide settings.
//!
//! Two layers live here:
//!
//! - [`ServerConfig`]: the TOML bootstrap read once at startup
//!   (`ServerConfig.toml`), deserialized with `serde`.
//! - [`Settings`]: the process-wide mutable settings reachable from scripts
//!   through the `Set` host function. These are plain atomics and locked
//!   strings; the scripting surface is the only writer at runtime and does
//!   not coordinate with readers, so readers may observe slightly stale
//!   values. That is acceptable by design.
//!
//! The global [`SETTINGS`] static is const-constructed so it needs no lazy
//! initialization.

use parking_lot::RwLock;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};

use crate::error::ServerResult;

/// Process-wide mutable settings.
///
/// Key ids used by the `Set` host function:
/// 0 = Debug, 1 = Private, 2 = MaxCars, 3 = MaxPlayers, 4 = MapName,
/// 5 = ServerName, 6 = ServerDesc.
pub struct Settings {
    debug: AtomicBool,
    private: AtomicBool,
    max_cars: AtomicI64,
    max_players: AtomicI64,
    map_name: RwLock<String>,
    server_name: RwLock<String>,
    server_desc: RwLock<String>,
}

/// The single process-wide settings instance.
pub static SETTINGS: Settings = Settings::new();

impl Settings {
    pub const fn new() -> Self {
        Self {
            debug: AtomicBool::new(false),
            private: AtomicBool::new(false),
            max_cars: AtomicI64::new(1),
            max_players: AtomicI64::new(10),
            map_name: RwLock::new(String::new()),
            server_name: RwLock::new(String::new()),
            server_desc: RwLock::new(String::new()),
        }
    }

    pub fn debug(&self) -> bool {
        self.debug.load(Ordering::Relaxed)
    }

    pub fn set_debug(&self, on: bool) {
        self.debug.store(on, Ordering::Relaxed);
    }

    pub fn private(&self) -> bool {
        self.private.load(Ordering::Relaxed)
    }

    pub fn set_private(&self, on: bool) {
        self.private.store(on, Ordering::Relaxed);
    }

    pub fn max_cars(&self) -> i64 {
        self.max_cars.load(Ordering::Relaxed)
    }

    pub fn set_max_cars(&self, n: i64) {
        self.max_cars.store(n, Ordering::Relaxed);
    }

    pub fn max_players(&self) -> i64 {
        self.max_players.load(Ordering::Relaxed)
    }

    pub fn set_max_players(&self, n: i64) {
        self.max_players.store(n, Ordering::Relaxed);
    }

    pub fn map_name(&self) -> String {
        self.map_name.read().clone()
    }

    pub fn set_map_name(&self, name: &str) {
        *self.map_name.write() = name.to_string();
    }

    pub fn server_name(&self) -> String {
        self.server_name.read().clone()
    }

    pub fn set_server_name(&self, name: &str) {
        *self.server_name.write() = name.to_string();
    }

    pub fn server_desc(&self) -> String {
        self.server_desc.read().clone()
    }

    pub fn set_server_desc(&self, desc: &str) {
        *self.server_desc.write() = desc.to_string();
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::new()
    }
}

/// Startup configuration loaded from `ServerConfig.toml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub debug: bool,
    pub private: bool,
    pub max_cars: i64,
    pub max_players: i64,
    pub map: String,
    pub name: String,
    pub description: String,
    /// Directory scanned for plugins (one subdirectory per plugin).
    pub plugins: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            debug: false,
            private: false,
            max_cars: 1,
            max_players: 10,
            map: "/levels/gridmap/info.json".to_string(),
            name: "Convoy Server".to_string(),
            description: String::new(),
            plugins: PathBuf::from("plugins"),
        }
    }
}

impl ServerConfig {
    /// Load the configuration file, falling back to defaults when the file
    /// does not exist.
    pub fn load(path: &Path) -> ServerResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&raw)?)
    }

    /// Publish the bootstrap values into the process-wide [`SETTINGS`].
    pub fn apply(&self) {
        SETTINGS.set_debug(self.debug);
        SETTINGS.set_private(self.private);
        SETTINGS.set_max_cars(self.max_cars);
        SETTINGS.set_max_players(self.max_players);
        SETTINGS.set_map_name(&self.map);
        SETTINGS.set_server_name(&self.name);
        SETTINGS.set_server_desc(&self.description);
    }
}
