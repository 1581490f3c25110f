//! Server entry point.
//!
//! Startup order matters here: the console queue and logger come first so
//! everything later can log; then the bootstrap configuration is published
//! into the process-wide settings; then the console (input + output
//! threads) and the plugin engine come up. After that the main thread only
//! hosts the plugin-reload watcher; shutdown happens through the console's
//! `exit` command or the script `exit()` global.

use anyhow::Result;
use clap::Parser;
use convoy::config::{ServerConfig, SETTINGS};
use convoy::console::Console;
use convoy::context::ServerContext;
use convoy::logging::{ConsoleLogger, ConsoleQueue};
use convoy::transport::NullTransport;
use log::{info, warn};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "convoy", about = "Coordination server with an embedded scripting runtime")]
struct Cli {
    /// Bootstrap configuration file.
    #[arg(long, default_value = "ServerConfig.toml")]
    config: PathBuf,

    /// Plugins directory; overrides the configured one.
    #[arg(long)]
    plugins: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let queue = ConsoleQueue::new();
    ConsoleLogger::init(Arc::clone(&queue), PathBuf::from("Server.log"))?;

    let config = ServerConfig::load(&cli.config)?;
    config.apply();

    let ctx = ServerContext::with_console(queue, Arc::new(NullTransport));
    let _console = Console::start(&ctx);

    let plugins_dir = cli.plugins.unwrap_or_else(|| config.plugins.clone());
    if plugins_dir.is_dir() {
        let loaded = ctx.plugins.load_plugins(&plugins_dir, &ctx)?;
        info!("Loaded {loaded} plugin script(s)");
    } else {
        warn!("plugin directory {} not found", plugins_dir.display());
    }

    info!("{} is up and running", SETTINGS.server_name());

    // re-execute plugins whose source changed on disk
    let watcher_ctx = Arc::clone(&ctx);
    std::thread::Builder::new()
        .name("plugin-watch".to_string())
        .spawn(move || loop {
            std::thread::sleep(Duration::from_secs(1));
            watcher_ctx.plugins.poll_reload();
        })?;

    loop {
        std::thread::park();
    }
}
