mod catalog;
mod config;
mod error;
mod ipc;
mod plugin;
mod presence;
mod process;
mod runtime;
mod state;
#[cfg(test)]
mod test_util;
mod watcher;

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

use crate::ipc::DiscordIpc;
use crate::plugin::PluginContext;
use crate::presence::PresenceSession;
use crate::process::SystemSource;
use crate::watcher::Watcher;

#[derive(Parser, Debug)]
#[command(
    name = "winepresence-daemon",
    about = "Mirrors the Wine app you're running as rich presence on a local chat client"
)]
struct Args {
    /// Path to the daemon config file.
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Log level filter; RUST_LOG takes precedence when set.
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(&args.log_level)?;

    info!("winepresence-daemon v{} starting", env!("CARGO_PKG_VERSION"));

    let config = config::Config::load(&args.config)?;
    let catalog = catalog::AppCatalog::load(&config.app_list_path)?;

    let session = Arc::new(PresenceSession::new(DiscordIpc::new(config.app_id.clone())));
    info!("connecting to presence endpoint...");
    if let Err(e) = session.connect().await {
        // The one unrecoverable failure: the user restarts the chat client
        // and relaunches the daemon.
        error!("could not connect to presence endpoint: {e}");
        std::process::exit(1);
    }

    let state = state::shared();
    let ctx = PluginContext {
        state: state.clone(),
        session: session.clone(),
    };
    let _plugins = plugin::spawn_all(&config.plugins, &ctx);

    info!("starting watcher");
    let watcher = Watcher::new(
        catalog,
        SystemSource::new(),
        session,
        state,
        config.poll_interval(),
    );

    // Shutdown is by process termination; no drain is needed.
    tokio::select! {
        _ = watcher.run() => {}
        _ = tokio::signal::ctrl_c() => info!("shutting down"),
    }
    Ok(())
}

fn init_tracing(level: &str) -> Result<()> {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(level))?;
    tracing_subscriber::fmt().with_env_filter(filter).init();
    Ok(())
}
