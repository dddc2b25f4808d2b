mod auth;
mod config;
mod controller;
mod logging;
mod model;
mod session;
mod view;

use std::path::PathBuf;
use std::sync::Arc;
use anyhow::{Context, Result};
use clap::Parser;

use auth::SpotifyAuth;
use config::{Config, DEFAULT_CONFIG_FILE};
use controller::{create_router, AppState};
use model::{LibraryCache, SpotifyLibrary};
use session::SessionStore;

/// Browse and manage your saved Spotify episodes, shows and playlists
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Address to listen on, overrides `server.bind`
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = Config::load_or_default(&args.config);
    config.apply_env();
    if let Some(bind) = args.bind {
        config.server.bind = bind;
    }

    // Keep the guard alive so buffered log lines reach the file
    let _log_guard = match logging::init_logging(&config.logging) {
        Ok(guard) => Some(guard),
        Err(e) => {
            eprintln!("Warning: Failed to initialize logging: {}", e);
            None
        }
    };

    tracing::info!("=== Spotify Library Starting ===");
    config.validate()?;

    let cache = LibraryCache::new(config.cache.ttl());
    let state = AppState {
        library: Arc::new(SpotifyLibrary::new(cache)),
        auth: Arc::new(SpotifyAuth::new(&config.spotify)),
        sessions: SessionStore::new(),
    };

    let listener = tokio::net::TcpListener::bind(&config.server.bind)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.bind))?;
    tracing::info!(address = %config.server.bind, "Listening");

    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("=== Spotify Library Stopped ===");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
}
