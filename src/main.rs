//! bids - chat and auction server
//!
//! Authenticated users chat, open timed auctions and bid on them over a
//! newline-delimited text protocol.

use bids_server::{Config, Server, ServerConfig};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "bids")]
#[command(about = "Chat and auction server")]
#[command(version)]
struct Args {
    /// Port to listen on (overrides the configured bind port)
    port: Option<u16>,

    /// YAML configuration file (defaults to $BIDS_CONFIG)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    // Explicit file first, then BIDS_CONFIG, then defaults; env overrides last
    let loaded = match &args.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    };
    let mut config = match loaded {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("Failed to load config: {}", e);
            return Err(e.into());
        }
    };

    if let Some(port) = args.port {
        config.network.bind_addr.set_port(port);
    }

    tracing::info!("Starting bids server");
    tracing::info!("  Bind address: {}", config.network.bind_addr);
    tracing::info!("  Max connections: {}", config.network.max_connections);
    tracing::info!(
        "  Keepalive: every {}ms, evict after {} missed",
        config.keepalive.ping_interval_ms,
        config.keepalive.max_missed
    );

    let server = Arc::new(Server::new(ServerConfig::from_config(&config)));

    // Spawn shutdown signal handler
    let shutdown_server = server.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        tracing::info!("Received shutdown signal, stopping server...");
        shutdown_server.shutdown();
    });

    // Run server (blocks until shutdown)
    server.run().await?;

    tracing::info!("Server stopped");
    Ok(())
}
