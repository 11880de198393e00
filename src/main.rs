//! commbench-server: serves the registry over raw TCP, HTTP and RPC.
//!
//! Configuration via CLI arguments or TOML file; Ctrl+C shuts every
//! binding down.

use commbench::config::Config;
use commbench::logging;
use commbench::server::Server;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::load()?;

    logging::init(&config.log_level);

    info!(
        socket = %config.socket_listen,
        http = %config.http_listen,
        rpc = %config.rpc_listen,
        rpc_workers = config.rpc_workers,
        buffer_size = config.buffer_size,
        max_connections = ?config.max_connections,
        "Starting commbench server"
    );

    let server = Server::bind(&config)?;
    let shutdown = CancellationToken::new();

    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            return;
        }
        info!("Shutting down");
        signal_token.cancel();
    });

    server.run(shutdown).await?;
    Ok(())
}
