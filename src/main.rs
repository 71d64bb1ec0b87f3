//! Edge CORS Proxy
//!
//! Single-origin reverse proxy that adds CORS grants to every response.
//! Configuration comes from an optional TOML file plus command-line
//! overrides; logging honours `RUST_LOG`.

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use edge_cors_proxy::lifecycle::{resolve_config, ConfigOverrides, Shutdown};
use edge_cors_proxy::observability::init_logging;
use edge_cors_proxy::HttpServer;

#[derive(Parser)]
#[command(name = "edge-cors-proxy")]
#[command(about = "Single-origin reverse proxy with retries and CORS rewriting", long_about = None)]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to listen on, e.g. 0.0.0.0:8080
    #[arg(short, long)]
    bind: Option<String>,

    /// Upstream origin, e.g. https://api.example.com
    #[arg(short, long)]
    upstream: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = resolve_config(
        cli.config.as_deref(),
        ConfigOverrides {
            bind_address: cli.bind,
            upstream_origin: cli.upstream,
        },
    )?;

    init_logging(&config.observability);

    tracing::info!("edge-cors-proxy v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        upstream = %config.upstream.origin,
        max_attempts = config.retries.max_attempts,
        base_delay_ms = config.retries.base_delay_ms,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let server = HttpServer::new(config)?;
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
