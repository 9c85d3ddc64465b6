//! Content-Rewriting Web Proxy
//!
//! An HTTP forward proxy that fetches a target URL on the caller's
//! behalf, rewrites embedded references so subsequent navigation also
//! flows through the proxy, and relays the transformed response.
//!
//! # Architecture Overview
//!
//! ```text
//!                   ┌────────────────────────────────────────────────────┐
//!                   │                 REWRITE PROXY                      │
//!                   │                                                    │
//!   Client Request  │  ┌────────┐   ┌──────────┐   ┌──────────────┐     │
//!   ────────────────┼─▶│  http  │──▶│ resolver │──▶│   upstream   │─────┼──▶ Origin
//!                   │  │ server │   │(explicit/│   │  (reqwest,   │     │    Server
//!                   │  └────────┘   │ referer) │   │   retries)   │     │
//!                   │               └──────────┘   └──────┬───────┘     │
//!                   │                                     │             │
//!                   │                                     ▼             │
//!   Client Response │  ┌──────────┐   ┌─────────────────────────┐       │
//!   ◀───────────────┼──│ response │◀──│  rewrite (html/css/js,  │◀──────┼──── Origin
//!                   │  │ assemble │   │  shim, base tag)        │       │    Response
//!                   │  └──────────┘   └─────────────────────────┘       │
//!                   │                                                    │
//!                   │  Cross-cutting: config · observability · lifecycle │
//!                   └────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use rewrite_proxy::config::loader::{load_config, ConfigError};
use rewrite_proxy::config::validation::validate_config;
use rewrite_proxy::{HttpServer, ProxyConfig, Shutdown};

#[derive(Parser)]
#[command(name = "rewrite-proxy")]
#[command(about = "Content-rewriting web proxy", version)]
struct Args {
    /// Path to a TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the listener bind address (e.g., 127.0.0.1:3000).
    #[arg(short, long)]
    listen: Option<String>,

    /// Override the log level.
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => ProxyConfig::default(),
    };
    if let Some(listen) = args.listen {
        config.listener.bind_address = listen;
    }
    if let Some(level) = args.log_level {
        config.observability.log_level = level;
    }
    if let Err(errors) = validate_config(&config) {
        return Err(Box::new(ConfigError::Validation(errors)) as Box<dyn std::error::Error>);
    }

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!(
                    "rewrite_proxy={},tower_http=info",
                    config.observability.log_level
                )
                .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "rewrite-proxy starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        prefixes = ?config.engine.prefixes,
        request_timeout_secs = config.upstream.request_timeout_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => rewrite_proxy::observability::metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let signal = shutdown.subscribe();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Shutdown signal received");
        }
        shutdown.trigger();
    });

    let server = HttpServer::new(config)?;
    server.run(listener, signal).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
