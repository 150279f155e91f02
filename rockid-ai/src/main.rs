//! rockid-ai - Rock Classification Service
//!
//! Fans each uploaded image out to every configured AI vision provider and
//! returns one reconciled classification.
//!
//! Endpoints: `POST /api/identify`, `POST /api/chat`, `GET /health`.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use rockid_ai::{build_router, config, AppState};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for rockid-ai
#[derive(Parser, Debug)]
#[command(name = "rockid-ai")]
#[command(about = "Multi-provider AI rock classification service")]
#[command(version)]
struct Args {
    /// Path to config.toml (overrides ROCKID_CONFIG)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to bind (overrides [server].host)
    #[arg(long, env = "ROCKID_HOST")]
    host: Option<String>,

    /// Port to listen on (overrides [server].port)
    #[arg(short, long, env = "ROCKID_PORT")]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let loaded = rockid_common::config::load_config(args.config.as_deref())
        .context("Failed to load configuration")?;
    let toml_config = loaded.config;

    // RUST_LOG wins over the configured level
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| toml_config.logging.level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting rockid-ai v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "Build: {} ({}, {})",
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );
    match &loaded.source {
        Some(path) => info!("Configuration loaded from {}", path.display()),
        None => info!("No configuration file found, using defaults"),
    }

    let adapters = config::build_adapters(&toml_config);
    if adapters.is_empty() {
        warn!("No providers have API keys; every identify request will return the fallback record");
    } else {
        info!("{} provider(s) enabled", adapters.len());
    }

    let components = config::build_components(&toml_config, adapters);
    let shutdown = CancellationToken::new();
    let state = AppState::new(components.pipeline, components.chat)
        .with_max_body_bytes(toml_config.server.max_body_bytes)
        .with_shutdown(shutdown.clone());

    let app = build_router(state);

    let host = args.host.unwrap_or(toml_config.server.host);
    let port = args.port.unwrap_or(toml_config.server.port);
    let listener = tokio::net::TcpListener::bind((host.as_str(), port))
        .await
        .with_context(|| format!("Failed to bind to {}:{}", host, port))?;
    let addr: SocketAddr = listener.local_addr().context("Failed to read bound address")?;
    info!("Listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown))
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM, then cancel in-flight provider calls
async fn shutdown_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }

    shutdown.cancel();
}
