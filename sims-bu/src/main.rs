//! Bulk Upload (sims-bu) - Main entry point
//!
//! Holds draft rows for class entitlement and student issue uploads,
//! consolidates duplicates, and forwards batches to the inventory service.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use sims_common::config::{load_config, resolve_config_path};
use sims_common::events::EventBus;
use sims_common::submit::SubmissionEmitter;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sims_bu::api::buildinfo::BuildInfo;
use sims_bu::upstream::RestBulkUpsert;
use sims_bu::{build_router, AppState};

/// Command-line arguments for sims-bu
#[derive(Parser, Debug)]
#[command(name = "sims-bu")]
#[command(about = "Bulk upload microservice for SIMS inventory")]
#[command(version)]
struct Args {
    /// Path to TOML config file
    #[arg(short, long, env = "SIMS_CONFIG")]
    config: Option<PathBuf>,

    /// Port to listen on (overrides config)
    #[arg(short, long, env = "SIMS_BU_PORT")]
    port: Option<u16>,

    /// Address to bind (overrides config)
    #[arg(long)]
    host: Option<String>,

    /// Inventory service base URL (overrides config)
    #[arg(long, env = "SIMS_UPSTREAM_URL")]
    upstream_url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = load_config(args.config.as_deref()).context("Failed to load configuration")?;

    // Initialize tracing; RUST_LOG wins over the configured level
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!(
                    "sims_bu={level},sims_common={level},tower_http={level}",
                    level = config.logging.level
                )
                .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let build = BuildInfo::CURRENT;
    info!(
        "Starting SIMS Bulk Upload ({}) v{} [{}] built {} ({})",
        build.module, build.version, build.git_hash, build.build_timestamp, build.build_profile
    );

    match resolve_config_path(args.config.as_deref()) {
        Some(path) if path.exists() => info!("Config file: {}", path.display()),
        Some(path) => warn!("Config file {} not found, using defaults", path.display()),
        None => info!("No config file, using defaults"),
    }

    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(host) = args.host {
        config.host = host;
    }
    if let Some(url) = args.upstream_url {
        config.upstream.base_url = url;
    }
    config.validate().context("Invalid configuration")?;

    info!("Upstream: {}", config.upstream.base_url);
    info!("Key encoding: {}", config.consolidation.key_encoding);

    let upstream = RestBulkUpsert::new(config.upstream.clone())
        .context("Failed to build upstream client")?;
    let event_bus = EventBus::new(config.event_capacity);
    let emitter = SubmissionEmitter::new(
        Arc::new(upstream),
        event_bus,
        config.consolidation.key_encoding,
    );

    let app = build_router(AppState::new(emitter));

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .context("Invalid listen address")?;

    info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
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
                warn!("Failed to install SIGTERM handler: {}", e);
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
}
