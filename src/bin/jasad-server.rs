// ABOUTME: Server binary for the Jasad fitness API
// ABOUTME: Loads configuration once, opens the stores, and serves the HTTP router until shutdown
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Jasad

//! # Jasad API Server Binary
//!
//! Configuration comes from the environment; `--http-port` and
//! `--database-url` override the corresponding variables.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use jasad::config::ServerConfig;
use jasad::logging;
use jasad::resources::ServerResources;
use jasad::routes;
use tokio::net::TcpListener;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "jasad-server")]
#[command(about = "Jasad fitness API - exercise catalogue and workout plans over HTTP")]
pub struct Args {
    /// Override HTTP port
    #[arg(long)]
    http_port: Option<u16>,

    /// Override database URL
    #[arg(long)]
    database_url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    logging::init_from_env()?;

    let mut config = ServerConfig::from_env()?;
    if let Some(http_port) = args.http_port {
        config.http_port = http_port;
    }
    if let Some(database_url) = args.database_url {
        config.database.url = database_url;
    }
    config.validate()?;

    info!("Starting Jasad API server");
    info!("{}", config.summary());

    let addr = format!("{}:{}", config.host, config.http_port);
    let resources = Arc::new(ServerResources::from_config(config).await?);
    let app = routes::router(&resources);

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("Listening on http://{addr}");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("server error")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
