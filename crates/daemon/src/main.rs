//! optimusctl — control daemon for the Optimus-OS process VM.
//!
//! Compiles C-subset sources, spawns and supervises cooperative
//! processes, and exposes both a REST API and a WebSocket event stream
//! (log lines interleaved with process lifecycle events).
//!
//! Default bind: 127.0.0.1:8872 (override via `OPTIMUSCTL_BIND`)
//! WebSocket: /events
//! REST API: /api/v1/*

mod api;
mod config;
mod events;
mod supervisor;
mod tracing_layer;

use anyhow::Result;
use std::sync::Arc;
use supervisor::Supervisor;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let supervisor = Arc::new(Supervisor::new(config::RunConfig::default()));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(true).with_thread_names(true))
        .with(tracing_layer::EventStreamLayer::new(supervisor.events.clone()))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,optimusctl=debug")))
        .init();

    info!("Starting optimusctl");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let bind_addr = config::bind_addr()?;
    info!("Binding to {}", bind_addr);

    tokio::spawn(Arc::clone(&supervisor).run_scheduler());

    let app = api::create_router(supervisor);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;

    info!("optimusctl listening on http://{}", bind_addr);
    info!("WebSocket events: ws://{}/events", bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
