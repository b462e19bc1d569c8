// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Stride API Server
//!
//! Records live runs from streamed GPS fixes and serves run history,
//! weekly statistics, goals and achievements.

use std::sync::Arc;

use stride_tracker::{
    config::Config,
    db::{MemoryStore, RemoteStore, RunStore},
    services::{HttpMapRenderer, MapRenderer, RunFinalizer, RunTracker},
    time_utils::{Clock, SystemClock},
    AppState, Identity,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging
    init_logging();

    // Load configuration from environment
    let config = Config::from_env().expect("Failed to load configuration");
    tracing::info!(port = config.port, user_id = %config.user_id, "Starting Stride API");

    let store: Arc<dyn RunStore> = match &config.backend_url {
        Some(url) => {
            tracing::info!(backend = %url, "Using REST sync backend");
            Arc::new(RemoteStore::new(url.clone()))
        }
        None => {
            tracing::warn!("BACKEND_URL not set, run history is kept in memory only");
            Arc::new(MemoryStore::new())
        }
    };

    let renderer: Option<Arc<dyn MapRenderer>> = match &config.map_renderer_url {
        Some(url) => {
            tracing::info!(renderer = %url, "Map snapshots enabled");
            Some(Arc::new(HttpMapRenderer::new(url.clone())))
        }
        None => {
            tracing::info!("MAP_RENDERER_URL not set, runs are saved without route images");
            None
        }
    };

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let finalizer = RunFinalizer::new(renderer, config.snapshot_padding_px, clock.clone());
    let tracker = Arc::new(RunTracker::new(
        finalizer,
        store.clone(),
        Identity::new(config.user_id.clone()),
        clock.clone(),
    ));

    // Keep the displayed duration fresh while a run is in progress
    let _ticker = tracker.spawn_ticker(config.tick_interval);

    // Build shared state
    let state = Arc::new(AppState {
        config: config.clone(),
        store,
        tracker,
        clock,
    });

    // Build router
    let app = stride_tracker::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging.
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("stride_tracker=debug".parse().unwrap())
                .add_directive("info".parse().unwrap()),
        )
        .with(format)
        .init();
}
