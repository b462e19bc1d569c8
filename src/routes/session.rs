// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Live session routes: lifecycle control, location ingest and snapshots.

use crate::error::Result;
use crate::models::{LocationFix, RunRecord};
use crate::services::path_recorder::to_geojson_feature;
use crate::services::run_session::{FixOutcome, SessionSnapshot};
use crate::AppState;
use axum::{
    extract::State,
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    routing::{get, post},
    Json, Router,
};
use futures_util::stream::{self, Stream};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Largest batch of fixes accepted in one request.
const MAX_FIXES_PER_BATCH: usize = 500;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/session", get(get_session))
        .route("/api/session/start", post(start_run))
        .route("/api/session/pause", post(pause_run))
        .route("/api/session/resume", post(resume_run))
        .route("/api/session/stop", post(stop_run))
        .route("/api/session/finish", post(finish_run))
        .route("/api/session/path", get(get_path))
        .route("/api/session/events", get(session_events))
        .route("/api/location", post(ingest_location))
}

// ─── Lifecycle ───────────────────────────────────────────────

async fn get_session(State(state): State<Arc<AppState>>) -> Json<SessionSnapshot> {
    Json(state.tracker.snapshot().await)
}

async fn start_run(State(state): State<Arc<AppState>>) -> Json<SessionSnapshot> {
    Json(state.tracker.start().await)
}

async fn pause_run(State(state): State<Arc<AppState>>) -> Json<SessionSnapshot> {
    Json(state.tracker.pause().await)
}

async fn resume_run(State(state): State<Arc<AppState>>) -> Json<SessionSnapshot> {
    Json(state.tracker.resume().await)
}

/// Abandon the run without saving.
async fn stop_run(State(state): State<Arc<AppState>>) -> Json<SessionSnapshot> {
    Json(state.tracker.stop().await)
}

/// Finalize, save and stop the current run.
async fn finish_run(
    State(state): State<Arc<AppState>>,
) -> Result<(StatusCode, Json<RunRecord>)> {
    let record = state.tracker.complete_run().await?;
    Ok((StatusCode::CREATED, Json(record)))
}

// ─── Route ───────────────────────────────────────────────────

async fn get_path(State(state): State<Arc<AppState>>) -> Json<geojson::Feature> {
    let points = state.tracker.path().await;
    Json(to_geojson_feature(&points))
}

// ─── Location Ingest ─────────────────────────────────────────

#[derive(Deserialize)]
struct LocationBatch {
    fixes: Vec<LocationFix>,
}

#[derive(Serialize, Default)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct LocationIngestResponse {
    pub accepted: u32,
    pub jitter: u32,
    pub marker_only: u32,
    pub discarded: u32,
    pub session: SessionSnapshot,
}

/// Deliver a batch of fixes in order. Each fix is applied atomically.
async fn ingest_location(
    State(state): State<Arc<AppState>>,
    Json(batch): Json<LocationBatch>,
) -> Result<Json<LocationIngestResponse>> {
    if batch.fixes.len() > MAX_FIXES_PER_BATCH {
        return Err(crate::error::AppError::BadRequest(format!(
            "At most {} fixes per request",
            MAX_FIXES_PER_BATCH
        )));
    }

    let mut response = LocationIngestResponse::default();
    for fix in batch.fixes {
        match state.tracker.on_fix(fix).await {
            FixOutcome::Accepted { .. } => response.accepted += 1,
            FixOutcome::Jitter => response.jitter += 1,
            FixOutcome::MarkerOnly => response.marker_only += 1,
            FixOutcome::Discarded => response.discarded += 1,
        }
    }

    tracing::debug!(
        accepted = response.accepted,
        jitter = response.jitter,
        discarded = response.discarded,
        "Location batch applied"
    );

    response.session = state.tracker.snapshot().await;
    Ok(Json(response))
}

// ─── Snapshot Stream ─────────────────────────────────────────

/// Server-sent events carrying session snapshots.
///
/// Sends the current snapshot immediately, then one per change. Closing the
/// connection drops the subscription.
async fn session_events(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = std::result::Result<Event, axum::Error>>> {
    let rx = state.tracker.subscribe();
    tracing::debug!(
        subscribers = state.tracker.subscriber_count(),
        "Snapshot subscriber connected"
    );

    let events = stream::unfold((rx, true), |(mut rx, first)| async move {
        if !first && rx.changed().await.is_err() {
            return None;
        }
        let snapshot = rx.borrow_and_update().clone();
        let event = Event::default().event("snapshot").json_data(&snapshot);
        Some((event, (rx, false)))
    });

    Sse::new(events).keep_alive(KeepAlive::default())
}
