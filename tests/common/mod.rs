// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use chrono::NaiveDate;
use futures_util::future::BoxFuture;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use stride_tracker::config::Config;
use stride_tracker::db::{MemoryStore, RunStore, StoreError};
use stride_tracker::models::{RunRecord, WeeklyGoal};
use stride_tracker::routes::create_router;
use stride_tracker::services::finalizer::{RenderError, SnapshotRequest};
use stride_tracker::services::{MapRenderer, RunFinalizer, RunTracker};
use stride_tracker::time_utils::{Clock, ManualClock};
use stride_tracker::{AppState, Identity};
use tokio::sync::Notify;
use tower::ServiceExt;

/// Wednesday 2026-10-14 12:00 UTC. Midweek in every time zone.
#[allow(dead_code)]
pub const NOW: i64 = 1_791_979_200_000;

#[allow(dead_code)]
pub const WEEK_MILLIS: i64 = 7 * 24 * 3_600_000;

/// Router plus handles on the pieces tests need to drive.
#[allow(dead_code)]
pub struct TestApp {
    pub router: Router,
    pub state: Arc<AppState>,
    pub clock: Arc<ManualClock>,
}

/// Create a test app backed by an in-memory store and no map renderer.
#[allow(dead_code)]
pub fn create_test_app() -> TestApp {
    create_test_app_with(Arc::new(MemoryStore::new()), None)
}

#[allow(dead_code)]
pub fn create_test_app_with(
    store: Arc<dyn RunStore>,
    renderer: Option<Arc<dyn MapRenderer>>,
) -> TestApp {
    let config = Config::test_default();
    let clock = Arc::new(ManualClock::new(NOW));
    let dyn_clock: Arc<dyn Clock> = clock.clone();

    let finalizer = RunFinalizer::new(renderer, config.snapshot_padding_px, dyn_clock.clone());
    let tracker = Arc::new(RunTracker::new(
        finalizer,
        store.clone(),
        Identity::new(config.user_id.clone()),
        dyn_clock.clone(),
    ));

    let state = Arc::new(AppState {
        config,
        store,
        tracker,
        clock: dyn_clock,
    });

    TestApp {
        router: create_router(state.clone()),
        state,
        clock,
    }
}

/// Send a request and decode the JSON response (`Null` for an empty body).
#[allow(dead_code)]
pub async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };

    let response = app
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

#[allow(dead_code)]
pub async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    send(app, Method::GET, uri, None).await
}

#[allow(dead_code)]
pub async fn post(app: &Router, uri: &str) -> (StatusCode, Value) {
    send(app, Method::POST, uri, None).await
}

/// A fix `steps` × 0.0001° north of the origin (about 11.12 m per step).
#[allow(dead_code)]
pub fn fix_json(steps: u32, timestamp_millis: i64) -> Value {
    json!({
        "latitude": 37.0 + f64::from(steps) * 0.0001,
        "longitude": -122.0,
        "timestamp_millis": timestamp_millis,
    })
}

/// Walk north from the origin, one step every two seconds (about 20 km/h).
#[allow(dead_code)]
pub fn walk(steps: u32, start_millis: i64) -> Value {
    let fixes: Vec<Value> = (0..=steps)
        .map(|i| fix_json(i, start_millis + i64::from(i) * 2_000))
        .collect();
    json!({ "fixes": fixes })
}

/// Store whose saves can be switched to fail.
#[derive(Default)]
#[allow(dead_code)]
pub struct FlakyStore {
    pub inner: MemoryStore,
    pub failing: AtomicBool,
}

#[allow(dead_code)]
impl FlakyStore {
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

impl RunStore for FlakyStore {
    fn save_run<'a>(
        &'a self,
        user_id: &'a str,
        run: &'a RunRecord,
    ) -> BoxFuture<'a, Result<RunRecord, StoreError>> {
        if self.failing.load(Ordering::SeqCst) {
            return Box::pin(async { Err::<RunRecord, _>(StoreError::Status(503)) });
        }
        self.inner.save_run(user_id, run)
    }

    fn list_runs<'a>(&'a self, user_id: &'a str) -> BoxFuture<'a, Result<Vec<RunRecord>, StoreError>> {
        self.inner.list_runs(user_id)
    }

    fn delete_run<'a>(&'a self, user_id: &'a str, run_id: u64) -> BoxFuture<'a, Result<bool, StoreError>> {
        self.inner.delete_run(user_id, run_id)
    }

    fn get_goal<'a>(
        &'a self,
        user_id: &'a str,
        week_start: NaiveDate,
    ) -> BoxFuture<'a, Result<Option<WeeklyGoal>, StoreError>> {
        self.inner.get_goal(user_id, week_start)
    }

    fn set_goal<'a>(
        &'a self,
        user_id: &'a str,
        goal: &'a WeeklyGoal,
    ) -> BoxFuture<'a, Result<(), StoreError>> {
        self.inner.set_goal(user_id, goal)
    }
}

/// Renderer that blocks until released, so tests can observe a
/// finalization in flight.
#[derive(Default)]
#[allow(dead_code)]
pub struct GatedRenderer {
    pub started: Notify,
    pub release: Notify,
}

impl MapRenderer for GatedRenderer {
    fn render(&self, request: SnapshotRequest) -> BoxFuture<'_, Result<String, RenderError>> {
        Box::pin(async move {
            self.started.notify_one();
            self.release.notified().await;
            Ok(format!("route-{}-points", request.points.len()))
        })
    }
}

/// Store whose saves block until released, so tests can observe a
/// finished run between finalization and persistence.
#[derive(Default)]
#[allow(dead_code)]
pub struct GatedStore {
    pub inner: MemoryStore,
    pub started: Notify,
    pub release: Notify,
}

impl RunStore for GatedStore {
    fn save_run<'a>(
        &'a self,
        user_id: &'a str,
        run: &'a RunRecord,
    ) -> BoxFuture<'a, Result<RunRecord, StoreError>> {
        Box::pin(async move {
            self.started.notify_one();
            self.release.notified().await;
            self.inner.save_run(user_id, run).await
        })
    }

    fn list_runs<'a>(&'a self, user_id: &'a str) -> BoxFuture<'a, Result<Vec<RunRecord>, StoreError>> {
        self.inner.list_runs(user_id)
    }

    fn delete_run<'a>(&'a self, user_id: &'a str, run_id: u64) -> BoxFuture<'a, Result<bool, StoreError>> {
        self.inner.delete_run(user_id, run_id)
    }

    fn get_goal<'a>(
        &'a self,
        user_id: &'a str,
        week_start: NaiveDate,
    ) -> BoxFuture<'a, Result<Option<WeeklyGoal>, StoreError>> {
        self.inner.get_goal(user_id, week_start)
    }

    fn set_goal<'a>(
        &'a self,
        user_id: &'a str,
        goal: &'a WeeklyGoal,
    ) -> BoxFuture<'a, Result<(), StoreError>> {
        self.inner.set_goal(user_id, goal)
    }
}
