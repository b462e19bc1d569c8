// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Turns a finished session into an immutable [`RunRecord`].
//!
//! Handles:
//! - Average speed from banked duration and distance
//! - Route snapshot via the external map renderer (best effort)
//! - Single-flight guarding so one run cannot be finalized twice at once

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures_util::future::BoxFuture;
use geo::BoundingRect;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::{PathPoint, RunRecord};
use crate::services::path_recorder::to_line_string;
use crate::services::run_session::RunTotals;
use crate::time_utils::Clock;

/// Request for a bounding-box render of a route.
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotRequest {
    pub points: Vec<PathPoint>,
    /// Padding around the route bounds, in pixels
    pub padding_px: u32,
}

impl SnapshotRequest {
    /// Route encoded as a precision-5 polyline.
    pub fn encoded_polyline(&self) -> std::result::Result<String, RenderError> {
        polyline::encode_coordinates(to_line_string(&self.points), 5)
            .map_err(|e| RenderError::Encoding(e.to_string()))
    }

    /// `[min_lon, min_lat, max_lon, max_lat]` of the route.
    pub fn bounding_box(&self) -> Option<[f64; 4]> {
        to_line_string(&self.points)
            .bounding_rect()
            .map(|r| [r.min().x, r.min().y, r.max().x, r.max().y])
    }
}

/// External service that draws a route and returns an opaque image reference.
pub trait MapRenderer: Send + Sync {
    fn render(&self, request: SnapshotRequest) -> BoxFuture<'_, std::result::Result<String, RenderError>>;
}

/// Errors from the map renderer. Never fatal to finalization.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("Failed to encode route: {0}")]
    Encoding(String),

    #[error("Renderer request failed: {0}")]
    Request(String),

    #[error("Renderer returned status {0}")]
    Status(u16),
}

/// Map renderer reached over HTTP.
#[derive(Clone)]
pub struct HttpMapRenderer {
    http: reqwest::Client,
    url: String,
}

#[derive(Serialize)]
struct RenderBody<'a> {
    polyline: &'a str,
    bbox: Option<[f64; 4]>,
    padding: u32,
}

#[derive(Deserialize)]
struct RenderResponse {
    image_ref: String,
}

impl HttpMapRenderer {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            url: url.into(),
        }
    }

    async fn render_inner(&self, request: SnapshotRequest) -> std::result::Result<String, RenderError> {
        let encoded = request.encoded_polyline()?;
        let body = RenderBody {
            polyline: &encoded,
            bbox: request.bounding_box(),
            padding: request.padding_px,
        };

        let response = self
            .http
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| RenderError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RenderError::Status(status.as_u16()));
        }

        let parsed: RenderResponse = response
            .json()
            .await
            .map_err(|e| RenderError::Request(e.to_string()))?;
        Ok(parsed.image_ref)
    }
}

impl MapRenderer for HttpMapRenderer {
    fn render(&self, request: SnapshotRequest) -> BoxFuture<'_, std::result::Result<String, RenderError>> {
        Box::pin(self.render_inner(request))
    }
}

/// Produces run records, one at a time.
pub struct RunFinalizer {
    renderer: Option<Arc<dyn MapRenderer>>,
    padding_px: u32,
    clock: Arc<dyn Clock>,
    is_finalizing: AtomicBool,
}

/// Clears the in-flight flag on drop, including when the future is cancelled.
struct FinalizeGuard<'a>(&'a AtomicBool);

impl Drop for FinalizeGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl RunFinalizer {
    pub fn new(
        renderer: Option<Arc<dyn MapRenderer>>,
        padding_px: u32,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            renderer,
            padding_px,
            clock,
            is_finalizing: AtomicBool::new(false),
        }
    }

    pub fn is_finalizing(&self) -> bool {
        self.is_finalizing.load(Ordering::Acquire)
    }

    /// Build the record for a finished run.
    ///
    /// Returns [`AppError::FinalizationInProgress`] if another call is still running.
    /// Renderer failure yields a record without an image.
    pub async fn finalize(&self, totals: RunTotals) -> Result<RunRecord> {
        let _guard = self.begin()?;

        tracing::info!(
            run_number = totals.run_number,
            distance_km = totals.distance_km,
            duration_millis = totals.duration_millis,
            points = totals.path.len(),
            "Finalizing run"
        );

        let image_ref = self.render_snapshot(totals.path).await;
        let record = RunRecord::new(
            self.clock.now_millis(),
            totals.duration_millis,
            totals.distance_km,
            image_ref,
        );

        tracing::info!(
            avg_speed_kmh = record.avg_speed_kmh,
            calories = record.calories_burned,
            has_image = record.image_ref.is_some(),
            "Run finalized"
        );
        Ok(record)
    }

    fn begin(&self) -> Result<FinalizeGuard<'_>> {
        self.is_finalizing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| AppError::FinalizationInProgress)?;
        Ok(FinalizeGuard(&self.is_finalizing))
    }

    async fn render_snapshot(&self, points: Vec<PathPoint>) -> Option<String> {
        if points.is_empty() {
            return None;
        }
        let renderer = self.renderer.as_ref()?;

        let request = SnapshotRequest {
            points,
            padding_px: self.padding_px,
        };
        match renderer.render(request).await {
            Ok(image_ref) => Some(image_ref),
            Err(e) => {
                tracing::warn!(error = %e, "Route snapshot failed, saving run without image");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time_utils::ManualClock;
    use std::sync::atomic::AtomicUsize;
    use tokio::sync::Notify;

    struct FixedRenderer {
        calls: AtomicUsize,
        result: std::result::Result<&'static str, u16>,
    }

    impl MapRenderer for FixedRenderer {
        fn render(&self, _request: SnapshotRequest) -> BoxFuture<'_, std::result::Result<String, RenderError>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let result = self
                .result
                .map(str::to_string)
                .map_err(RenderError::Status);
            Box::pin(async move { result })
        }
    }

    /// Blocks until released.
    struct GatedRenderer {
        gate: Arc<Notify>,
    }

    impl MapRenderer for GatedRenderer {
        fn render(&self, _request: SnapshotRequest) -> BoxFuture<'_, std::result::Result<String, RenderError>> {
            let gate = self.gate.clone();
            Box::pin(async move {
                gate.notified().await;
                Ok("gated.png".to_string())
            })
        }
    }

    fn pt(lat: f64, lon: f64) -> PathPoint {
        PathPoint {
            latitude: lat,
            longitude: lon,
        }
    }

    fn totals(path: Vec<PathPoint>) -> RunTotals {
        RunTotals {
            run_number: 1,
            duration_millis: 30 * 60_000,
            distance_km: 5.0,
            path,
        }
    }

    #[tokio::test]
    async fn test_finalize_with_image() {
        let renderer = Arc::new(FixedRenderer {
            calls: AtomicUsize::new(0),
            result: Ok("runs/1.png"),
        });
        let clock = Arc::new(ManualClock::new(42_000));
        let finalizer = RunFinalizer::new(Some(renderer.clone()), 100, clock);

        let record = finalizer
            .finalize(totals(vec![pt(37.0, -122.0), pt(37.01, -122.0)]))
            .await
            .unwrap();

        assert_eq!(record.timestamp_millis, 42_000);
        assert_eq!(record.image_ref.as_deref(), Some("runs/1.png"));
        assert!((record.avg_speed_kmh - 10.0).abs() < 1e-9);
        assert_eq!(record.calories_burned, 350);
        assert_eq!(record.id, None);
        assert_eq!(renderer.calls.load(Ordering::SeqCst), 1);
        assert!(!finalizer.is_finalizing());
    }

    #[tokio::test]
    async fn test_empty_path_skips_renderer() {
        let renderer = Arc::new(FixedRenderer {
            calls: AtomicUsize::new(0),
            result: Ok("unused"),
        });
        let finalizer =
            RunFinalizer::new(Some(renderer.clone()), 100, Arc::new(ManualClock::new(0)));

        let record = finalizer.finalize(totals(vec![])).await.unwrap();
        assert!(record.image_ref.is_none());
        assert_eq!(renderer.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_renderer_failure_is_not_fatal() {
        let renderer = Arc::new(FixedRenderer {
            calls: AtomicUsize::new(0),
            result: Err(503),
        });
        let finalizer = RunFinalizer::new(Some(renderer), 100, Arc::new(ManualClock::new(0)));

        let record = finalizer
            .finalize(totals(vec![pt(37.0, -122.0)]))
            .await
            .unwrap();
        assert!(record.image_ref.is_none());
        assert_eq!(record.distance_km, 5.0);
    }

    #[tokio::test]
    async fn test_missing_renderer() {
        let finalizer = RunFinalizer::new(None, 100, Arc::new(ManualClock::new(0)));
        let record = finalizer
            .finalize(totals(vec![pt(37.0, -122.0)]))
            .await
            .unwrap();
        assert!(record.image_ref.is_none());
    }

    #[tokio::test]
    async fn test_concurrent_finalize_rejected() {
        let gate = Arc::new(Notify::new());
        let finalizer = Arc::new(RunFinalizer::new(
            Some(Arc::new(GatedRenderer { gate: gate.clone() })),
            100,
            Arc::new(ManualClock::new(0)),
        ));

        let first = {
            let finalizer = finalizer.clone();
            tokio::spawn(async move { finalizer.finalize(totals(vec![pt(37.0, -122.0)])).await })
        };

        while !finalizer.is_finalizing() {
            tokio::task::yield_now().await;
        }

        let second = finalizer.finalize(totals(vec![pt(37.0, -122.0)])).await;
        assert!(matches!(second, Err(AppError::FinalizationInProgress)));

        gate.notify_one();
        let record = first.await.unwrap().unwrap();
        assert_eq!(record.image_ref.as_deref(), Some("gated.png"));
        assert!(!finalizer.is_finalizing());
    }

    #[tokio::test]
    async fn test_cancelled_finalize_releases_flag() {
        let gate = Arc::new(Notify::new());
        let finalizer = RunFinalizer::new(
            Some(Arc::new(GatedRenderer { gate })),
            100,
            Arc::new(ManualClock::new(0)),
        );

        let pending = finalizer.finalize(totals(vec![pt(37.0, -122.0)]));
        let timed_out =
            tokio::time::timeout(std::time::Duration::from_millis(10), pending).await;
        assert!(timed_out.is_err());
        assert!(!finalizer.is_finalizing());
    }

    #[test]
    fn test_snapshot_request_encoding() {
        let request = SnapshotRequest {
            points: vec![pt(38.5, -120.2), pt(40.7, -120.95), pt(43.252, -126.453)],
            padding_px: 100,
        };
        assert_eq!(
            request.encoded_polyline().unwrap(),
            "_p~iF~ps|U_ulLnnqC_mqNvxq`@"
        );
        assert_eq!(
            request.bounding_box(),
            Some([-126.453, 38.5, -120.2, 43.252])
        );
    }
}
