// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Live run tracking service.
//!
//! Wraps the [`RunSession`] state machine so that:
//! 1. Each fix delivery is applied atomically under one lock
//! 2. Every state change is published to subscribers as a snapshot
//! 3. A cooperative ticker refreshes the displayed duration while running
//! 4. Finishing a run finalizes, persists, then stops, without blocking fixes

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;

use crate::db::RunStore;
use crate::error::{AppError, Result};
use crate::models::{LocationFix, PathPoint, RunRecord};
use crate::services::finalizer::RunFinalizer;
use crate::services::run_session::{FixOutcome, RunSession, RunState, SessionSnapshot};
use crate::time_utils::Clock;
use crate::Identity;

/// Most finalized-but-unsaved runs kept for retry; the oldest is dropped beyond this.
pub const MAX_UNSAVED_RUNS: usize = 50;

pub struct RunTracker {
    session: Mutex<RunSession>,
    snapshots: watch::Sender<SessionSnapshot>,
    finalizer: RunFinalizer,
    store: Arc<dyn RunStore>,
    identity: Identity,
    clock: Arc<dyn Clock>,
    /// Finalized runs whose save failed, oldest first
    unsaved: Mutex<Vec<RunRecord>>,
    /// Set from the start of `complete_run` until its run is stopped
    finishing: AtomicBool,
}

/// Releases the finishing claim on drop, including on cancellation.
struct FinishGuard<'a>(&'a AtomicBool);

impl Drop for FinishGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl RunTracker {
    pub fn new(
        finalizer: RunFinalizer,
        store: Arc<dyn RunStore>,
        identity: Identity,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let (snapshots, _) = watch::channel(SessionSnapshot::default());
        Self {
            session: Mutex::new(RunSession::new()),
            snapshots,
            finalizer,
            store,
            identity,
            clock,
            unsaved: Mutex::new(Vec::new()),
            finishing: AtomicBool::new(false),
        }
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// Subscribe to session snapshots. Drop the receiver to unsubscribe.
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshots.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.snapshots.receiver_count()
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        let session = self.session.lock().await;
        session.snapshot(self.clock.now_millis())
    }

    pub async fn path(&self) -> Vec<PathPoint> {
        self.session.lock().await.path().snapshot()
    }

    pub async fn start(&self) -> SessionSnapshot {
        self.transition("start", |s, now| s.start(now)).await
    }

    pub async fn pause(&self) -> SessionSnapshot {
        self.transition("pause", |s, now| s.pause(now)).await
    }

    pub async fn resume(&self) -> SessionSnapshot {
        self.transition("resume", |s, now| s.resume(now)).await
    }

    /// Discard the current run without saving it.
    pub async fn stop(&self) -> SessionSnapshot {
        self.transition("stop", |s, _| s.stop()).await
    }

    async fn transition<F>(&self, action: &'static str, apply: F) -> SessionSnapshot
    where
        F: FnOnce(&mut RunSession, i64) -> bool,
    {
        let mut session = self.session.lock().await;
        let now = self.clock.now_millis();
        if apply(&mut session, now) {
            tracing::info!(
                action,
                run_number = session.run_number(),
                state = ?session.state(),
                "Run state changed"
            );
        } else {
            tracing::debug!(action, state = ?session.state(), "Ignoring illegal transition");
        }
        self.publish(&session, now)
    }

    /// Deliver one fix from the location provider.
    pub async fn on_fix(&self, fix: LocationFix) -> FixOutcome {
        let mut session = self.session.lock().await;
        let now = self.clock.now_millis();
        let outcome = session.on_fix(fix, now);

        match outcome {
            FixOutcome::Discarded | FixOutcome::Jitter => {}
            FixOutcome::MarkerOnly | FixOutcome::Accepted { .. } => {
                self.publish(&session, now);
            }
        }
        outcome
    }

    /// Refresh the displayed duration. Never banks elapsed time.
    pub async fn tick(&self) {
        let session = self.session.lock().await;
        if session.state() == RunState::Running {
            self.publish(&session, self.clock.now_millis());
        }
    }

    /// Run [`tick`](Self::tick) every `period` until the tracker is dropped
    /// or the returned handle is aborted.
    pub fn spawn_ticker(self: &Arc<Self>, period: Duration) -> JoinHandle<()> {
        let weak: Weak<Self> = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                let Some(tracker) = weak.upgrade() else {
                    break;
                };
                tracker.tick().await;
            }
        })
    }

    /// Produce the record for the run in progress without stopping it.
    pub async fn finalize(&self) -> Result<RunRecord> {
        let totals = {
            let session = self.session.lock().await;
            if session.state() == RunState::Ready {
                return Err(AppError::NoActiveRun);
            }
            session.totals(self.clock.now_millis())
        };
        self.finalizer.finalize(totals).await
    }

    /// Finalize, persist, then stop the run.
    ///
    /// Only one call runs at a time across all three steps; a concurrent call
    /// gets [`AppError::FinalizationInProgress`]. The session is stopped even if
    /// the save fails; the record is then queued for
    /// [`retry_unsaved`](Self::retry_unsaved) and the error returned.
    pub async fn complete_run(&self) -> Result<RunRecord> {
        self.finishing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| AppError::FinalizationInProgress)?;
        let _guard = FinishGuard(&self.finishing);

        let (totals, run_number) = {
            let session = self.session.lock().await;
            if session.state() == RunState::Ready {
                return Err(AppError::NoActiveRun);
            }
            (session.totals(self.clock.now_millis()), session.run_number())
        };

        let record = self.finalizer.finalize(totals).await?;
        let saved = self.store.save_run(&self.identity.user_id, &record).await;

        self.stop_if_current(run_number).await;

        match saved {
            Ok(stored) => {
                tracing::info!(run_id = ?stored.id, "Run saved");
                Ok(stored)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to save run, keeping it for retry");
                self.queue_unsaved(record).await;
                Err(e.into())
            }
        }
    }

    /// Only stop the session instance that was finalized.
    async fn stop_if_current(&self, run_number: u64) {
        let mut session = self.session.lock().await;
        if session.run_number() != run_number {
            tracing::warn!(
                finalized = run_number,
                current = session.run_number(),
                "A newer run started during finalization, leaving it running"
            );
            return;
        }
        if session.stop() {
            tracing::info!(run_number, "Run stopped after finalization");
        }
        self.publish(&session, self.clock.now_millis());
    }

    async fn queue_unsaved(&self, record: RunRecord) {
        let mut unsaved = self.unsaved.lock().await;
        unsaved.push(record);
        if unsaved.len() > MAX_UNSAVED_RUNS {
            let dropped = unsaved.remove(0);
            tracing::warn!(
                timestamp_millis = dropped.timestamp_millis,
                distance_km = dropped.distance_km,
                "Unsaved run queue full, dropping oldest run"
            );
        }
    }

    pub async fn unsaved_runs(&self) -> Vec<RunRecord> {
        self.unsaved.lock().await.clone()
    }

    /// Re-submit runs whose save previously failed.
    ///
    /// Returns the runs stored this time; failures stay queued.
    pub async fn retry_unsaved(&self) -> Result<Vec<RunRecord>> {
        let pending = std::mem::take(&mut *self.unsaved.lock().await);
        let mut stored = Vec::with_capacity(pending.len());
        let mut still_pending = Vec::new();
        let mut last_error = None;

        for record in pending {
            match self.store.save_run(&self.identity.user_id, &record).await {
                Ok(saved) => stored.push(saved),
                Err(e) => {
                    tracing::warn!(error = %e, "Retry save failed");
                    still_pending.push(record);
                    last_error = Some(e);
                }
            }
        }

        if !still_pending.is_empty() {
            // Anything queued meanwhile goes after the older records.
            let mut unsaved = self.unsaved.lock().await;
            still_pending.append(&mut unsaved);
            let excess = still_pending.len().saturating_sub(MAX_UNSAVED_RUNS);
            if excess > 0 {
                tracing::warn!(dropped = excess, "Unsaved run queue full, dropping oldest runs");
                still_pending.drain(..excess);
            }
            *unsaved = still_pending;
        }

        match last_error {
            Some(e) if stored.is_empty() => Err(e.into()),
            _ => Ok(stored),
        }
    }

    fn publish(&self, session: &RunSession, now_millis: i64) -> SessionSnapshot {
        let snapshot = session.snapshot(now_millis);
        self.snapshots.send_replace(snapshot.clone());
        snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{MemoryStore, StoreError};
    use crate::models::WeeklyGoal;
    use crate::time_utils::ManualClock;
    use chrono::NaiveDate;
    use futures_util::future::{self, BoxFuture};

    /// Backend that is always down.
    struct DownStore;

    impl RunStore for DownStore {
        fn save_run<'a>(
            &'a self,
            _user_id: &'a str,
            _run: &'a RunRecord,
        ) -> BoxFuture<'a, std::result::Result<RunRecord, StoreError>> {
            Box::pin(future::ready(Err(StoreError::Status(503))))
        }

        fn list_runs<'a>(
            &'a self,
            _user_id: &'a str,
        ) -> BoxFuture<'a, std::result::Result<Vec<RunRecord>, StoreError>> {
            Box::pin(future::ready(Err(StoreError::Status(503))))
        }

        fn delete_run<'a>(
            &'a self,
            _user_id: &'a str,
            _run_id: u64,
        ) -> BoxFuture<'a, std::result::Result<bool, StoreError>> {
            Box::pin(future::ready(Err(StoreError::Status(503))))
        }

        fn get_goal<'a>(
            &'a self,
            _user_id: &'a str,
            _week_start: NaiveDate,
        ) -> BoxFuture<'a, std::result::Result<Option<WeeklyGoal>, StoreError>> {
            Box::pin(future::ready(Err(StoreError::Status(503))))
        }

        fn set_goal<'a>(
            &'a self,
            _user_id: &'a str,
            _goal: &'a WeeklyGoal,
        ) -> BoxFuture<'a, std::result::Result<(), StoreError>> {
            Box::pin(future::ready(Err(StoreError::Status(503))))
        }
    }

    const LAT0: f64 = 37.3318;
    const LON0: f64 = -122.0312;

    fn tracker() -> (Arc<RunTracker>, Arc<ManualClock>, MemoryStore) {
        let clock = Arc::new(ManualClock::new(1_000_000));
        let store = MemoryStore::new();
        let finalizer = RunFinalizer::new(None, 100, clock.clone());
        let tracker = RunTracker::new(
            finalizer,
            Arc::new(store.clone()),
            Identity::new("tester"),
            clock.clone(),
        );
        (Arc::new(tracker), clock, store)
    }

    #[tokio::test]
    async fn test_subscribers_see_transitions() {
        let (tracker, _clock, _) = tracker();
        let mut rx = tracker.subscribe();

        tracker.start().await;
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().state, RunState::Running);
        assert_eq!(tracker.subscriber_count(), 1);

        drop(rx);
        assert_eq!(tracker.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_tick_updates_duration_without_banking() {
        let (tracker, clock, _) = tracker();
        let rx = tracker.subscribe();
        tracker.start().await;

        clock.advance(1_500);
        tracker.tick().await;
        assert_eq!(rx.borrow().duration_millis, 1_500);

        let paused = tracker.pause().await;
        assert_eq!(paused.duration_millis, 1_500);

        clock.advance(10_000);
        tracker.tick().await;
        assert_eq!(rx.borrow().duration_millis, 1_500);
    }

    #[tokio::test]
    async fn test_complete_run_persists_and_stops() {
        let (tracker, clock, store) = tracker();
        tracker.start().await;
        tracker.on_fix(LocationFix::new(LAT0, LON0, 0)).await;
        clock.advance(2_000);
        tracker.on_fix(LocationFix::new(LAT0 + 0.0001, LON0, 2_000)).await;
        clock.advance(8_000);

        let record = tracker.complete_run().await.unwrap();
        assert_eq!(record.id, Some(1));
        assert_eq!(record.duration_millis, 10_000);
        assert_eq!(record.timestamp_millis, 1_010_000);

        let snapshot = tracker.snapshot().await;
        assert_eq!(snapshot.state, RunState::Ready);
        assert_eq!(snapshot.path_points, 0);
        assert_eq!(store.list_runs("tester").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_complete_run_requires_active_run() {
        let (tracker, _, _) = tracker();
        assert!(matches!(
            tracker.complete_run().await,
            Err(AppError::NoActiveRun)
        ));
        assert!(matches!(tracker.finalize().await, Err(AppError::NoActiveRun)));
    }

    #[tokio::test]
    async fn test_finalize_does_not_stop() {
        let (tracker, _, _) = tracker();
        tracker.start().await;
        tracker.finalize().await.unwrap();
        assert_eq!(tracker.snapshot().await.state, RunState::Running);
    }

    #[tokio::test]
    async fn test_unsaved_queue_is_capped() {
        let clock = Arc::new(ManualClock::new(1_000_000));
        let finalizer = RunFinalizer::new(None, 100, clock.clone());
        let tracker = RunTracker::new(
            finalizer,
            Arc::new(DownStore),
            Identity::new("tester"),
            clock.clone(),
        );

        for _ in 0..MAX_UNSAVED_RUNS + 3 {
            tracker.start().await;
            clock.advance(1_000);
            assert!(matches!(
                tracker.complete_run().await,
                Err(AppError::Persistence(_))
            ));
        }

        let unsaved = tracker.unsaved_runs().await;
        assert_eq!(unsaved.len(), MAX_UNSAVED_RUNS);
        // The three oldest were dropped
        assert_eq!(unsaved[0].timestamp_millis, 1_004_000);

        assert!(tracker.retry_unsaved().await.is_err());
        assert_eq!(tracker.unsaved_runs().await.len(), MAX_UNSAVED_RUNS);
    }

    #[tokio::test]
    async fn test_finishing_claim_released_after_failure() {
        let clock = Arc::new(ManualClock::new(1_000_000));
        let finalizer = RunFinalizer::new(None, 100, clock.clone());
        let tracker = RunTracker::new(
            finalizer,
            Arc::new(DownStore),
            Identity::new("tester"),
            clock.clone(),
        );

        assert!(matches!(
            tracker.complete_run().await,
            Err(AppError::NoActiveRun)
        ));
        tracker.start().await;
        assert!(tracker.complete_run().await.is_err());
        tracker.start().await;
        assert!(matches!(
            tracker.complete_run().await,
            Err(AppError::Persistence(_))
        ));
    }

    #[tokio::test]
    async fn test_ticker_stops_when_tracker_dropped() {
        let (tracker, _, _) = tracker();
        let handle = tracker.spawn_ticker(Duration::from_millis(5));
        drop(tracker);
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("ticker should exit")
            .unwrap();
    }
}
