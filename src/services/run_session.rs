// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Run lifecycle state machine and live accounting.
//!
//! All operations take the current wall-clock time explicitly so that the
//! caller owns the clock. Illegal transitions are silent no-ops.

use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::models::run::calories_for_distance;
use crate::models::{LocationFix, PathPoint};
use crate::services::location_filter::LocationFilter;
use crate::services::path_recorder::PathRecorder;

/// Displayed speed drops to zero after this long without an accepted fix.
pub const STALE_SPEED_AFTER_MILLIS: i64 = 3_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum RunState {
    #[default]
    Ready,
    Running,
    Paused,
}

/// What happened to a delivered fix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FixOutcome {
    /// Malformed coordinates; nothing changed
    Discarded,
    /// Live marker moved; session not running so no accounting
    MarkerOnly,
    /// Within the jitter radius of the last accepted fix
    Jitter,
    Accepted { delta_meters: f64, speed_kmh: f64 },
}

/// Read-only view of the session published to observers.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct SessionSnapshot {
    pub state: RunState,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub run_number: u64,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub duration_millis: u64,
    pub distance_km: f64,
    pub speed_kmh: f64,
    pub calories: u32,
    pub path_points: usize,
    pub current_position: Option<PathPoint>,
}

/// Totals handed to the finalizer.
#[derive(Debug, Clone, PartialEq)]
pub struct RunTotals {
    pub run_number: u64,
    pub duration_millis: u64,
    pub distance_km: f64,
    pub path: Vec<PathPoint>,
}

#[derive(Debug, Clone, Default)]
pub struct RunSession {
    state: RunState,
    run_number: u64,
    accumulated_elapsed_millis: u64,
    segment_start_millis: i64,
    total_distance_meters: f64,
    current_speed_kmh: f64,
    last_accepted_fix: Option<LocationFix>,
    last_accepted_at_millis: i64,
    current_position: Option<PathPoint>,
    path: PathRecorder,
    filter: LocationFilter,
}

impl RunSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// Incremented each time a new run starts from READY.
    pub fn run_number(&self) -> u64 {
        self.run_number
    }

    pub fn accumulated_elapsed_millis(&self) -> u64 {
        self.accumulated_elapsed_millis
    }

    pub fn total_distance_meters(&self) -> f64 {
        self.total_distance_meters
    }

    pub fn current_speed_kmh(&self) -> f64 {
        self.current_speed_kmh
    }

    pub fn calories(&self) -> u32 {
        calories_for_distance(self.total_distance_meters / 1000.0)
    }

    pub fn current_position(&self) -> Option<PathPoint> {
        self.current_position
    }

    pub fn path(&self) -> &PathRecorder {
        &self.path
    }

    /// READY -> RUNNING. Returns whether the transition happened.
    pub fn start(&mut self, now_millis: i64) -> bool {
        if self.state != RunState::Ready {
            return false;
        }
        self.state = RunState::Running;
        self.run_number += 1;
        self.segment_start_millis = now_millis;
        self.last_accepted_fix = None;
        true
    }

    /// RUNNING -> PAUSED, banking the current segment.
    pub fn pause(&mut self, now_millis: i64) -> bool {
        if self.state != RunState::Running {
            return false;
        }
        self.accumulated_elapsed_millis += self.segment_elapsed(now_millis);
        self.state = RunState::Paused;
        true
    }

    /// PAUSED -> RUNNING with a fresh segment anchor.
    ///
    /// The last accepted fix is kept, so the first fix after resuming is
    /// measured from where the run was paused.
    pub fn resume(&mut self, now_millis: i64) -> bool {
        if self.state != RunState::Paused {
            return false;
        }
        self.segment_start_millis = now_millis;
        self.state = RunState::Running;
        true
    }

    /// {RUNNING, PAUSED} -> READY. Resets all accumulators and clears the path.
    ///
    /// Finalize before calling this; nothing survives it except the live marker.
    pub fn stop(&mut self) -> bool {
        if self.state == RunState::Ready {
            return false;
        }
        self.state = RunState::Ready;
        self.accumulated_elapsed_millis = 0;
        self.segment_start_millis = 0;
        self.total_distance_meters = 0.0;
        self.current_speed_kmh = 0.0;
        self.last_accepted_fix = None;
        self.last_accepted_at_millis = 0;
        self.path.clear();
        true
    }

    /// Elapsed run time for display. Does not bank anything.
    pub fn tick(&self, now_millis: i64) -> u64 {
        match self.state {
            RunState::Running => self.accumulated_elapsed_millis + self.segment_elapsed(now_millis),
            RunState::Paused | RunState::Ready => self.accumulated_elapsed_millis,
        }
    }

    /// Apply one delivered fix.
    pub fn on_fix(&mut self, fix: LocationFix, now_millis: i64) -> FixOutcome {
        if !fix.is_well_formed() {
            tracing::trace!(?fix, "Discarding malformed fix");
            return FixOutcome::Discarded;
        }

        self.current_position = Some(fix.point());
        if self.state != RunState::Running {
            return FixOutcome::MarkerOnly;
        }

        let result = self.filter.accept(&fix, self.last_accepted_fix.as_ref());
        if !result.accepted {
            return FixOutcome::Jitter;
        }

        self.total_distance_meters += result.delta_meters;
        self.current_speed_kmh = result.speed_kmh;
        self.last_accepted_fix = Some(fix);
        self.last_accepted_at_millis = now_millis;
        self.path.append(fix.point());

        FixOutcome::Accepted {
            delta_meters: result.delta_meters,
            speed_kmh: result.speed_kmh,
        }
    }

    /// Current totals and a copy of the route for finalization.
    pub fn totals(&self, now_millis: i64) -> RunTotals {
        RunTotals {
            run_number: self.run_number,
            duration_millis: self.tick(now_millis),
            distance_km: self.total_distance_meters / 1000.0,
            path: self.path.snapshot(),
        }
    }

    pub fn snapshot(&self, now_millis: i64) -> SessionSnapshot {
        let speed_is_stale = self.state == RunState::Running
            && now_millis - self.last_accepted_at_millis > STALE_SPEED_AFTER_MILLIS;

        SessionSnapshot {
            state: self.state,
            run_number: self.run_number,
            duration_millis: self.tick(now_millis),
            distance_km: self.total_distance_meters / 1000.0,
            speed_kmh: if speed_is_stale {
                0.0
            } else {
                self.current_speed_kmh
            },
            calories: self.calories(),
            path_points: self.path.len(),
            current_position: self.current_position,
        }
    }

    fn segment_elapsed(&self, now_millis: i64) -> u64 {
        (now_millis - self.segment_start_millis).max(0) as u64
    }
}
