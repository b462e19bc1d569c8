// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Jitter and spike filtering for raw position fixes.

use crate::models::LocationFix;
use geo::{Distance, Haversine};

/// Movements at or below this many meters are GPS jitter.
pub const JITTER_THRESHOLD_METERS: f64 = 1.0;

/// Instantaneous speeds above this are treated as position spikes.
pub const SPIKE_SPEED_KMH: f64 = 40.0;

/// Outcome of offering a fix to the filter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterResult {
    pub delta_meters: f64,
    pub speed_kmh: f64,
    pub accepted: bool,
}

impl FilterResult {
    fn rejected() -> Self {
        Self {
            delta_meters: 0.0,
            speed_kmh: 0.0,
            accepted: false,
        }
    }
}

/// Stateless filter deciding whether a fix contributes to run distance.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocationFilter;

impl LocationFilter {
    /// Evaluate `fix` against the last accepted fix.
    ///
    /// A spike keeps its distance but reports zero speed.
    pub fn accept(&self, fix: &LocationFix, last_accepted: Option<&LocationFix>) -> FilterResult {
        let Some(last) = last_accepted else {
            return FilterResult {
                delta_meters: 0.0,
                speed_kmh: 0.0,
                accepted: true,
            };
        };

        let gap = great_circle_distance(last, fix);
        if gap <= JITTER_THRESHOLD_METERS {
            return FilterResult::rejected();
        }

        let time_gap_seconds = (fix.timestamp_millis - last.timestamp_millis) as f64 / 1000.0;
        let mut speed_kmh = if time_gap_seconds > 0.0 {
            (gap / time_gap_seconds) * 3.6
        } else {
            0.0
        };

        if speed_kmh > SPIKE_SPEED_KMH {
            tracing::debug!(gap, speed_kmh, "Speed spike clamped to zero");
            speed_kmh = 0.0;
        }

        FilterResult {
            delta_meters: gap,
            speed_kmh,
            accepted: true,
        }
    }
}

/// Haversine distance between two fixes in meters.
pub fn great_circle_distance(a: &LocationFix, b: &LocationFix) -> f64 {
    Haversine.distance(a.to_geo(), b.to_geo())
}
