// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Sorting of run history.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::models::RunRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum SortKey {
    #[default]
    Date,
    Distance,
    Duration,
    Calories,
    Speed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortKey {
    fn compare(self, a: &RunRecord, b: &RunRecord) -> Ordering {
        match self {
            SortKey::Date => a.timestamp_millis.cmp(&b.timestamp_millis),
            SortKey::Distance => a.distance_km.total_cmp(&b.distance_km),
            SortKey::Duration => a.duration_millis.cmp(&b.duration_millis),
            SortKey::Calories => a.calories_burned.cmp(&b.calories_burned),
            SortKey::Speed => a.avg_speed_kmh.total_cmp(&b.avg_speed_kmh),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct HistorySorter;

impl HistorySorter {
    /// Stable ascending sort; descending is exactly its reverse.
    pub fn sort(&self, history: &[RunRecord], key: SortKey, direction: SortDirection) -> Vec<RunRecord> {
        let mut sorted = history.to_vec();
        sorted.sort_by(|a, b| key.compare(a, b));
        if direction == SortDirection::Desc {
            sorted.reverse();
        }
        sorted
    }
}
