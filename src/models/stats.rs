// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Aggregated statistics returned to the dashboard and weekly report.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::models::{RunRecord, WeeklyGoal};

/// Which run field a weekly chart sums.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum StatsMetric {
    #[default]
    Distance,
    Calories,
    /// Minutes
    Duration,
}

impl StatsMetric {
    pub fn value_of(self, run: &RunRecord) -> f64 {
        match self {
            StatsMetric::Distance => run.distance_km,
            StatsMetric::Calories => f64::from(run.calories_burned),
            StatsMetric::Duration => run.duration_minutes(),
        }
    }

    pub fn unit(self) -> &'static str {
        match self {
            StatsMetric::Distance => "km",
            StatsMetric::Calories => "kcal",
            StatsMetric::Duration => "min",
        }
    }

    /// Human-readable total, e.g. `"12.34 km"` or `"700 kcal"`.
    pub fn format_total(self, total: f64) -> String {
        match self {
            StatsMetric::Distance => format!("{:.2} {}", total, self.unit()),
            StatsMetric::Calories | StatsMetric::Duration => {
                format!("{} {}", total.round() as i64, self.unit())
            }
        }
    }
}

/// One calendar week of a single metric, bucketed Monday..Sunday.
#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct WeekSummary {
    pub metric: StatsMetric,
    /// Index 0 is Monday, 6 is Sunday
    pub per_day: [f64; 7],
    pub total: f64,
    pub formatted_total: String,
    #[cfg_attr(feature = "binding-generation", ts(type = "string"))]
    pub week_start: DateTime<FixedOffset>,
    pub week_offset: i32,
}

/// All-time totals across the run history.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct LifetimeTotals {
    pub runs: u32,
    pub distance_km: f64,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub calories: u64,
    pub hours: f64,
}

/// Current-week progress against the weekly goal.
#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct DashboardSummary {
    #[cfg_attr(feature = "binding-generation", ts(type = "string"))]
    pub week_start: DateTime<FixedOffset>,
    pub week_distance_km: f64,
    pub week_calories: f64,
    pub goal: WeeklyGoal,
    /// Fraction of the distance target reached, clamped to `0.0..=1.0`
    pub distance_progress: f64,
    /// Fraction of the calorie target reached, clamped to `0.0..=1.0`
    pub calories_progress: f64,
    pub lifetime: LifetimeTotals,
}
