// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Weekly goal model.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use validator::Validate;

pub const DEFAULT_TARGET_DISTANCE_KM: f64 = 10.0;
pub const DEFAULT_TARGET_CALORIES: u32 = 2000;

/// Distance and calorie targets for one calendar week (Monday start).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct WeeklyGoal {
    /// Monday of the week this goal applies to
    #[cfg_attr(feature = "binding-generation", ts(type = "string"))]
    pub week_start_date: NaiveDate,
    #[validate(range(min = 0.0, max = 1000.0))]
    pub target_distance_km: f64,
    #[validate(range(max = 100_000))]
    pub target_calories: u32,
}

impl WeeklyGoal {
    /// Goal used when nothing has been stored for the week.
    pub fn default_for(week_start_date: NaiveDate) -> Self {
        Self {
            week_start_date,
            target_distance_km: DEFAULT_TARGET_DISTANCE_KM,
            target_calories: DEFAULT_TARGET_CALORIES,
        }
    }
}
