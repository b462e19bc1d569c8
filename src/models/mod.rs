// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Data models for the application.

pub mod achievement;
pub mod goal;
pub mod run;
pub mod stats;

pub use achievement::{Achievement, AchievementStatus, Criterion};
pub use goal::WeeklyGoal;
pub use run::{LocationFix, PathPoint, RunRecord};
pub use stats::{DashboardSummary, LifetimeTotals, StatsMetric, WeekSummary};
