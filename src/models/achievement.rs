// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Achievement badges. Unlock state is derived from history, never stored.

use serde::Serialize;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Condition a run history must satisfy to unlock a badge.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", content = "threshold", rename_all = "snake_case")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum Criterion {
    /// History holds at least this many runs
    MinRuns(usize),
    /// Summed distance across all runs reaches this many km
    TotalDistanceKm(f64),
    /// Some single run averaged at least this speed
    AnyRunAvgSpeedKmh(f64),
    /// Some run was recorded at or after this local hour (0-23)
    AnyRunAtOrAfterHour(u32),
}

/// A badge definition.
#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct Achievement {
    pub id: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    pub criterion: Criterion,
}

/// A badge paired with whether the current history unlocks it.
#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct AchievementStatus {
    pub achievement: Achievement,
    pub unlocked: bool,
}
