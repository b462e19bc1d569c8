// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Badge evaluation over the full run history.
//!
//! Unlock status is recomputed on every call; nothing is cached. Cost is
//! linear in history length per badge.

use chrono::{DateTime, TimeZone, Timelike, Utc};

use crate::models::{Achievement, AchievementStatus, Criterion, RunRecord};

/// Built-in badge catalogue.
pub const ACHIEVEMENTS: &[Achievement] = &[
    Achievement {
        id: "first_steps",
        title: "First Steps",
        description: "Complete your first run",
        criterion: Criterion::MinRuns(1),
    },
    Achievement {
        id: "marathoner",
        title: "Marathoner",
        description: "Run a total of 42 km",
        criterion: Criterion::TotalDistanceKm(42.0),
    },
    Achievement {
        id: "speedster",
        title: "Speedster",
        description: "Average 12 km/h or faster in a single run",
        criterion: Criterion::AnyRunAvgSpeedKmh(12.0),
    },
    Achievement {
        id: "night_owl",
        title: "Night Owl",
        description: "Finish a run after 8 PM",
        criterion: Criterion::AnyRunAtOrAfterHour(20),
    },
    Achievement {
        id: "dedicated",
        title: "Dedicated",
        description: "Complete 10 runs",
        criterion: Criterion::MinRuns(10),
    },
];

#[derive(Debug, Clone)]
pub struct AchievementEvaluator<Tz: TimeZone> {
    tz: Tz,
}

impl<Tz: TimeZone> AchievementEvaluator<Tz> {
    /// `tz` decides the local hour for time-of-day badges.
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }

    pub fn evaluate(&self, history: &[RunRecord]) -> Vec<AchievementStatus> {
        self.evaluate_catalogue(ACHIEVEMENTS, history)
    }

    pub fn evaluate_catalogue(
        &self,
        catalogue: &[Achievement],
        history: &[RunRecord],
    ) -> Vec<AchievementStatus> {
        catalogue
            .iter()
            .map(|achievement| AchievementStatus {
                unlocked: self.is_met(achievement.criterion, history),
                achievement: achievement.clone(),
            })
            .collect()
    }

    pub fn is_met(&self, criterion: Criterion, history: &[RunRecord]) -> bool {
        match criterion {
            Criterion::MinRuns(n) => history.len() >= n,
            Criterion::TotalDistanceKm(km) => {
                history.iter().map(|r| r.distance_km).sum::<f64>() >= km
            }
            Criterion::AnyRunAvgSpeedKmh(kmh) => history.iter().any(|r| r.avg_speed_kmh >= kmh),
            Criterion::AnyRunAtOrAfterHour(hour) => history
                .iter()
                .any(|r| self.local_hour(r.timestamp_millis) >= hour),
        }
    }

    fn local_hour(&self, millis: i64) -> u32 {
        DateTime::<Utc>::from_timestamp_millis(millis)
            .unwrap_or_default()
            .with_timezone(&self.tz)
            .hour()
    }
}
