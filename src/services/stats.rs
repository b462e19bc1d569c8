// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Calendar-week aggregation of run history.
//!
//! Weeks start Monday 00:00 in the aggregator's time zone. Records are
//! bucketed by their local weekday, Monday = 0 through Sunday = 6.

use chrono::{DateTime, Datelike, Days, NaiveDate, NaiveTime, TimeDelta, TimeZone, Utc};

use crate::models::{
    DashboardSummary, LifetimeTotals, RunRecord, StatsMetric, WeekSummary, WeeklyGoal,
};

#[derive(Debug, Clone)]
pub struct StatsAggregator<Tz: TimeZone> {
    tz: Tz,
}

impl<Tz: TimeZone> StatsAggregator<Tz> {
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }

    fn local(&self, millis: i64) -> DateTime<Tz> {
        DateTime::<Utc>::from_timestamp_millis(millis)
            .unwrap_or_default()
            .with_timezone(&self.tz)
    }

    fn local_midnight(&self, date: NaiveDate) -> DateTime<Tz> {
        let midnight = date.and_time(NaiveTime::MIN);
        self.tz
            .from_local_datetime(&midnight)
            .earliest()
            // Midnight can fall inside a DST gap; treat the wall time as UTC then.
            .unwrap_or_else(|| self.tz.from_utc_datetime(&midnight))
    }

    /// Monday of the week containing `now_millis`, shifted by `week_offset` weeks.
    ///
    /// Offsets past the calendar's range saturate at the first or last
    /// representable date.
    pub fn week_start_date(&self, now_millis: i64, week_offset: i32) -> NaiveDate {
        let today = self.local(now_millis).date_naive();
        let monday = today - Days::new(u64::from(today.weekday().num_days_from_monday()));
        TimeDelta::try_weeks(i64::from(week_offset))
            .and_then(|shift| monday.checked_add_signed(shift))
            .unwrap_or(if week_offset < 0 {
                NaiveDate::MIN
            } else {
                NaiveDate::MAX
            })
    }

    /// Local midnight starting the selected week.
    pub fn week_start(&self, now_millis: i64, week_offset: i32) -> DateTime<Tz> {
        self.local_midnight(self.week_start_date(now_millis, week_offset))
    }

    /// `[start, end)` of the selected week in epoch milliseconds.
    pub fn week_bounds_millis(&self, now_millis: i64, week_offset: i32) -> (i64, i64) {
        let monday = self.week_start_date(now_millis, week_offset);
        let next_monday = monday.checked_add_days(Days::new(7)).unwrap_or(NaiveDate::MAX);
        (
            self.local_midnight(monday).timestamp_millis(),
            self.local_midnight(next_monday).timestamp_millis(),
        )
    }

    /// Per-day sums of `metric` for one week.
    pub fn week_buckets(
        &self,
        history: &[RunRecord],
        metric: StatsMetric,
        week_offset: i32,
        now_millis: i64,
    ) -> WeekSummary {
        let (start, end) = self.week_bounds_millis(now_millis, week_offset);
        let mut per_day = [0.0; 7];
        let mut total = 0.0;

        for run in history
            .iter()
            .filter(|r| (start..end).contains(&r.timestamp_millis))
        {
            let index = self
                .local(run.timestamp_millis)
                .weekday()
                .num_days_from_monday() as usize;
            let value = metric.value_of(run);
            per_day[index] += value;
            total += value;
        }

        WeekSummary {
            metric,
            per_day,
            total,
            formatted_total: metric.format_total(total),
            week_start: self.week_start(now_millis, week_offset).fixed_offset(),
            week_offset,
        }
    }

    /// Current-week totals and goal progress, independent of any navigation.
    pub fn dashboard(
        &self,
        history: &[RunRecord],
        goal: WeeklyGoal,
        now_millis: i64,
    ) -> DashboardSummary {
        let distance = self.week_buckets(history, StatsMetric::Distance, 0, now_millis);
        let calories = self.week_buckets(history, StatsMetric::Calories, 0, now_millis);

        DashboardSummary {
            week_start: distance.week_start,
            week_distance_km: distance.total,
            week_calories: calories.total,
            distance_progress: progress(distance.total, goal.target_distance_km),
            calories_progress: progress(calories.total, f64::from(goal.target_calories)),
            goal,
            lifetime: lifetime_totals(history),
        }
    }
}

fn progress(value: f64, target: f64) -> f64 {
    if target > 0.0 {
        (value / target).clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// All-time totals over the full history.
pub fn lifetime_totals(history: &[RunRecord]) -> LifetimeTotals {
    let total_millis: u64 = history.iter().map(|r| r.duration_millis).sum();
    LifetimeTotals {
        runs: u32::try_from(history.len()).unwrap_or(u32::MAX),
        distance_km: history.iter().map(|r| r.distance_km).sum(),
        calories: history.iter().map(|r| u64::from(r.calories_burned)).sum(),
        hours: total_millis as f64 / 3_600_000.0,
    }
}

/// Week navigation state for the weekly report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WeekCursor {
    pub week_offset: i32,
    pub metric: StatsMetric,
}

impl WeekCursor {
    pub fn previous(&mut self) {
        self.week_offset = self.week_offset.saturating_sub(1);
    }

    pub fn next(&mut self) {
        self.week_offset = self.week_offset.saturating_add(1);
    }

    pub fn set_metric(&mut self, metric: StatsMetric) {
        self.metric = metric;
    }

    pub fn reset(&mut self) {
        self.week_offset = 0;
    }

    pub fn summary<Tz: TimeZone>(
        &self,
        aggregator: &StatsAggregator<Tz>,
        history: &[RunRecord],
        now_millis: i64,
    ) -> WeekSummary {
        aggregator.week_buckets(history, self.metric, self.week_offset, now_millis)
    }
}
