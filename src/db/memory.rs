// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-process store used when no sync backend is configured.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::NaiveDate;
use dashmap::DashMap;
use futures_util::future::{self, BoxFuture};

use crate::db::{RunStore, StoreError};
use crate::models::{RunRecord, WeeklyGoal};

#[derive(Clone, Default)]
pub struct MemoryStore {
    runs: Arc<DashMap<String, Vec<RunRecord>>>,
    goals: Arc<DashMap<(String, NaiveDate), WeeklyGoal>>,
    next_id: Arc<AtomicU64>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn insert_run(&self, user_id: &str, run: &RunRecord) -> RunRecord {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let stored = run.with_id(id);
        self.runs
            .entry(user_id.to_string())
            .or_default()
            .push(stored.clone());
        stored
    }

    /// Newest first, matching the backend's ordering.
    fn runs_for(&self, user_id: &str) -> Vec<RunRecord> {
        let mut runs = self
            .runs
            .get(user_id)
            .map(|r| r.value().clone())
            .unwrap_or_default();
        runs.sort_by(|a, b| b.timestamp_millis.cmp(&a.timestamp_millis));
        runs
    }

    fn remove_run(&self, user_id: &str, run_id: u64) -> bool {
        let Some(mut runs) = self.runs.get_mut(user_id) else {
            return false;
        };
        let before = runs.len();
        runs.retain(|r| r.id != Some(run_id));
        runs.len() != before
    }
}

impl RunStore for MemoryStore {
    fn save_run<'a>(
        &'a self,
        user_id: &'a str,
        run: &'a RunRecord,
    ) -> BoxFuture<'a, Result<RunRecord, StoreError>> {
        Box::pin(future::ready(Ok(self.insert_run(user_id, run))))
    }

    fn list_runs<'a>(&'a self, user_id: &'a str) -> BoxFuture<'a, Result<Vec<RunRecord>, StoreError>> {
        Box::pin(future::ready(Ok(self.runs_for(user_id))))
    }

    fn delete_run<'a>(&'a self, user_id: &'a str, run_id: u64) -> BoxFuture<'a, Result<bool, StoreError>> {
        Box::pin(future::ready(Ok(self.remove_run(user_id, run_id))))
    }

    fn get_goal<'a>(
        &'a self,
        user_id: &'a str,
        week_start: NaiveDate,
    ) -> BoxFuture<'a, Result<Option<WeeklyGoal>, StoreError>> {
        let goal = self
            .goals
            .get(&(user_id.to_string(), week_start))
            .map(|g| g.value().clone());
        Box::pin(future::ready(Ok(goal)))
    }

    fn set_goal<'a>(
        &'a self,
        user_id: &'a str,
        goal: &'a WeeklyGoal,
    ) -> BoxFuture<'a, Result<(), StoreError>> {
        self.goals
            .insert((user_id.to_string(), goal.week_start_date), goal.clone());
        Box::pin(future::ready(Ok(())))
    }
}
