// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Persistence layer.
//!
//! The engine only ever talks to a [`RunStore`]; the binary picks the
//! REST sync backend when one is configured and an in-memory store otherwise.

pub mod memory;
pub mod remote;

pub use memory::MemoryStore;
pub use remote::RemoteStore;

use chrono::NaiveDate;
use futures_util::future::BoxFuture;

use crate::error::AppError;
use crate::models::{RunRecord, WeeklyGoal};

/// Backend endpoint paths.
pub mod endpoints {
    pub const CREATE_RUN: &str = "create_run";
    pub const GET_RUNS: &str = "get_runs";
    pub const DELETE_RUN: &str = "delete_run";
    pub const SET_WEEKLY_GOAL: &str = "set_weekly_goal";
    pub const GET_WEEKLY_GOAL: &str = "get_weekly_goal";
}

/// Durable storage for run history and weekly goals, scoped per user.
pub trait RunStore: Send + Sync {
    /// Persist a run and return the stored copy (with its assigned id).
    fn save_run<'a>(
        &'a self,
        user_id: &'a str,
        run: &'a RunRecord,
    ) -> BoxFuture<'a, Result<RunRecord, StoreError>>;

    fn list_runs<'a>(&'a self, user_id: &'a str) -> BoxFuture<'a, Result<Vec<RunRecord>, StoreError>>;

    /// Returns `false` if no such run existed.
    fn delete_run<'a>(&'a self, user_id: &'a str, run_id: u64) -> BoxFuture<'a, Result<bool, StoreError>>;

    fn get_goal<'a>(
        &'a self,
        user_id: &'a str,
        week_start: NaiveDate,
    ) -> BoxFuture<'a, Result<Option<WeeklyGoal>, StoreError>>;

    fn set_goal<'a>(
        &'a self,
        user_id: &'a str,
        goal: &'a WeeklyGoal,
    ) -> BoxFuture<'a, Result<(), StoreError>>;
}

/// Errors from the persistence backend.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Backend request failed: {0}")]
    Request(String),

    #[error("Backend returned status {0}")]
    Status(u16),

    #[error("Malformed backend response: {0}")]
    Decode(String),
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        AppError::Persistence(err.to_string())
    }
}
