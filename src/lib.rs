// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Stride: live run tracking and run statistics.
//!
//! This crate turns a stream of raw GPS fixes into run records and
//! aggregates run history into weekly reports, sorted views and badges.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use std::sync::Arc;

use config::Config;
use db::RunStore;
use services::RunTracker;
use time_utils::Clock;

/// The user on whose behalf the engine records and reads runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: String,
}

impl Identity {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
        }
    }
}

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn RunStore>,
    pub tracker: Arc<RunTracker>,
    pub clock: Arc<dyn Clock>,
}
