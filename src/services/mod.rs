// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - run tracking and statistics engine.

pub mod achievements;
pub mod finalizer;
pub mod history;
pub mod location_filter;
pub mod path_recorder;
pub mod run_session;
pub mod stats;
pub mod tracker;

pub use achievements::AchievementEvaluator;
pub use finalizer::{HttpMapRenderer, MapRenderer, RunFinalizer};
pub use history::{HistorySorter, SortDirection, SortKey};
pub use location_filter::LocationFilter;
pub use path_recorder::PathRecorder;
pub use run_session::{RunSession, RunState, SessionSnapshot};
pub use stats::{StatsAggregator, WeekCursor};
pub use tracker::RunTracker;
