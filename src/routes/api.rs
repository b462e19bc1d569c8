// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! API routes over the stored run history.

use crate::error::{AppError, Result};
use crate::models::{AchievementStatus, DashboardSummary, RunRecord, StatsMetric, WeekSummary, WeeklyGoal};
use crate::services::{AchievementEvaluator, HistorySorter, SortDirection, SortKey, StatsAggregator};
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Furthest a weekly report may navigate from the current week.
const MAX_WEEK_OFFSET: i32 = 520;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/runs", get(get_runs))
        .route("/api/runs/{id}", delete(delete_run))
        .route("/api/runs/unsaved", get(get_unsaved_runs))
        .route("/api/runs/retry", post(retry_unsaved_runs))
        .route("/api/stats/week", get(get_week_stats))
        .route("/api/stats/dashboard", get(get_dashboard))
        .route("/api/goals/current", get(get_current_goal).put(set_current_goal))
        .route("/api/achievements", get(get_achievements))
}

/// Stats are computed in the server's local time zone.
fn aggregator() -> StatsAggregator<chrono::Local> {
    StatsAggregator::new(chrono::Local)
}

async fn load_history(state: &AppState) -> Result<Vec<RunRecord>> {
    let user_id = &state.tracker.identity().user_id;
    Ok(state.store.list_runs(user_id).await?)
}

// ─── Runs ────────────────────────────────────────────────────

#[derive(Deserialize)]
struct RunsQuery {
    #[serde(default)]
    sort: SortKey,
    #[serde(default)]
    direction: SortDirection,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct RunsResponse {
    pub runs: Vec<RunRecord>,
    pub total: u32,
    pub sort: SortKey,
    pub direction: SortDirection,
}

/// Full run history, sorted.
async fn get_runs(
    State(state): State<Arc<AppState>>,
    Query(params): Query<RunsQuery>,
) -> Result<Json<RunsResponse>> {
    let history = load_history(&state).await?;
    tracing::debug!(
        count = history.len(),
        sort = ?params.sort,
        direction = ?params.direction,
        "Fetching runs"
    );

    let runs = HistorySorter.sort(&history, params.sort, params.direction);
    Ok(Json(RunsResponse {
        total: u32::try_from(runs.len()).unwrap_or(u32::MAX),
        runs,
        sort: params.sort,
        direction: params.direction,
    }))
}

async fn delete_run(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> Result<StatusCode> {
    let user_id = &state.tracker.identity().user_id;
    if !state.store.delete_run(user_id, id).await? {
        return Err(AppError::NotFound(format!("Run {} not found", id)));
    }
    tracing::info!(run_id = id, "Run deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Finalized runs still waiting to be saved.
async fn get_unsaved_runs(State(state): State<Arc<AppState>>) -> Json<Vec<RunRecord>> {
    Json(state.tracker.unsaved_runs().await)
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct RetryResponse {
    pub saved: Vec<RunRecord>,
    pub pending: u32,
}

async fn retry_unsaved_runs(State(state): State<Arc<AppState>>) -> Result<Json<RetryResponse>> {
    let saved = state.tracker.retry_unsaved().await?;
    let pending = u32::try_from(state.tracker.unsaved_runs().await.len()).unwrap_or(u32::MAX);
    Ok(Json(RetryResponse { saved, pending }))
}

// ─── Stats ───────────────────────────────────────────────────

#[derive(Deserialize)]
struct WeekQuery {
    #[serde(default)]
    metric: StatsMetric,
    /// 0 = current week, -1 = previous week, ...
    #[serde(default)]
    offset: i32,
}

/// Per-day totals for one week.
async fn get_week_stats(
    State(state): State<Arc<AppState>>,
    Query(params): Query<WeekQuery>,
) -> Result<Json<WeekSummary>> {
    if params.offset.unsigned_abs() > MAX_WEEK_OFFSET.unsigned_abs() {
        return Err(AppError::BadRequest(format!(
            "Week offset must be within ±{}",
            MAX_WEEK_OFFSET
        )));
    }

    let history = load_history(&state).await?;
    let summary = aggregator().week_buckets(
        &history,
        params.metric,
        params.offset,
        state.clock.now_millis(),
    );
    Ok(Json(summary))
}

/// Current-week progress against the weekly goal, plus lifetime totals.
async fn get_dashboard(State(state): State<Arc<AppState>>) -> Result<Json<DashboardSummary>> {
    let now = state.clock.now_millis();
    let aggregator = aggregator();
    let history = load_history(&state).await?;
    let goal = current_goal(&state, aggregator.week_start_date(now, 0)).await?;

    Ok(Json(aggregator.dashboard(&history, goal, now)))
}

// ─── Goals ───────────────────────────────────────────────────

async fn current_goal(state: &AppState, week_start: chrono::NaiveDate) -> Result<WeeklyGoal> {
    let user_id = &state.tracker.identity().user_id;
    Ok(state
        .store
        .get_goal(user_id, week_start)
        .await?
        .unwrap_or_else(|| WeeklyGoal::default_for(week_start)))
}

async fn get_current_goal(State(state): State<Arc<AppState>>) -> Result<Json<WeeklyGoal>> {
    let week_start = aggregator().week_start_date(state.clock.now_millis(), 0);
    Ok(Json(current_goal(&state, week_start).await?))
}

#[derive(Deserialize)]
struct GoalRequest {
    target_distance_km: f64,
    target_calories: u32,
}

/// Set targets for the current week.
async fn set_current_goal(
    State(state): State<Arc<AppState>>,
    Json(request): Json<GoalRequest>,
) -> Result<Json<WeeklyGoal>> {
    let goal = WeeklyGoal {
        week_start_date: aggregator().week_start_date(state.clock.now_millis(), 0),
        target_distance_km: request.target_distance_km,
        target_calories: request.target_calories,
    };
    goal.validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let user_id = &state.tracker.identity().user_id;
    state.store.set_goal(user_id, &goal).await?;
    tracing::info!(
        week = %goal.week_start_date,
        distance_km = goal.target_distance_km,
        calories = goal.target_calories,
        "Weekly goal updated"
    );
    Ok(Json(goal))
}

// ─── Achievements ────────────────────────────────────────────

async fn get_achievements(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<AchievementStatus>>> {
    let history = load_history(&state).await?;
    Ok(Json(AchievementEvaluator::new(chrono::Local).evaluate(&history)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_runs_query_defaults_to_newest_first() {
        let params: RunsQuery = serde_json::from_str("{}").unwrap();
        assert_eq!(params.sort, SortKey::Date);
        assert_eq!(params.direction, SortDirection::Desc);
    }

    #[test]
    fn test_week_query_defaults_to_current_distance() {
        let params: WeekQuery = serde_json::from_str("{}").unwrap();
        assert_eq!(params.metric, StatsMetric::Distance);
        assert_eq!(params.offset, 0);
    }

    #[test]
    fn test_week_query_accepts_metric_names() {
        let params: WeekQuery =
            serde_json::from_str(r#"{"metric": "calories", "offset": -3}"#).unwrap();
        assert_eq!(params.metric, StatsMetric::Calories);
        assert_eq!(params.offset, -3);
    }
}
