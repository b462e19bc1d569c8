// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! REST sync backend client.
//!
//! Wire format uses the backend's field names (`duration`, `distance`,
//! `speed`, `image_url`, ...); conversion happens at this boundary only.

use chrono::NaiveDate;
use futures_util::future::BoxFuture;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use crate::db::{endpoints, RunStore, StoreError};
use crate::models::{RunRecord, WeeklyGoal};

/// Client for the run sync backend.
#[derive(Clone)]
pub struct RemoteStore {
    http: reqwest::Client,
    base_url: String,
}

#[derive(Serialize)]
struct CreateRunBody<'a> {
    uid: &'a str,
    timestamp: i64,
    duration: u64,
    distance: f64,
    calories: u32,
    speed: f64,
    path_points: &'a str,
    image_url: &'a str,
}

#[derive(Deserialize)]
struct CreatedRun {
    id: Option<u64>,
}

#[derive(Deserialize)]
struct WireRun {
    #[serde(default)]
    id: Option<u64>,
    timestamp: i64,
    duration: u64,
    distance: f64,
    calories: u32,
    speed: f64,
    #[serde(default)]
    image_url: Option<String>,
}

impl From<WireRun> for RunRecord {
    fn from(w: WireRun) -> Self {
        RunRecord {
            id: w.id,
            timestamp_millis: w.timestamp,
            duration_millis: w.duration,
            distance_km: w.distance,
            avg_speed_kmh: w.speed,
            calories_burned: w.calories,
            image_ref: w.image_url.filter(|u| !u.is_empty()),
        }
    }
}

#[derive(Serialize)]
struct GoalBody<'a> {
    uid: &'a str,
    week_start_date: String,
    target_km: f64,
    target_calories: u32,
}

#[derive(Deserialize)]
struct WireGoal {
    target_km: f64,
    target_calories: u32,
}

impl RemoteStore {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.base_url, endpoint)
    }

    async fn create_run(&self, user_id: &str, run: &RunRecord) -> Result<RunRecord, StoreError> {
        let body = CreateRunBody {
            uid: user_id,
            timestamp: run.timestamp_millis,
            duration: run.duration_millis,
            distance: run.distance_km,
            calories: run.calories_burned,
            speed: run.avg_speed_kmh,
            path_points: "[]",
            image_url: run.image_ref.as_deref().unwrap_or(""),
        };

        let response = self
            .http
            .post(self.url(endpoints::CREATE_RUN))
            .json(&body)
            .send()
            .await
            .map_err(|e| StoreError::Request(e.to_string()))?;

        if response.status() != StatusCode::CREATED {
            return Err(StoreError::Status(response.status().as_u16()));
        }

        // The backend may or may not echo the new id.
        let created = response.json::<CreatedRun>().await.ok();
        Ok(match created.and_then(|c| c.id) {
            Some(id) => run.with_id(id),
            None => run.clone(),
        })
    }

    async fn fetch_runs(&self, user_id: &str) -> Result<Vec<RunRecord>, StoreError> {
        let response = self
            .http
            .get(self.url(endpoints::GET_RUNS))
            .query(&[("uid", user_id)])
            .send()
            .await
            .map_err(|e| StoreError::Request(e.to_string()))?;

        if !response.status().is_success() {
            return Err(StoreError::Status(response.status().as_u16()));
        }

        let runs: Vec<WireRun> = response
            .json()
            .await
            .map_err(|e| StoreError::Decode(e.to_string()))?;
        Ok(runs.into_iter().map(RunRecord::from).collect())
    }

    async fn remove_run(&self, run_id: u64) -> Result<bool, StoreError> {
        let response = self
            .http
            .delete(self.url(endpoints::DELETE_RUN))
            .query(&[("run_id", run_id)])
            .send()
            .await
            .map_err(|e| StoreError::Request(e.to_string()))?;

        match response.status() {
            StatusCode::OK | StatusCode::NO_CONTENT => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            other => Err(StoreError::Status(other.as_u16())),
        }
    }

    async fn fetch_goal(
        &self,
        user_id: &str,
        week_start: NaiveDate,
    ) -> Result<Option<WeeklyGoal>, StoreError> {
        let response = self
            .http
            .get(self.url(endpoints::GET_WEEKLY_GOAL))
            .query(&[
                ("uid", user_id.to_string()),
                ("week_start_date", week_start.to_string()),
            ])
            .send()
            .await
            .map_err(|e| StoreError::Request(e.to_string()))?;

        match response.status() {
            StatusCode::OK => {
                let wire: WireGoal = response
                    .json()
                    .await
                    .map_err(|e| StoreError::Decode(e.to_string()))?;
                Ok(Some(WeeklyGoal {
                    week_start_date: week_start,
                    target_distance_km: wire.target_km,
                    target_calories: wire.target_calories,
                }))
            }
            StatusCode::NOT_FOUND => Ok(None),
            other => Err(StoreError::Status(other.as_u16())),
        }
    }

    async fn store_goal(&self, user_id: &str, goal: &WeeklyGoal) -> Result<(), StoreError> {
        let body = GoalBody {
            uid: user_id,
            week_start_date: goal.week_start_date.to_string(),
            target_km: goal.target_distance_km,
            target_calories: goal.target_calories,
        };

        let response = self
            .http
            .post(self.url(endpoints::SET_WEEKLY_GOAL))
            .json(&body)
            .send()
            .await
            .map_err(|e| StoreError::Request(e.to_string()))?;

        match response.status() {
            StatusCode::OK | StatusCode::CREATED => Ok(()),
            other => Err(StoreError::Status(other.as_u16())),
        }
    }
}

impl RunStore for RemoteStore {
    fn save_run<'a>(
        &'a self,
        user_id: &'a str,
        run: &'a RunRecord,
    ) -> BoxFuture<'a, Result<RunRecord, StoreError>> {
        Box::pin(self.create_run(user_id, run))
    }

    fn list_runs<'a>(&'a self, user_id: &'a str) -> BoxFuture<'a, Result<Vec<RunRecord>, StoreError>> {
        Box::pin(self.fetch_runs(user_id))
    }

    fn delete_run<'a>(&'a self, _user_id: &'a str, run_id: u64) -> BoxFuture<'a, Result<bool, StoreError>> {
        Box::pin(self.remove_run(run_id))
    }

    fn get_goal<'a>(
        &'a self,
        user_id: &'a str,
        week_start: NaiveDate,
    ) -> BoxFuture<'a, Result<Option<WeeklyGoal>, StoreError>> {
        Box::pin(self.fetch_goal(user_id, week_start))
    }

    fn set_goal<'a>(
        &'a self,
        user_id: &'a str,
        goal: &'a WeeklyGoal,
    ) -> BoxFuture<'a, Result<(), StoreError>> {
        Box::pin(self.store_goal(user_id, goal))
    }
}
