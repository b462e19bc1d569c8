// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server port
    pub port: u16,
    /// Frontend URL for CORS
    pub frontend_url: String,
    /// Owner of every run recorded by this engine
    pub user_id: String,
    /// Base URL of the REST sync backend (in-memory store if unset)
    pub backend_url: Option<String>,
    /// Map snapshot service endpoint (no route images if unset)
    pub map_renderer_url: Option<String>,
    /// Padding hint passed to the map renderer, in pixels
    pub snapshot_padding_px: u32,
    /// Period of the display-duration ticker
    pub tick_interval: Duration,
}

impl Config {
    /// Config for tests: in-memory store, no renderer.
    pub fn test_default() -> Self {
        Self {
            port: 8080,
            frontend_url: "http://localhost:5173".to_string(),
            user_id: "test-runner".to_string(),
            backend_url: None,
            map_renderer_url: None,
            snapshot_padding_px: 100,
            tick_interval: Duration::from_millis(100),
        }
    }

    /// Load configuration from environment variables (and `.env` if present).
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        Ok(Self {
            port: parse_or("PORT", 8080)?,
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            user_id: env::var("USER_ID")
                .map(|v| v.trim().to_string())
                .ok()
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| "local-runner".to_string()),
            backend_url: optional("BACKEND_URL"),
            map_renderer_url: optional("MAP_RENDERER_URL"),
            snapshot_padding_px: parse_or("SNAPSHOT_PADDING_PX", 100)?,
            tick_interval: Duration::from_millis(parse_or("TICK_INTERVAL_MS", 100)?),
        })
    }
}

fn optional(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_or<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid(name, raw)),
        Err(_) => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}: {1:?}")]
    Invalid(&'static str, String),
}
