// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Append-only route recording for the active run.

use crate::models::PathPoint;
use geo::LineString;

#[derive(Debug, Clone, Default)]
pub struct PathRecorder {
    points: Vec<PathPoint>,
}

impl PathRecorder {
    pub fn append(&mut self, point: PathPoint) {
        self.points.push(point);
    }

    /// Owned copy of the route so far.
    pub fn snapshot(&self) -> Vec<PathPoint> {
        self.points.clone()
    }

    pub fn clear(&mut self) {
        self.points.clear();
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[PathPoint] {
        &self.points
    }
}

/// Route as a geo line string (x = longitude, y = latitude).
pub fn to_line_string(points: &[PathPoint]) -> LineString<f64> {
    points.iter().copied().map(geo::Coord::from).collect()
}

/// Route as a GeoJSON `LineString` feature.
pub fn to_geojson_feature(points: &[PathPoint]) -> geojson::Feature {
    let geometry = geojson::Geometry::new(geojson::Value::from(&to_line_string(points)));
    let mut properties = geojson::JsonObject::new();
    properties.insert("points".to_string(), serde_json::json!(points.len()));

    geojson::Feature {
        bbox: None,
        geometry: Some(geometry),
        id: None,
        properties: Some(properties),
        foreign_members: None,
    }
}
