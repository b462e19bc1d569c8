// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Run records, raw position fixes and recorded path points.

use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Flat calories-per-kilometre coefficient.
///
/// User weight/height are collected elsewhere but never enter this formula.
pub const CALORIES_PER_KM: f64 = 70.0;

const MILLIS_PER_HOUR: f64 = 3_600_000.0;

/// A raw position sample pushed by the location provider.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocationFix {
    pub latitude: f64,
    pub longitude: f64,
    /// Unix epoch milliseconds
    pub timestamp_millis: i64,
    /// Horizontal accuracy radius in meters
    #[serde(default)]
    pub accuracy_meters: f64,
}

impl LocationFix {
    pub fn new(latitude: f64, longitude: f64, timestamp_millis: i64) -> Self {
        Self {
            latitude,
            longitude,
            timestamp_millis,
            accuracy_meters: 0.0,
        }
    }

    /// Coordinates are finite and inside the WGS84 ranges.
    pub fn is_well_formed(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }

    pub fn point(&self) -> PathPoint {
        PathPoint {
            latitude: self.latitude,
            longitude: self.longitude,
        }
    }

    pub(crate) fn to_geo(self) -> geo::Point<f64> {
        geo::Point::new(self.longitude, self.latitude)
    }
}

/// One vertex of the recorded route.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct PathPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl From<PathPoint> for geo::Coord<f64> {
    fn from(p: PathPoint) -> Self {
        geo::coord! { x: p.longitude, y: p.latitude }
    }
}

/// A finished run. Never mutated after construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct RunRecord {
    /// Store-assigned identifier (`None` until persisted)
    #[cfg_attr(feature = "binding-generation", ts(type = "number | null"))]
    pub id: Option<u64>,
    /// When the run was finalized (Unix epoch milliseconds)
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub timestamp_millis: i64,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub duration_millis: u64,
    pub distance_km: f64,
    pub avg_speed_kmh: f64,
    pub calories_burned: u32,
    /// Opaque reference to the route snapshot image
    pub image_ref: Option<String>,
}

impl RunRecord {
    /// Build a record whose average speed is derived from distance and duration.
    pub fn new(
        timestamp_millis: i64,
        duration_millis: u64,
        distance_km: f64,
        image_ref: Option<String>,
    ) -> Self {
        Self {
            id: None,
            timestamp_millis,
            duration_millis,
            distance_km,
            avg_speed_kmh: average_speed_kmh(distance_km, duration_millis),
            calories_burned: calories_for_distance(distance_km),
            image_ref,
        }
    }

    /// Copy of this record carrying the identifier assigned by the store.
    pub fn with_id(&self, id: u64) -> Self {
        Self {
            id: Some(id),
            ..self.clone()
        }
    }

    pub fn duration_minutes(&self) -> f64 {
        self.duration_millis as f64 / 60_000.0
    }
}

/// `distance / hours`, or zero for an empty duration.
pub fn average_speed_kmh(distance_km: f64, duration_millis: u64) -> f64 {
    let hours = duration_millis as f64 / MILLIS_PER_HOUR;
    if hours > 0.0 {
        distance_km / hours
    } else {
        0.0
    }
}

/// Calories from distance alone, truncated to whole kilocalories.
pub fn calories_for_distance(distance_km: f64) -> u32 {
    (distance_km * CALORIES_PER_KM).max(0.0) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_average_speed_consistent_with_duration() {
        let record = RunRecord::new(0, 30 * 60 * 1000, 5.0, None);
        assert!((record.avg_speed_kmh - 10.0).abs() < 1e-9);
        assert_eq!(record.calories_burned, 350);
    }

    #[test]
    fn test_zero_duration_has_zero_speed() {
        let record = RunRecord::new(0, 0, 1.2, None);
        assert_eq!(record.avg_speed_kmh, 0.0);
    }

    #[test]
    fn test_calories_truncate() {
        // 0.5111 km * 70 = 35.777
        assert_eq!(calories_for_distance(0.5111), 35);
        assert_eq!(calories_for_distance(0.0), 0);
    }

    #[test]
    fn test_well_formed_rejects_non_finite_and_out_of_range() {
        assert!(LocationFix::new(37.4, -122.1, 0).is_well_formed());
        assert!(!LocationFix::new(f64::NAN, -122.1, 0).is_well_formed());
        assert!(!LocationFix::new(37.4, f64::INFINITY, 0).is_well_formed());
        assert!(!LocationFix::new(91.0, 0.0, 0).is_well_formed());
        assert!(!LocationFix::new(0.0, -181.0, 0).is_well_formed());
    }

    #[test]
    fn test_with_id_keeps_fields() {
        let record = RunRecord::new(1_000, 60_000, 1.0, Some("img".to_string()));
        let stored = record.with_id(7);
        assert_eq!(stored.id, Some(7));
        assert_eq!(stored.distance_km, record.distance_km);
        assert_eq!(stored.image_ref.as_deref(), Some("img"));
    }
}
