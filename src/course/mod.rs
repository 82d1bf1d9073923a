//! Planned course handling.
//!
//! A [`Course`] is the static polyline the rider intends to follow, with a
//! non-decreasing cumulative distance per point. The [`matcher`] projects
//! live positions onto it and [`elevation`] fills in missing altitudes.

pub mod elevation;
pub mod matcher;

use serde::{Deserialize, Serialize};

use crate::telemetry::error::{TelemetryError, TelemetryResult};
use crate::telemetry::raw::{parse_course_points, RawCoursePoint};
use crate::telemetry::types::GeoPosition;

pub use elevation::{enrich_course_elevation, ElevationError, ElevationProvider};
pub use matcher::{CourseMatcher, MatchState};

/// A point on the planned route.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CoursePoint {
    /// Latitude in degrees
    pub lat: f64,
    /// Longitude in degrees
    pub lon: f64,
    /// Elevation in meters
    pub altitude: Option<f64>,
    /// Distance from the course start in meters
    pub cumulative_distance_m: f64,
}

impl CoursePoint {
    pub fn position(&self) -> GeoPosition {
        GeoPosition::new(self.lat, self.lon)
    }
}

/// An ordered planned route.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Course {
    points: Vec<CoursePoint>,
}

impl Course {
    /// Build a course from raw points.
    ///
    /// Points without valid coordinates are skipped. Cumulative distance
    /// uses the native value when present, otherwise the running haversine
    /// sum, and never decreases.
    pub fn from_raw_points(raw: &[RawCoursePoint]) -> Self {
        let mut points: Vec<CoursePoint> = Vec::with_capacity(raw.len());
        let mut cumulative = 0.0f64;

        for raw_point in raw {
            let Some(position) = raw_point.position() else {
                continue;
            };

            let candidate = match (raw_point.native_distance(), points.last()) {
                (Some(native), _) => native,
                (None, Some(prev)) => cumulative + prev.position().distance_to(&position),
                (None, None) => 0.0,
            };
            cumulative = cumulative.max(candidate);

            points.push(CoursePoint {
                lat: position.latitude,
                lon: position.longitude,
                altitude: raw_point.altitude(),
                cumulative_distance_m: cumulative,
            });
        }

        if points.len() < raw.len() {
            tracing::debug!(
                "Skipped {} course points without valid coordinates",
                raw.len() - points.len()
            );
        }

        Self { points }
    }

    /// Build a course from coordinates, computing distances.
    pub fn from_positions(positions: &[(f64, f64)]) -> Self {
        let raw: Vec<RawCoursePoint> = positions
            .iter()
            .map(|(lat, lon)| RawCoursePoint {
                lat: Some(*lat),
                lon: Some(*lon),
                ..Default::default()
            })
            .collect();
        Self::from_raw_points(&raw)
    }

    pub fn points(&self) -> &[CoursePoint] {
        &self.points
    }

    pub(crate) fn points_mut(&mut self) -> &mut [CoursePoint] {
        &mut self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Course length in meters.
    pub fn total_distance_m(&self) -> f64 {
        self.points
            .last()
            .map(|p| p.cumulative_distance_m)
            .unwrap_or(0.0)
    }

    /// Total climbing along the course in meters.
    pub fn elevation_gain_m(&self) -> f64 {
        self.points
            .windows(2)
            .filter_map(|w| Some(w[1].altitude? - w[0].altitude?))
            .filter(|gain| *gain > 0.0)
            .sum()
    }
}

/// Decode a course payload.
pub fn parse_course(json: &str) -> TelemetryResult<Course> {
    let raw = parse_course_points(json)?;
    let course = Course::from_raw_points(&raw);
    if course.is_empty() {
        return Err(TelemetryError::EmptyPayload(
            "course has no points with valid coordinates".to_string(),
        ));
    }
    Ok(course)
}
