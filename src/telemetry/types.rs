//! Telemetry sample types.
//!
//! A [`TelemetrySample`] is immutable sensor data plus two disjoint groups of
//! derived fields: [`PointMetrics`], written only by the stats engine, and
//! `course_distance_km`, written only by the course matcher. Both processors
//! may run over the same slice without touching each other's fields.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Ordering and deduplication key of a sample.
pub type Timestamp = DateTime<Utc>;

/// A WGS84 coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPosition {
    /// Latitude in degrees
    pub latitude: f64,
    /// Longitude in degrees
    pub longitude: f64,
}

impl GeoPosition {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Great-circle distance to another position in meters.
    pub fn distance_to(&self, other: &GeoPosition) -> f64 {
        crate::metrics::physics::haversine_distance(
            self.latitude,
            self.longitude,
            other.latitude,
            other.longitude,
        )
    }

    /// Both coordinates finite and within WGS84 bounds.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

/// Fields derived by the stats engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PointMetrics {
    /// Cumulative live-track distance in meters
    pub total_distance_m: f64,
    /// Cumulative live-track distance in kilometers
    pub distance_km: f64,
    /// Gradient over the rolling window (percent), absent without altitude data
    pub gradient_percent: Option<f64>,
    /// Climb rate over the rolling window (VAM, m/h), absent without altitude data
    pub climb_rate_m_per_h: Option<f64>,
    /// 30-second smoothed power in watts
    pub smoothed_power_watts: f64,
    /// W' balance at this instant in joules
    pub energy_reserve_joules: f64,
    /// Smoothed power / heart rate
    pub efficiency: Option<f64>,
}

/// One timestamped telemetry sample from the tracker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySample {
    /// Sample time (unique per sample)
    pub timestamp: Timestamp,
    /// GPS fix, absent when the tracker had none
    pub position: Option<GeoPosition>,
    /// Elevation in meters
    pub altitude_m: Option<f64>,
    /// Speed in m/s
    pub speed_mps: Option<f64>,
    /// Instantaneous power in watts
    pub power_watts: Option<f64>,
    /// Heart rate in bpm
    pub heart_rate_bpm: Option<f64>,
    /// Cadence in rpm
    pub cadence_rpm: Option<f64>,
    /// Cumulative distance reported by the device itself, in meters
    pub native_distance_m: Option<f64>,
    /// Stats engine output
    #[serde(default)]
    pub metrics: PointMetrics,
    /// Distance along the loaded course in kilometers (course matcher output)
    #[serde(default)]
    pub course_distance_km: Option<f64>,
}

impl TelemetrySample {
    /// Create an empty sample at the given time.
    pub fn new(timestamp: Timestamp) -> Self {
        Self {
            timestamp,
            position: None,
            altitude_m: None,
            speed_mps: None,
            power_watts: None,
            heart_rate_bpm: None,
            cadence_rpm: None,
            native_distance_m: None,
            metrics: PointMetrics::default(),
            course_distance_km: None,
        }
    }

    pub fn with_position(mut self, latitude: f64, longitude: f64) -> Self {
        self.position = Some(GeoPosition::new(latitude, longitude));
        self
    }

    pub fn with_altitude(mut self, altitude_m: f64) -> Self {
        self.altitude_m = Some(altitude_m);
        self
    }

    pub fn with_power(mut self, watts: f64) -> Self {
        self.power_watts = Some(watts);
        self
    }

    pub fn with_heart_rate(mut self, bpm: f64) -> Self {
        self.heart_rate_bpm = Some(bpm);
        self
    }

    pub fn with_cadence(mut self, rpm: f64) -> Self {
        self.cadence_rpm = Some(rpm);
        self
    }

    pub fn with_speed(mut self, mps: f64) -> Self {
        self.speed_mps = Some(mps);
        self
    }

    pub fn with_native_distance(mut self, meters: f64) -> Self {
        self.native_distance_m = Some(meters);
        self
    }

    /// Seconds elapsed since `earlier`, negative if `earlier` is later.
    pub fn seconds_since(&self, earlier: &TelemetrySample) -> f64 {
        seconds_between(&earlier.timestamp, &self.timestamp)
    }

    /// Drop all derived fields, leaving the raw sensor data.
    pub fn clear_derived(&mut self) {
        self.metrics = PointMetrics::default();
        self.course_distance_km = None;
    }
}

/// Seconds from `from` to `to` with millisecond resolution.
pub fn seconds_between(from: &Timestamp, to: &Timestamp) -> f64 {
    (*to - *from).num_milliseconds() as f64 / 1000.0
}
