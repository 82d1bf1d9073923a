//! Raw payload shapes as delivered by the tracking service.
//!
//! Decoding is lenient: numbers may arrive as JSON numbers or numeric
//! strings, anything else (and any non-finite value) is treated as absent.
//! Points that cannot be decoded at all, or have no usable timestamp, are
//! dropped from their batch rather than failing it.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::error::{TelemetryError, TelemetryResult};
use super::types::{GeoPosition, TelemetrySample, Timestamp};
use crate::metrics::physics::finite;

/// A live-track batch: `{ "trackPoints": [...] }`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawTrackBatch {
    #[serde(default, rename = "trackPoints")]
    pub track_points: Vec<Value>,
}

/// Nested position object.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct RawPosition {
    #[serde(default, deserialize_with = "lenient_f64")]
    pub lat: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub lon: Option<f64>,
}

/// A single live-track point.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTrackPoint {
    #[serde(default)]
    pub date_time: Option<Value>,
    #[serde(default, deserialize_with = "lenient_position")]
    pub position: Option<RawPosition>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub altitude: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub elevation: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub speed: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub speed_meters_per_sec: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub power_watts: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub heart_rate_beats_per_min: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub cadence_cycles_per_min: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub distance_meters: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub total_distance_meters: Option<f64>,
}

impl RawTrackPoint {
    /// Convert into a sample. Returns `None` without a usable timestamp.
    pub fn into_sample(self) -> Option<TelemetrySample> {
        let timestamp = self.date_time.as_ref().and_then(parse_timestamp)?;

        let position = self
            .position
            .and_then(|p| Some(GeoPosition::new(p.lat?, p.lon?)))
            .filter(GeoPosition::is_valid);

        Some(TelemetrySample {
            position,
            altitude_m: self.altitude.or(self.elevation),
            speed_mps: self.speed.or(self.speed_meters_per_sec),
            power_watts: self.power_watts.filter(|w| *w >= 0.0),
            heart_rate_bpm: self.heart_rate_beats_per_min.filter(|hr| *hr >= 0.0),
            cadence_rpm: self.cadence_cycles_per_min.filter(|c| *c >= 0.0),
            native_distance_m: self
                .distance_meters
                .or(self.total_distance_meters)
                .filter(|d| *d >= 0.0),
            ..TelemetrySample::new(timestamp)
        })
    }
}

/// A course payload: `{ "geoPoints": [...] }` or `{ "trackPoints": [...] }`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawCourse {
    #[serde(default, rename = "geoPoints")]
    pub geo_points: Vec<Value>,
    #[serde(default, rename = "trackPoints")]
    pub track_points: Vec<Value>,
}

/// A single planned-route point.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawCoursePoint {
    #[serde(default, deserialize_with = "lenient_f64")]
    pub latitude: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub lat: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub longitude: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub lon: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub elevation: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub altitude: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub distance_meters: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub total_distance_meters: Option<f64>,
}

impl RawCoursePoint {
    pub fn position(&self) -> Option<GeoPosition> {
        let lat = self.latitude.or(self.lat)?;
        let lon = self.longitude.or(self.lon)?;
        Some(GeoPosition::new(lat, lon)).filter(GeoPosition::is_valid)
    }

    pub fn altitude(&self) -> Option<f64> {
        self.elevation.or(self.altitude)
    }

    pub fn native_distance(&self) -> Option<f64> {
        self.distance_meters
            .or(self.total_distance_meters)
            .filter(|d| *d >= 0.0)
    }
}

/// Decode a live-track batch into samples, in payload order.
pub fn parse_track_batch(json: &str) -> TelemetryResult<Vec<TelemetrySample>> {
    let batch: RawTrackBatch = serde_json::from_str(json)?;
    let total = batch.track_points.len();

    let samples: Vec<TelemetrySample> = batch
        .track_points
        .into_iter()
        .filter_map(decode_point::<RawTrackPoint>)
        .filter_map(RawTrackPoint::into_sample)
        .collect();

    if samples.len() < total {
        tracing::debug!(
            "Dropped {} of {} track points without a usable timestamp",
            total - samples.len(),
            total
        );
    }

    if samples.is_empty() {
        return Err(TelemetryError::EmptyPayload(format!(
            "no usable track points (received {})",
            total
        )));
    }

    Ok(samples)
}

/// Decode the points of a course payload.
pub fn parse_course_points(json: &str) -> TelemetryResult<Vec<RawCoursePoint>> {
    let course: RawCourse = serde_json::from_str(json)?;
    let values = if course.geo_points.is_empty() {
        course.track_points
    } else {
        course.geo_points
    };

    let points: Vec<RawCoursePoint> = values
        .into_iter()
        .filter_map(decode_point::<RawCoursePoint>)
        .collect();

    if points.is_empty() {
        return Err(TelemetryError::EmptyPayload(
            "no geoPoints or trackPoints in course".to_string(),
        ));
    }

    Ok(points)
}

fn decode_point<T: serde::de::DeserializeOwned>(value: Value) -> Option<T> {
    match serde_json::from_value(value) {
        Ok(point) => Some(point),
        Err(e) => {
            tracing::debug!("Skipping undecodable point: {}", e);
            None
        }
    }
}

/// Parse an RFC 3339 string or epoch milliseconds.
pub fn parse_timestamp(value: &Value) -> Option<Timestamp> {
    match value {
        Value::String(s) => DateTime::parse_from_rfc3339(s.trim())
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        Value::Number(n) => n
            .as_i64()
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single()),
        _ => None,
    }
}

fn lenient_number(value: Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    number.and_then(finite)
}

fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(lenient_number))
}

fn lenient_position<'de, D>(deserializer: D) -> Result<Option<RawPosition>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| serde_json::from_value(v).ok()))
}
