//! Shared ride fixtures for integration tests.

use chrono::{DateTime, Duration, TimeZone, Utc};
use ridetrace::course::Course;
use ridetrace::telemetry::TelemetrySample;

/// Meters per degree of longitude at the equator.
pub const M_PER_DEG: f64 = 111_194.93;

pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap()
}

/// A sample at `secs` after the start, placed `x_m` east and `y_m` north of (0, 0).
pub fn sample_at(secs: i64, x_m: f64, y_m: f64) -> TelemetrySample {
    TelemetrySample::new(start_time() + Duration::seconds(secs))
        .with_position(y_m / M_PER_DEG, x_m / M_PER_DEG)
}

/// A rolling ride at 1 Hz, ~8 m/s, with intervals and a climb.
pub fn interval_ride(seconds: i64) -> Vec<TelemetrySample> {
    (0..seconds)
        .map(|t| {
            let watts = if (t / 60) % 2 == 0 { 360.0 } else { 150.0 };
            let altitude = 200.0 + 40.0 * ((t as f64) / 120.0).sin();
            sample_at(t, t as f64 * 8.0, 0.0)
                .with_power(watts + (t % 7) as f64)
                .with_heart_rate(120.0 + (t % 60) as f64)
                .with_cadence(90.0)
                .with_altitude(altitude)
        })
        .collect()
}

/// Straight west-to-east course along the equator.
pub fn straight_course(length_m: f64, spacing_m: f64) -> Course {
    let n = (length_m / spacing_m) as usize;
    let positions: Vec<(f64, f64)> = (0..=n)
        .map(|i| (0.0, i as f64 * spacing_m / M_PER_DEG))
        .collect();
    Course::from_positions(&positions)
}
