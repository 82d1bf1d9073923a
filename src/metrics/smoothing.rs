//! Time-based rolling window over the telemetry array.
//!
//! The window is scanned backward from a point until the configured horizon
//! is reached, so the cost is bounded by the number of samples in the
//! horizon (about 30 at 1 Hz), not by the length of the series.

use crate::metrics::physics::{finite, ROLLING_WINDOW_SECS};
use crate::telemetry::types::TelemetrySample;

/// Result of a backward window scan.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RollingStats {
    /// Average power over the visited samples (missing power counts as 0).
    /// `None` when there is no earlier sample to form a window with.
    pub avg_power: Option<f64>,
    /// Altitude of the earliest visited sample
    pub altitude_at_start: Option<f64>,
    /// Cumulative distance of the earliest visited sample
    pub distance_at_start: f64,
    /// Seconds between the earliest visited sample and the current one
    pub elapsed_secs: f64,
}

/// Rolling window accumulator with a configurable horizon.
#[derive(Debug, Clone, Copy)]
pub struct RollingWindow {
    /// Horizon in seconds
    horizon_secs: f64,
}

impl RollingWindow {
    /// Create a window with the given horizon.
    pub fn new(horizon_secs: f64) -> Self {
        Self { horizon_secs }
    }

    /// Create the standard 30-second window.
    pub fn thirty_second() -> Self {
        Self::new(ROLLING_WINDOW_SECS)
    }

    pub fn horizon_secs(&self) -> f64 {
        self.horizon_secs
    }

    /// Scan backward from `index`.
    ///
    /// Samples before `index` must already carry their cumulative distance in
    /// `metrics.total_distance_m`. The scan stops at the first sample whose
    /// age reaches the horizon, or at the start of the array.
    pub fn stats(&self, points: &[TelemetrySample], index: usize) -> RollingStats {
        if index == 0 || index >= points.len() {
            return RollingStats::default();
        }

        let current = &points[index];
        let mut sum_power = 0.0;
        let mut count = 0usize;
        let mut start = index;

        for j in (0..=index).rev() {
            let past = &points[j];
            sum_power += past.power_watts.and_then(finite).unwrap_or(0.0);
            count += 1;
            start = j;

            if current.seconds_since(past) >= self.horizon_secs {
                break;
            }
        }

        let earliest = &points[start];
        RollingStats {
            avg_power: finite(sum_power / count as f64),
            altitude_at_start: earliest.altitude_m,
            distance_at_start: earliest.metrics.total_distance_m,
            elapsed_secs: current.seconds_since(earliest).max(0.0),
        }
    }
}

impl Default for RollingWindow {
    fn default() -> Self {
        Self::thirty_second()
    }
}

/// Scan the standard 30-second window ending at `index`.
pub fn rolling_stats(points: &[TelemetrySample], index: usize) -> RollingStats {
    RollingWindow::thirty_second().stats(points, index)
}
