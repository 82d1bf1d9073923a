//! Stats engine: per-point derived metrics and session accumulators.
//!
//! The engine walks a suffix of the ordered telemetry array, writes each
//! point's [`PointMetrics`](crate::telemetry::types::PointMetrics) in place
//! and folds the point into the session accumulators (W' balance, elevation
//! gain, work, zone histograms, NP). Accumulator state is carried between
//! calls, so processing a series in one pass or in consecutive suffixes
//! yields the same values.

use serde::{Deserialize, Serialize};

use crate::config::AthleteProfile;
use crate::metrics::physics::{
    climb_rate, efficiency, finite, gradient, stress_metrics, update_w_prime_balance,
    GPS_NOISE_FLOOR_M, WORK_GAP_SECS,
};
use crate::metrics::smoothing::RollingWindow;
use crate::metrics::zones::{HrZones, PowerZones, HR_ZONE_COUNT, POWER_ZONE_COUNT};
use crate::telemetry::types::{PointMetrics, TelemetrySample};

/// Session-level aggregates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionStats {
    /// Normalized Power in watts
    pub normalized_power: f64,
    /// NP / CP
    pub intensity_factor: f64,
    /// Training Stress Score
    pub training_stress_score: f64,
    /// Total positive elevation change in meters
    pub total_elevation_gain_m: f64,
    /// Total mechanical work in joules
    pub total_work_joules: f64,
    /// Seconds spent in each heart rate zone
    pub time_in_hr_zones: [f64; HR_ZONE_COUNT],
    /// Seconds spent in each power zone
    pub time_in_power_zones: [f64; POWER_ZONE_COUNT],
}

/// Computes derived metrics for telemetry points.
#[derive(Debug, Clone)]
pub struct StatsEngine {
    /// Athlete parameters
    profile: AthleteProfile,
    /// CP-derived power zones
    power_zones: PowerZones,
    /// Heart rate zones
    hr_zones: HrZones,
    /// 30-second window for smoothing and gradient anchors
    window: RollingWindow,
    /// Current W' balance in joules
    energy_reserve_joules: f64,
    /// Elevation gain accumulator
    total_elevation_gain_m: f64,
    /// Work accumulator
    total_work_joules: f64,
    /// Heart rate zone histogram
    time_in_hr_zones: [f64; HR_ZONE_COUNT],
    /// Power zone histogram
    time_in_power_zones: [f64; POWER_ZONE_COUNT],
    /// Sum of smoothed power to the fourth
    sum_power_4th: f64,
    /// Number of samples in the NP accumulator
    np_count: u64,
}

impl StatsEngine {
    /// Create an engine for the given athlete with a full W' reserve.
    pub fn new(profile: AthleteProfile) -> Self {
        Self {
            power_zones: profile.power_zones(),
            hr_zones: profile.hr_zones(),
            window: RollingWindow::thirty_second(),
            energy_reserve_joules: profile.w_prime_joules,
            total_elevation_gain_m: 0.0,
            total_work_joules: 0.0,
            time_in_hr_zones: [0.0; HR_ZONE_COUNT],
            time_in_power_zones: [0.0; POWER_ZONE_COUNT],
            sum_power_4th: 0.0,
            np_count: 0,
            profile,
        }
    }

    pub fn profile(&self) -> &AthleteProfile {
        &self.profile
    }

    /// Current W' balance in joules.
    pub fn energy_reserve(&self) -> f64 {
        self.energy_reserve_joules
    }

    /// Reset all accumulators for a full recomputation.
    pub fn reset(&mut self) {
        self.energy_reserve_joules = self.profile.w_prime_joules;
        self.total_elevation_gain_m = 0.0;
        self.total_work_joules = 0.0;
        self.time_in_hr_zones = [0.0; HR_ZONE_COUNT];
        self.time_in_power_zones = [0.0; POWER_ZONE_COUNT];
        self.sum_power_4th = 0.0;
        self.np_count = 0;
    }

    /// Derive metrics for `points[start_index..]`, in order.
    ///
    /// Points before `start_index` must already have been processed by this
    /// engine since its last reset.
    pub fn process_points(&mut self, points: &mut [TelemetrySample], start_index: usize) {
        if start_index >= points.len() {
            return;
        }

        let cp = self.profile.critical_power_watts;
        let w_prime_max = self.profile.w_prime_joules;

        let mut distance = if start_index > 0 {
            points[start_index - 1].metrics.total_distance_m
        } else {
            0.0
        };

        for i in start_index..points.len() {
            let dt = if i > 0 {
                let delta = points[i].seconds_since(&points[i - 1]);
                if delta > 0.0 {
                    delta
                } else {
                    if delta < 0.0 {
                        tracing::debug!("Point {} is older than its predecessor, dt forced to 0", i);
                    }
                    0.0
                }
            } else {
                0.0
            };

            // Distance: native cumulative value wins, else haversine delta above the noise floor
            if let Some(native) = points[i].native_distance_m.and_then(finite) {
                distance = distance.max(native);
            } else if i > 0 {
                if let (Some(prev), Some(cur)) = (points[i - 1].position, points[i].position) {
                    let delta = prev.distance_to(&cur);
                    if delta > GPS_NOISE_FLOOR_M {
                        distance += delta;
                    }
                }
            }

            // Elevation gain: descents never subtract
            if i > 0 {
                if let (Some(prev), Some(cur)) = (points[i - 1].altitude_m, points[i].altitude_m) {
                    if let Some(gain) = finite(cur - prev) {
                        self.total_elevation_gain_m += gain.max(0.0);
                    }
                }
            }

            // The window reads this point's distance when it is its own anchor
            points[i].metrics.total_distance_m = distance;
            let window = self.window.stats(points, i);

            // Non-finite readings are treated as absent
            let point = &points[i];
            let power = point.power_watts.and_then(finite);
            let heart_rate = point.heart_rate_bpm.and_then(finite);
            let smoothed = window
                .avg_power
                .unwrap_or_else(|| power.unwrap_or(0.0));

            let (climb_rate_m_per_h, gradient_percent) = match point.altitude_m.and_then(finite) {
                Some(_) if i == 0 => (Some(0.0), Some(0.0)),
                Some(now) => match window.altitude_at_start.and_then(finite) {
                    Some(then) => (
                        Some(climb_rate(now, then, window.elapsed_secs)),
                        Some(gradient(now, then, distance - window.distance_at_start)),
                    ),
                    None => (None, None),
                },
                None => (None, None),
            };

            if dt > 0.0 {
                self.energy_reserve_joules =
                    update_w_prime_balance(self.energy_reserve_joules, smoothed, dt, cp, w_prime_max);

                if let Some(hr) = heart_rate.filter(|hr| *hr > 0.0) {
                    self.time_in_hr_zones[self.hr_zones.zone_index(hr)] += dt;
                }
                if power.is_some() && smoothed > 0.0 {
                    self.time_in_power_zones[self.power_zones.zone_index(smoothed)] += dt;
                }

                // Long gaps are pauses, not continuous effort
                if dt < WORK_GAP_SECS {
                    self.total_work_joules += power.unwrap_or(0.0) * dt;
                }
            }

            if finite(smoothed).is_some() {
                self.sum_power_4th += smoothed.powi(4);
                self.np_count += 1;
            }

            points[i].metrics = PointMetrics {
                total_distance_m: distance,
                distance_km: distance / 1000.0,
                gradient_percent,
                climb_rate_m_per_h,
                smoothed_power_watts: smoothed.round(),
                energy_reserve_joules: self.energy_reserve_joules,
                efficiency: efficiency(smoothed, heart_rate),
            };
        }

        tracing::trace!(
            "Processed {} points from index {}",
            points.len() - start_index,
            start_index
        );
    }

    /// Session aggregates over everything processed since the last reset.
    pub fn global_stats(&self, duration_secs: f64) -> SessionStats {
        let stress = stress_metrics(
            self.sum_power_4th,
            self.np_count,
            self.profile.critical_power_watts,
            duration_secs,
        );

        SessionStats {
            normalized_power: stress.normalized_power,
            intensity_factor: stress.intensity_factor,
            training_stress_score: stress.training_stress_score,
            total_elevation_gain_m: self.total_elevation_gain_m,
            total_work_joules: self.total_work_joules,
            time_in_hr_zones: self.time_in_hr_zones,
            time_in_power_zones: self.time_in_power_zones,
        }
    }
}
