//! Stateless geometry and physiology primitives.
//!
//! Every function here is pure: distances, climb rate, gradient, aerobic
//! efficiency, the W' balance recurrence and the NP/IF/TSS load metrics.
//! Thresholds shared with the tests live here as named constants.

use serde::{Deserialize, Serialize};

/// Mean Earth radius used for great-circle distances (meters).
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Distance deltas below this are GPS jitter and are discarded (meters).
pub const GPS_NOISE_FLOOR_M: f64 = 0.5;

/// Rolling window horizon for smoothed power and gradient/VAM anchors (seconds).
pub const ROLLING_WINDOW_SECS: f64 = 30.0;

/// Minimum distance covered over the window before a gradient is reported (meters).
pub const GRADIENT_MIN_DISTANCE_M: f64 = 10.0;

/// Reported gradients are clamped to +/- this value (percent).
pub const GRADIENT_LIMIT_PERCENT: f64 = 30.0;

/// Climb rates are clamped to this magnitude (meters per hour).
pub const VAM_LIMIT_M_PER_H: f64 = 5000.0;

/// Time deltas at or above this are pauses and add no work (seconds).
pub const WORK_GAP_SECS: f64 = 300.0;

/// Efficiency is only reported above this smoothed power (watts).
pub const EFFICIENCY_MIN_POWER_W: f64 = 10.0;

/// Efficiency is only reported above this heart rate (bpm).
pub const EFFICIENCY_MIN_HR_BPM: f64 = 40.0;

/// Skiba recovery time constant: `tau = A * e^(-k * (CP - P)) + C`.
pub const W_PRIME_TAU_AMPLITUDE_S: f64 = 546.0;
pub const W_PRIME_TAU_DECAY: f64 = 0.01;
pub const W_PRIME_TAU_OFFSET_S: f64 = 316.0;

/// Returns `Some(value)` only for finite numbers.
pub fn finite(value: f64) -> Option<f64> {
    value.is_finite().then_some(value)
}

/// Round to the given number of decimal places.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Great-circle distance between two coordinates (Haversine formula), in meters.
pub fn haversine_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();

    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    let distance = EARTH_RADIUS_M * c;
    if distance.is_finite() {
        distance
    } else {
        0.0
    }
}

/// Vertical ascent rate in meters per hour.
///
/// Descents report 0, the result is clamped to [`VAM_LIMIT_M_PER_H`] and
/// rounded to whole meters. A non-positive window yields 0.
pub fn climb_rate(altitude_now: f64, altitude_then: f64, elapsed_secs: f64) -> f64 {
    if elapsed_secs <= 0.0 {
        return 0.0;
    }

    let vam = (altitude_now - altitude_then) / (elapsed_secs / 3600.0);
    match finite(vam) {
        Some(v) if v > 0.0 => v.min(VAM_LIMIT_M_PER_H).round(),
        _ => 0.0,
    }
}

/// Gradient in percent over a distance delta.
///
/// Returns 0 unless the delta exceeds [`GRADIENT_MIN_DISTANCE_M`]; otherwise
/// the value is rounded to one decimal and clamped to +/- [`GRADIENT_LIMIT_PERCENT`].
pub fn gradient(altitude_now: f64, altitude_then: f64, distance_delta_m: f64) -> f64 {
    if !(distance_delta_m > GRADIENT_MIN_DISTANCE_M) {
        return 0.0;
    }

    let grade = (altitude_now - altitude_then) / distance_delta_m * 100.0;
    match finite(grade) {
        Some(g) => round_to(g, 1).clamp(-GRADIENT_LIMIT_PERCENT, GRADIENT_LIMIT_PERCENT),
        None => 0.0,
    }
}

/// Aerobic efficiency (power to heart rate ratio), rounded to two decimals.
///
/// Absent when the rider is effectively stationary or no strap is worn.
pub fn efficiency(power_watts: f64, heart_rate_bpm: Option<f64>) -> Option<f64> {
    let hr = heart_rate_bpm?;
    if power_watts > EFFICIENCY_MIN_POWER_W && hr > EFFICIENCY_MIN_HR_BPM {
        finite(round_to(power_watts / hr, 2))
    } else {
        None
    }
}

/// Recovery time constant for the given power (seconds).
///
/// Lower power means deeper recovery and a shorter constant.
pub fn w_prime_tau(power_watts: f64, critical_power: f64) -> f64 {
    let under_cp = critical_power - power_watts;
    W_PRIME_TAU_AMPLITUDE_S * (-W_PRIME_TAU_DECAY * under_cp).exp() + W_PRIME_TAU_OFFSET_S
}

/// Advance the W' balance by `dt` seconds at `power_watts`.
///
/// Above CP the reserve depletes linearly; at or below CP the expended part
/// decays exponentially with a power-dependent time constant. The result is
/// always within `[0, w_prime_max]`.
pub fn update_w_prime_balance(
    balance: f64,
    power_watts: f64,
    dt: f64,
    critical_power: f64,
    w_prime_max: f64,
) -> f64 {
    let next = if power_watts > critical_power {
        balance - (power_watts - critical_power) * dt
    } else {
        let tau = w_prime_tau(power_watts, critical_power);
        let expended = w_prime_max - balance;
        w_prime_max - expended * (-dt / tau).exp()
    };

    match finite(next) {
        Some(b) => b.clamp(0.0, w_prime_max.max(0.0)),
        None => balance.clamp(0.0, w_prime_max.max(0.0)),
    }
}

/// Normalized Power, Intensity Factor and Training Stress Score.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StressMetrics {
    pub normalized_power: f64,
    pub intensity_factor: f64,
    pub training_stress_score: f64,
}

/// Compute load metrics from the fourth-power accumulator.
pub fn stress_metrics(
    sum_power_4th: f64,
    count: u64,
    critical_power: f64,
    duration_secs: f64,
) -> StressMetrics {
    if count == 0 {
        return StressMetrics::default();
    }

    let normalized_power = finite((sum_power_4th / count as f64).powf(0.25)).unwrap_or(0.0);

    let intensity_factor = if critical_power > 0.0 {
        normalized_power / critical_power
    } else {
        0.0
    };

    // TSS = (sec * NP * IF) / (CP * 3600) * 100
    let training_stress_score = if critical_power > 0.0 && duration_secs > 0.0 {
        duration_secs * normalized_power * intensity_factor / (critical_power * 3600.0) * 100.0
    } else {
        0.0
    };

    StressMetrics {
        normalized_power,
        intensity_factor: finite(intensity_factor).unwrap_or(0.0),
        training_stress_score: finite(training_stress_score).unwrap_or(0.0),
    }
}
