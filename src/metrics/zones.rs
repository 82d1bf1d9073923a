//! Power and heart rate zone thresholds.
//!
//! Power zones follow the Coggan 7-zone layout anchored on Critical Power;
//! heart rate zones come straight from the athlete's five configured upper
//! bounds.

use serde::{Deserialize, Serialize};

/// Number of heart rate zones.
pub const HR_ZONE_COUNT: usize = 5;

/// Number of power zones.
pub const POWER_ZONE_COUNT: usize = 7;

/// Upper bounds of power zones 1-6 as fractions of CP. Zone 7 is open-ended.
pub const POWER_ZONE_CP_FRACTIONS: [f64; POWER_ZONE_COUNT - 1] = [0.55, 0.75, 0.90, 1.05, 1.20, 1.50];

/// Index of the first zone whose upper bound is `>= value`, or the last zone.
pub fn zone_index(upper_bounds: &[f64], zone_count: usize, value: f64) -> usize {
    upper_bounds
        .iter()
        .position(|limit| value <= *limit)
        .unwrap_or(zone_count - 1)
        .min(zone_count - 1)
}

/// CP-derived power zones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PowerZones {
    /// Upper bound in watts of zones 1-6
    pub upper_bounds: [f64; POWER_ZONE_COUNT - 1],
}

impl PowerZones {
    /// Derive zones from Critical Power. Bounds are rounded to whole watts.
    pub fn from_critical_power(cp: f64) -> Self {
        let mut upper_bounds = [0.0; POWER_ZONE_COUNT - 1];
        for (bound, fraction) in upper_bounds.iter_mut().zip(POWER_ZONE_CP_FRACTIONS) {
            *bound = (cp * fraction).round();
        }
        Self { upper_bounds }
    }

    /// Zero-based zone index for a power value.
    pub fn zone_index(&self, watts: f64) -> usize {
        zone_index(&self.upper_bounds, POWER_ZONE_COUNT, watts)
    }

    /// One-based zone number (1-7) for a power value.
    pub fn get_zone(&self, watts: f64) -> u8 {
        self.zone_index(watts) as u8 + 1
    }
}

/// Heart rate zones from configured upper bounds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HrZones {
    /// Upper bound in bpm of zones 1-5 (ascending)
    pub upper_bounds: [f64; HR_ZONE_COUNT],
}

impl HrZones {
    pub fn from_upper_bounds(upper_bounds: [f64; HR_ZONE_COUNT]) -> Self {
        Self { upper_bounds }
    }

    /// Zero-based zone index; anything above the last bound is zone 5.
    pub fn zone_index(&self, bpm: f64) -> usize {
        zone_index(&self.upper_bounds, HR_ZONE_COUNT, bpm)
    }

    /// One-based zone number (1-5).
    pub fn get_zone(&self, bpm: f64) -> u8 {
        self.zone_index(bpm) as u8 + 1
    }

    /// Bounds are strictly ascending and finite.
    pub fn is_ascending(&self) -> bool {
        self.upper_bounds.iter().all(|b| b.is_finite())
            && self.upper_bounds.windows(2).all(|w| w[0] < w[1])
    }
}

impl Default for HrZones {
    fn default() -> Self {
        Self::from_upper_bounds([135.0, 150.0, 165.0, 178.0, 200.0])
    }
}
