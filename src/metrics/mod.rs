//! Metrics module for per-point derivation, zones and session aggregates.

pub mod engine;
pub mod physics;
pub mod smoothing;
pub mod zones;

pub use engine::{SessionStats, StatsEngine};
pub use smoothing::{RollingStats, RollingWindow};
pub use zones::{HrZones, PowerZones};
