//! RideTrace - live cycling telemetry engine
//!
//! Ingests batches of ride samples that may arrive late or duplicated,
//! derives per-point physiology (smoothed power, W' balance, gradient, VAM)
//! and session aggregates (NP, IF, TSS, zone times), and projects the live
//! track onto a planned course.

pub mod config;
pub mod course;
pub mod metrics;
pub mod session;
pub mod telemetry;

// Re-export commonly used types
pub use config::{AthleteProfile, EngineConfig};
pub use course::{Course, CourseMatcher};
pub use metrics::engine::StatsEngine;
pub use session::{LiveSession, SessionSnapshot};
pub use telemetry::store::{IngestOutcome, SessionSummary, TelemetryStore};
pub use telemetry::types::TelemetrySample;
