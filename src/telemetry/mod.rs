//! Live telemetry: sample types, payload decoding and the ingestion store.

pub mod error;
pub mod raw;
pub mod store;
pub mod types;

pub use error::{TelemetryError, TelemetryResult};
pub use raw::parse_track_batch;
pub use store::{
    choose_strategy, IngestOutcome, IngestStrategy, SessionSummary, SkipReason, TelemetryStore,
};
pub use types::{GeoPosition, PointMetrics, TelemetrySample, Timestamp};
