//! Telemetry error types.

use thiserror::Error;

/// Errors raised while decoding raw payloads.
///
/// Only whole-payload problems are errors; a bad field or a bad point inside
/// an otherwise valid payload is dropped instead.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// Payload is not valid JSON or has the wrong top-level shape.
    #[error("Malformed payload: {0}")]
    MalformedPayload(#[from] serde_json::Error),

    /// Payload decoded but contained no usable points.
    #[error("Empty payload: {0}")]
    EmptyPayload(String),
}

/// Result type for telemetry decoding.
pub type TelemetryResult<T> = Result<T, TelemetryError>;
