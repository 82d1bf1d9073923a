//! Telemetry store and ingestion controller.
//!
//! Incoming samples are merged into an ordered map keyed by timestamp (last
//! write wins). Each batch is then applied in one of two ways:
//!
//! - **Incremental**: the batch lies strictly after the current tail, so it is
//!   appended and only the new suffix goes through the stats engine. Engine
//!   state (W' balance, accumulators) carries over untouched.
//! - **Rebuilding**: anything else (first batch, late or overlapping data).
//!   The ordered array is rebuilt from the map, the engine is reset and the
//!   whole array is reprocessed, since W' balance and rolling windows are
//!   path-dependent.
//!
//! Both paths produce identical derived fields for the same data.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::raw::parse_track_batch;
use super::types::{seconds_between, TelemetrySample, Timestamp};
use crate::config::AthleteProfile;
use crate::metrics::engine::{SessionStats, StatsEngine};

/// How a batch is applied to the ordered array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IngestStrategy {
    /// Append the batch and process only the new suffix
    Incremental,
    /// Rebuild the array from the store and reprocess everything
    Rebuilding,
}

impl fmt::Display for IngestStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IngestStrategy::Incremental => write!(f, "incremental"),
            IngestStrategy::Rebuilding => write!(f, "rebuilding"),
        }
    }
}

/// Pick a strategy from the current tail and the first incoming timestamp.
pub fn choose_strategy(last_timestamp: Option<Timestamp>, first_incoming: Timestamp) -> IngestStrategy {
    match last_timestamp {
        Some(tail) if first_incoming > tail => IngestStrategy::Incremental,
        _ => IngestStrategy::Rebuilding,
    }
}

/// Why a batch changed nothing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SkipReason {
    /// The batch had no samples
    EmptyBatch,
    /// The payload could not be decoded
    Malformed(String),
}

/// Result of one ingestion call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum IngestOutcome {
    /// New points were appended starting at `start_index`
    Appended { start_index: usize, added: usize },
    /// The array was rebuilt and fully reprocessed
    Rebuilt { point_count: usize },
    /// Nothing changed
    Skipped(SkipReason),
}

impl IngestOutcome {
    /// First index whose derived fields changed, if any.
    pub fn dirty_from(&self) -> Option<usize> {
        match self {
            IngestOutcome::Appended { start_index, .. } => Some(*start_index),
            IngestOutcome::Rebuilt { .. } => Some(0),
            IngestOutcome::Skipped(_) => None,
        }
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, IngestOutcome::Skipped(_))
    }
}

/// Session aggregates plus the whole-array figures consumers display.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    /// Seconds between the first and last sample
    pub duration_secs: f64,
    /// Live-track distance at the last sample in meters
    pub distance_m: f64,
    /// Total work rounded to kilojoules
    pub work_kj: f64,
    /// Number of points in the ordered array
    pub point_count: usize,
    /// Engine aggregates
    #[serde(flatten)]
    pub stats: SessionStats,
}

/// Callback receiving the enriched array and the session summary.
pub type Subscriber = Box<dyn FnMut(&[TelemetrySample], &SessionSummary) + Send>;

/// Owns the deduplicated samples, the ordered enriched array and the engine.
pub struct TelemetryStore {
    /// Raw samples keyed by timestamp
    raw: BTreeMap<Timestamp, TelemetrySample>,
    /// Ordered, enriched points
    points: Vec<TelemetrySample>,
    /// Stats engine
    engine: StatsEngine,
    /// Latest summary
    summary: SessionSummary,
    /// Registered listeners
    subscribers: Vec<Subscriber>,
}

impl TelemetryStore {
    /// Create an empty store for the given athlete.
    pub fn new(profile: AthleteProfile) -> Self {
        Self {
            raw: BTreeMap::new(),
            points: Vec::new(),
            engine: StatsEngine::new(profile),
            summary: SessionSummary::default(),
            subscribers: Vec::new(),
        }
    }

    /// The ordered, enriched points.
    pub fn points(&self) -> &[TelemetrySample] {
        &self.points
    }

    /// Mutable view for processors that own a disjoint set of fields.
    pub(crate) fn points_mut(&mut self) -> &mut [TelemetrySample] {
        &mut self.points
    }

    pub fn summary(&self) -> &SessionSummary {
        &self.summary
    }

    pub fn engine(&self) -> &StatsEngine {
        &self.engine
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Timestamp of the last point in the ordered array.
    pub fn last_timestamp(&self) -> Option<Timestamp> {
        self.points.last().map(|p| p.timestamp)
    }

    /// Register a listener called after every effective ingestion.
    pub fn subscribe<F>(&mut self, callback: F)
    where
        F: FnMut(&[TelemetrySample], &SessionSummary) + Send + 'static,
    {
        self.subscribers.push(Box::new(callback));
    }

    /// Merge a batch, recompute and notify subscribers.
    pub fn ingest(&mut self, batch: Vec<TelemetrySample>) -> IngestOutcome {
        let outcome = self.apply(batch);
        if !outcome.is_skipped() {
            self.notify();
        }
        outcome
    }

    /// Decode a JSON batch and ingest it. Malformed payloads are a logged no-op.
    pub fn ingest_json(&mut self, json: &str) -> IngestOutcome {
        match parse_track_batch(json) {
            Ok(batch) => self.ingest(batch),
            Err(e) => {
                tracing::warn!("Ignoring telemetry batch: {}", e);
                IngestOutcome::Skipped(SkipReason::Malformed(e.to_string()))
            }
        }
    }

    /// Merge a batch and recompute without notifying subscribers.
    pub fn apply(&mut self, batch: Vec<TelemetrySample>) -> IngestOutcome {
        let Some(first) = batch.first() else {
            tracing::debug!("Ignoring empty telemetry batch");
            return IngestOutcome::Skipped(SkipReason::EmptyBatch);
        };

        let mut strategy = choose_strategy(self.last_timestamp(), first.timestamp);
        if strategy == IngestStrategy::Incremental && !is_strictly_ascending(&batch) {
            tracing::debug!("Batch is not internally ordered, rebuilding instead of appending");
            strategy = IngestStrategy::Rebuilding;
        }
        tracing::debug!("Applying batch of {} samples ({})", batch.len(), strategy);

        let outcome = match strategy {
            IngestStrategy::Incremental => self.append(batch),
            IngestStrategy::Rebuilding => self.rebuild(batch),
        };

        self.refresh_summary();
        outcome
    }

    /// Call every subscriber with the current state.
    pub fn notify(&mut self) {
        let points = &self.points;
        let summary = &self.summary;
        for subscriber in self.subscribers.iter_mut() {
            subscriber(points, summary);
        }
    }

    /// Drop all data and reset the engine, keeping subscribers.
    pub fn clear(&mut self) {
        self.raw.clear();
        self.points.clear();
        self.engine.reset();
        self.summary = SessionSummary::default();
    }

    fn append(&mut self, batch: Vec<TelemetrySample>) -> IngestOutcome {
        let start_index = self.points.len();

        for mut sample in batch {
            sample.clear_derived();
            self.raw.insert(sample.timestamp, sample.clone());
            self.points.push(sample);
        }

        self.engine.process_points(&mut self.points, start_index);

        let added = self.points.len() - start_index;
        tracing::debug!("Appended {} points at index {}", added, start_index);
        IngestOutcome::Appended { start_index, added }
    }

    fn rebuild(&mut self, batch: Vec<TelemetrySample>) -> IngestOutcome {
        let incoming = batch.len();
        for mut sample in batch {
            sample.clear_derived();
            self.raw.insert(sample.timestamp, sample);
        }

        self.points = self.raw.values().cloned().collect();
        self.engine.reset();
        self.engine.process_points(&mut self.points, 0);

        tracing::info!(
            "Rebuilt telemetry array: {} points after merging {} incoming",
            self.points.len(),
            incoming
        );
        IngestOutcome::Rebuilt {
            point_count: self.points.len(),
        }
    }

    fn refresh_summary(&mut self) {
        let duration_secs = match (self.points.first(), self.points.last()) {
            (Some(first), Some(last)) => seconds_between(&first.timestamp, &last.timestamp).max(0.0),
            _ => 0.0,
        };
        let stats = self.engine.global_stats(duration_secs);

        self.summary = SessionSummary {
            duration_secs,
            distance_m: self
                .points
                .last()
                .map(|p| p.metrics.total_distance_m)
                .unwrap_or(0.0),
            work_kj: (stats.total_work_joules / 1000.0).round(),
            point_count: self.points.len(),
            stats,
        };
    }
}

fn is_strictly_ascending(batch: &[TelemetrySample]) -> bool {
    batch.windows(2).all(|w| w[0].timestamp < w[1].timestamp)
}
