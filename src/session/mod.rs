//! Live session: one activity's telemetry store plus course projection.
//!
//! The session is the single writer for its data. Batches and course loads
//! go through `&mut self`, so a host that receives batches concurrently must
//! serialize calls (e.g. hold the session behind a mutex or feed it from one
//! task).

use serde::Serialize;
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::course::{Course, CourseMatcher};
use crate::telemetry::raw::parse_track_batch;
use crate::telemetry::store::{IngestOutcome, SessionSummary, SkipReason, TelemetryStore};
use crate::telemetry::types::TelemetrySample;

/// Read-only view handed to subscribers.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct SessionSnapshot<'a> {
    /// Enriched, ordered live points
    pub points: &'a [TelemetrySample],
    /// Session aggregates
    pub summary: &'a SessionSummary,
    /// Whether `course_distance_km` is being produced
    pub course_loaded: bool,
}

type SnapshotSubscriber = Box<dyn FnMut(&SessionSnapshot<'_>) + Send>;

/// One tracked activity.
pub struct LiveSession {
    /// Session identifier (for logs)
    id: Uuid,
    /// Telemetry store and stats engine
    store: TelemetryStore,
    /// Course projection
    matcher: CourseMatcher,
    /// Registered listeners
    subscribers: Vec<SnapshotSubscriber>,
}

impl LiveSession {
    /// Start an empty session.
    pub fn new(config: &EngineConfig) -> Self {
        let id = Uuid::new_v4();
        tracing::info!(
            session = %id,
            "Session started (CP {} W, W' {} J)",
            config.athlete.critical_power_watts,
            config.athlete.w_prime_joules
        );

        Self {
            id,
            store: TelemetryStore::new(config.athlete.clone()),
            matcher: CourseMatcher::new(config.course.clone()),
            subscribers: Vec::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn points(&self) -> &[TelemetrySample] {
        self.store.points()
    }

    pub fn summary(&self) -> &SessionSummary {
        self.store.summary()
    }

    pub fn store(&self) -> &TelemetryStore {
        &self.store
    }

    pub fn matcher(&self) -> &CourseMatcher {
        &self.matcher
    }

    pub fn course(&self) -> Option<&Course> {
        self.matcher.has_course().then(|| self.matcher.course())
    }

    /// Current state for consumers.
    pub fn snapshot(&self) -> SessionSnapshot<'_> {
        SessionSnapshot {
            points: self.store.points(),
            summary: self.store.summary(),
            course_loaded: self.matcher.has_course(),
        }
    }

    /// Register a listener called after every effective change.
    pub fn subscribe<F>(&mut self, callback: F)
    where
        F: FnMut(&SessionSnapshot<'_>) + Send + 'static,
    {
        self.subscribers.push(Box::new(callback));
    }

    /// Load (or replace) the planned course and re-project all live points.
    pub fn load_course(&mut self, course: Course) {
        tracing::info!(session = %self.id, "Loading course with {} points", course.len());
        self.matcher.set_course(course);

        let points = self.store.points_mut();
        for point in points.iter_mut() {
            point.course_distance_km = None;
        }
        self.matcher.process_points(points, 0);
        self.notify();
    }

    /// Merge a batch, recompute metrics and course distances, notify.
    pub fn ingest(&mut self, batch: Vec<TelemetrySample>) -> IngestOutcome {
        let outcome = self.store.apply(batch);
        let Some(dirty_from) = outcome.dirty_from() else {
            return outcome;
        };

        // Rebuilt arrays are reprojected from scratch
        if dirty_from == 0 {
            self.matcher.reset();
        }
        self.matcher.process_points(self.store.points_mut(), dirty_from);

        tracing::debug!(
            session = %self.id,
            "Ingested batch: {:?}, {} points total",
            outcome,
            self.store.len()
        );
        self.notify();
        outcome
    }

    /// Decode a JSON batch and ingest it. Malformed payloads are a logged no-op.
    pub fn ingest_json(&mut self, json: &str) -> IngestOutcome {
        match parse_track_batch(json) {
            Ok(batch) => self.ingest(batch),
            Err(e) => {
                tracing::warn!(session = %self.id, "Ignoring telemetry batch: {}", e);
                IngestOutcome::Skipped(SkipReason::Malformed(e.to_string()))
            }
        }
    }

    fn notify(&mut self) {
        let snapshot = SessionSnapshot {
            points: self.store.points(),
            summary: self.store.summary(),
            course_loaded: self.matcher.has_course(),
        };
        for subscriber in self.subscribers.iter_mut() {
            subscriber(&snapshot);
        }
    }
}
