//! Course elevation enrichment.
//!
//! Remote lookups are rate limited, so only a bounded, evenly spaced subset
//! of course points is looked up and the rest are linearly interpolated by
//! cumulative distance. The lookup itself is behind [`ElevationProvider`].

use thiserror::Error;

use super::{Course, CoursePoint};
use crate::config::ElevationSettings;

/// Elevation lookup errors.
#[derive(Debug, Error)]
pub enum ElevationError {
    #[error("Elevation lookup failed: {0}")]
    LookupFailed(String),

    #[error("Elevation response has {got} values for {expected} coordinates")]
    LengthMismatch { expected: usize, got: usize },
}

/// Source of elevations for `(latitude, longitude)` pairs.
pub trait ElevationProvider {
    /// Return one elevation in meters per coordinate, in order.
    fn lookup(&self, coords: &[(f64, f64)]) -> Result<Vec<f64>, ElevationError>;
}

/// Evenly spaced indices covering `len` points with at most `max_samples`.
///
/// The first and last index are always included.
pub fn select_key_indices(len: usize, max_samples: usize) -> Vec<usize> {
    if max_samples == 0 {
        return Vec::new();
    }
    if len <= max_samples {
        return (0..len).collect();
    }
    if max_samples == 1 {
        return vec![len - 1];
    }

    let step = (len - 1) as f64 / (max_samples - 1) as f64;
    let mut indices: Vec<usize> = (0..max_samples)
        .map(|i| ((i as f64 * step).round() as usize).min(len - 1))
        .collect();

    if let Some(last) = indices.last_mut() {
        *last = len - 1;
    }
    indices
}

/// Apply fetched elevations and interpolate the points between them.
///
/// `fetched` is parallel to `points`. A missing first value is anchored at
/// 0 m. Points between two anchors are interpolated by cumulative distance;
/// anchors with no distance between them propagate the first anchor's value.
/// Points after the last anchor keep their current altitude.
pub fn interpolate_elevation(points: &mut [CoursePoint], fetched: &[Option<f64>]) {
    if points.is_empty() {
        return;
    }

    let mut last_anchor = 0;
    for i in 0..points.len() {
        let value = match fetched.get(i).copied().flatten() {
            Some(v) => v,
            None if i == 0 => 0.0,
            None => continue,
        };

        points[i].altitude = Some(value);
        fill_gap(points, last_anchor, i);
        last_anchor = i;
    }
}

fn fill_gap(points: &mut [CoursePoint], start: usize, end: usize) {
    if end <= start + 1 {
        return;
    }

    let start_alt = points[start].altitude.unwrap_or(0.0);
    let end_alt = points[end].altitude.unwrap_or(start_alt);
    let start_dist = points[start].cumulative_distance_m;
    let span = points[end].cumulative_distance_m - start_dist;

    for point in &mut points[start + 1..end] {
        point.altitude = if span <= 0.0 {
            Some(start_alt)
        } else {
            let fraction = (point.cumulative_distance_m - start_dist) / span;
            Some(start_alt + (end_alt - start_alt) * fraction)
        };
    }
}

/// Look up a subset of course points and interpolate the rest.
///
/// Failed chunks are logged and skipped. Returns the number of points that
/// received a looked-up elevation.
pub fn enrich_course_elevation<P: ElevationProvider>(
    course: &mut Course,
    provider: &P,
    settings: &ElevationSettings,
) -> usize {
    if course.is_empty() {
        return 0;
    }

    let indices = select_key_indices(course.len(), settings.max_samples);
    let mut fetched: Vec<Option<f64>> = vec![None; course.len()];
    let mut fetched_count = 0;

    for chunk in indices.chunks(settings.chunk_size.max(1)) {
        let coords: Vec<(f64, f64)> = chunk
            .iter()
            .map(|&i| {
                let p = &course.points()[i];
                (p.lat, p.lon)
            })
            .collect();

        let result = provider.lookup(&coords).and_then(|values| {
            if values.len() == coords.len() {
                Ok(values)
            } else {
                Err(ElevationError::LengthMismatch {
                    expected: coords.len(),
                    got: values.len(),
                })
            }
        });

        match result {
            Ok(values) => {
                for (&i, value) in chunk.iter().zip(values) {
                    if value.is_finite() {
                        fetched[i] = Some(value);
                        fetched_count += 1;
                    }
                }
            }
            Err(e) => {
                // Elevation is optional, keep going
                tracing::warn!("Failed to fetch elevation chunk: {}", e);
            }
        }
    }

    interpolate_elevation(course.points_mut(), &fetched);
    tracing::info!(
        "Elevation fetched for {} of {} course points",
        fetched_count,
        course.len()
    );
    fetched_count
}
