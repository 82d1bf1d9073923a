//! Projection of live positions onto the planned course.
//!
//! Each positioned live point gets a distance along the course. While the
//! rider is within the off-course threshold of the route, the distance is
//! that of the nearest course point ahead of the last match. Once off
//! course, distance advances by the distance actually ridden (dead
//! reckoning). On rejoin the buffered off-course points are re-projected by
//! linear interpolation between the exit and entry course distances, so the
//! series stays continuous and monotonic across the excursion.
//!
//! The matcher writes only `course_distance_km` on live points.

use serde::{Deserialize, Serialize};

use super::Course;
use crate::config::CourseSettings;
use crate::telemetry::types::{GeoPosition, TelemetrySample};

/// Matcher state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MatchState {
    /// Last positioned point was within the threshold of the course
    #[default]
    OnCourse,
    /// Last positioned point was beyond the threshold
    OffCourse,
}

/// Nearest course point found for a live position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CourseMatch {
    /// Index into the course points
    pub index: usize,
    /// Distance from the live position in meters
    pub distance_m: f64,
}

/// Assigns distance-along-course to live points.
#[derive(Debug, Clone)]
pub struct CourseMatcher {
    /// Loaded course
    course: Course,
    /// Threshold and search window
    settings: CourseSettings,
    /// Current state
    state: MatchState,
    /// Course index of the last on-course match; never moves backward
    last_match_index: usize,
    /// Live indices of points seen since leaving the course
    off_course_buffer: Vec<usize>,
    /// Course distance at the last on-course match (meters)
    exit_course_dist_m: f64,
    /// Distance ridden since leaving the course (meters)
    dist_since_exit_m: f64,
    /// Position of the last on-course live point
    exit_position: Option<GeoPosition>,
    /// Position of the last positioned live point processed
    last_position: Option<GeoPosition>,
}

impl CourseMatcher {
    /// Create a matcher with no course loaded.
    pub fn new(settings: CourseSettings) -> Self {
        Self {
            course: Course::default(),
            settings,
            state: MatchState::OnCourse,
            last_match_index: 0,
            off_course_buffer: Vec::new(),
            exit_course_dist_m: 0.0,
            dist_since_exit_m: 0.0,
            exit_position: None,
            last_position: None,
        }
    }

    /// Create a matcher with default threshold (70 m) and window (500 points).
    pub fn with_defaults() -> Self {
        Self::new(CourseSettings::default())
    }

    /// Load a course and reset all matching state.
    pub fn set_course(&mut self, course: Course) {
        tracing::info!(
            "Course loaded: {} points, {:.0} m",
            course.len(),
            course.total_distance_m()
        );
        self.course = course;
        self.reset();
    }

    pub fn course(&self) -> &Course {
        &self.course
    }

    pub fn has_course(&self) -> bool {
        !self.course.is_empty()
    }

    pub fn state(&self) -> MatchState {
        self.state
    }

    pub fn last_match_index(&self) -> usize {
        self.last_match_index
    }

    /// Number of live points currently buffered off course.
    pub fn buffered_len(&self) -> usize {
        self.off_course_buffer.len()
    }

    /// Return to the initial on-course state at course index 0.
    pub fn reset(&mut self) {
        self.state = MatchState::OnCourse;
        self.last_match_index = 0;
        self.off_course_buffer.clear();
        self.exit_course_dist_m = 0.0;
        self.dist_since_exit_m = 0.0;
        self.exit_position = None;
        self.last_position = None;
    }

    /// Project `live_points[start_index..]` onto the course.
    ///
    /// Calling this again from index 0 requires a [`reset`](Self::reset)
    /// first. Without a course this is a no-op; points without a position
    /// are skipped.
    pub fn process_points(&mut self, live_points: &mut [TelemetrySample], start_index: usize) {
        if !self.has_course() {
            return;
        }

        for i in start_index..live_points.len() {
            let Some(position) = live_points[i].position else {
                continue;
            };
            let Some(found) = self.find_best_match(&position) else {
                continue;
            };

            if found.distance_m <= self.settings.max_off_course_m {
                if self.state == MatchState::OffCourse {
                    self.resolve_gap(live_points, found.index, &position);
                    tracing::debug!(
                        "Rejoined course at index {} after {:.0} m off course",
                        found.index,
                        self.dist_since_exit_m
                    );
                    self.state = MatchState::OnCourse;
                }

                let course_dist = self.course.points()[found.index].cumulative_distance_m;
                self.last_match_index = found.index;
                self.exit_course_dist_m = course_dist;
                self.dist_since_exit_m = 0.0;
                self.exit_position = Some(position);
                live_points[i].course_distance_km = Some(course_dist / 1000.0);
            } else {
                if self.state == MatchState::OnCourse {
                    tracing::debug!(
                        "Left course at {:.0} m ({:.0} m from route)",
                        self.exit_course_dist_m,
                        found.distance_m
                    );
                    self.state = MatchState::OffCourse;
                }

                if let Some(prev) = self.last_position {
                    self.dist_since_exit_m += prev.distance_to(&position);
                }
                self.off_course_buffer.push(i);
                live_points[i].course_distance_km =
                    Some((self.exit_course_dist_m + self.dist_since_exit_m) / 1000.0);
            }

            self.last_position = Some(position);
        }
    }

    /// Nearest course point in the forward search window.
    pub fn find_best_match(&self, position: &GeoPosition) -> Option<CourseMatch> {
        let points = self.course.points();
        let end = points
            .len()
            .min(self.last_match_index.saturating_add(self.settings.search_window));

        points
            .get(self.last_match_index..end)?
            .iter()
            .enumerate()
            .map(|(offset, cp)| CourseMatch {
                index: self.last_match_index + offset,
                distance_m: position.distance_to(&cp.position()),
            })
            .fold(None, |best: Option<CourseMatch>, candidate| match best {
                Some(b) if b.distance_m <= candidate.distance_m => Some(b),
                _ => Some(candidate),
            })
    }

    /// Re-project buffered off-course points between the exit and entry
    /// course distances, proportionally to the distance ridden.
    fn resolve_gap(
        &mut self,
        live_points: &mut [TelemetrySample],
        entry_index: usize,
        rejoin_position: &GeoPosition,
    ) {
        let buffer = std::mem::take(&mut self.off_course_buffer);
        if buffer.is_empty() {
            return;
        }

        let course = self.course.points();
        let start_dist = course[self.last_match_index].cumulative_distance_m;
        let end_dist = course[entry_index].cumulative_distance_m;
        let gap = end_dist - start_dist;

        if gap <= 0.0 {
            for &idx in &buffer {
                live_points[idx].course_distance_km = Some(end_dist / 1000.0);
            }
            return;
        }

        let mut ridden = 0.0;
        let mut prev = self.exit_position;
        let mut cumulative = Vec::with_capacity(buffer.len());
        for &idx in &buffer {
            if let Some(pos) = live_points[idx].position {
                if let Some(p) = prev {
                    ridden += p.distance_to(&pos);
                }
                prev = Some(pos);
            }
            cumulative.push(ridden);
        }
        if let Some(p) = prev {
            ridden += p.distance_to(rejoin_position);
        }

        let total = if ridden > 0.0 { ridden } else { 1.0 };
        for (&idx, travelled) in buffer.iter().zip(cumulative) {
            let projected = start_dist + travelled / total * gap;
            live_points[idx].course_distance_km = Some(projected / 1000.0);
        }
    }
}

impl Default for CourseMatcher {
    fn default() -> Self {
        Self::with_defaults()
    }
}
