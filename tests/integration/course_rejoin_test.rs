//! Integration tests for off-course excursions and rejoin interpolation.

use ridetrace::config::EngineConfig;
use ridetrace::course::{CourseMatcher, MatchState};
use ridetrace::session::LiveSession;
use ridetrace::telemetry::TelemetrySample;

use super::fixtures::{sample_at, straight_course};

/// On course to 200 m, a detour ~80-100 m north, rejoin at 260 m, then on to 300 m.
fn detour_ride() -> Vec<TelemetrySample> {
    let mut ride: Vec<TelemetrySample> = (0..=10)
        .map(|i| sample_at(i, i as f64 * 20.0, 0.0).with_power(220.0))
        .collect();

    let detour = [(205.0, 80.0), (215.0, 100.0), (230.0, 100.0), (245.0, 100.0), (255.0, 80.0)];
    for (k, (x, y)) in detour.iter().enumerate() {
        ride.push(sample_at(11 + k as i64, *x, *y).with_power(220.0));
    }

    ride.push(sample_at(16, 260.0, 0.0).with_power(220.0));
    ride.push(sample_at(17, 280.0, 0.0).with_power(220.0));
    ride.push(sample_at(18, 300.0, 0.0).with_power(220.0));
    ride
}

fn course_km(points: &[TelemetrySample]) -> Vec<f64> {
    points.iter().map(|p| p.course_distance_km.unwrap()).collect()
}

fn assert_rejoin_continuity(km: &[f64]) {
    let exit = km[10];
    let entry = km[16];
    assert!((exit - 0.200).abs() < 0.001);
    assert!((entry - 0.260).abs() < 0.001);

    for value in &km[11..16] {
        assert!(*value > exit && *value < entry, "{} not within ({}, {})", value, exit, entry);
    }
    assert!(km.windows(2).all(|w| w[1] > w[0]));
}

#[test]
fn test_rejoin_interpolates_buffered_points() {
    let mut matcher = CourseMatcher::with_defaults();
    matcher.set_course(straight_course(1000.0, 10.0));

    let mut points = detour_ride();
    matcher.process_points(&mut points[..16], 0);

    // Still out: dead-reckoned values run ahead of the course
    assert_eq!(matcher.state(), MatchState::OffCourse);
    assert_eq!(matcher.buffered_len(), 5);
    let reckoned = points[15].course_distance_km.unwrap();
    assert!(reckoned > 0.300);

    matcher.process_points(&mut points, 16);

    assert_eq!(matcher.state(), MatchState::OnCourse);
    assert_eq!(matcher.buffered_len(), 0);
    assert_rejoin_continuity(&course_km(&points));
}

#[test]
fn test_rejoin_across_session_batches() {
    let ride = detour_ride();
    let mut session = LiveSession::new(&EngineConfig::default());
    session.load_course(straight_course(1000.0, 10.0));

    session.ingest(ride[..13].to_vec());
    session.ingest(ride[13..17].to_vec());
    session.ingest(ride[17..].to_vec());

    assert_rejoin_continuity(&course_km(session.points()));
}

#[test]
fn test_late_batch_during_detour_reprojects_from_start() {
    let ride = detour_ride();

    let mut in_order = LiveSession::new(&EngineConfig::default());
    in_order.load_course(straight_course(1000.0, 10.0));
    in_order.ingest(ride.clone());

    let mut late = LiveSession::new(&EngineConfig::default());
    late.load_course(straight_course(1000.0, 10.0));
    late.ingest(ride[..12].to_vec());
    late.ingest(ride[14..].to_vec());
    late.ingest(ride[12..14].to_vec());

    assert_eq!(course_km(late.points()), course_km(in_order.points()));
    assert_eq!(late.points(), in_order.points());
}

#[test]
fn test_points_without_position_keep_no_course_distance() {
    let mut session = LiveSession::new(&EngineConfig::default());
    session.load_course(straight_course(500.0, 10.0));

    let indoor = TelemetrySample::new(super::fixtures::start_time()).with_power(180.0);
    session.ingest(vec![indoor, sample_at(1, 50.0, 0.0)]);

    assert_eq!(session.points()[0].course_distance_km, None);
    assert!((session.points()[1].course_distance_km.unwrap() - 0.050).abs() < 0.001);
}
