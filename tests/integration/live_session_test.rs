//! Integration tests for the live session fed with JSON payloads.

use std::sync::{Arc, Mutex};

use chrono::{Duration, SecondsFormat};
use ridetrace::config::{AthleteProfile, EngineConfig};
use ridetrace::course::parse_course;
use ridetrace::session::LiveSession;
use ridetrace::telemetry::IngestOutcome;
use serde_json::{json, Value};

use super::fixtures::{start_time, M_PER_DEG};

fn track_point(secs: i64, x_m: f64, watts: f64, hr: f64) -> Value {
    let time = (start_time() + Duration::seconds(secs)).to_rfc3339_opts(SecondsFormat::Secs, true);
    json!({
        "dateTime": time,
        "position": { "lat": 0.0, "lon": x_m / M_PER_DEG },
        "altitude": 100.0 + x_m / 100.0,
        "powerWatts": watts,
        "heartRateBeatsPerMin": hr,
        "cadenceCyclesPerMin": 90
    })
}

fn batch(range: std::ops::Range<i64>) -> String {
    let points: Vec<Value> = range.map(|t| track_point(t, t as f64 * 8.0, 250.0, 145.0)).collect();
    json!({ "trackPoints": points }).to_string()
}

fn course_json(length_m: f64) -> String {
    let points: Vec<Value> = (0..=(length_m / 10.0) as i64)
        .map(|i| json!({ "lat": 0.0, "lon": i as f64 * 10.0 / M_PER_DEG, "elevation": 100.0 + i as f64 / 10.0 }))
        .collect();
    json!({ "geoPoints": points }).to_string()
}

fn config() -> EngineConfig {
    EngineConfig {
        athlete: AthleteProfile::new(250.0, 18_000.0),
        ..Default::default()
    }
}

#[test]
fn test_json_batches_build_enriched_track() {
    let mut session = LiveSession::new(&config());
    session.load_course(parse_course(&course_json(2000.0)).unwrap());

    assert!(matches!(session.ingest_json(&batch(0..60)), IngestOutcome::Rebuilt { .. }));
    assert!(matches!(session.ingest_json(&batch(60..120)), IngestOutcome::Appended { .. }));

    let points = session.points();
    assert_eq!(points.len(), 120);

    let last = &points[119];
    assert!((last.metrics.total_distance_m - 952.0).abs() < 0.5);
    assert!((last.course_distance_km.unwrap() - 0.950).abs() < 0.011);
    assert_eq!(last.metrics.smoothed_power_watts, 250.0);
    assert_eq!(last.metrics.efficiency, Some(1.72));
    // Riding exactly at CP never touches W'
    assert_eq!(last.metrics.energy_reserve_joules, 18_000.0);

    let summary = session.summary();
    assert_eq!(summary.point_count, 120);
    assert_eq!(summary.duration_secs, 119.0);
    assert!(summary.stats.total_elevation_gain_m > 9.0);
}

#[test]
fn test_subscribers_notified_per_effective_change() {
    let mut session = LiveSession::new(&config());
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    session.subscribe(move |snapshot| {
        sink.lock()
            .unwrap()
            .push((snapshot.points.len(), snapshot.summary.point_count, snapshot.course_loaded));
    });

    session.ingest_json(&batch(0..10));
    session.ingest_json("{ broken");
    session.ingest_json(r#"{"trackPoints": [{"powerWatts": 100}]}"#);
    session.load_course(parse_course(&course_json(500.0)).unwrap());
    session.ingest_json(&batch(10..20));

    assert_eq!(
        *seen.lock().unwrap(),
        vec![(10, 10, false), (10, 10, true), (20, 20, true)]
    );
}

#[test]
fn test_duplicate_batch_is_idempotent() {
    let mut session = LiveSession::new(&config());
    session.load_course(parse_course(&course_json(1000.0)).unwrap());
    session.ingest_json(&batch(0..30));
    let before = session.points().to_vec();
    let summary_before = session.summary().clone();

    let outcome = session.ingest_json(&batch(0..30));

    assert_eq!(outcome, IngestOutcome::Rebuilt { point_count: 30 });
    assert_eq!(session.points(), before.as_slice());
    assert_eq!(session.summary(), &summary_before);
}

#[test]
fn test_snapshot_serializes() {
    let mut session = LiveSession::new(&config());
    session.ingest_json(&batch(0..5));

    let value = serde_json::to_value(session.snapshot()).unwrap();
    assert_eq!(value["points"].as_array().unwrap().len(), 5);
    assert_eq!(value["summary"]["point_count"], 5);
    assert_eq!(value["course_loaded"], false);
}
