//! Integration tests for batch ingestion and derived metrics.

use ridetrace::config::AthleteProfile;
use ridetrace::telemetry::{IngestOutcome, TelemetrySample, TelemetryStore};

use super::fixtures::{interval_ride, sample_at};

fn profile() -> AthleteProfile {
    AthleteProfile::new(280.0, 20_000.0)
}

fn ingest_in_chunks(samples: &[TelemetrySample], size: usize) -> TelemetryStore {
    let mut store = TelemetryStore::new(profile());
    for chunk in samples.chunks(size) {
        store.ingest(chunk.to_vec());
    }
    store
}

#[test]
fn test_chunked_append_matches_single_batch() {
    let ride = interval_ride(600);

    let mut whole = TelemetryStore::new(profile());
    whole.ingest(ride.clone());

    let chunked = ingest_in_chunks(&ride, 37);

    assert_eq!(chunked.points(), whole.points());
    assert_eq!(chunked.summary(), whole.summary());
    assert_eq!(chunked.engine().energy_reserve(), whole.engine().energy_reserve());
}

#[test]
fn test_out_of_order_batches_match_single_batch() {
    let ride = interval_ride(400);

    let mut whole = TelemetryStore::new(profile());
    whole.ingest(ride.clone());

    let mut shuffled = TelemetryStore::new(profile());
    let chunks: Vec<Vec<TelemetrySample>> = ride.chunks(50).map(|c| c.to_vec()).collect();
    for idx in [3, 0, 7, 1, 2, 6, 4, 5] {
        shuffled.ingest(chunks[idx].clone());
    }

    assert_eq!(shuffled.points(), whole.points());
    assert_eq!(shuffled.summary(), whole.summary());
}

#[test]
fn test_append_after_rebuild_reports_suffix() {
    let ride = interval_ride(120);
    let mut store = TelemetryStore::new(profile());

    assert_eq!(
        store.ingest(ride[..60].to_vec()),
        IngestOutcome::Rebuilt { point_count: 60 }
    );
    assert_eq!(
        store.ingest(ride[60..].to_vec()),
        IngestOutcome::Appended {
            start_index: 60,
            added: 60
        }
    );
}

#[test]
fn test_energy_reserve_stays_bounded() {
    let mut store = TelemetryStore::new(profile());
    let sprint: Vec<TelemetrySample> = (0..900)
        .map(|t| sample_at(t, 0.0, 0.0).with_power(if t < 600 { 700.0 } else { 0.0 }))
        .collect();
    store.ingest(sprint);

    for point in store.points() {
        let reserve = point.metrics.energy_reserve_joules;
        assert!((0.0..=20_000.0).contains(&reserve));
    }
    // Ten minutes far above CP empties the tank
    assert_eq!(store.points()[599].metrics.energy_reserve_joules, 0.0);
    assert!(store.points()[899].metrics.energy_reserve_joules > 0.0);
}

#[test]
fn test_zone_times_sum_to_duration() {
    let mut store = TelemetryStore::new(profile());
    store.ingest(interval_ride(300));

    let summary = store.summary();
    let power_total: f64 = summary.stats.time_in_power_zones.iter().sum();
    let hr_total: f64 = summary.stats.time_in_hr_zones.iter().sum();

    assert_eq!(summary.duration_secs, 299.0);
    assert!((power_total - 299.0).abs() < 1e-9);
    assert!((hr_total - 299.0).abs() < 1e-9);
}

#[test]
fn test_zone_times_skip_missing_sensors() {
    let mut store = TelemetryStore::new(profile());
    let coasting: Vec<TelemetrySample> = (0..60).map(|t| sample_at(t, t as f64 * 5.0, 0.0)).collect();
    store.ingest(coasting);

    let summary = store.summary();
    assert_eq!(summary.stats.time_in_power_zones.iter().sum::<f64>(), 0.0);
    assert_eq!(summary.stats.time_in_hr_zones.iter().sum::<f64>(), 0.0);
    assert_eq!(summary.stats.normalized_power, 0.0);
}

#[test]
fn test_distance_is_monotonic() {
    let mut store = TelemetryStore::new(profile());
    // Back and forth along the equator, with GPS jitter below the noise floor
    let wander: Vec<TelemetrySample> = (0..200)
        .map(|t| {
            let x = if t % 50 < 25 { (t % 50) as f64 * 6.0 } else { (50 - t % 50) as f64 * 6.0 };
            sample_at(t, x + if t % 2 == 0 { 0.2 } else { 0.0 }, 0.0).with_power(200.0)
        })
        .collect();
    store.ingest(wander);

    let points = store.points();
    assert!(points
        .windows(2)
        .all(|w| w[1].metrics.total_distance_m >= w[0].metrics.total_distance_m));
    assert!(points[199].metrics.total_distance_m > 0.0);
    assert!((points[199].metrics.distance_km * 1000.0 - points[199].metrics.total_distance_m).abs() < 1e-9);
}

#[test]
fn test_native_distance_preferred() {
    let mut store = TelemetryStore::new(profile());
    store.ingest(vec![
        sample_at(0, 0.0, 0.0).with_native_distance(1000.0),
        sample_at(1, 100.0, 0.0).with_native_distance(1010.0),
        sample_at(2, 200.0, 0.0).with_native_distance(1005.0),
    ]);

    let distances: Vec<f64> = store.points().iter().map(|p| p.metrics.total_distance_m).collect();
    assert_eq!(distances, vec![1000.0, 1010.0, 1010.0]);
}

#[test]
fn test_gradient_is_clamped() {
    let mut store = TelemetryStore::new(profile());
    // 20 m of climbing per 12 m ridden
    let wall: Vec<TelemetrySample> = (0..60)
        .map(|t| sample_at(t, t as f64 * 12.0, 0.0).with_altitude(100.0 + t as f64 * 20.0))
        .collect();
    store.ingest(wall);

    for point in store.points() {
        let grade = point.metrics.gradient_percent.unwrap();
        assert!((-30.0..=30.0).contains(&grade));
    }
    assert_eq!(store.points()[59].metrics.gradient_percent, Some(30.0));
    assert_eq!(store.points()[59].metrics.climb_rate_m_per_h, Some(5000.0));
}

#[test]
fn test_missing_altitude_leaves_climb_fields_absent() {
    let mut store = TelemetryStore::new(profile());
    store.ingest((0..10).map(|t| sample_at(t, t as f64 * 8.0, 0.0)).collect());

    for point in store.points() {
        assert_eq!(point.metrics.gradient_percent, None);
        assert_eq!(point.metrics.climb_rate_m_per_h, None);
    }
    assert_eq!(store.summary().stats.total_elevation_gain_m, 0.0);
}

#[test]
fn test_load_metrics_for_steady_cp_effort() {
    let mut store = TelemetryStore::new(profile());
    store.ingest((0..3601).map(|t| sample_at(t, 0.0, 0.0).with_power(280.0)).collect());

    let stats = &store.summary().stats;
    assert!((stats.normalized_power - 280.0).abs() < 1e-6);
    assert!((stats.intensity_factor - 1.0).abs() < 1e-9);
    assert!((stats.training_stress_score - 100.0).abs() < 1e-6);
    assert_eq!(store.summary().work_kj, 1008.0);
}

#[test]
fn test_non_finite_power_does_not_poison_totals() {
    let mut store = TelemetryStore::new(profile());
    store.ingest(vec![
        sample_at(0, 0.0, 0.0).with_power(200.0),
        sample_at(1, 0.0, 0.0).with_power(f64::NAN),
        sample_at(2, 0.0, 0.0).with_power(200.0),
    ]);
    store.ingest(vec![sample_at(3, 0.0, 0.0).with_power(f64::INFINITY)]);

    let summary = store.summary();
    assert!(summary.stats.total_work_joules.is_finite());
    assert_eq!(summary.stats.total_work_joules, 200.0);
    assert_eq!(summary.work_kj, 0.0);
    assert_eq!(summary.stats.time_in_power_zones[6], 0.0);
    assert!(store
        .points()
        .iter()
        .all(|p| p.metrics.smoothed_power_watts.is_finite()));
    assert!(summary.stats.normalized_power.is_finite());
}
