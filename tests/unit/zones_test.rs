//! Unit tests for zone calculations.

use ridetrace::config::AthleteProfile;
use ridetrace::metrics::zones::{HrZones, PowerZones, POWER_ZONE_COUNT};

#[test]
fn test_power_zones_from_cp_300() {
    let zones = PowerZones::from_critical_power(300.0);

    // 55/75/90/105/120/150 % of CP
    assert_eq!(zones.upper_bounds, [165.0, 225.0, 270.0, 315.0, 360.0, 450.0]);
}

#[test]
fn test_power_zones_from_default_profile() {
    let zones = AthleteProfile::default().power_zones();
    assert_eq!(zones.upper_bounds, [154.0, 210.0, 252.0, 294.0, 336.0, 420.0]);
}

#[test]
fn test_power_zone_lookup() {
    let zones = PowerZones::from_critical_power(300.0);

    assert_eq!(zones.get_zone(0.0), 1);
    assert_eq!(zones.get_zone(165.0), 1);
    assert_eq!(zones.get_zone(165.5), 2);
    assert_eq!(zones.get_zone(300.0), 4);
    assert_eq!(zones.get_zone(450.0), 6);
    assert_eq!(zones.get_zone(451.0), 7);
    assert_eq!(zones.get_zone(2000.0), 7);
}

#[test]
fn test_power_zone_index_in_range() {
    let zones = PowerZones::from_critical_power(250.0);
    for watts in [50.0, 180.0, 240.0, 300.0, 1500.0] {
        let idx = zones.zone_index(watts);
        assert!(idx < POWER_ZONE_COUNT);
    }
}

#[test]
fn test_hr_zone_lookup() {
    let zones = HrZones::default();

    assert_eq!(zones.get_zone(90.0), 1);
    assert_eq!(zones.get_zone(135.0), 1);
    assert_eq!(zones.get_zone(136.0), 2);
    assert_eq!(zones.get_zone(165.0), 3);
    assert_eq!(zones.get_zone(178.0), 4);
    assert_eq!(zones.get_zone(200.0), 5);
}

#[test]
fn test_hr_above_last_bound_is_last_zone() {
    let zones = HrZones::default();
    assert_eq!(zones.get_zone(230.0), 5);
}

#[test]
fn test_custom_hr_zones() {
    let zones = HrZones::from_upper_bounds([120.0, 140.0, 155.0, 170.0, 190.0]);
    assert!(zones.is_ascending());
    assert_eq!(zones.get_zone(150.0), 3);

    let broken = HrZones::from_upper_bounds([120.0, 110.0, 155.0, 170.0, 190.0]);
    assert!(!broken.is_ascending());
}
