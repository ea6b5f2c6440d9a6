use chrono::NaiveDate;

use solar_tracking_engine::config::EngineConfig;
use solar_tracking_engine::predictor::ClearSkyPredictor;
use solar_tracking_engine::simulation::*;
use solar_tracking_engine::telemetry::TelemetryEvent;
use solar_tracking_engine::types::{MotionAction, Orientation, WinterMode};
use solar_tracking_engine::{ConfigError, EngineError, SimulationError, TrackingOrchestrator};

macro_rules! assert_approx {
    ($left:expr, $right:expr, $tol:expr) => {
        let (l, r) = ($left as f64, $right as f64);
        assert!(
            (l - r).abs() <= $tol,
            "assert_approx failed: left={}, right={}, diff={}, tol={}",
            l, r, (l - r).abs(), $tol
        );
    };
}

fn engine() -> TrackingOrchestrator<ClearSkyPredictor> {
    TrackingOrchestrator::new(EngineConfig::default(), ClearSkyPredictor::default())
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

// ── Time utilities ──

#[test]
fn test_known_time_conversions() {
    assert_eq!(minutes_to_time(0), (0, 0));
    assert_eq!(minutes_to_time(720), (12, 0));
    assert_eq!(minutes_to_time(1439), (23, 59));
    assert_eq!(minutes_to_time(390), (6, 30));
}

#[test]
fn test_intervals_per_day() {
    assert_eq!(intervals_per_day(10), 144);
    assert_eq!(intervals_per_day(15), 96);
    assert_eq!(intervals_per_day(1), 1440);
}

// ── Sunrise/sunset estimation ──

#[test]
fn test_equinox_12h_daylight() {
    let ss = estimate_sunrise_sunset(39.8, 80);
    let midpoint = (ss.sunrise + ss.sunset) as f64 / 2.0;
    assert_approx!(midpoint, 720.0, 30.0);
    let daylight = ss.sunset - ss.sunrise;
    assert_approx!(daylight as f64, 720.0, 60.0);
}

#[test]
fn test_summer_longer_than_winter() {
    let solstice = estimate_sunrise_sunset(39.8, 172);
    let winter = estimate_sunrise_sunset(39.8, 355);
    assert!((solstice.sunset - solstice.sunrise) > (winter.sunset - winter.sunrise));
}

#[test]
fn test_polar_day_and_night() {
    let day = estimate_sunrise_sunset(80.0, 172);
    assert_eq!((day.sunrise, day.sunset), (0, 1440));
    let night = estimate_sunrise_sunset(80.0, 355);
    assert_eq!(night.sunrise, night.sunset);
}

// ── Site defaults ──

#[test]
fn test_fixed_rig_faces_equator() {
    let north = SimulationConfig::for_site(39.8, date(2026, 6, 21), -5.0);
    assert_eq!(north.fixed.azimuth(), 180.0);
    assert!(north.fixed.tilt() > 20.0 && north.fixed.tilt() < 40.0);
    let south = SimulationConfig::for_site(-33.9, date(2026, 6, 21), 10.0);
    assert_eq!(south.fixed.azimuth(), 0.0);
}

// ── Clear summer day ──

#[test]
fn test_clear_summer_day_beats_fixed() {
    let mut e = engine();
    let sim = SimulationConfig::for_site(39.8, date(2026, 6, 21), -5.0);
    let report = simulate_day(&mut e, &sim).unwrap();
    let s = report.summary;

    assert_eq!(report.slots.len(), 144);
    assert_eq!(report.slots[0].minutes, 0);
    assert_eq!(report.slots[143].minutes, 1430);

    assert!(s.energy_fixed_kwh > 0.0);
    assert!(s.energy_dual_kwh > s.energy_fixed_kwh, "{:?}", s);
    assert!(s.gain_vs_fixed_pct > 0.0);
    assert!(s.moves > 0);
    assert!(s.motor_energy_kwh > 0.0);
    assert!(s.motor_energy_kwh < s.energy_dual_kwh);
    assert!(!e.winter_state().active);

    // midnight slots see no light
    assert_eq!(report.slots[0].beam_wm2, 0.0);
    assert_eq!(report.slots[0].power_dual_w, 0.0);
}

#[test]
fn test_co2_offset_is_net_of_motor_energy() {
    let mut e = engine();
    let sim = SimulationConfig::for_site(39.8, date(2026, 3, 21), -5.0);
    let s = simulate_day(&mut e, &sim).unwrap().summary;
    assert_approx!(
        s.co2_offset_kg,
        (s.energy_dual_kwh - s.motor_energy_kwh).max(0.0) * 0.4,
        1e-12
    );
}

#[test]
fn test_day_ends_stowed() {
    let mut e = engine();
    let sim = SimulationConfig::for_site(39.8, date(2026, 6, 21), -5.0);
    let report = simulate_day(&mut e, &sim).unwrap();
    let last = report.slots.last().unwrap();
    assert_eq!(last.dual, Orientation::new(0.0, 180.0));
}

// ── Snowy day ──

#[test]
fn test_snowy_day_latches_winter_tilt() {
    let mut e = engine();
    let mut sim = SimulationConfig::for_site(39.8, date(2026, 1, 15), -6.0);
    sim.hourly_temps_c = vec![-5.0; 24];
    sim.snow_detected = true;
    let report = simulate_day(&mut e, &sim).unwrap();

    assert!(e.winter_state().active);
    assert!(report.slots[..2].iter().all(|s| !s.winter_active));
    assert!(report.slots[2..].iter().all(|s| s.winter_active));
    assert_eq!(report.slots[2].action, MotionAction::Move);
    assert!(report.slots[2..]
        .iter()
        .all(|s| s.dual == Orientation::new(65.0, 180.0)));
    assert_eq!(report.summary.moves, 1);

    let transitions = report
        .events
        .iter()
        .filter(|e| matches!(e, TelemetryEvent::WinterTransition { mode: WinterMode::Winter, .. }))
        .count();
    assert_eq!(transitions, 1);
}

// ── Errors ──

#[test]
fn test_invalid_interval_is_rejected() {
    let mut e = engine();
    let mut sim = SimulationConfig::for_site(39.8, date(2026, 6, 21), -5.0);
    sim.interval_minutes = 0;
    assert!(matches!(
        simulate_day(&mut e, &sim),
        Err(SimulationError::Config(ConfigError::Invalid(_)))
    ));

    sim.interval_minutes = 2000;
    assert!(sim.validate().is_err());
}

#[test]
fn test_bad_utc_offset_is_a_config_error() {
    let mut e = engine();
    for offset in [30.0, -24.0, f64::NAN] {
        let sim = SimulationConfig::for_site(39.8, date(2026, 6, 21), offset);
        match simulate_day(&mut e, &sim) {
            Err(SimulationError::Config(ConfigError::Invalid(msg))) => {
                assert!(msg.contains("utc offset"), "{msg}")
            }
            other => panic!("offset {offset}: {other:?}"),
        }
    }
}

#[test]
fn test_out_of_range_year_is_rejected() {
    let mut e = engine();
    let sim = SimulationConfig::for_site(39.8, date(1850, 6, 21), -5.0);
    assert!(matches!(
        simulate_day(&mut e, &sim),
        Err(SimulationError::Engine(EngineError::InvalidGeoTime(_)))
    ));
}
