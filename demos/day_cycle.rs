use chrono::{NaiveDate, TimeZone};
use chrono_tz::America::Chicago;

use solar_tracking_engine::{
    simulate_day, CancelToken, ClearSkyPredictor, CycleInput, CycleOutcome, EngineConfig,
    Orientation, SensorSnapshot, SimulationConfig, TelemetryEvent, TimeoutPredictor,
    TrackingOrchestrator,
};

struct PrintActuator;

impl solar_tracking_engine::ActuatorPort for PrintActuator {
    fn command(&mut self, target: Orientation) {
        println!(
            "  actuator <- tilt {:.2}°, azimuth {:.2}°",
            target.tilt(),
            target.azimuth()
        );
    }
}

fn main() -> anyhow::Result<()> {
    let config = EngineConfig::from_toml_str(
        r#"
        latitude = 39.8
        longitude = -89.6
        cycle_duration_minutes = 10.0
        "#,
    )?;

    let predictor = TimeoutPredictor::spawn(ClearSkyPredictor::default(), config.predictor_timeout())?;
    let mut engine = TrackingOrchestrator::new(config.clone(), predictor);

    let dt = Chicago.with_ymd_and_hms(2026, 3, 21, 12, 0, 0).unwrap();
    let input = CycleInput {
        current: Orientation::new(10.0, 120.0),
        readings: SensorSnapshot {
            ambient_temp_c: 12.0,
            snow_detected: false,
            irradiance_measured_wm2: 850.0,
            energy_available_wh: 200.0,
        }
        .into(),
        geo: config.geo_time(&dt),
    };

    println!("=== Single Control Cycle ===");
    println!(
        "Location: Springfield, IL ({:.1}°N, {:.1}°W)",
        config.latitude, -config.longitude
    );
    println!("Date/Time: {}", dt);
    let mut events: Vec<TelemetryEvent> = Vec::new();
    match engine.run_cycle(&input, &mut PrintActuator, &mut events, &CancelToken::new()) {
        CycleOutcome::Committed(decision) => {
            println!("Decision: {:?} ({})", decision.action, decision.reason);
            println!("Predicted gain: {:.2} Wh", decision.predicted_gain_wh);
            println!("Motor cost: {:.2} Wh", decision.estimated_motor_cost_wh);
        }
        CycleOutcome::Aborted => println!("cycle aborted"),
    }
    println!();

    for (label, temp, snow) in [("Clear winter day", 3.0, false), ("Snowy winter day", -5.0, true)] {
        let mut engine = TrackingOrchestrator::new(config.clone(), ClearSkyPredictor::default());
        let date = NaiveDate::from_ymd_opt(2026, 1, 15).unwrap();
        let mut sim = SimulationConfig::for_site(config.latitude, date, -6.0);
        sim.hourly_temps_c = vec![temp; 24];
        sim.snow_detected = snow;
        let report = simulate_day(&mut engine, &sim)?;
        let s = report.summary;

        println!("=== {} ({}) ===", label, date);
        println!("Dual-axis energy:   {:.2} kWh", s.energy_dual_kwh);
        println!("Single-axis energy: {:.2} kWh", s.energy_single_kwh);
        println!("Fixed energy:       {:.2} kWh", s.energy_fixed_kwh);
        println!("Motor energy:       {:.3} kWh over {} moves", s.motor_energy_kwh, s.moves);
        println!("Gain vs fixed:      {:.1}%", s.gain_vs_fixed_pct);
        println!("CO₂ offset:         {:.2} kg", s.co2_offset_kg);
        println!();
    }
    Ok(())
}
