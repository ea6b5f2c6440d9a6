//! Whole-day simulation against fixed and single-axis baselines.
//!
//! Drives a real [`TrackingOrchestrator`] through one local day at a fixed
//! interval under a clear-sky beam, applying every MOVE perfectly, and
//! compares harvested energy with a fixed rig and an azimuth-only tracker.

use chrono::{Datelike, FixedOffset, NaiveDate, TimeZone};
use serde::{Deserialize, Serialize};

use crate::angles::{self, optimal_fixed_tilt};
use crate::error::{ConfigError, EngineError, SimulationError};
use crate::optimizer::MotorCostModel;
use crate::orchestrator::{CycleInput, TrackingOrchestrator};
use crate::predictor::{cosine_incidence, IrradiancePredictor};
use crate::telemetry::{ActuatorPort, TelemetryEvent};
use crate::types::{MotionAction, Orientation, SensorSnapshot};

const FALLBACK_TEMP_C: f64 = 15.0;

pub fn minutes_to_time(total_minutes: i32) -> (i32, i32) {
    (total_minutes / 60, total_minutes % 60)
}

pub fn intervals_per_day(interval_minutes: i32) -> i32 {
    1440 / interval_minutes
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SunriseSunset {
    pub sunrise: i32,
    pub sunset: i32,
}

/// Sunrise and sunset in minutes of local solar time. Polar night collapses
/// to solar noon; midnight sun spans the whole day.
pub fn estimate_sunrise_sunset(latitude: f64, day_of_year: i32) -> SunriseSunset {
    let lat_rad = angles::deg_to_rad(latitude);
    let decl = angles::solar_declination(day_of_year);
    let decl_rad = angles::deg_to_rad(decl);
    let cos_h = -lat_rad.tan() * decl_rad.tan();

    if cos_h >= 1.0 {
        SunriseSunset {
            sunrise: 720,
            sunset: 720,
        }
    } else if cos_h <= -1.0 {
        SunriseSunset {
            sunrise: 0,
            sunset: 1440,
        }
    } else {
        let h_deg = angles::rad_to_deg(cos_h.acos());
        let half_day_minutes = (h_deg / 15.0) * 60.0;
        let solar_noon_minutes = 720;
        SunriseSunset {
            sunrise: (solar_noon_minutes as f64 - half_day_minutes) as i32,
            sunset: (solar_noon_minutes as f64 + half_day_minutes) as i32,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    pub date: NaiveDate,
    pub utc_offset_hours: f64,
    pub interval_minutes: i32,
    /// One value per local hour; missing hours reuse the last value.
    pub hourly_temps_c: Vec<f64>,
    pub snow_detected: bool,
    pub clear_sky_peak_wm2: f64,
    pub panel_efficiency: f64,
    pub fixed: Orientation,
    pub initial: Orientation,
    pub available_energy_wh: f64,
    pub co2_kg_per_kwh: f64,
}

impl SimulationConfig {
    /// Defaults for a site: 10 minute steps, 20 % efficient panels, fixed
    /// rig at the annual optimum tilt facing the equator.
    pub fn for_site(latitude: f64, date: NaiveDate, utc_offset_hours: f64) -> Self {
        let equator_facing = if latitude >= 0.0 { 180.0 } else { 0.0 };
        Self {
            date,
            utc_offset_hours,
            interval_minutes: 10,
            hourly_temps_c: vec![FALLBACK_TEMP_C; 24],
            snow_detected: false,
            clear_sky_peak_wm2: 1000.0,
            panel_efficiency: 0.2,
            fixed: Orientation::new(optimal_fixed_tilt(latitude), equator_facing),
            initial: Orientation::new(0.0, equator_facing),
            available_energy_wh: 1000.0,
            co2_kg_per_kwh: 0.4,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.interval_minutes <= 0 || self.interval_minutes > 1440 {
            return Err(ConfigError::Invalid(format!(
                "simulation interval {} min outside (0, 1440]",
                self.interval_minutes
            )));
        }
        if !self.utc_offset_hours.is_finite() || self.utc_offset_hours.abs() >= 24.0 {
            return Err(ConfigError::Invalid(format!(
                "utc offset {}h outside (-24, 24)",
                self.utc_offset_hours
            )));
        }
        Ok(())
    }

    fn utc_offset(&self) -> Result<FixedOffset, ConfigError> {
        FixedOffset::east_opt((self.utc_offset_hours * 3600.0).round() as i32).ok_or_else(|| {
            ConfigError::Invalid(format!("utc offset {}h", self.utc_offset_hours))
        })
    }

    fn temp_at(&self, hour: i32) -> f64 {
        self.hourly_temps_c
            .get(hour as usize)
            .or_else(|| self.hourly_temps_c.last())
            .copied()
            .unwrap_or(FALLBACK_TEMP_C)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimulationSlot {
    pub minutes: i32,
    pub zenith: f64,
    pub optimal: Orientation,
    pub dual: Orientation,
    pub action: MotionAction,
    pub winter_active: bool,
    pub temp_c: f64,
    pub beam_wm2: f64,
    pub power_dual_w: f64,
    pub power_single_w: f64,
    pub power_fixed_w: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DaySummary {
    pub energy_dual_kwh: f64,
    pub energy_single_kwh: f64,
    pub energy_fixed_kwh: f64,
    pub motor_energy_kwh: f64,
    pub moves: u32,
    pub co2_offset_kg: f64,
    pub gain_vs_fixed_pct: f64,
    pub gain_vs_single_pct: f64,
    pub sunrise_sunset: SunriseSunset,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayReport {
    pub slots: Vec<SimulationSlot>,
    pub summary: DaySummary,
    pub events: Vec<TelemetryEvent>,
}

/// Actuator that reaches every target instantly.
struct IdealActuator {
    pose: Orientation,
}

impl ActuatorPort for IdealActuator {
    fn command(&mut self, target: Orientation) {
        self.pose = target;
    }
}

fn percent_gain(tracked: f64, baseline: f64) -> f64 {
    if baseline > 0.0 {
        (tracked - baseline) / baseline * 100.0
    } else {
        0.0
    }
}

pub fn simulate_day<P, M>(
    engine: &mut TrackingOrchestrator<P, M>,
    sim: &SimulationConfig,
) -> Result<DayReport, SimulationError>
where
    P: IrradiancePredictor,
    M: MotorCostModel,
{
    sim.validate()?;
    let offset = sim.utc_offset()?;

    let area = engine.config().panel_area_m2;
    let latitude = engine.config().latitude;
    let interval_hours = sim.interval_minutes as f64 / 60.0;

    let mut actuator = IdealActuator { pose: sim.initial };
    let mut events: Vec<TelemetryEvent> = Vec::new();
    let n_intervals = intervals_per_day(sim.interval_minutes);
    let mut slots = Vec::with_capacity(n_intervals as usize);
    let mut motor_wh = 0.0;
    let mut moves = 0;

    for interval in 0..n_intervals {
        let mins = interval * sim.interval_minutes;
        let (hour, minute) = minutes_to_time(mins);
        let naive = sim
            .date
            .and_hms_opt(hour as u32, minute as u32, 0)
            .ok_or_else(|| EngineError::InvalidGeoTime(format!("{hour:02}:{minute:02}")))?;
        let local = offset
            .from_local_datetime(&naive)
            .single()
            .ok_or_else(|| EngineError::InvalidGeoTime(naive.to_string()))?;

        let geo = engine.config().geo_time(&local);
        geo.validate()?;
        let sun = angles::solar_position(geo.latitude, geo.longitude, &geo.timestamp);
        let beam = if sun.is_above_horizon() {
            sim.clear_sky_peak_wm2
        } else {
            0.0
        };
        let temp_c = sim.temp_at(hour);

        let input = CycleInput {
            current: actuator.pose,
            readings: SensorSnapshot {
                ambient_temp_c: temp_c,
                snow_detected: sim.snow_detected,
                irradiance_measured_wm2: beam,
                energy_available_wh: sim.available_energy_wh,
            }
            .into(),
            geo,
        };
        let plan = engine.plan(&input);
        let decision = engine.commit(plan, &mut actuator, &mut events);
        if decision.is_move() {
            moves += 1;
            motor_wh += decision.estimated_motor_cost_wh;
        }

        let optimal = angles::tracking_target(&sun);
        let single = Orientation::new(sim.fixed.tilt(), sun.azimuth);
        let power = |pose: &Orientation| {
            beam * cosine_incidence(&sun, pose) * area * sim.panel_efficiency
        };

        slots.push(SimulationSlot {
            minutes: mins,
            zenith: sun.zenith,
            optimal,
            dual: actuator.pose,
            action: decision.action,
            winter_active: engine.winter_state().active,
            temp_c,
            beam_wm2: beam,
            power_dual_w: power(&actuator.pose),
            power_single_w: power(&single),
            power_fixed_w: power(&sim.fixed),
        });
    }

    let kwh = |f: fn(&SimulationSlot) -> f64| {
        slots.iter().map(f).sum::<f64>() * interval_hours / 1000.0
    };
    let energy_dual_kwh = kwh(|s| s.power_dual_w);
    let energy_single_kwh = kwh(|s| s.power_single_w);
    let energy_fixed_kwh = kwh(|s| s.power_fixed_w);
    let motor_energy_kwh = motor_wh / 1000.0;
    let day_of_year = angles::day_of_year(sim.date.year(), sim.date.month(), sim.date.day());

    let summary = DaySummary {
        energy_dual_kwh,
        energy_single_kwh,
        energy_fixed_kwh,
        motor_energy_kwh,
        moves,
        co2_offset_kg: (energy_dual_kwh - motor_energy_kwh).max(0.0) * sim.co2_kg_per_kwh,
        gain_vs_fixed_pct: percent_gain(energy_dual_kwh, energy_fixed_kwh),
        gain_vs_single_pct: percent_gain(energy_dual_kwh, energy_single_kwh),
        sunrise_sunset: estimate_sunrise_sunset(latitude, day_of_year),
    };

    Ok(DayReport {
        slots,
        summary,
        events,
    })
}
