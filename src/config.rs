//! Engine configuration.
//!
//! Every field has a default so a partial TOML file (or none at all) yields a
//! usable configuration. Call [`EngineConfig::validate`] after editing values
//! by hand; [`EngineConfig::from_toml_str`] validates for you.

use std::time::Duration;

use chrono::{DateTime, TimeZone};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::optimizer::LinearMotorCost;
use crate::types::{GeoTime, Orientation};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WinterConfig {
    /// Ambient temperature (°C) below which snow can latch WINTER.
    pub temp_threshold_c: f64,
    /// Consecutive qualifying samples required before a transition.
    pub dwell_samples: u32,
    /// Snow-shedding tilt while WINTER is active.
    pub tilt_deg: f64,
}

impl Default for WinterConfig {
    fn default() -> Self {
        Self {
            temp_threshold_c: 2.0,
            dwell_samples: 3,
            tilt_deg: 65.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    // --- Site ---
    pub latitude: f64,
    pub longitude: f64,

    // --- Winter override ---
    pub winter: WinterConfig,

    // --- Motion gate ---
    /// Combined tilt + azimuth travel below which the tracker never moves.
    pub min_move_epsilon_deg: f64,
    /// Gain must beat motor cost by this fraction to justify a move.
    pub safety_margin: f64,
    pub motor_cost: LinearMotorCost,
    pub panel_area_m2: f64,
    /// Horizon over which a move's gain is counted (one control cycle).
    pub cycle_duration_minutes: f64,

    // --- Predictor ---
    pub predictor_timeout_ms: u64,

    // --- Degraded operation ---
    /// Parking pose while the sun is below the horizon.
    pub stow: Orientation,
    /// Consecutive cycles with missing sensor data before degraded mode.
    pub missed_sensor_escalation: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            latitude: 39.8,
            longitude: -89.6,

            winter: WinterConfig::default(),

            min_move_epsilon_deg: 1.0,
            safety_margin: 0.1,
            motor_cost: LinearMotorCost::default(),
            panel_area_m2: 2.0,
            cycle_duration_minutes: 10.0,

            predictor_timeout_ms: 250,

            stow: Orientation::new(0.0, 180.0),
            missed_sensor_escalation: 3,
        }
    }
}

impl EngineConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        fn invalid(msg: impl Into<String>) -> Result<(), ConfigError> {
            Err(ConfigError::Invalid(msg.into()))
        }

        if !(-90.0..=90.0).contains(&self.latitude) {
            return invalid(format!("latitude {} outside [-90, 90]", self.latitude));
        }
        if !(-180.0..=180.0).contains(&self.longitude) {
            return invalid(format!("longitude {} outside [-180, 180]", self.longitude));
        }
        if !self.winter.temp_threshold_c.is_finite() {
            return invalid("winter.temp_threshold_c must be finite");
        }
        if self.winter.dwell_samples == 0 {
            return invalid("winter.dwell_samples must be at least 1");
        }
        if !(60.0..=90.0).contains(&self.winter.tilt_deg) {
            return invalid(format!(
                "winter.tilt_deg {} outside [60, 90]",
                self.winter.tilt_deg
            ));
        }
        if !(self.min_move_epsilon_deg >= 0.0) {
            return invalid("min_move_epsilon_deg must be non-negative");
        }
        if !(self.safety_margin >= 0.0) {
            return invalid("safety_margin must be non-negative");
        }
        let m = &self.motor_cost;
        if [m.tilt_wh_per_deg, m.azimuth_wh_per_deg, m.activation_overhead_wh]
            .iter()
            .any(|c| !(*c >= 0.0))
        {
            return invalid("motor_cost coefficients must be non-negative");
        }
        if !(self.panel_area_m2 > 0.0) {
            return invalid("panel_area_m2 must be positive");
        }
        if !(self.cycle_duration_minutes > 0.0) {
            return invalid("cycle_duration_minutes must be positive");
        }
        if self.predictor_timeout_ms == 0 {
            return invalid("predictor_timeout_ms must be positive");
        }
        if !self.stow.is_finite() {
            return invalid("stow orientation must be finite");
        }
        if self.missed_sensor_escalation == 0 {
            return invalid("missed_sensor_escalation must be at least 1");
        }
        Ok(())
    }

    pub fn predictor_timeout(&self) -> Duration {
        Duration::from_millis(self.predictor_timeout_ms)
    }

    pub fn cycle_duration_hours(&self) -> f64 {
        self.cycle_duration_minutes / 60.0
    }

    /// GeoTime for this site at `at`.
    pub fn geo_time<Tz: TimeZone>(&self, at: &DateTime<Tz>) -> GeoTime {
        GeoTime::new(self.latitude, self.longitude, at)
    }
}
