use chrono::{DateTime, Datelike, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

/// Years the closed-form solar formulas are trusted for.
pub const SUPPORTED_YEARS: std::ops::RangeInclusive<i32> = 1900..=2199;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoTime {
    pub latitude: f64,
    pub longitude: f64,
    pub timestamp: DateTime<Utc>,
}

impl GeoTime {
    pub fn new<Tz: TimeZone>(latitude: f64, longitude: f64, timestamp: &DateTime<Tz>) -> Self {
        Self {
            latitude,
            longitude,
            timestamp: timestamp.with_timezone(&Utc),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !self.latitude.is_finite() || !(-90.0..=90.0).contains(&self.latitude) {
            return Err(EngineError::InvalidGeoTime(format!(
                "latitude {} outside [-90, 90]",
                self.latitude
            )));
        }
        if !self.longitude.is_finite() || !(-180.0..=180.0).contains(&self.longitude) {
            return Err(EngineError::InvalidGeoTime(format!(
                "longitude {} outside [-180, 180]",
                self.longitude
            )));
        }
        if !SUPPORTED_YEARS.contains(&self.timestamp.year()) {
            return Err(EngineError::InvalidGeoTime(format!(
                "timestamp {} outside supported years",
                self.timestamp
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SolarPosition {
    pub day_of_year: i32,
    pub declination: f64,
    pub equation_of_time: f64,
    pub local_solar_time: f64,
    pub hour_angle: f64,
    pub zenith: f64,
    pub altitude: f64,
    pub azimuth: f64,
}

impl SolarPosition {
    pub fn is_above_horizon(&self) -> bool {
        self.zenith <= 90.0
    }
}

/// Panel pose. Tilt is clamped to [0, 90] and azimuth wrapped to [0, 360)
/// on construction, so every value in circulation is normalized.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "OrientationRepr")]
pub struct Orientation {
    tilt: f64,
    azimuth: f64,
}

#[derive(Deserialize)]
struct OrientationRepr {
    tilt: f64,
    azimuth: f64,
}

impl From<OrientationRepr> for Orientation {
    fn from(repr: OrientationRepr) -> Self {
        Orientation::new(repr.tilt, repr.azimuth)
    }
}

impl Orientation {
    pub fn new(tilt: f64, azimuth: f64) -> Self {
        Self {
            tilt: tilt.clamp(0.0, 90.0),
            azimuth: crate::angles::normalize_angle(azimuth),
        }
    }

    pub fn tilt(&self) -> f64 {
        self.tilt
    }

    pub fn azimuth(&self) -> f64 {
        self.azimuth
    }

    pub fn is_finite(&self) -> bool {
        self.tilt.is_finite() && self.azimuth.is_finite()
    }

    /// Per-axis travel to reach `target`; azimuth takes the short way round.
    pub fn displacement(&self, target: &Orientation) -> AngularDisplacement {
        let raw = (target.azimuth - self.azimuth).abs();
        AngularDisplacement {
            tilt_deg: (target.tilt - self.tilt).abs(),
            azimuth_deg: if raw > 180.0 { 360.0 - raw } else { raw },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct AngularDisplacement {
    pub tilt_deg: f64,
    pub azimuth_deg: f64,
}

impl AngularDisplacement {
    pub fn total(&self) -> f64 {
        self.tilt_deg + self.azimuth_deg
    }

    pub fn is_zero(&self) -> bool {
        self.tilt_deg == 0.0 && self.azimuth_deg == 0.0
    }

    pub fn tilt_only(&self) -> Self {
        Self {
            tilt_deg: self.tilt_deg,
            azimuth_deg: 0.0,
        }
    }
}

/// Validated per-cycle sensor input.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensorSnapshot {
    pub ambient_temp_c: f64,
    pub snow_detected: bool,
    pub irradiance_measured_wm2: f64,
    pub energy_available_wh: f64,
}

/// Sensor payload as delivered by the edge collaborator; any field may be
/// absent.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SensorReadings {
    pub ambient_temp_c: Option<f64>,
    pub snow_detected: Option<bool>,
    pub irradiance_measured_wm2: Option<f64>,
    pub energy_available_wh: Option<f64>,
}

impl SensorReadings {
    pub fn into_snapshot(self) -> Result<SensorSnapshot> {
        Ok(SensorSnapshot {
            ambient_temp_c: finite(self.ambient_temp_c, "ambient_temp_c")?,
            snow_detected: self
                .snow_detected
                .ok_or(EngineError::SensorDataMissing("snow_detected"))?,
            irradiance_measured_wm2: finite(
                self.irradiance_measured_wm2,
                "irradiance_measured_wm2",
            )?,
            energy_available_wh: finite(self.energy_available_wh, "energy_available_wh")?,
        })
    }
}

impl From<SensorSnapshot> for SensorReadings {
    fn from(s: SensorSnapshot) -> Self {
        Self {
            ambient_temp_c: Some(s.ambient_temp_c),
            snow_detected: Some(s.snow_detected),
            irradiance_measured_wm2: Some(s.irradiance_measured_wm2),
            energy_available_wh: Some(s.energy_available_wh),
        }
    }
}

fn finite(value: Option<f64>, field: &'static str) -> Result<f64> {
    value
        .filter(|v| v.is_finite())
        .ok_or(EngineError::SensorDataMissing(field))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WinterMode {
    Normal,
    Winter,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct WinterState {
    pub active: bool,
    pub entered_at: Option<DateTime<Utc>>,
    /// Azimuth the panel held when WINTER was entered.
    pub frozen_azimuth: Option<f64>,
}

impl WinterState {
    pub fn mode(&self) -> WinterMode {
        if self.active {
            WinterMode::Winter
        } else {
            WinterMode::Normal
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MotionAction {
    Move,
    Hold,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasonCode {
    /// Tracking the astronomical target pays for itself.
    Geometry,
    /// Expected gain does not cover motor cost plus margin.
    InsufficientGain,
    /// Displacement below the minimum-move epsilon.
    BelowMinimumMove,
    /// Winter override drives tilt for snow shedding.
    SnowShedding,
    /// Sun below horizon, parking at the stow orientation.
    NightStow,
    /// Motor cost exceeds the energy reported available.
    InsufficientEnergy,
    InvalidGeoTime,
    InvalidOrientation,
    SensorDataMissing,
}

impl ReasonCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Geometry => "geometry",
            Self::InsufficientGain => "insufficient_gain",
            Self::BelowMinimumMove => "below_minimum_move",
            Self::SnowShedding => "snow_shedding",
            Self::NightStow => "night_stow",
            Self::InsufficientEnergy => "insufficient_energy",
            Self::InvalidGeoTime => "invalid_geo_time",
            Self::InvalidOrientation => "invalid_orientation",
            Self::SensorDataMissing => "sensor_data_missing",
        }
    }
}

impl std::fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MotionDecision {
    pub action: MotionAction,
    pub target: Orientation,
    pub predicted_gain_wh: f64,
    pub estimated_motor_cost_wh: f64,
    pub reason: ReasonCode,
}

impl MotionDecision {
    pub fn hold(current: Orientation, gain_wh: f64, cost_wh: f64, reason: ReasonCode) -> Self {
        Self {
            action: MotionAction::Hold,
            target: current,
            predicted_gain_wh: gain_wh,
            estimated_motor_cost_wh: cost_wh,
            reason,
        }
    }

    pub fn move_to(target: Orientation, gain_wh: f64, cost_wh: f64, reason: ReasonCode) -> Self {
        Self {
            action: MotionAction::Move,
            target,
            predicted_gain_wh: gain_wh,
            estimated_motor_cost_wh: cost_wh,
            reason,
        }
    }

    pub fn is_move(&self) -> bool {
        self.action == MotionAction::Move
    }
}
