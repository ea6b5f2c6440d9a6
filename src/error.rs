//! Error types shared by the engine.
//!
//! Cycle-level failures (`EngineError`) never abort the control loop: the
//! orchestrator turns each of them into a HOLD decision plus telemetry.

use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    /// Latitude, longitude or timestamp is non-finite or out of range.
    #[error("invalid geo-time: {0}")]
    InvalidGeoTime(String),
    /// A required sensor field was absent (or non-finite) in this cycle.
    #[error("sensor field `{0}` missing")]
    SensorDataMissing(&'static str),
    /// The actuator reported a non-finite pose.
    #[error("current orientation is not finite")]
    InvalidOrientation,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PredictorError {
    #[error("predictor unavailable: {0}")]
    Unavailable(String),
    #[error("predictor timed out after {0:?}")]
    Timeout(Duration),
    #[error("predictor returned non-finite value {0}")]
    NonFinite(f64),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Error)]
pub enum SimulationError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Engine(#[from] EngineError),
}

pub type Result<T> = std::result::Result<T, EngineError>;
