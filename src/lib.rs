pub mod angles;
pub mod config;
pub mod error;
pub mod optimizer;
pub mod orchestrator;
pub mod predictor;
pub mod simulation;
pub mod telemetry;
pub mod types;
pub mod winter;

pub use angles::{
    day_of_year, deg_to_rad, equation_of_time, hour_angle, normalize_angle, optimal_fixed_tilt,
    rad_to_deg, solar_altitude, solar_azimuth, solar_declination, solar_position,
    solar_zenith_angle, tracking_target, SolarGeometryModel, DEGREES_PER_HOUR, EARTH_AXIAL_TILT,
};

pub use config::{EngineConfig, WinterConfig};
pub use error::{ConfigError, EngineError, PredictorError, SimulationError};
pub use optimizer::{GatePolicy, LinearMotorCost, MotionCostOptimizer, MotorCostModel};
pub use orchestrator::{CancelToken, CycleInput, CycleOutcome, CyclePlan, TrackingOrchestrator};
pub use predictor::{
    cosine_incidence, estimate_pair, estimate_poses, geometric_estimate, ClearSkyPredictor,
    EstimateSource, IrradiancePair, IrradiancePredictor, PredictionFeatures, TimeoutPredictor,
};
pub use simulation::{simulate_day, DayReport, DaySummary, SimulationConfig, SimulationSlot};
pub use telemetry::{
    ActuatorPort, DegradedReason, JsonLinesSink, TelemetryEvent, TelemetryRecord, TelemetrySink,
};

pub use types::{
    AngularDisplacement, GeoTime, MotionAction, MotionDecision, Orientation, ReasonCode,
    SensorReadings, SensorSnapshot, SolarPosition, WinterMode, WinterState,
};
pub use winter::{WinterModeController, WinterTransition};
