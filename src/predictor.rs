//! Irradiance prediction seam.
//!
//! The trained model lives outside this crate; the engine only needs
//! something implementing [`IrradiancePredictor`]. When the model fails,
//! times out, or returns garbage, both estimates for the cycle fall back to
//! a Lambertian cosine model scaled by the measured irradiance.

use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use log::warn;
use serde::{Deserialize, Serialize};

use crate::angles::deg_to_rad;
use crate::error::PredictorError;
use crate::types::{Orientation, SolarPosition};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PredictionFeatures {
    pub sun: SolarPosition,
    pub orientation: Orientation,
    pub ambient_temp_c: f64,
    pub timestamp: DateTime<Utc>,
}

pub trait IrradiancePredictor {
    /// Predicted plane-of-array irradiance in W/m².
    fn predict(&self, features: &PredictionFeatures) -> Result<f64, PredictorError>;
}

impl<P: IrradiancePredictor + ?Sized> IrradiancePredictor for Box<P> {
    fn predict(&self, features: &PredictionFeatures) -> Result<f64, PredictorError> {
        (**self).predict(features)
    }
}

impl<P: IrradiancePredictor + ?Sized> IrradiancePredictor for std::sync::Arc<P> {
    fn predict(&self, features: &PredictionFeatures) -> Result<f64, PredictorError> {
        (**self).predict(features)
    }
}

/// Cosine of the angle between the panel normal and the sun vector, floored
/// at zero (sun behind the panel or below the horizon).
pub fn cosine_incidence(sun: &SolarPosition, orientation: &Orientation) -> f64 {
    if !sun.is_above_horizon() {
        return 0.0;
    }
    let zenith = deg_to_rad(sun.zenith);
    let tilt = deg_to_rad(orientation.tilt());
    let rel_az = deg_to_rad(sun.azimuth - orientation.azimuth());
    let cos_inc = zenith.cos() * tilt.cos() + zenith.sin() * tilt.sin() * rel_az.cos();
    cos_inc.clamp(0.0, 1.0)
}

pub fn geometric_estimate(
    sun: &SolarPosition,
    orientation: &Orientation,
    measured_wm2: f64,
) -> f64 {
    measured_wm2.max(0.0) * cosine_incidence(sun, orientation)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EstimateSource {
    Model,
    Fallback,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IrradiancePair {
    pub current_wm2: f64,
    pub candidate_wm2: f64,
    pub source: EstimateSource,
}

fn checked(value: Result<f64, PredictorError>) -> Result<f64, PredictorError> {
    match value {
        Ok(v) if v.is_finite() => Ok(v.max(0.0)),
        Ok(v) => Err(PredictorError::NonFinite(v)),
        Err(e) => Err(e),
    }
}

/// Predict irradiance at every pose in `poses`. If any call fails the whole
/// set is recomputed from geometry so the values stay comparable.
pub fn estimate_poses<P: IrradiancePredictor + ?Sized, const N: usize>(
    predictor: &P,
    sun: &SolarPosition,
    poses: [Orientation; N],
    ambient_temp_c: f64,
    timestamp: DateTime<Utc>,
    measured_wm2: f64,
) -> ([f64; N], EstimateSource) {
    let mut predicted = [0.0; N];
    let mut failure = None;
    for (slot, orientation) in predicted.iter_mut().zip(poses.iter()) {
        let features = PredictionFeatures {
            sun: *sun,
            orientation: *orientation,
            ambient_temp_c,
            timestamp,
        };
        match checked(predictor.predict(&features)) {
            Ok(v) => *slot = v,
            Err(e) => {
                failure = Some(e);
                break;
            }
        }
    }

    match failure {
        None => (predicted, EstimateSource::Model),
        Some(e) => {
            warn!("irradiance predictor failed ({e}), using cosine fallback");
            (
                poses.map(|o| geometric_estimate(sun, &o, measured_wm2)),
                EstimateSource::Fallback,
            )
        }
    }
}

/// Predict irradiance at both poses, falling back to geometry for both if
/// either call fails.
pub fn estimate_pair<P: IrradiancePredictor + ?Sized>(
    predictor: &P,
    sun: &SolarPosition,
    current: &Orientation,
    candidate: &Orientation,
    ambient_temp_c: f64,
    timestamp: DateTime<Utc>,
    measured_wm2: f64,
) -> IrradiancePair {
    let ([current_wm2, candidate_wm2], source) = estimate_poses(
        predictor,
        sun,
        [*current, *candidate],
        ambient_temp_c,
        timestamp,
        measured_wm2,
    );
    IrradiancePair {
        current_wm2,
        candidate_wm2,
        source,
    }
}

/// Deterministic clear-sky reference model: a fixed beam irradiance
/// attenuated by cos(zenith) and projected onto the panel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClearSkyPredictor {
    pub peak_wm2: f64,
}

impl Default for ClearSkyPredictor {
    fn default() -> Self {
        Self { peak_wm2: 1000.0 }
    }
}

impl IrradiancePredictor for ClearSkyPredictor {
    fn predict(&self, features: &PredictionFeatures) -> Result<f64, PredictorError> {
        let beam = self.peak_wm2 * deg_to_rad(features.sun.zenith).cos().max(0.0);
        Ok(beam * cosine_incidence(&features.sun, &features.orientation))
    }
}

struct Job {
    features: PredictionFeatures,
    deadline: Instant,
    reply: mpsc::SyncSender<Result<f64, PredictorError>>,
}

/// Runs a predictor on its own worker thread and bounds every call by
/// `timeout`. At most one request waits behind the one being served; while
/// that slot is taken, calls fail fast with `Unavailable`. Requests whose
/// caller has already timed out are skipped, not run.
pub struct TimeoutPredictor {
    jobs: mpsc::SyncSender<Job>,
    timeout: Duration,
}

impl TimeoutPredictor {
    pub fn spawn<P>(inner: P, timeout: Duration) -> std::io::Result<Self>
    where
        P: IrradiancePredictor + Send + 'static,
    {
        let (jobs, rx) = mpsc::sync_channel::<Job>(1);
        thread::Builder::new()
            .name("irradiance-predictor".into())
            .spawn(move || {
                for job in rx {
                    if Instant::now() >= job.deadline {
                        continue;
                    }
                    let result = inner.predict(&job.features);
                    let _ = job.reply.send(result);
                }
            })?;
        Ok(Self { jobs, timeout })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl IrradiancePredictor for TimeoutPredictor {
    fn predict(&self, features: &PredictionFeatures) -> Result<f64, PredictorError> {
        let (reply, rx) = mpsc::sync_channel(1);
        let job = Job {
            features: *features,
            deadline: Instant::now() + self.timeout,
            reply,
        };
        self.jobs.try_send(job).map_err(|e| match e {
            mpsc::TrySendError::Full(_) => {
                PredictorError::Unavailable("predictor worker busy".into())
            }
            mpsc::TrySendError::Disconnected(_) => {
                PredictorError::Unavailable("predictor worker stopped".into())
            }
        })?;
        match rx.recv_timeout(self.timeout) {
            Ok(result) => result,
            Err(mpsc::RecvTimeoutError::Timeout) => Err(PredictorError::Timeout(self.timeout)),
            Err(mpsc::RecvTimeoutError::Disconnected) => Err(PredictorError::Unavailable(
                "predictor worker dropped the request".into(),
            )),
        }
    }
}
