//! Per-cycle coordinator.
//!
//! [`TrackingOrchestrator`] owns the winter controller and the injected
//! predictor and motor model. A cycle is split in two:
//!
//! 1. [`plan`](TrackingOrchestrator::plan) computes the sun position, the
//!    candidate pose, the predictions and the [`MotionDecision`], together
//!    with the engine state that follows from them. Nothing leaves the
//!    engine and nothing inside it changes.
//! 2. [`commit`](TrackingOrchestrator::commit) adopts that state, emits
//!    telemetry and then, only for MOVE, sends the actuator command as the
//!    very last step.
//!
//! Dropping a plan instead of committing it is how a cycle is aborted; the
//! engine is left exactly as it was before the plan was made.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};

use crate::angles::SolarGeometryModel;
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::optimizer::{GatePolicy, LinearMotorCost, MotionCostOptimizer, MotorCostModel};
use crate::predictor::{estimate_pair, estimate_poses, EstimateSource, IrradiancePredictor};
use crate::telemetry::{
    ActuatorPort, DegradedReason, TelemetryEvent, TelemetryRecord, TelemetrySink,
};
use crate::types::{
    GeoTime, MotionDecision, Orientation, ReasonCode, SensorReadings, SolarPosition, WinterState,
};
use crate::winter::WinterModeController;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CycleInput {
    /// Pose reported by the actuator after the previous cycle.
    pub current: Orientation,
    pub readings: SensorReadings,
    pub geo: GeoTime,
}

/// Decision, telemetry and successor engine state for one cycle, not yet
/// applied.
#[derive(Debug, Clone, PartialEq)]
#[must_use = "a plan does nothing until committed"]
pub struct CyclePlan {
    decision: MotionDecision,
    events: Vec<TelemetryEvent>,
    winter: WinterModeController,
    missed_sensor_cycles: u32,
}

impl CyclePlan {
    pub fn decision(&self) -> &MotionDecision {
        &self.decision
    }

    pub fn events(&self) -> &[TelemetryEvent] {
        &self.events
    }

    /// Winter state the engine adopts if this plan is committed.
    pub fn winter_state(&self) -> WinterState {
        self.winter.state()
    }
}

/// Shared shutdown flag checked before a plan is committed.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CycleOutcome {
    Committed(MotionDecision),
    Aborted,
}

pub struct TrackingOrchestrator<P, M = LinearMotorCost> {
    config: EngineConfig,
    geometry: SolarGeometryModel,
    winter: WinterModeController,
    predictor: P,
    motor_cost: M,
    optimizer: MotionCostOptimizer,
    missed_sensor_cycles: u32,
}

impl<P: IrradiancePredictor> TrackingOrchestrator<P, LinearMotorCost> {
    pub fn new(config: EngineConfig, predictor: P) -> Self {
        let motor_cost = config.motor_cost;
        Self::with_motor_cost(config, predictor, motor_cost)
    }
}

impl<P: IrradiancePredictor, M: MotorCostModel> TrackingOrchestrator<P, M> {
    pub fn with_motor_cost(config: EngineConfig, predictor: P, motor_cost: M) -> Self {
        Self {
            geometry: SolarGeometryModel::new(),
            winter: WinterModeController::new(config.winter.clone()),
            optimizer: MotionCostOptimizer::from_config(&config),
            config,
            predictor,
            motor_cost,
            missed_sensor_cycles: 0,
        }
    }

    /// Resume with a previously persisted winter state.
    pub fn with_winter_state(mut self, state: WinterState) -> Self {
        self.winter = WinterModeController::restore(self.config.winter.clone(), state);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn winter_state(&self) -> WinterState {
        self.winter.state()
    }

    pub fn missed_sensor_cycles(&self) -> u32 {
        self.missed_sensor_cycles
    }

    /// Plan, then commit unless `cancel` has fired in the meantime. An
    /// aborted cycle leaves the engine untouched.
    pub fn run_cycle(
        &mut self,
        input: &CycleInput,
        actuator: &mut impl ActuatorPort,
        sink: &mut impl TelemetrySink,
        cancel: &CancelToken,
    ) -> CycleOutcome {
        let plan = self.plan(input);
        if cancel.is_cancelled() {
            info!("cycle at {} aborted before commit", input.geo.timestamp);
            return CycleOutcome::Aborted;
        }
        CycleOutcome::Committed(self.commit(plan, actuator, sink))
    }

    /// Adopt the plan's engine state, emit its telemetry, then command the
    /// actuator if the decision is MOVE. Plans must be committed in the
    /// order they were made.
    pub fn commit(
        &mut self,
        plan: CyclePlan,
        actuator: &mut impl ActuatorPort,
        sink: &mut impl TelemetrySink,
    ) -> MotionDecision {
        let CyclePlan {
            decision,
            events,
            winter,
            missed_sensor_cycles,
        } = plan;
        self.winter = winter;
        self.missed_sensor_cycles = missed_sensor_cycles;
        for event in &events {
            if let TelemetryEvent::WinterTransition { mode, at } = event {
                info!("winter mode -> {:?} at {}", mode, at);
            }
            sink.emit(event);
        }
        if decision.is_move() {
            actuator.command(decision.target);
        }
        decision
    }

    pub fn plan(&self, input: &CycleInput) -> CyclePlan {
        let at = input.geo.timestamp;
        let current = input.current;

        if !current.is_finite() {
            return self.degraded(
                input,
                None,
                DegradedReason::InvalidOrientation,
                ReasonCode::InvalidOrientation,
                EngineError::InvalidOrientation.to_string(),
            );
        }

        let sun = match self.geometry.compute(&input.geo) {
            Ok(sun) => sun,
            Err(e) => {
                return self.degraded(
                    input,
                    None,
                    DegradedReason::InvalidGeoTime,
                    ReasonCode::InvalidGeoTime,
                    e.to_string(),
                )
            }
        };

        let snapshot = match input.readings.into_snapshot() {
            Ok(snapshot) => snapshot,
            Err(e) => return self.skip_cycle(input, sun, e),
        };
        let mut winter = self.winter.clone();
        let mut events = Vec::new();
        if let Some(t) = winter.evaluate(&snapshot, &current, at) {
            events.push(TelemetryEvent::WinterTransition {
                mode: t.mode,
                at: t.at,
            });
        }

        let nominal = self.geometry.nominal_target(&sun);
        let (candidate, policy) = if winter.is_active() {
            (
                winter.override_target(nominal.unwrap_or(self.config.stow)),
                GatePolicy::SnowShedding,
            )
        } else {
            match nominal {
                Some(target) => (target, GatePolicy::Economic),
                None => (self.config.stow, GatePolicy::Stow),
            }
        };

        let (mut decision, source) = if policy == GatePolicy::SnowShedding {
            let tilted = Orientation::new(candidate.tilt(), current.azimuth());
            let ([at_current, at_tilted, at_candidate], source) = estimate_poses(
                &self.predictor,
                &sun,
                [current, tilted, candidate],
                snapshot.ambient_temp_c,
                at,
                snapshot.irradiance_measured_wm2,
            );
            let decision = self.optimizer.decide_snow_shedding(
                current,
                candidate,
                at_current,
                at_tilted,
                at_candidate,
                &self.motor_cost,
            );
            (decision, source)
        } else {
            let irradiance = estimate_pair(
                &self.predictor,
                &sun,
                &current,
                &candidate,
                snapshot.ambient_temp_c,
                at,
                snapshot.irradiance_measured_wm2,
            );
            let decision = self.optimizer.decide_with(
                policy,
                current,
                candidate,
                irradiance.current_wm2,
                irradiance.candidate_wm2,
                &self.motor_cost,
            );
            (decision, irradiance.source)
        };

        if decision.is_move() && decision.estimated_motor_cost_wh > snapshot.energy_available_wh {
            warn!(
                "move needs {:.2} Wh but only {:.2} Wh available, holding",
                decision.estimated_motor_cost_wh, snapshot.energy_available_wh
            );
            decision = MotionDecision::hold(
                current,
                decision.predicted_gain_wh,
                decision.estimated_motor_cost_wh,
                ReasonCode::InsufficientEnergy,
            );
        }

        debug!(
            "{:?} ({}) target tilt={:.1} az={:.1} gain={:.2}Wh cost={:.2}Wh",
            decision.action,
            decision.reason,
            decision.target.tilt(),
            decision.target.azimuth(),
            decision.predicted_gain_wh,
            decision.estimated_motor_cost_wh
        );

        events.push(record(
            input,
            Some(sun),
            decision,
            winter.state(),
            Some(source),
            false,
        ));
        CyclePlan {
            decision,
            events,
            winter,
            missed_sensor_cycles: 0,
        }
    }

    fn degraded(
        &self,
        input: &CycleInput,
        sun: Option<SolarPosition>,
        reason: DegradedReason,
        code: ReasonCode,
        detail: String,
    ) -> CyclePlan {
        error!("degraded cycle at {}: {}", input.geo.timestamp, detail);
        let decision = MotionDecision::hold(input.current, 0.0, 0.0, code);
        let events = vec![
            degraded_event(reason, detail, input.geo.timestamp),
            record(input, sun, decision, self.winter.state(), None, true),
        ];
        CyclePlan {
            decision,
            events,
            winter: self.winter.clone(),
            missed_sensor_cycles: self.missed_sensor_cycles,
        }
    }

    fn skip_cycle(&self, input: &CycleInput, sun: SolarPosition, e: EngineError) -> CyclePlan {
        let field = match &e {
            EngineError::SensorDataMissing(field) => *field,
            _ => "unknown",
        };
        let consecutive = self.missed_sensor_cycles.saturating_add(1);
        warn!("skipping cycle: {e} ({consecutive} consecutive)");

        let at = input.geo.timestamp;
        let decision = MotionDecision::hold(input.current, 0.0, 0.0, ReasonCode::SensorDataMissing);
        let escalated = consecutive >= self.config.missed_sensor_escalation;

        let mut events = vec![TelemetryEvent::SensorDataMissing {
            field: field.to_string(),
            consecutive,
            at,
        }];
        if consecutive == self.config.missed_sensor_escalation {
            error!("{consecutive} consecutive cycles without sensor data, entering degraded mode");
            events.push(degraded_event(
                DegradedReason::SensorDataMissing,
                format!("{consecutive} consecutive cycles missing `{field}`"),
                at,
            ));
        }
        events.push(record(
            input,
            Some(sun),
            decision,
            self.winter.state(),
            None,
            escalated,
        ));
        CyclePlan {
            decision,
            events,
            winter: self.winter.clone(),
            missed_sensor_cycles: consecutive,
        }
    }
}

fn record(
    input: &CycleInput,
    sun: Option<SolarPosition>,
    decision: MotionDecision,
    winter: WinterState,
    estimate_source: Option<EstimateSource>,
    degraded: bool,
) -> TelemetryEvent {
    TelemetryEvent::Cycle(TelemetryRecord {
        timestamp: input.geo.timestamp,
        current: input.current,
        sun,
        decision,
        winter_mode: winter.mode(),
        estimate_source,
        degraded,
    })
}

fn degraded_event(reason: DegradedReason, detail: String, at: DateTime<Utc>) -> TelemetryEvent {
    TelemetryEvent::Degraded { reason, detail, at }
}
