//! Cost-aware motion gate.
//!
//! Weighs the energy a move is expected to harvest over one control cycle
//! against what the two axis motors spend getting there.

use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::types::{AngularDisplacement, MotionDecision, Orientation, ReasonCode};

/// Maps angular travel to actuator energy.
pub trait MotorCostModel {
    fn cost_wh(&self, displacement: &AngularDisplacement) -> f64;
}

/// Each axis costed independently per degree, plus a fixed wake/settle
/// overhead charged once per activation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinearMotorCost {
    pub tilt_wh_per_deg: f64,
    pub azimuth_wh_per_deg: f64,
    pub activation_overhead_wh: f64,
}

impl Default for LinearMotorCost {
    fn default() -> Self {
        Self {
            tilt_wh_per_deg: 0.05,
            azimuth_wh_per_deg: 0.03,
            activation_overhead_wh: 0.5,
        }
    }
}

impl MotorCostModel for LinearMotorCost {
    fn cost_wh(&self, displacement: &AngularDisplacement) -> f64 {
        if displacement.is_zero() {
            return 0.0;
        }
        displacement.tilt_deg * self.tilt_wh_per_deg
            + displacement.azimuth_deg * self.azimuth_wh_per_deg
            + self.activation_overhead_wh
    }
}

/// Which rule set applies to a candidate pose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GatePolicy {
    /// Move only when the gain beats cost by the safety margin.
    Economic,
    /// Tilt is forced (snow shedding); azimuth is still gated economically.
    SnowShedding,
    /// Night parking; only the minimum-move epsilon applies.
    Stow,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionCostOptimizer {
    pub min_move_epsilon_deg: f64,
    pub safety_margin: f64,
    pub panel_area_m2: f64,
    pub cycle_duration_hours: f64,
}

impl MotionCostOptimizer {
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            min_move_epsilon_deg: config.min_move_epsilon_deg,
            safety_margin: config.safety_margin,
            panel_area_m2: config.panel_area_m2,
            cycle_duration_hours: config.cycle_duration_hours(),
        }
    }

    /// Energy (Wh) gained over one cycle by sitting at the candidate pose
    /// instead of the current one.
    pub fn expected_gain_wh(&self, predicted_current_wm2: f64, predicted_candidate_wm2: f64) -> f64 {
        (predicted_candidate_wm2 - predicted_current_wm2)
            * self.panel_area_m2
            * self.cycle_duration_hours
    }

    fn pays_off(&self, gain_wh: f64, cost_wh: f64) -> bool {
        gain_wh > cost_wh * (1.0 + self.safety_margin)
    }

    pub fn decide<M: MotorCostModel + ?Sized>(
        &self,
        current: Orientation,
        candidate: Orientation,
        predicted_current_wm2: f64,
        predicted_candidate_wm2: f64,
        motor_cost: &M,
    ) -> MotionDecision {
        self.decide_with(
            GatePolicy::Economic,
            current,
            candidate,
            predicted_current_wm2,
            predicted_candidate_wm2,
            motor_cost,
        )
    }

    /// Gate `candidate` under `policy`. For snow shedding there is no
    /// estimate at the tilt-only pose: when tilt moves the whole gain is
    /// credited to it and azimuth holds, otherwise the gain belongs to the
    /// azimuth move. [`Self::decide_snow_shedding`] takes the extra estimate.
    pub fn decide_with<M: MotorCostModel + ?Sized>(
        &self,
        policy: GatePolicy,
        current: Orientation,
        candidate: Orientation,
        predicted_current_wm2: f64,
        predicted_candidate_wm2: f64,
        motor_cost: &M,
    ) -> MotionDecision {
        let displacement = current.displacement(&candidate);
        let gain = self.expected_gain_wh(predicted_current_wm2, predicted_candidate_wm2);
        let cost = motor_cost.cost_wh(&displacement);

        if displacement.total() < self.min_move_epsilon_deg {
            return MotionDecision::hold(current, gain, cost, ReasonCode::BelowMinimumMove);
        }

        match policy {
            GatePolicy::Economic => {
                if self.pays_off(gain, cost) {
                    MotionDecision::move_to(candidate, gain, cost, ReasonCode::Geometry)
                } else {
                    MotionDecision::hold(current, gain, cost, ReasonCode::InsufficientGain)
                }
            }
            GatePolicy::Stow => {
                MotionDecision::move_to(candidate, gain, cost, ReasonCode::NightStow)
            }
            GatePolicy::SnowShedding => {
                let (tilt_gain, azimuth_gain) =
                    if displacement.tilt_deg >= self.min_move_epsilon_deg {
                        (gain, 0.0)
                    } else {
                        (0.0, gain)
                    };
                self.snow_shedding(
                    current,
                    candidate,
                    displacement,
                    tilt_gain,
                    azimuth_gain,
                    motor_cost,
                )
            }
        }
    }

    /// Snow-shedding gate. The tilt move is forced; the azimuth move must pay
    /// for its marginal motor cost out of its marginal gain, i.e. the gain
    /// from the tilt-only pose `(candidate.tilt, current.azimuth)` to the
    /// candidate.
    pub fn decide_snow_shedding<M: MotorCostModel + ?Sized>(
        &self,
        current: Orientation,
        candidate: Orientation,
        predicted_current_wm2: f64,
        predicted_tilted_wm2: f64,
        predicted_candidate_wm2: f64,
        motor_cost: &M,
    ) -> MotionDecision {
        let displacement = current.displacement(&candidate);
        let tilt_gain = self.expected_gain_wh(predicted_current_wm2, predicted_tilted_wm2);
        let azimuth_gain = self.expected_gain_wh(predicted_tilted_wm2, predicted_candidate_wm2);

        if displacement.total() < self.min_move_epsilon_deg {
            return MotionDecision::hold(
                current,
                tilt_gain + azimuth_gain,
                motor_cost.cost_wh(&displacement),
                ReasonCode::BelowMinimumMove,
            );
        }
        self.snow_shedding(current, candidate, displacement, tilt_gain, azimuth_gain, motor_cost)
    }

    fn snow_shedding<M: MotorCostModel + ?Sized>(
        &self,
        current: Orientation,
        candidate: Orientation,
        displacement: AngularDisplacement,
        tilt_gain: f64,
        azimuth_gain: f64,
        motor_cost: &M,
    ) -> MotionDecision {
        let tilt_moves = displacement.tilt_deg >= self.min_move_epsilon_deg;
        let tilt_cost = if tilt_moves {
            motor_cost.cost_wh(&displacement.tilt_only())
        } else {
            0.0
        };

        let azimuth_moves = displacement.azimuth_deg >= self.min_move_epsilon_deg && {
            let with_azimuth = if tilt_moves {
                displacement
            } else {
                AngularDisplacement {
                    tilt_deg: 0.0,
                    azimuth_deg: displacement.azimuth_deg,
                }
            };
            let marginal = motor_cost.cost_wh(&with_azimuth) - tilt_cost;
            self.pays_off(azimuth_gain, marginal)
        };

        let target = Orientation::new(
            if tilt_moves { candidate.tilt() } else { current.tilt() },
            if azimuth_moves { candidate.azimuth() } else { current.azimuth() },
        );
        if tilt_moves || azimuth_moves {
            let gain = if azimuth_moves {
                tilt_gain + azimuth_gain
            } else {
                tilt_gain
            };
            let cost = motor_cost.cost_wh(&current.displacement(&target));
            MotionDecision::move_to(target, gain, cost, ReasonCode::SnowShedding)
        } else {
            let reason = if displacement.azimuth_deg >= self.min_move_epsilon_deg {
                ReasonCode::InsufficientGain
            } else {
                ReasonCode::BelowMinimumMove
            };
            MotionDecision::hold(
                current,
                tilt_gain + azimuth_gain,
                motor_cost.cost_wh(&displacement),
                reason,
            )
        }
    }
}
