use solar_tracking_engine::config::EngineConfig;
use solar_tracking_engine::optimizer::{
    GatePolicy, LinearMotorCost, MotionCostOptimizer, MotorCostModel,
};
use solar_tracking_engine::types::{
    AngularDisplacement, MotionAction, Orientation, ReasonCode,
};

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

/// Gain = Δirr × 2 m² × 0.25 h.
fn optimizer(safety_margin: f64) -> MotionCostOptimizer {
    MotionCostOptimizer {
        min_move_epsilon_deg: 1.0,
        safety_margin,
        panel_area_m2: 2.0,
        cycle_duration_hours: 0.25,
    }
}

fn motor(tilt: f64, azimuth: f64, overhead: f64) -> LinearMotorCost {
    LinearMotorCost {
        tilt_wh_per_deg: tilt,
        azimuth_wh_per_deg: azimuth,
        activation_overhead_wh: overhead,
    }
}

// ── Motor cost ──

#[test]
fn test_zero_displacement_costs_nothing() {
    let m = LinearMotorCost::default();
    assert_eq!(m.cost_wh(&AngularDisplacement::default()), 0.0);
}

#[test]
fn test_per_axis_cost_plus_overhead() {
    let m = motor(0.05, 0.03, 0.5);
    let d = AngularDisplacement {
        tilt_deg: 10.0,
        azimuth_deg: 20.0,
    };
    assert_approx!(m.cost_wh(&d), 0.5 + 0.6 + 0.5, 1e-12);
    assert_approx!(m.cost_wh(&d.tilt_only()), 1.0, 1e-12);
}

#[test]
fn test_azimuth_displacement_takes_short_way() {
    let d = Orientation::new(10.0, 350.0).displacement(&Orientation::new(10.0, 10.0));
    assert_eq!(d.azimuth_deg, 20.0);
    assert_eq!(d.tilt_deg, 0.0);

    let d = Orientation::new(10.0, 10.0).displacement(&Orientation::new(10.0, 350.0));
    assert_eq!(d.azimuth_deg, 20.0);
}

#[test]
fn test_default_model_from_config() {
    let o = MotionCostOptimizer::from_config(&EngineConfig::default());
    assert_approx!(o.cycle_duration_hours, 10.0 / 60.0, 1e-12);
    assert_eq!(o.min_move_epsilon_deg, 1.0);
    assert_eq!(o.panel_area_m2, 2.0);
}

// ── Economic gate ──

#[test]
fn test_gain_exactly_at_threshold_holds() {
    // cost = 10° × 0.25 + 1.5 = 4.0, threshold = 4.0 × 1.25 = 5.0
    let o = optimizer(0.25);
    let m = motor(0.25, 0.0, 1.5);
    let current = Orientation::new(20.0, 180.0);
    let candidate = Orientation::new(30.0, 180.0);

    let d = o.decide(current, candidate, 500.0, 510.0, &m);
    assert_eq!(d.predicted_gain_wh, 5.0);
    assert_eq!(d.estimated_motor_cost_wh, 4.0);
    assert_eq!(d.action, MotionAction::Hold);
    assert_eq!(d.reason, ReasonCode::InsufficientGain);
    assert_eq!(d.target, current);
}

#[test]
fn test_gain_just_above_threshold_moves() {
    let o = optimizer(0.25);
    let m = motor(0.25, 0.0, 1.5);
    let current = Orientation::new(20.0, 180.0);
    let candidate = Orientation::new(30.0, 180.0);

    let d = o.decide(current, candidate, 500.0, 510.000001, &m);
    assert_eq!(d.action, MotionAction::Move);
    assert_eq!(d.reason, ReasonCode::Geometry);
    assert_eq!(d.target, candidate);
}

#[test]
fn test_small_gain_against_large_cost_holds() {
    // gain 2 Wh, cost 5 Wh, margin 10 %
    let o = optimizer(0.1);
    let m = motor(0.25, 0.0, 2.5);
    let current = Orientation::new(20.0, 180.0);
    let d = o.decide(current, Orientation::new(30.0, 180.0), 500.0, 504.0, &m);
    assert_approx!(d.predicted_gain_wh, 2.0, 1e-12);
    assert_approx!(d.estimated_motor_cost_wh, 5.0, 1e-12);
    assert_eq!(d.action, MotionAction::Hold);
    assert_eq!(d.reason, ReasonCode::InsufficientGain);
    assert_eq!(d.target, current);
}

#[test]
fn test_negative_gain_never_moves() {
    let o = optimizer(0.0);
    let m = motor(0.0, 0.0, 0.0);
    let d = o.decide(
        Orientation::new(20.0, 180.0),
        Orientation::new(60.0, 90.0),
        800.0,
        300.0,
        &m,
    );
    assert_eq!(d.action, MotionAction::Hold);
}

// ── Minimum move ──

#[test]
fn test_below_epsilon_holds_regardless_of_gain() {
    let o = optimizer(0.0);
    let m = motor(0.0, 0.0, 0.0);
    let current = Orientation::new(20.0, 180.0);
    let candidate = Orientation::new(20.4, 180.5);
    for policy in [GatePolicy::Economic, GatePolicy::SnowShedding, GatePolicy::Stow] {
        let d = o.decide_with(policy, current, candidate, 0.0, 1.0e6, &m);
        assert_eq!(d.action, MotionAction::Hold, "{:?}", policy);
        assert_eq!(d.reason, ReasonCode::BelowMinimumMove);
        assert_eq!(d.target, current);
    }
}

#[test]
fn test_wrapped_azimuth_counts_short_travel() {
    let o = optimizer(0.0);
    let m = motor(0.0, 0.1, 0.0);
    let current = Orientation::new(20.0, 359.6);
    let d = o.decide(current, Orientation::new(20.0, 0.2), 0.0, 1000.0, &m);
    assert_eq!(d.reason, ReasonCode::BelowMinimumMove);

    let d = o.decide(
        Orientation::new(20.0, 350.0),
        Orientation::new(20.0, 10.0),
        0.0,
        0.0,
        &m,
    );
    assert_approx!(d.estimated_motor_cost_wh, 2.0, 1e-9);
}

// ── Snow shedding ──

#[test]
fn test_snow_shedding_tilt_is_forced() {
    let o = optimizer(0.1);
    let m = LinearMotorCost::default();
    let current = Orientation::new(30.0, 150.0);
    let candidate = Orientation::new(65.0, 150.0);

    // the steep pose sees less light; tilt still moves
    let d = o.decide_with(GatePolicy::SnowShedding, current, candidate, 600.0, 100.0, &m);
    assert_eq!(d.action, MotionAction::Move);
    assert_eq!(d.reason, ReasonCode::SnowShedding);
    assert_eq!(d.target, candidate);
    assert!(d.predicted_gain_wh < 0.0);
    assert_approx!(d.estimated_motor_cost_wh, 35.0 * 0.05 + 0.5, 1e-9);
}

#[test]
fn test_snow_shedding_azimuth_needs_gain() {
    let o = optimizer(0.1);
    let m = LinearMotorCost::default();
    let current = Orientation::new(30.0, 150.0);
    let candidate = Orientation::new(65.0, 200.0);

    // marginal azimuth cost = 50° × 0.03 = 1.5 Wh, needs > 1.65 Wh
    let d = o.decide_snow_shedding(current, candidate, 500.0, 500.0, 503.0, &m);
    assert_eq!(d.action, MotionAction::Move);
    assert_eq!(d.target, Orientation::new(65.0, 150.0));
    assert_approx!(d.estimated_motor_cost_wh, 35.0 * 0.05 + 0.5, 1e-9);

    let d = o.decide_snow_shedding(current, candidate, 500.0, 500.0, 504.0, &m);
    assert_eq!(d.action, MotionAction::Move);
    assert_eq!(d.target, candidate);
    assert_approx!(d.predicted_gain_wh, 2.0, 1e-9);
    assert_approx!(d.estimated_motor_cost_wh, 35.0 * 0.05 + 50.0 * 0.03 + 0.5, 1e-9);
}

#[test]
fn test_snow_shedding_tilt_gain_does_not_pay_for_azimuth() {
    let o = optimizer(0.1);
    let m = LinearMotorCost::default();
    let current = Orientation::new(30.0, 150.0);
    let candidate = Orientation::new(65.0, 200.0);

    // almost all of the gain comes from the steeper tilt
    let d = o.decide_snow_shedding(current, candidate, 300.0, 600.0, 601.0, &m);
    assert_eq!(d.action, MotionAction::Move);
    assert_eq!(d.reason, ReasonCode::SnowShedding);
    assert_eq!(d.target, Orientation::new(65.0, 150.0));
    assert_approx!(d.predicted_gain_wh, 300.0 * 0.5, 1e-9);
}

#[test]
fn test_snow_shedding_without_tilted_estimate_credits_tilt() {
    let o = optimizer(0.1);
    let m = LinearMotorCost::default();
    let current = Orientation::new(30.0, 150.0);
    let candidate = Orientation::new(65.0, 200.0);

    let d = o.decide_with(GatePolicy::SnowShedding, current, candidate, 300.0, 601.0, &m);
    assert_eq!(d.target, Orientation::new(65.0, 150.0));

    // already steep: the whole gain belongs to the azimuth move, which now
    // also carries the activation overhead (2.0 Wh, needs > 2.2 Wh)
    let at_tilt = Orientation::new(65.0, 150.0);
    let d = o.decide_with(GatePolicy::SnowShedding, at_tilt, candidate, 500.0, 504.0, &m);
    assert_eq!(d.action, MotionAction::Hold);
    assert_eq!(d.reason, ReasonCode::InsufficientGain);

    let d = o.decide_with(GatePolicy::SnowShedding, at_tilt, candidate, 500.0, 505.0, &m);
    assert_eq!(d.action, MotionAction::Move);
    assert_eq!(d.target, candidate);
}

#[test]
fn test_snow_shedding_at_tilt_holds_without_gain() {
    let o = optimizer(0.1);
    let m = LinearMotorCost::default();
    let current = Orientation::new(65.0, 150.0);
    let candidate = Orientation::new(65.0, 200.0);
    let d = o.decide_with(GatePolicy::SnowShedding, current, candidate, 500.0, 500.0, &m);
    assert_eq!(d.action, MotionAction::Hold);
    assert_eq!(d.reason, ReasonCode::InsufficientGain);
    assert_eq!(d.target, current);
}

// ── Stow ──

#[test]
fn test_stow_ignores_economics() {
    let o = optimizer(0.5);
    let m = LinearMotorCost::default();
    let current = Orientation::new(40.0, 250.0);
    let stow = Orientation::new(0.0, 180.0);
    let d = o.decide_with(GatePolicy::Stow, current, stow, 0.0, 0.0, &m);
    assert_eq!(d.action, MotionAction::Move);
    assert_eq!(d.reason, ReasonCode::NightStow);
    assert_eq!(d.target, stow);
    assert_eq!(d.predicted_gain_wh, 0.0);
    assert!(d.estimated_motor_cost_wh > 0.0);
}
