//! Debounced winter (snow-shedding) override.
//!
//! ```text
//!            cold && snow  × dwell_samples
//!   NORMAL ─────────────────────────────────▶ WINTER
//!          ◀─────────────────────────────────
//!            warm && !snow × dwell_samples
//! ```
//!
//! Any sample that does not satisfy the condition for the opposite state
//! resets the streak, so a single noisy reading can never flip the mode.
//! While WINTER is active the target is a steep tilt with the azimuth frozen
//! at the pose the panel held on entry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::WinterConfig;
use crate::types::{Orientation, SensorSnapshot, WinterMode, WinterState};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WinterTransition {
    pub mode: WinterMode,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WinterModeController {
    config: WinterConfig,
    state: WinterState,
    /// Consecutive samples satisfying the exit condition of the current mode.
    streak: u32,
}

impl WinterModeController {
    pub fn new(config: WinterConfig) -> Self {
        Self {
            config,
            state: WinterState::default(),
            streak: 0,
        }
    }

    /// Resume from a persisted state. A WINTER state without a frozen
    /// azimuth is not resumable and starts in NORMAL instead.
    pub fn restore(config: WinterConfig, state: WinterState) -> Self {
        let state = match state {
            WinterState {
                active: true,
                frozen_azimuth: None,
                ..
            } => WinterState::default(),
            other => other,
        };
        Self {
            config,
            state,
            streak: 0,
        }
    }

    pub fn state(&self) -> WinterState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state.active
    }

    /// Feed one sample. `current` is the pose reported by the actuator; its
    /// azimuth is frozen if this sample completes the entry dwell.
    pub fn evaluate(
        &mut self,
        snapshot: &SensorSnapshot,
        current: &Orientation,
        at: DateTime<Utc>,
    ) -> Option<WinterTransition> {
        let cold = snapshot.ambient_temp_c < self.config.temp_threshold_c;
        let qualifies = if self.state.active {
            !cold && !snapshot.snow_detected
        } else {
            cold && snapshot.snow_detected
        };

        if !qualifies {
            self.streak = 0;
            return None;
        }

        self.streak += 1;
        if self.streak < self.config.dwell_samples {
            return None;
        }

        self.streak = 0;
        self.state = if self.state.active {
            WinterState::default()
        } else {
            WinterState {
                active: true,
                entered_at: Some(at),
                frozen_azimuth: Some(current.azimuth()),
            }
        };
        Some(WinterTransition {
            mode: self.state.mode(),
            at,
        })
    }

    /// Replace `nominal` with the snow-shedding pose while WINTER is active.
    pub fn override_target(&self, nominal: Orientation) -> Orientation {
        match (self.state.active, self.state.frozen_azimuth) {
            (true, Some(azimuth)) => Orientation::new(self.config.tilt_deg, azimuth),
            _ => nominal,
        }
    }
}
