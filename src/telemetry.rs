//! Outbound seams: actuator commands and telemetry.
//!
//! ```text
//!   TrackingOrchestrator ──▶ ActuatorPort   (MOVE only)
//!                        ──▶ TelemetrySink  (every cycle)
//! ```
//!
//! Both are fire-and-forget. Whether the motors actually reached the target
//! comes back as next cycle's `current` orientation.

use std::io::Write;

use chrono::{DateTime, Utc};
use log::warn;
use serde::{Deserialize, Serialize};

use crate::predictor::EstimateSource;
use crate::types::{MotionDecision, Orientation, SolarPosition, WinterMode};

pub trait ActuatorPort {
    fn command(&mut self, target: Orientation);
}

pub trait TelemetrySink {
    fn emit(&mut self, event: &TelemetryEvent);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DegradedReason {
    InvalidGeoTime,
    InvalidOrientation,
    SensorDataMissing,
}

/// One committed cycle, as seen by the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryRecord {
    pub timestamp: DateTime<Utc>,
    pub current: Orientation,
    pub sun: Option<SolarPosition>,
    pub decision: MotionDecision,
    pub winter_mode: WinterMode,
    pub estimate_source: Option<EstimateSource>,
    pub degraded: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TelemetryEvent {
    Cycle(TelemetryRecord),
    WinterTransition {
        mode: WinterMode,
        at: DateTime<Utc>,
    },
    SensorDataMissing {
        field: String,
        consecutive: u32,
        at: DateTime<Utc>,
    },
    Degraded {
        reason: DegradedReason,
        detail: String,
        at: DateTime<Utc>,
    },
}

impl TelemetrySink for Vec<TelemetryEvent> {
    fn emit(&mut self, event: &TelemetryEvent) {
        self.push(event.clone());
    }
}

/// Writes each event as one JSON line, e.g. to a socket or spool file
/// picked up by the cloud uploader.
pub struct JsonLinesSink<W: Write> {
    writer: W,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> TelemetrySink for JsonLinesSink<W> {
    fn emit(&mut self, event: &TelemetryEvent) {
        let written = serde_json::to_writer(&mut self.writer, event)
            .map_err(std::io::Error::from)
            .and_then(|_| self.writer.write_all(b"\n"));
        if let Err(e) = written {
            warn!("telemetry write failed: {e}");
        }
    }
}
