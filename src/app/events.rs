//! Outbound application events.
//!
//! The [`AppService`](super::service::AppService) emits these through the
//! [`EventSink`](super::ports::EventSink) port.  Adapters on the other
//! side decide what to do with them: log to serial, update host entities,
//! record them in tests.

use serde::Serialize;

use crate::config::Setpoint;
use crate::control::predictive::PredictiveOutputs;
use crate::control::HeaterCommand;
use crate::error::{Error, SafetyFault};
use crate::fsm::ControlMode;
use crate::fuel::ConsumptionCounters;
use crate::safety::SafetyState;
use crate::telemetry::Telemetry;

/// Structured events emitted by the application core.
#[derive(Debug, Clone)]
pub enum AppEvent {
    /// The application service has started (carries the initial mode).
    Started(ControlMode),

    /// Periodic telemetry snapshot.
    Telemetry(TelemetrySnapshot),

    /// The mode machine switched modes.
    ModeChanged { from: ControlMode, to: ControlMode },

    /// The safety guard forced the heater off.
    FaultDetected(SafetyFault),

    /// The safety guard released its override.
    FaultCleared,

    /// No status frame from the heater within the communication timeout.
    LinkLost,

    /// Status frames are arriving again.
    LinkRestored,

    /// A setting changed to `value`.
    SetpointChanged { setpoint: Setpoint, value: f32 },

    /// A host request was refused; prior values are kept.
    CommandRejected(Error),

    /// Fuel counters were zeroed by the host or a day rollover.
    ConsumptionReset { total: bool, daily: bool },
}

/// A point-in-time snapshot of every value the controller exposes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TelemetrySnapshot {
    pub mode: ControlMode,
    /// Status frames arrived within the communication timeout.
    pub connected: bool,
    /// Latest heater report, `None` until the first status frame.
    pub heater: Option<Telemetry>,
    pub state_duration_s: u32,
    pub cooling_down: bool,
    /// Reported by the heater or raised by the safety guard.
    pub low_voltage_fault: bool,
    pub consumption: ConsumptionCounters,
    pub controller: PredictiveOutputs,
    /// Temperature input used by the control laws this tick.
    pub temperature_c: Option<f32>,
    /// Output after the safety overlay.
    pub commanded: HeaterCommand,
    pub power_switch: bool,
    pub safety: SafetyState,
    /// A control law is running on held or fallback output.
    pub degraded: bool,
    pub passive_sniff: bool,
}
