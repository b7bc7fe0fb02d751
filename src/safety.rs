//! Supply-voltage guard.
//!
//! The guard runs **every control tick before the command is transmitted**
//! and may override whatever the active mode asked for.  A diesel heater
//! that starts on a sagging battery floods the burner, and one that keeps
//! running below its operating voltage stalls the glow plug.
//!
//! ## Fault lifecycle
//!
//! ```text
//!          v < operate while running
//!          v < start   while starting
//!   ┌────┐ ─────────────────────────▶ ┌───────┐
//!   │ OK │                            │ FAULT │──┐ v < start:
//!   └────┘ ◀───────────────────────── └───────┘◀─┘ restart debounce
//!          v ≥ start for voltage_recovery_s
//! ```
//!
//! While FAULT the commanded output is forced off regardless of mode.

use log::{error, info};
use serde::Serialize;

use crate::config::HeaterConfig;
use crate::control::antifreeze::AntifreezeBand;
use crate::error::SafetyFault;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum GuardState {
    Ok,
    Fault,
}

/// Edge reported by [`VoltageGuard::evaluate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardTransition {
    Tripped(SafetyFault),
    Cleared,
}

/// What the guard needs from the latest telemetry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoltageInput {
    pub voltage: f32,
    /// Heater is starting or burning.
    pub running: bool,
    /// A start is being requested while the heater is not yet running.
    pub starting: bool,
}

/// Derived each tick and exposed to the host; never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SafetyState {
    pub voltage_ok: bool,
    pub antifreeze_band: AntifreezeBand,
}

pub struct VoltageGuard {
    min_start: f32,
    min_operate: f32,
    recovery_ms: u64,
    state: GuardState,
    /// When the voltage last rose back above `min_start` while faulted.
    recovering_since: Option<u64>,
}

impl VoltageGuard {
    pub fn new(config: &HeaterConfig) -> Self {
        let mut guard = Self {
            min_start: 0.0,
            min_operate: 0.0,
            recovery_ms: 0,
            state: GuardState::Ok,
            recovering_since: None,
        };
        guard.update_thresholds(config);
        guard
    }

    pub fn update_thresholds(&mut self, config: &HeaterConfig) {
        self.min_start = config.min_voltage_start;
        self.min_operate = config.min_voltage_operate;
        self.recovery_ms = (config.voltage_recovery_s * 1000.0) as u64;
    }

    /// Evaluate one tick.  `None` (no fresh telemetry) leaves the state
    /// untouched.
    pub fn evaluate(&mut self, input: Option<VoltageInput>, now_ms: u64) -> Option<GuardTransition> {
        let input = input?;
        match self.state {
            GuardState::Ok => {
                let low_running = input.running && input.voltage < self.min_operate;
                let low_start = input.starting && input.voltage < self.min_start;
                if !(low_running || low_start) {
                    return None;
                }
                error!(
                    "SAFETY FAULT SET: {} ({:.1} V, {})",
                    SafetyFault::LowVoltage,
                    input.voltage,
                    if low_running { "running" } else { "starting" }
                );
                self.state = GuardState::Fault;
                self.recovering_since = None;
                Some(GuardTransition::Tripped(SafetyFault::LowVoltage))
            }
            GuardState::Fault => {
                if input.voltage < self.min_start {
                    self.recovering_since = None;
                    return None;
                }
                let since = *self.recovering_since.get_or_insert(now_ms);
                if now_ms.saturating_sub(since) < self.recovery_ms {
                    return None;
                }
                info!(
                    "SAFETY FAULT CLEARED: {} ({:.1} V)",
                    SafetyFault::LowVoltage,
                    input.voltage
                );
                self.state = GuardState::Ok;
                self.recovering_since = None;
                Some(GuardTransition::Cleared)
            }
        }
    }

    pub fn state(&self) -> GuardState {
        self.state
    }

    pub fn is_fault(&self) -> bool {
        self.state == GuardState::Fault
    }

    pub fn fault(&self) -> Option<SafetyFault> {
        self.is_fault().then_some(SafetyFault::LowVoltage)
    }
}
