//! Latest heater status and the link health derived from it.
//!
//! Each valid status frame replaces the stored [`Telemetry`] wholesale.
//! The store also tracks when the last frame arrived (the link is
//! considered lost after [`COMMUNICATION_TIMEOUT_MS`]) and how long the
//! heater has been in its current run state.

use log::{info, warn};
use serde::Serialize;

use crate::protocol::ControllerCommand;

/// No status frame for this long means the heater is unreachable.
pub const COMMUNICATION_TIMEOUT_MS: u64 = 5_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RunState {
    Off,
    Starting,
    Running,
    CoolingDown,
    Fault,
}

impl RunState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Off => "Off",
            Self::Starting => "Starting",
            Self::Running => "Running",
            Self::CoolingDown => "Cooling Down",
            Self::Fault => "Fault",
        }
    }

    /// Burning or about to be.
    pub fn is_active(self) -> bool {
        matches!(self, Self::Starting | Self::Running)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum GlowPlugStatus {
    Off,
    Preheat,
    On,
    Fault,
}

impl GlowPlugStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Off => "Off",
            Self::Preheat => "Preheat",
            Self::On => "On",
            Self::Fault => "Fault",
        }
    }
}

/// One decoded heater status report.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Telemetry {
    /// Supply voltage (V)
    pub input_voltage: f32,
    /// Reported power level, 0-100 in steps of 10
    pub power_percent: u8,
    pub fan_speed_rpm: u16,
    /// Fuel pump pulse rate (Hz)
    pub pump_frequency_hz: f32,
    pub glow_plug: GlowPlugStatus,
    /// Heat exchanger temperature (Celsius)
    pub heat_exchanger_temperature_c: f32,
    pub run_state: RunState,
    /// The heater itself flagged low supply voltage
    pub low_voltage_fault: bool,
}

impl Default for Telemetry {
    fn default() -> Self {
        Self {
            input_voltage: 0.0,
            power_percent: 0,
            fan_speed_rpm: 0,
            pump_frequency_hz: 0.0,
            glow_plug: GlowPlugStatus::Off,
            heat_exchanger_temperature_c: 0.0,
            run_state: RunState::Off,
            low_voltage_fault: false,
        }
    }
}

/// Link state change reported by [`TelemetryStore::check_link`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkChange {
    Lost,
    Restored,
}

#[derive(Debug, Default)]
pub struct TelemetryStore {
    latest: Option<Telemetry>,
    last_received_ms: Option<u64>,
    state_since_ms: u64,
    observed: Option<ControllerCommand>,
    connected: bool,
    frames: u32,
}

impl TelemetryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the stored telemetry with a freshly decoded report.
    pub fn apply(&mut self, t: Telemetry, now_ms: u64) {
        let previous = self.latest.map(|p| p.run_state);
        if previous != Some(t.run_state) {
            info!(
                "heater: {} -> {}",
                previous.map_or("-", RunState::as_str),
                t.run_state.as_str()
            );
            self.state_since_ms = now_ms;
        }
        self.latest = Some(t);
        self.last_received_ms = Some(now_ms);
        self.frames = self.frames.saturating_add(1);
    }

    /// Record a command frame sent by another controller (sniff mode).
    pub fn observe_command(&mut self, cmd: ControllerCommand) {
        self.observed = Some(cmd);
    }

    pub fn observed_command(&self) -> Option<ControllerCommand> {
        self.observed
    }

    /// Re-evaluate the communication timeout, reporting edges only.
    pub fn check_link(&mut self, now_ms: u64) -> Option<LinkChange> {
        let connected = self.is_connected(now_ms);
        if connected == self.connected {
            return None;
        }
        self.connected = connected;
        if connected {
            info!("heater link restored");
            Some(LinkChange::Restored)
        } else {
            warn!(
                "heater link lost: no status for {} ms",
                COMMUNICATION_TIMEOUT_MS
            );
            Some(LinkChange::Lost)
        }
    }

    pub fn is_connected(&self, now_ms: u64) -> bool {
        self.last_received_ms
            .is_some_and(|t| now_ms.saturating_sub(t) <= COMMUNICATION_TIMEOUT_MS)
    }

    /// Most recent report regardless of age.
    pub fn latest(&self) -> Option<&Telemetry> {
        self.latest.as_ref()
    }

    /// Most recent report, or `None` once the link has timed out.
    pub fn fresh(&self, now_ms: u64) -> Option<&Telemetry> {
        if self.is_connected(now_ms) {
            self.latest.as_ref()
        } else {
            None
        }
    }

    /// Pump rate for fuel accounting; zero while disconnected.
    pub fn pump_frequency_hz(&self, now_ms: u64) -> f32 {
        self.fresh(now_ms).map_or(0.0, |t| t.pump_frequency_hz)
    }

    /// Seconds since `run_state` last changed.
    pub fn state_duration_s(&self, now_ms: u64) -> u32 {
        if self.latest.is_none() {
            return 0;
        }
        (now_ms.saturating_sub(self.state_since_ms) / 1000) as u32
    }

    pub fn cooling_down(&self) -> bool {
        self.latest
            .is_some_and(|t| t.run_state == RunState::CoolingDown)
    }

    pub fn frames_received(&self) -> u32 {
        self.frames
    }
}
