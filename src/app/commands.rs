//! Inbound commands to the application service.
//!
//! These represent actions requested by the host layer (select, number and
//! switch entities, buttons, an external temperature sensor) that the
//! [`AppService`](super::service::AppService) interprets and acts upon.
//! They take effect at the next tick boundary.

use crate::config::{HeaterConfig, Setpoint};
use crate::fsm::ControlMode;

/// Commands that external adapters can send into the application core.
#[derive(Debug, Clone)]
pub enum AppCommand {
    /// Switch control mode; applied at the start of the next tick.
    SelectMode(ControlMode),

    /// Manual-mode power level (10-100 %).
    SetManualPower(f32),

    /// Change one numeric setting.
    SetSetpoint(Setpoint, f32),

    /// Master enable for Manual and Automatic.
    SetPowerSwitch(bool),

    /// Zero the lifetime fuel total.
    ResetTotalConsumption,

    /// Zero the daily fuel counter.
    ResetDailyConsumption,

    /// Fresh reading from an external temperature sensor, or `None` when
    /// that sensor became unavailable.
    ExternalTemperature(Option<f32>),

    /// Replace the whole configuration (validated first).
    UpdateConfig(HeaterConfig),

    /// Persist the current config on the next auto-save check.
    SaveConfig,
}
