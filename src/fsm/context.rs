//! Shared mutable context threaded through every mode handler.
//!
//! `ModeContext` is the single struct that mode handlers read from and
//! write to: the current time and temperature input, the configuration,
//! host-set values (manual power, power switch), and the control laws
//! whose state must survive across ticks.

use crate::config::HeaterConfig;
use crate::control::antifreeze::AntifreezeThermostat;
use crate::control::predictive::PredictiveController;
use crate::control::HeaterCommand;

/// The shared context passed to every mode handler function.
pub struct ModeContext {
    // -- Timing --
    /// Monotonic time of the current tick (milliseconds).
    pub now_ms: u64,
    /// Ticks elapsed since the current mode was entered.
    pub ticks_in_mode: u64,

    // -- Inputs --
    /// Temperature driving Automatic and Antifreeze; `None` when no source
    /// is fresh.  Updated before each tick.
    pub temperature_c: Option<f32>,

    // -- Host-set values --
    pub config: HeaterConfig,
    /// Last power explicitly set in Manual mode (%).
    pub manual_power_percent: f32,
    /// Master enable for Manual and Automatic.  Antifreeze ignores it.
    pub power_switch: bool,

    // -- Control laws --
    pub controller: PredictiveController,
    pub antifreeze: AntifreezeThermostat,

    // -- Output --
    /// What the active mode asked for on the last tick, before the safety
    /// overlay.
    pub requested: HeaterCommand,
}

impl ModeContext {
    pub fn new(config: HeaterConfig) -> Self {
        Self {
            now_ms: 0,
            ticks_in_mode: 0,
            temperature_c: None,
            manual_power_percent: config.default_power_percent,
            power_switch: true,
            config,
            controller: PredictiveController::new(),
            antifreeze: AntifreezeThermostat::new(),
            requested: HeaterCommand::OFF,
        }
    }
}
