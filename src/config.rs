//! Heater controller configuration.
//!
//! All tunable parameters of the controller.  Values start from the
//! defaults below, can be restored from NVS, and can be changed at runtime
//! by the host layer through [`Setpoint`]s.

use serde::{Deserialize, Serialize};

use crate::app::ports::ConfigError;
use crate::fsm::ControlMode;

/// Fastest allowed control cadence.
pub const MIN_SEND_INTERVAL_MS: u32 = 200;

/// Widest allowed slope-fit window.
pub const MAX_SLOPE_WINDOW_S: u32 = 120;

/// Core controller configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeaterConfig {
    // --- Mode ---
    /// Mode selected at boot
    pub control_mode: ControlMode,
    /// Manual power at boot, and the fallback power when the temperature
    /// input is lost in Automatic mode (10-100%)
    pub default_power_percent: f32,
    /// Receive-only installation: decode everything, transmit nothing
    pub passive_sniff: bool,

    // --- Fuel ---
    /// Fuel volume injected by one pump pulse (mL)
    pub injected_per_pulse_ml: f32,

    // --- Timing ---
    /// Telemetry publish / fuel persist interval (milliseconds)
    pub polling_interval_ms: u32,
    /// Control cycle and command frame interval (milliseconds)
    pub send_interval_ms: u32,

    // --- Predictive PI ---
    /// Target temperature (Celsius)
    pub target_temperature_c: f32,
    pub kp: f32,
    pub ki: f32,
    /// Minimum time the heater stays on after an on-transition (seconds)
    pub min_on_time_s: f32,
    /// Horizon of the temperature projection (seconds)
    pub t_lookahead_s: f32,
    /// Trailing window for the slope fit (seconds)
    pub slope_window_s: f32,
    /// PI output at or below which the heater is turned off (%)
    pub output_off_threshold: f32,
    /// PI output at or above which the heater is turned on (%)
    pub output_on_threshold: f32,
    /// How long the last command is held after the temperature input
    /// disappears (seconds)
    pub sensor_grace_s: f32,
    /// External temperature samples older than this are ignored (seconds)
    pub external_temperature_max_age_s: f32,

    // --- Voltage safety ---
    /// Minimum supply voltage to start, and to recover from a fault (V)
    pub min_voltage_start: f32,
    /// Minimum supply voltage while running (V)
    pub min_voltage_operate: f32,
    /// Voltage must stay above `min_voltage_start` this long to clear a
    /// fault (seconds)
    pub voltage_recovery_s: f32,

    // --- Antifreeze bands (Celsius, strictly increasing) ---
    pub antifreeze_temp_on: f32,
    pub antifreeze_temp_medium: f32,
    pub antifreeze_temp_low: f32,
    pub antifreeze_temp_off: f32,
}

impl Default for HeaterConfig {
    fn default() -> Self {
        Self {
            // Mode
            control_mode: ControlMode::Manual,
            default_power_percent: 80.0,
            passive_sniff: false,

            // Fuel
            injected_per_pulse_ml: 0.022,

            // Timing
            polling_interval_ms: 60_000, // 1/min
            send_interval_ms: 1_000,     // 1 Hz

            // Predictive PI
            target_temperature_c: 20.0,
            kp: 10.0,
            ki: 0.5,
            min_on_time_s: 30.0,
            t_lookahead_s: 90.0,
            slope_window_s: 45.0,
            output_off_threshold: -10.0,
            output_on_threshold: 10.0,
            sensor_grace_s: 120.0,
            external_temperature_max_age_s: 300.0,

            // Voltage safety
            min_voltage_start: 12.3,
            min_voltage_operate: 11.4,
            voltage_recovery_s: 10.0,

            // Antifreeze
            antifreeze_temp_on: 2.0,
            antifreeze_temp_medium: 6.0,
            antifreeze_temp_low: 8.0,
            antifreeze_temp_off: 9.0,
        }
    }
}

// ---------------------------------------------------------------------------
// Setpoints (host-adjustable numeric values)
// ---------------------------------------------------------------------------

/// Numeric settings the host layer may read and write at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Setpoint {
    TargetTemperature,
    Kp,
    Ki,
    MinOnTime,
    Lookahead,
    SlopeWindow,
    OutputOffThreshold,
    OutputOnThreshold,
    InjectedPerPulse,
    DefaultPower,
    MinVoltageStart,
    MinVoltageOperate,
    AntifreezeOn,
    AntifreezeMedium,
    AntifreezeLow,
    AntifreezeOff,
}

impl Setpoint {
    pub const ALL: [Setpoint; 16] = [
        Setpoint::TargetTemperature,
        Setpoint::Kp,
        Setpoint::Ki,
        Setpoint::MinOnTime,
        Setpoint::Lookahead,
        Setpoint::SlopeWindow,
        Setpoint::OutputOffThreshold,
        Setpoint::OutputOnThreshold,
        Setpoint::InjectedPerPulse,
        Setpoint::DefaultPower,
        Setpoint::MinVoltageStart,
        Setpoint::MinVoltageOperate,
        Setpoint::AntifreezeOn,
        Setpoint::AntifreezeMedium,
        Setpoint::AntifreezeLow,
        Setpoint::AntifreezeOff,
    ];

    /// Inclusive valid range.
    pub fn range(self) -> (f32, f32) {
        match self {
            Self::TargetTemperature => (5.0, 35.0),
            Self::Kp => (0.1, 50.0),
            Self::Ki => (0.0, 5.0),
            Self::MinOnTime => (0.0, 300.0),
            Self::Lookahead => (30.0, 300.0),
            Self::SlopeWindow => (10.0, MAX_SLOPE_WINDOW_S as f32),
            Self::OutputOffThreshold => (-100.0, 0.0),
            Self::OutputOnThreshold => (0.0, 100.0),
            Self::InjectedPerPulse => (0.001, 1.0),
            Self::DefaultPower => (10.0, 100.0),
            Self::MinVoltageStart => (10.0, 15.0),
            Self::MinVoltageOperate => (9.0, 14.0),
            Self::AntifreezeOn | Self::AntifreezeMedium | Self::AntifreezeLow => (-20.0, 20.0),
            Self::AntifreezeOff => (-20.0, 30.0),
        }
    }

    /// Static rejection message used when a value falls outside [`range`](Self::range).
    pub fn range_message(self) -> &'static str {
        match self {
            Self::TargetTemperature => "target_temperature must be 5–35",
            Self::Kp => "kp must be 0.1–50",
            Self::Ki => "ki must be 0–5",
            Self::MinOnTime => "min_on_time must be 0–300",
            Self::Lookahead => "t_lookahead must be 30–300",
            Self::SlopeWindow => "slope_window must be 10–120",
            Self::OutputOffThreshold => "output_off_threshold must be -100–0",
            Self::OutputOnThreshold => "output_on_threshold must be 0–100",
            Self::InjectedPerPulse => "injected_per_pulse must be 0.001–1.0",
            Self::DefaultPower => "default_power_percent must be 10–100",
            Self::MinVoltageStart => "min_voltage_start must be 10–15",
            Self::MinVoltageOperate => "min_voltage_operate must be 9–14",
            Self::AntifreezeOn => "antifreeze_temp_on must be -20–20",
            Self::AntifreezeMedium => "antifreeze_temp_medium must be -20–20",
            Self::AntifreezeLow => "antifreeze_temp_low must be -20–20",
            Self::AntifreezeOff => "antifreeze_temp_off must be -20–30",
        }
    }

    pub fn get(self, cfg: &HeaterConfig) -> f32 {
        match self {
            Self::TargetTemperature => cfg.target_temperature_c,
            Self::Kp => cfg.kp,
            Self::Ki => cfg.ki,
            Self::MinOnTime => cfg.min_on_time_s,
            Self::Lookahead => cfg.t_lookahead_s,
            Self::SlopeWindow => cfg.slope_window_s,
            Self::OutputOffThreshold => cfg.output_off_threshold,
            Self::OutputOnThreshold => cfg.output_on_threshold,
            Self::InjectedPerPulse => cfg.injected_per_pulse_ml,
            Self::DefaultPower => cfg.default_power_percent,
            Self::MinVoltageStart => cfg.min_voltage_start,
            Self::MinVoltageOperate => cfg.min_voltage_operate,
            Self::AntifreezeOn => cfg.antifreeze_temp_on,
            Self::AntifreezeMedium => cfg.antifreeze_temp_medium,
            Self::AntifreezeLow => cfg.antifreeze_temp_low,
            Self::AntifreezeOff => cfg.antifreeze_temp_off,
        }
    }

    fn slot(self, cfg: &mut HeaterConfig) -> &mut f32 {
        match self {
            Self::TargetTemperature => &mut cfg.target_temperature_c,
            Self::Kp => &mut cfg.kp,
            Self::Ki => &mut cfg.ki,
            Self::MinOnTime => &mut cfg.min_on_time_s,
            Self::Lookahead => &mut cfg.t_lookahead_s,
            Self::SlopeWindow => &mut cfg.slope_window_s,
            Self::OutputOffThreshold => &mut cfg.output_off_threshold,
            Self::OutputOnThreshold => &mut cfg.output_on_threshold,
            Self::InjectedPerPulse => &mut cfg.injected_per_pulse_ml,
            Self::DefaultPower => &mut cfg.default_power_percent,
            Self::MinVoltageStart => &mut cfg.min_voltage_start,
            Self::MinVoltageOperate => &mut cfg.min_voltage_operate,
            Self::AntifreezeOn => &mut cfg.antifreeze_temp_on,
            Self::AntifreezeMedium => &mut cfg.antifreeze_temp_medium,
            Self::AntifreezeLow => &mut cfg.antifreeze_temp_low,
            Self::AntifreezeOff => &mut cfg.antifreeze_temp_off,
        }
    }

    /// Write `value` into a copy of `cfg` and validate the whole result.
    ///
    /// On rejection `cfg` is untouched, so the prior valid value is kept.
    pub fn apply(self, cfg: &mut HeaterConfig, value: f32) -> Result<(), ConfigError> {
        let mut candidate = cfg.clone();
        *self.slot(&mut candidate) = value;
        validate_config(&candidate)?;
        *cfg = candidate;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Range- and consistency-check a configuration.
///
/// Invalid values are rejected, never clamped.
pub fn validate_config(cfg: &HeaterConfig) -> Result<(), ConfigError> {
    for sp in Setpoint::ALL {
        let (lo, hi) = sp.range();
        let v = sp.get(cfg);
        if !(lo..=hi).contains(&v) {
            return Err(ConfigError::ValidationFailed(sp.range_message()));
        }
    }
    if cfg.min_voltage_operate >= cfg.min_voltage_start {
        return Err(ConfigError::ValidationFailed(
            "min_voltage_operate must be < min_voltage_start",
        ));
    }
    if !(cfg.antifreeze_temp_on < cfg.antifreeze_temp_medium
        && cfg.antifreeze_temp_medium < cfg.antifreeze_temp_low
        && cfg.antifreeze_temp_low < cfg.antifreeze_temp_off)
    {
        return Err(ConfigError::ValidationFailed(
            "antifreeze bands must satisfy on < medium < low < off",
        ));
    }
    if !(1_000..=3_600_000).contains(&cfg.polling_interval_ms) {
        return Err(ConfigError::ValidationFailed(
            "polling_interval_ms must be 1000–3600000",
        ));
    }
    if !(MIN_SEND_INTERVAL_MS..=10_000).contains(&cfg.send_interval_ms) {
        return Err(ConfigError::ValidationFailed(
            "send_interval_ms must be 200–10000",
        ));
    }
    if !(1.0..=300.0).contains(&cfg.voltage_recovery_s) {
        return Err(ConfigError::ValidationFailed(
            "voltage_recovery_s must be 1–300",
        ));
    }
    if !(0.0..=3600.0).contains(&cfg.sensor_grace_s) {
        return Err(ConfigError::ValidationFailed(
            "sensor_grace_s must be 0–3600",
        ));
    }
    if !(10.0..=3600.0).contains(&cfg.external_temperature_max_age_s) {
        return Err(ConfigError::ValidationFailed(
            "external_temperature_max_age_s must be 10–3600",
        ));
    }
    Ok(())
}
