//! Heater control laws.
//!
//! Both laws reduce to the same actuation model the heater understands:
//! on/off plus a power level in 10 % steps.

pub mod antifreeze;
pub mod predictive;

use serde::Serialize;

/// Lowest power level the heater accepts while burning (%).
pub const MIN_POWER_PERCENT: u8 = 10;
/// Highest power level (%).
pub const MAX_POWER_PERCENT: u8 = 100;

/// What a mode asks the heater to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HeaterCommand {
    pub on: bool,
    /// 10-100 in steps of 10 when `on`, 0 otherwise.
    pub power_percent: u8,
}

impl HeaterCommand {
    pub const OFF: Self = Self {
        on: false,
        power_percent: 0,
    };

    pub fn on(percent: u8) -> Self {
        Self::from_output(f32::from(percent))
    }

    /// Turn a continuous output (%) into a burning command.
    pub fn from_output(output: f32) -> Self {
        Self {
            on: true,
            power_percent: quantize_power(output),
        }
    }

    /// Protocol power step (1-10).  Off commands still carry the minimum
    /// step on the wire.
    pub fn power_step(self) -> u8 {
        (self.power_percent / 10).clamp(1, 10)
    }
}

/// Round to the nearest 10 % and clamp to the burnable range.
pub fn quantize_power(percent: f32) -> u8 {
    if !percent.is_finite() {
        return MIN_POWER_PERCENT;
    }
    let stepped = (percent / 10.0).round() * 10.0;
    stepped.clamp(f32::from(MIN_POWER_PERCENT), f32::from(MAX_POWER_PERCENT)) as u8
}
