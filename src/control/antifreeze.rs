//! Banded thermostat for frost protection.
//!
//! ```text
//!   °C   ──────┬────────┬────────┬────────┬──────────▶
//!        full  │ medium │  low   │  hold  │   off
//!        100 % │  60 %  │  30 %  │        │
//!             on     medium     low      off
//! ```
//!
//! Between `low` and `off` the previous decision is kept, so the heater
//! only stops once the temperature clears `off`.

use log::{info, warn};
use serde::Serialize;

use super::HeaterCommand;
use crate::config::HeaterConfig;

pub const FULL_POWER_PERCENT: u8 = 100;
pub const MEDIUM_POWER_PERCENT: u8 = 60;
pub const LOW_POWER_PERCENT: u8 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AntifreezeBand {
    Off,
    Low,
    Medium,
    Full,
}

impl AntifreezeBand {
    pub fn command(self) -> HeaterCommand {
        match self {
            Self::Off => HeaterCommand::OFF,
            Self::Low => HeaterCommand::on(LOW_POWER_PERCENT),
            Self::Medium => HeaterCommand::on(MEDIUM_POWER_PERCENT),
            Self::Full => HeaterCommand::on(FULL_POWER_PERCENT),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Off => "off",
            Self::Low => "low",
            Self::Medium => "medium",
            Self::Full => "full",
        }
    }
}

/// Band thresholds (°C), strictly increasing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AntifreezeBands {
    pub on: f32,
    pub medium: f32,
    pub low: f32,
    pub off: f32,
}

impl AntifreezeBands {
    pub fn from_config(cfg: &HeaterConfig) -> Self {
        Self {
            on: cfg.antifreeze_temp_on,
            medium: cfg.antifreeze_temp_medium,
            low: cfg.antifreeze_temp_low,
            off: cfg.antifreeze_temp_off,
        }
    }

    /// Band for temperature `t`, given the band currently active.
    pub fn classify(&self, t: f32, previous: AntifreezeBand) -> AntifreezeBand {
        if t > self.off {
            AntifreezeBand::Off
        } else if t <= self.on {
            AntifreezeBand::Full
        } else if t <= self.medium {
            AntifreezeBand::Medium
        } else if t <= self.low {
            AntifreezeBand::Low
        } else {
            // Hold zone: keep whatever was decided last.
            previous
        }
    }
}

pub struct AntifreezeThermostat {
    band: AntifreezeBand,
    last_sample_ms: Option<u64>,
    degraded: bool,
}

impl Default for AntifreezeThermostat {
    fn default() -> Self {
        Self::new()
    }
}

impl AntifreezeThermostat {
    pub fn new() -> Self {
        Self {
            band: AntifreezeBand::Off,
            last_sample_ms: None,
            degraded: false,
        }
    }

    pub fn reset(&mut self) {
        self.band = AntifreezeBand::Off;
        self.degraded = false;
    }

    pub fn evaluate(
        &mut self,
        bands: &AntifreezeBands,
        temperature: Option<f32>,
        sensor_grace_s: f32,
        now_ms: u64,
    ) -> HeaterCommand {
        match temperature.filter(|t| t.is_finite()) {
            Some(t) => {
                if self.degraded {
                    info!("antifreeze: temperature input restored ({t:.1}°C)");
                    self.degraded = false;
                }
                self.last_sample_ms = Some(now_ms);
                let band = bands.classify(t, self.band);
                if band != self.band {
                    info!(
                        "antifreeze: {} -> {} at {t:.1}°C",
                        self.band.as_str(),
                        band.as_str()
                    );
                    self.band = band;
                }
            }
            None => {
                if !self.degraded {
                    warn!("antifreeze: temperature input lost");
                    self.degraded = true;
                }
                let grace_ms = (sensor_grace_s * 1000.0) as u64;
                let within_grace = self
                    .last_sample_ms
                    .is_some_and(|t| now_ms.saturating_sub(t) < grace_ms);
                if !within_grace && self.band != AntifreezeBand::Off {
                    warn!("antifreeze: no temperature, turning off");
                    self.band = AntifreezeBand::Off;
                }
            }
        }
        self.band.command()
    }

    pub fn band(&self) -> AntifreezeBand {
        self.band
    }

    pub fn is_degraded(&self) -> bool {
        self.degraded
    }
}
