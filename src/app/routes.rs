//! Declarative telemetry routing.
//!
//! The host layer registers one sink per value it exposes.  The table is
//! built once at startup; each publish walks it and pushes the mapped
//! fields out, so the service never knows which entities exist.
//!
//! ```text
//!   TelemetrySnapshot ──▶ [ (InputVoltage, 3), (RunState, 7), … ] ──▶ TelemetrySink
//! ```

use heapless::Vec;

use super::events::TelemetrySnapshot;
use super::ports::TelemetrySink;
use crate::error::Error;

/// Host-side identifier for one output entity.
pub type SinkId = u8;

/// Every value the controller can publish.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TelemetryField {
    InputVoltage,
    RunState,
    PowerLevel,
    FanSpeed,
    PumpFrequency,
    GlowPlugStatus,
    HeatExchangerTemperature,
    StateDuration,
    CoolingDown,
    LowVoltageFault,
    HourlyConsumption,
    DailyConsumption,
    TotalConsumption,
    PiOutput,
    PredictedTemperature,
    TemperatureSlope,
}

impl TelemetryField {
    pub const ALL: [TelemetryField; 16] = [
        Self::InputVoltage,
        Self::RunState,
        Self::PowerLevel,
        Self::FanSpeed,
        Self::PumpFrequency,
        Self::GlowPlugStatus,
        Self::HeatExchangerTemperature,
        Self::StateDuration,
        Self::CoolingDown,
        Self::LowVoltageFault,
        Self::HourlyConsumption,
        Self::DailyConsumption,
        Self::TotalConsumption,
        Self::PiOutput,
        Self::PredictedTemperature,
        Self::TemperatureSlope,
    ];

    /// Current value of this field.  Heater-reported fields are `None`
    /// while the link is down.
    pub fn value(self, snap: &TelemetrySnapshot) -> Option<FieldValue> {
        let heater = snap.heater.filter(|_| snap.connected);
        let value = match self {
            Self::InputVoltage => FieldValue::Number(heater?.input_voltage),
            Self::RunState => FieldValue::Text(heater?.run_state.as_str()),
            Self::PowerLevel => FieldValue::Number(f32::from(heater?.power_percent)),
            Self::FanSpeed => FieldValue::Number(f32::from(heater?.fan_speed_rpm)),
            Self::PumpFrequency => FieldValue::Number(heater?.pump_frequency_hz),
            Self::GlowPlugStatus => FieldValue::Text(heater?.glow_plug.as_str()),
            Self::HeatExchangerTemperature => {
                FieldValue::Number(heater?.heat_exchanger_temperature_c)
            }
            Self::StateDuration => FieldValue::Number(snap.state_duration_s as f32),
            Self::CoolingDown => FieldValue::Flag(snap.cooling_down),
            Self::LowVoltageFault => FieldValue::Flag(snap.low_voltage_fault),
            Self::HourlyConsumption => FieldValue::Number(snap.consumption.hourly_ml_per_h as f32),
            Self::DailyConsumption => FieldValue::Number(snap.consumption.daily_ml as f32),
            Self::TotalConsumption => FieldValue::Number(snap.consumption.total_ml as f32),
            Self::PiOutput => FieldValue::Number(snap.controller.pi_output),
            Self::PredictedTemperature => {
                FieldValue::Number(snap.controller.predicted_temperature_c)
            }
            Self::TemperatureSlope => FieldValue::Number(snap.controller.slope),
        };
        Some(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue {
    Number(f32),
    Flag(bool),
    Text(&'static str),
}

const MAX_ROUTES: usize = 24;

/// Fixed table of `field → sink` mappings.
#[derive(Debug, Clone, Default)]
pub struct TelemetryRoutes {
    routes: Vec<(TelemetryField, SinkId), MAX_ROUTES>,
}

impl TelemetryRoutes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Route every field, using its position in [`TelemetryField::ALL`]
    /// as the sink id.
    pub fn all_fields() -> Self {
        let mut table = Self::new();
        table.routes.extend(
            TelemetryField::ALL
                .into_iter()
                .enumerate()
                .map(|(i, f)| (f, i as SinkId)),
        );
        table
    }

    pub fn route(&mut self, field: TelemetryField, sink: SinkId) -> Result<(), Error> {
        self.routes
            .push((field, sink))
            .map_err(|_| Error::Config("telemetry route table full"))
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Push every routed field that currently has a value.
    pub fn publish(&self, snap: &TelemetrySnapshot, sink: &mut impl TelemetrySink) {
        for &(field, id) in &self.routes {
            if let Some(value) = field.value(snap) {
                sink.publish(id, value);
            }
        }
    }
}
