//! Log-based sink adapters.
//!
//! [`LogEventSink`] writes structured application events to the ESP-IDF
//! logger (UART / USB-CDC in production).  [`LogTelemetrySink`] does the
//! same for routed telemetry values, standing in for the host's entity
//! layer when none is attached.

use log::{info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::{EventSink, TelemetrySink};
use crate::app::routes::{FieldValue, SinkId};

/// Adapter that logs every [`AppEvent`] to the serial console.
#[derive(Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Telemetry(t) => {
                let mode = t.mode.as_str();
                match t.heater.filter(|_| t.connected) {
                    Some(h) => info!(
                        "TELEM | mode={} | state={} | {:.1}V | power={}% fan={}rpm \
                         pump={:.1}Hz | hx={:.0}\u{00b0}C | total={:.0}mL",
                        mode,
                        h.run_state.as_str(),
                        h.input_voltage,
                        h.power_percent,
                        h.fan_speed_rpm,
                        h.pump_frequency_hz,
                        h.heat_exchanger_temperature_c,
                        t.consumption.total_ml,
                    ),
                    None => info!("TELEM | mode={} | heater not connected", mode),
                }
                match serde_json::to_string(t) {
                    Ok(json) => log::debug!("TELEM | {}", json),
                    Err(e) => warn!("TELEM | snapshot serialisation failed: {}", e),
                }
            }
            AppEvent::ModeChanged { from, to } => {
                info!("MODE | {} -> {}", from.as_str(), to.as_str());
            }
            AppEvent::FaultDetected(fault) => {
                warn!("FAULT | detected: {}", fault);
            }
            AppEvent::FaultCleared => {
                info!("FAULT | cleared");
            }
            AppEvent::LinkLost => {
                warn!("LINK | no status frame from heater");
            }
            AppEvent::LinkRestored => {
                info!("LINK | heater status restored");
            }
            AppEvent::SetpointChanged { setpoint, value } => {
                info!("SET | {:?} = {}", setpoint, value);
            }
            AppEvent::CommandRejected(err) => {
                warn!("SET | rejected: {}", err);
            }
            AppEvent::ConsumptionReset { total, daily } => {
                info!("FUEL | reset total={} daily={}", total, daily);
            }
            AppEvent::Started(mode) => {
                info!("START | initial_mode={}", mode.as_str());
            }
        }
    }
}

/// Logs each routed telemetry value as `sink id = value`.
#[derive(Default)]
pub struct LogTelemetrySink {
    published: u32,
}

impl LogTelemetrySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Values published since construction.
    pub fn published(&self) -> u32 {
        self.published
    }
}

impl TelemetrySink for LogTelemetrySink {
    fn publish(&mut self, sink: SinkId, value: FieldValue) {
        self.published = self.published.wrapping_add(1);
        match value {
            FieldValue::Number(v) => log::debug!("ENTITY[{}] = {:.3}", sink, v),
            FieldValue::Flag(v) => log::debug!("ENTITY[{}] = {}", sink, v),
            FieldValue::Text(v) => log::debug!("ENTITY[{}] = {}", sink, v),
        }
    }
}
