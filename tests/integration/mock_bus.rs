//! Simulated heater bus for integration tests.
//!
//! Records every frame written by the controller and replays queued bytes
//! on read, so tests can script the heater side of the conversation.

use std::collections::VecDeque;

use sunster::app::events::AppEvent;
use sunster::app::ports::EventSink;
use sunster::protocol::messages::HeaterState;
use sunster::protocol::{StatusFrame, Transport};

// ── MockBus ───────────────────────────────────────────────────

#[derive(Default)]
pub struct MockBus {
    /// One entry per `write` call.
    pub written: Vec<Vec<u8>>,
    rx: VecDeque<u8>,
}

#[allow(dead_code)]
impl MockBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue bytes for the controller to read.
    pub fn inject(&mut self, bytes: &[u8]) {
        self.rx.extend(bytes);
    }

    pub fn last_frame(&self) -> Option<&[u8]> {
        self.written.last().map(Vec::as_slice)
    }

    /// Opcode byte of the most recent controller frame.
    pub fn last_opcode(&self) -> Option<u8> {
        self.last_frame().and_then(|f| f.get(3).copied())
    }

    /// Power step byte of the most recent controller frame.
    pub fn last_power_step(&self) -> Option<u8> {
        self.last_frame().and_then(|f| f.get(4).copied())
    }
}

impl Transport for MockBus {
    type Error = ();

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, ()> {
        let n = buf.len().min(self.rx.len());
        for (slot, byte) in buf.iter_mut().zip(self.rx.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }

    fn write(&mut self, data: &[u8]) -> Result<usize, ()> {
        self.written.push(data.to_vec());
        Ok(data.len())
    }

    fn flush(&mut self) -> Result<(), ()> {
        Ok(())
    }

    fn available(&self) -> bool {
        !self.rx.is_empty()
    }
}

// ── Status frames ─────────────────────────────────────────────

pub fn status(state: HeaterState, voltage_dv: u16, pump_centihz: u16) -> StatusFrame {
    StatusFrame {
        state,
        power_step: 8,
        voltage_dv,
        fan_rpm: 3_200,
        pump_centihz,
        glow_plug: 0,
        exchanger_dc: 450,
        error_code: 0,
    }
}

/// Encoded status frame with a healthy 12.6 V supply.
pub fn running_status() -> Vec<u8> {
    status(HeaterState::StableCombustion, 126, 200)
        .to_frame()
        .encode()
        .to_vec()
}

pub fn status_bytes(state: HeaterState, voltage_dv: u16) -> Vec<u8> {
    status(state, voltage_dv, 0).to_frame().encode().to_vec()
}

// ── Event recorder ────────────────────────────────────────────

#[derive(Default)]
pub struct EventLog {
    pub events: Vec<AppEvent>,
}

#[allow(dead_code)]
impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self, pred: impl Fn(&AppEvent) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }
}

impl EventSink for EventLog {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}

// ── Bus polling ───────────────────────────────────────────────

/// Read everything queued on the bus into the service, the way the main
/// loop does before each tick.  Returns the number of frames decoded.
pub fn drain(
    app: &mut sunster::app::service::AppService,
    link: &mut sunster::protocol::HeaterLink<MockBus>,
    now_ms: u64,
) -> usize {
    let mut buf = [0u8; 32];
    let mut frames = 0;
    loop {
        let n = link.receive(&mut buf);
        if n == 0 {
            return frames;
        }
        frames += app.on_bytes(&buf[..n], now_ms);
    }
}
