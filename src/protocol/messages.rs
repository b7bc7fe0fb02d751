//! Typed views of the two frame kinds on the wire.
//!
//! Controller command (addr `0x66`, 11-byte payload):
//! ```text
//! [0] power step 1-10   [1] target °C   [2..11] zero
//! ```
//!
//! Heater status (addr `0x77`, opcode `0x01`, 52-byte payload, big-endian):
//! ```text
//! [0]     heater state        [1]     power step
//! [2..4]  voltage  (0.1 V)    [4..6]  fan rpm
//! [6..8]  pump     (0.01 Hz)  [8]     glow plug
//! [9..11] exchanger (0.1 °C)  [11]    error code
//! ```

use super::frame::{Address, HeaterFrame};
use crate::control::HeaterCommand;
use crate::error::ProtocolError;
use crate::telemetry::{GlowPlugStatus, RunState, Telemetry};

/// Heater status report.
pub const OPCODE_STATUS: u8 = 0x01;

/// Payload length the controller always sends.
pub const COMMAND_PAYLOAD_LEN: usize = 11;

/// Payload length of a full heater status report.
pub const STATUS_PAYLOAD_LEN: usize = 52;

/// Bytes of the status payload this parser reads.
const STATUS_MIN_LEN: usize = 12;

// ---------------------------------------------------------------------------
// Controller → heater
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CommandOpcode {
    Stop = 0x02,
    Start = 0x06,
    Running = 0x08,
}

impl CommandOpcode {
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            0x02 => Some(Self::Stop),
            0x06 => Some(Self::Start),
            0x08 => Some(Self::Running),
            _ => None,
        }
    }

    /// Opcode for `command` given what the heater currently reports.
    ///
    /// `start` is repeated until the heater leaves Off/CoolingDown, after
    /// which `running` carries power updates.
    pub fn for_command(command: HeaterCommand, heater: Option<RunState>) -> Self {
        if !command.on {
            return Self::Stop;
        }
        match heater {
            Some(RunState::Starting | RunState::Running) => Self::Running,
            _ => Self::Start,
        }
    }
}

/// One command frame as sent (or observed, in sniff mode).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerCommand {
    pub opcode: CommandOpcode,
    /// Power step 1-10 (10 % each).
    pub power_step: u8,
    pub target_c: u8,
}

impl ControllerCommand {
    pub fn new(opcode: CommandOpcode, command: HeaterCommand, target_c: f32) -> Self {
        Self {
            opcode,
            power_step: command.power_step(),
            target_c: target_c.round().clamp(0.0, 255.0) as u8,
        }
    }

    pub fn power_percent(&self) -> u8 {
        self.power_step.saturating_mul(10)
    }
}

/// Build the wire frame for a controller command.
pub fn encode_command(cmd: &ControllerCommand) -> HeaterFrame {
    let mut payload = [0u8; COMMAND_PAYLOAD_LEN];
    payload[0] = cmd.power_step.clamp(1, 10);
    payload[1] = cmd.target_c;
    HeaterFrame {
        address: Address::Controller,
        opcode: cmd.opcode as u8,
        payload: heapless::Vec::from_iter(payload),
    }
}

/// Parse a controller frame seen on the wire (sniff mode).
pub fn parse_command(frame: &HeaterFrame) -> Result<ControllerCommand, ProtocolError> {
    if frame.address != Address::Controller {
        return Err(ProtocolError::UnknownAddress(frame.address as u8));
    }
    let opcode =
        CommandOpcode::from_byte(frame.opcode).ok_or(ProtocolError::UnknownOpcode(frame.opcode))?;
    let &[power_step, target_c, ..] = &frame.payload[..] else {
        return Err(ProtocolError::ShortPayload);
    };
    Ok(ControllerCommand {
        opcode,
        power_step,
        target_c,
    })
}

// ---------------------------------------------------------------------------
// Heater → controller
// ---------------------------------------------------------------------------

/// Raw heater state byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaterState {
    Off,
    Polling,
    HeatingUp,
    StableCombustion,
    StoppingCooling,
    Other(u8),
}

impl HeaterState {
    pub fn from_byte(b: u8) -> Self {
        match b {
            0 => Self::Off,
            1 => Self::Polling,
            2 => Self::HeatingUp,
            3 => Self::StableCombustion,
            4 => Self::StoppingCooling,
            other => Self::Other(other),
        }
    }

    pub fn as_byte(self) -> u8 {
        match self {
            Self::Off => 0,
            Self::Polling => 1,
            Self::HeatingUp => 2,
            Self::StableCombustion => 3,
            Self::StoppingCooling => 4,
            Self::Other(b) => b,
        }
    }
}

/// Status payload decoded to engineering units, not yet interpreted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatusFrame {
    pub state: HeaterState,
    pub power_step: u8,
    pub voltage_dv: u16,
    pub fan_rpm: u16,
    pub pump_centihz: u16,
    pub glow_plug: u8,
    pub exchanger_dc: i16,
    pub error_code: u8,
}

impl StatusFrame {
    pub fn from_frame(frame: &HeaterFrame) -> Result<Self, ProtocolError> {
        if frame.address != Address::Heater {
            return Err(ProtocolError::UnknownAddress(frame.address as u8));
        }
        if frame.opcode != OPCODE_STATUS {
            return Err(ProtocolError::UnknownOpcode(frame.opcode));
        }
        let p = &frame.payload;
        if p.len() < STATUS_MIN_LEN {
            return Err(ProtocolError::ShortPayload);
        }
        Ok(Self {
            state: HeaterState::from_byte(p[0]),
            power_step: p[1],
            voltage_dv: u16::from_be_bytes([p[2], p[3]]),
            fan_rpm: u16::from_be_bytes([p[4], p[5]]),
            pump_centihz: u16::from_be_bytes([p[6], p[7]]),
            glow_plug: p[8],
            exchanger_dc: i16::from_be_bytes([p[9], p[10]]),
            error_code: p[11],
        })
    }

    /// Full 52-byte status frame (used by simulators and tests).
    pub fn to_frame(&self) -> HeaterFrame {
        let mut p = [0u8; STATUS_PAYLOAD_LEN];
        p[0] = self.state.as_byte();
        p[1] = self.power_step;
        p[2..4].copy_from_slice(&self.voltage_dv.to_be_bytes());
        p[4..6].copy_from_slice(&self.fan_rpm.to_be_bytes());
        p[6..8].copy_from_slice(&self.pump_centihz.to_be_bytes());
        p[8] = self.glow_plug;
        p[9..11].copy_from_slice(&self.exchanger_dc.to_be_bytes());
        p[11] = self.error_code;
        HeaterFrame {
            address: Address::Heater,
            opcode: OPCODE_STATUS,
            payload: heapless::Vec::from_iter(p),
        }
    }

    pub fn to_telemetry(&self) -> Telemetry {
        let run_state = if self.error_code > 1 {
            RunState::Fault
        } else {
            match self.state {
                HeaterState::Off => RunState::Off,
                HeaterState::Polling | HeaterState::HeatingUp => RunState::Starting,
                HeaterState::StableCombustion => RunState::Running,
                HeaterState::StoppingCooling => RunState::CoolingDown,
                HeaterState::Other(_) => RunState::Fault,
            }
        };
        let glow_plug = match self.glow_plug {
            0 => GlowPlugStatus::Off,
            1 => GlowPlugStatus::Preheat,
            2 => GlowPlugStatus::On,
            _ => GlowPlugStatus::Fault,
        };
        Telemetry {
            input_voltage: f32::from(self.voltage_dv) / 10.0,
            power_percent: self.power_step.min(10) * 10,
            fan_speed_rpm: self.fan_rpm,
            pump_frequency_hz: f32::from(self.pump_centihz) / 100.0,
            glow_plug,
            heat_exchanger_temperature_c: f32::from(self.exchanger_dc) / 10.0,
            run_state,
            low_voltage_fault: self.error_code == 1,
        }
    }
}

/// Decode a heater status frame into telemetry.
pub fn parse_status(frame: &HeaterFrame) -> Result<Telemetry, ProtocolError> {
    StatusFrame::from_frame(frame).map(|s| s.to_telemetry())
}
