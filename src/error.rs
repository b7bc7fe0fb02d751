//! Unified error types for the heater controller core.
//!
//! A single `Error` enum that every subsystem can convert into, keeping the
//! control loop's error handling uniform.  All variants are `Copy` so they
//! can be passed through the safety guard and mode machine without
//! allocation.  None of them is fatal: the controller keeps ticking and
//! degrades instead of halting.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Every fallible operation in the core funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A frame on the serial link was malformed.  Recovered locally.
    Protocol(ProtocolError),
    /// A temperature input is missing.  Recovered by hold + fallback.
    Sensor(SensorError),
    /// A safety interlock is active.  Recovered after debounce.
    Safety(SafetyFault),
    /// A requested setting was out of range and has been rejected.
    Config(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Protocol(e) => write!(f, "protocol: {e}"),
            Self::Sensor(e) => write!(f, "sensor: {e}"),
            Self::Safety(e) => write!(f, "safety: {e}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Protocol errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolError {
    /// Trailing checksum does not match the frame contents.
    ChecksumMismatch,
    /// Address byte is neither controller nor heater.
    UnknownAddress(u8),
    /// Declared payload length exceeds the receive buffer.
    LengthOutOfRange(u8),
    /// Receive buffer overflowed before a frame completed.
    Overflow,
    /// Payload too short for the opcode it carries.
    ShortPayload,
    /// Opcode is not one this codec understands.
    UnknownOpcode(u8),
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ChecksumMismatch => write!(f, "checksum mismatch"),
            Self::UnknownAddress(a) => write!(f, "unknown address 0x{a:02X}"),
            Self::LengthOutOfRange(l) => write!(f, "length {l} out of range"),
            Self::Overflow => write!(f, "receive buffer overflow"),
            Self::ShortPayload => write!(f, "payload too short"),
            Self::UnknownOpcode(o) => write!(f, "unknown opcode 0x{o:02X}"),
        }
    }
}

impl From<ProtocolError> for Error {
    fn from(e: ProtocolError) -> Self {
        Self::Protocol(e)
    }
}

// ---------------------------------------------------------------------------
// Sensor errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    /// Neither an external nor an onboard temperature sample is fresh.
    TemperatureUnavailable,
}

impl fmt::Display for SensorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TemperatureUnavailable => write!(f, "temperature unavailable"),
        }
    }
}

impl From<SensorError> for Error {
    fn from(e: SensorError) -> Self {
        Self::Sensor(e)
    }
}

// ---------------------------------------------------------------------------
// Safety faults
// ---------------------------------------------------------------------------

/// Safety faults force the commanded output to off until they clear.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SafetyFault {
    /// Supply voltage below the start or operate threshold.
    LowVoltage,
}

impl fmt::Display for SafetyFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LowVoltage => write!(f, "low supply voltage"),
        }
    }
}

impl From<SafetyFault> for Error {
    fn from(e: SafetyFault) -> Self {
        Self::Safety(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Crate-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
