//! Frame layout shared by both directions of the link.
//!
//! ```text
//! ┌──────┬──────┬─────┬────────┬───────────────┬──────────┐
//! │ 0xAA │ ADDR │ LEN │ OPCODE │ PAYLOAD[LEN]  │ CHECKSUM │
//! └──────┴──────┴─────┴────────┴───────────────┴──────────┘
//! ```
//!
//! CHECKSUM is the wrapping 8-bit sum of ADDR, LEN, OPCODE and every
//! payload byte.  The start marker is not included.

use heapless::Vec;

use crate::error::ProtocolError;

/// Start-of-frame marker.
pub const FRAME_START: u8 = 0xAA;

/// Largest payload accepted on the wire.
pub const MAX_PAYLOAD: usize = 64;

/// START + ADDR + LEN + OPCODE.
pub const HEADER_LEN: usize = 4;

/// Header, largest payload and checksum.
pub const MAX_FRAME_LEN: usize = HEADER_LEN + MAX_PAYLOAD + 1;

/// Who sent the frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Address {
    /// Controller → heater (commands).
    Controller = 0x66,
    /// Heater → controller (status).
    Heater = 0x77,
}

impl Address {
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            0x66 => Some(Self::Controller),
            0x77 => Some(Self::Heater),
            _ => None,
        }
    }
}

/// One complete, checksum-verified frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaterFrame {
    pub address: Address,
    pub opcode: u8,
    pub payload: Vec<u8, MAX_PAYLOAD>,
}

impl HeaterFrame {
    pub fn new(address: Address, opcode: u8, payload: &[u8]) -> Result<Self, ProtocolError> {
        let payload = Vec::from_slice(payload)
            .map_err(|()| ProtocolError::LengthOutOfRange(payload.len().min(255) as u8))?;
        Ok(Self {
            address,
            opcode,
            payload,
        })
    }

    pub fn checksum(&self) -> u8 {
        checksum(
            self.address as u8,
            self.payload.len() as u8,
            self.opcode,
            &self.payload,
        )
    }

    pub fn encoded_len(&self) -> usize {
        HEADER_LEN + self.payload.len() + 1
    }

    /// Serialize to wire bytes with the checksum appended.
    pub fn encode(&self) -> Vec<u8, MAX_FRAME_LEN> {
        // The payload is bounded by MAX_PAYLOAD, so the output always fits.
        let mut out: Vec<u8, MAX_FRAME_LEN> = Vec::new();
        out.extend(
            [
                FRAME_START,
                self.address as u8,
                self.payload.len() as u8,
                self.opcode,
            ]
            .into_iter()
            .chain(self.payload.iter().copied())
            .chain(core::iter::once(self.checksum())),
        );
        out
    }
}

/// Wrapping sum of the header fields and payload.
pub fn checksum(address: u8, len: u8, opcode: u8, payload: &[u8]) -> u8 {
    payload
        .iter()
        .fold(address.wrapping_add(len).wrapping_add(opcode), |acc, b| {
            acc.wrapping_add(*b)
        })
}
