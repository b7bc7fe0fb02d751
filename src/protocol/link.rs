//! The single writer to the heater UART.
//!
//! In passive-sniff installations another controller owns the bus; the
//! link then refuses to encode or transmit anything and only reads.

use log::{debug, info, warn};

use super::messages::{encode_command, ControllerCommand};
use super::transport::Transport;

/// What happened to a `send` request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    Sent,
    /// Sniff mode: nothing was encoded or written.
    Suppressed,
    /// The transport errored or accepted fewer bytes than the frame.
    Failed,
}

pub struct HeaterLink<T: Transport> {
    transport: T,
    sniff: bool,
    sent: u32,
    suppressed: u32,
    tx_errors: u32,
}

impl<T: Transport> HeaterLink<T> {
    pub fn new(transport: T, sniff: bool) -> Self {
        if sniff {
            info!("heater link: passive sniff, transmit disabled");
        }
        Self {
            transport,
            sniff,
            sent: 0,
            suppressed: 0,
            tx_errors: 0,
        }
    }

    pub fn is_sniffing(&self) -> bool {
        self.sniff
    }

    /// Encode and transmit `cmd` unless the link is sniffing.
    pub fn send(&mut self, cmd: &ControllerCommand) -> SendOutcome {
        if self.sniff {
            if self.suppressed == 0 {
                info!("heater link: sniffing, suppressing {:?}", cmd.opcode);
            } else {
                debug!("heater link: suppressed {:?}", cmd.opcode);
            }
            self.suppressed = self.suppressed.saturating_add(1);
            return SendOutcome::Suppressed;
        }

        let bytes = encode_command(cmd).encode();
        let outcome = match self.transport.write(&bytes) {
            Ok(n) if n == bytes.len() => match self.transport.flush() {
                Ok(()) => SendOutcome::Sent,
                Err(e) => {
                    warn!("heater link: flush failed: {e:?}");
                    SendOutcome::Failed
                }
            },
            Ok(n) => {
                warn!("heater link: short write {n}/{}", bytes.len());
                SendOutcome::Failed
            }
            Err(e) => {
                warn!("heater link: write failed: {e:?}");
                SendOutcome::Failed
            }
        };
        match outcome {
            SendOutcome::Sent => self.sent = self.sent.saturating_add(1),
            _ => self.tx_errors = self.tx_errors.saturating_add(1),
        }
        outcome
    }

    /// Non-blocking read of whatever the UART has buffered.
    pub fn receive(&mut self, buf: &mut [u8]) -> usize {
        match self.transport.read(buf) {
            Ok(n) => n,
            Err(e) => {
                warn!("heater link: read failed: {e:?}");
                0
            }
        }
    }

    pub fn frames_sent(&self) -> u32 {
        self.sent
    }

    pub fn sends_suppressed(&self) -> u32 {
        self.suppressed
    }

    pub fn tx_errors(&self) -> u32 {
        self.tx_errors
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }
}
