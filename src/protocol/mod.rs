//! Heater serial link.
//!
//! The controller and the heater share a half-duplex UART.  Both sides
//! speak the same framing; only the address byte tells them apart.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Protocol Stack                          │
//! │                                                             │
//! │  ┌───────────┐   ┌───────────┐   ┌───────────────────────┐ │
//! │  │ Transport │──▶│  Decoder  │──▶│ messages::parse_*     │ │
//! │  │ (UART)    │   │ (framing) │   │  → TelemetryStore     │ │
//! │  └───────────┘   └───────────┘   └───────────────────────┘ │
//! │       ▲                                                     │
//! │       │          ┌───────────┐   ┌───────────────────────┐ │
//! │       └──────────│HeaterLink │◀──│ messages::encode_cmd  │ │
//! │   (suppressed    │ (writer)  │   │  ← mode machine       │ │
//! │    when sniffing)└───────────┘   └───────────────────────┘ │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod codec;
pub mod frame;
pub mod link;
pub mod messages;
pub mod transport;

pub use codec::{DecoderStats, FrameDecoder};
pub use frame::{Address, HeaterFrame};
pub use link::{HeaterLink, SendOutcome};
pub use messages::{CommandOpcode, ControllerCommand, StatusFrame};
pub use transport::{NullTransport, Transport};
