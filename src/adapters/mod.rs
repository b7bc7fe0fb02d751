//! Adapters — concrete implementations of the hexagonal port traits.
//!
//! | Adapter    | Implements         | Connects to                |
//! |------------|--------------------|----------------------------|
//! | `log_sink` | EventSink          | Serial log output          |
//! |            | TelemetrySink      |                            |
//! | `nvs`      | ConfigPort         | NVS / in-memory store      |
//! |            | StoragePort        |                            |
//! | `time`     | ClockPort          | ESP32 system timer + SNTP  |
//! | `uart`     | Transport          | Heater bus (ESP-IDF UART)  |
//! | `watchdog` | —                  | ESP-IDF task watchdog      |

pub mod log_sink;
pub mod nvs;
pub mod time;
#[cfg(feature = "espidf")]
pub mod uart;
pub mod watchdog;
