//! Sunster diesel heater controller library.
//!
//! Exposes the pure-logic modules for integration testing and host-side
//! simulation.  All ESP-IDF-specific code is guarded by
//! `#[cfg(feature = "espidf")]` within each module.

#![deny(unused_must_use)]

pub mod app;
pub mod config;
pub mod control;
pub mod error;
pub mod fsm;
pub mod fuel;
pub mod protocol;
pub mod safety;
pub mod scheduler;
pub mod telemetry;

pub mod adapters;
