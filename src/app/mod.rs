//! Application core — pure domain logic, zero I/O.
//!
//! This module contains the orchestration of the heater controller:
//! decoding status, fuel accounting, the voltage guard, the mode machine,
//! and the host-facing command/event surface.  All interaction with
//! hardware happens through **port traits** defined in [`ports`], keeping
//! this layer fully testable without real peripherals.

pub mod commands;
pub mod events;
pub mod ports;
pub mod routes;
pub mod service;
