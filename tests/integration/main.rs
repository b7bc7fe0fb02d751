//! Integration test driver for `tests/integration/` submodule.
//!
//! Each `mod` below maps to a file that exercises a specific subsystem
//! against a simulated heater bus.  All tests run on the host (x86_64)
//! with no real hardware required.

mod link_tests;
mod mock_bus;
mod safety_tests;
