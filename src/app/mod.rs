//! Application core: pure domain logic, zero I/O.
//!
//! This module wires the threshold pipeline (evaluator → debounce →
//! dispatcher) and the weekly scheduler into one polling tick.  All
//! interaction with sensors, mail, relays and cameras happens through the
//! **port traits** defined in [`ports`], keeping this layer fully testable
//! without real peripherals.

pub mod events;
pub mod ports;
pub mod runner;
pub mod service;
