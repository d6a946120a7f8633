//! envmon: environment monitoring library.
//!
//! Polls environmental sensors, evaluates readings against configured
//! thresholds, and fires debounced alerts and relay activations alongside
//! weekly scheduled jobs (summary mail, relay, camera).  The binary in
//! `main.rs` wires the adapters; everything here is testable on the host.

#![deny(unused_must_use)]

pub mod app;
pub mod config;
pub mod debounce;
pub mod dispatch;
pub mod error;
pub mod evaluator;
pub mod scheduler;
pub mod sensors;

pub mod adapters;
