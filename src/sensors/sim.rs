//! Simulated sensor channel for host runs and tests.
//!
//! The value and an optional injected fault live in shared atomics, so a
//! clone kept by a test (or a simulation driver) can steer the channel the
//! hub owns.

use core::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;

use chrono::NaiveDateTime;

use super::{Metric, SensorReading};
use crate::app::ports::SensorPort;
use crate::error::SensorError;

const NO_FAULT: u8 = 0;

#[derive(Debug, Clone)]
pub struct SimSensor {
    metric: Metric,
    value_bits: Arc<AtomicU64>,
    fault: Arc<AtomicU8>,
}

impl SimSensor {
    pub fn new(metric: Metric, initial: f64) -> Self {
        Self {
            metric,
            value_bits: Arc::new(AtomicU64::new(initial.to_bits())),
            fault: Arc::new(AtomicU8::new(NO_FAULT)),
        }
    }

    /// Set the value the next reads return.
    pub fn set(&self, value: f64) {
        self.value_bits.store(value.to_bits(), Ordering::Relaxed);
    }

    pub fn value(&self) -> f64 {
        f64::from_bits(self.value_bits.load(Ordering::Relaxed))
    }

    /// Make subsequent reads fail with `fault`, or succeed again with `None`.
    pub fn fail_with(&self, fault: Option<SensorError>) {
        self.fault.store(encode_fault(fault), Ordering::Relaxed);
    }
}

impl SensorPort for SimSensor {
    fn metric(&self) -> Metric {
        self.metric
    }

    fn read(&mut self, now: NaiveDateTime) -> Result<SensorReading, SensorError> {
        if let Some(fault) = decode_fault(self.fault.load(Ordering::Relaxed)) {
            return Err(fault);
        }
        Ok(SensorReading::new(self.metric, self.value(), now))
    }
}

fn encode_fault(fault: Option<SensorError>) -> u8 {
    match fault {
        None => NO_FAULT,
        Some(SensorError::BusReadFailed) => 1,
        Some(SensorError::ChecksumMismatch) => 2,
        Some(SensorError::OutOfRange) => 3,
        Some(SensorError::WarmingUp) => 4,
    }
}

fn decode_fault(raw: u8) -> Option<SensorError> {
    match raw {
        1 => Some(SensorError::BusReadFailed),
        2 => Some(SensorError::ChecksumMismatch),
        3 => Some(SensorError::OutOfRange),
        4 => Some(SensorError::WarmingUp),
        _ => None,
    }
}
