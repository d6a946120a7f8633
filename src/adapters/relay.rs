//! Relay driver over an `embedded-hal` output pin.
//!
//! Relay boards of this kind are active low: driving the line low closes
//! the contact.  Activation records a switch-off deadline instead of
//! blocking; the run loop calls [`RelayPort::service`] to honour it.

use chrono::{Duration, NaiveDateTime};
use embedded_hal::digital::{ErrorType, OutputPin};
use log::{debug, info, warn};

use crate::app::ports::RelayPort;
use crate::error::ActionError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayState {
    Off,
    On { until: NaiveDateTime },
    Released,
}

pub struct GpioRelay<P: OutputPin> {
    pin: P,
    state: RelayState,
}

impl<P: OutputPin> GpioRelay<P> {
    /// Take the pin and drive it to the off level.
    pub fn new(mut pin: P) -> Self {
        if let Err(e) = pin.set_high() {
            warn!("Relay: initial switch-off failed: {:?}", e);
        }
        Self {
            pin,
            state: RelayState::Off,
        }
    }

    pub fn state(&self) -> RelayState {
        self.state
    }

    pub fn is_on(&self) -> bool {
        matches!(self.state, RelayState::On { .. })
    }

    fn drive(&mut self, on: bool) -> Result<(), ActionError> {
        let res = if on { self.pin.set_low() } else { self.pin.set_high() };
        res.map_err(|e| {
            warn!("Relay: pin write failed: {:?}", e);
            ActionError::Hardware("relay pin write failed")
        })
    }
}

impl<P: OutputPin> RelayPort for GpioRelay<P> {
    fn activate(&mut self, duration_minutes: u32, now: NaiveDateTime) -> Result<(), ActionError> {
        if self.state == RelayState::Released {
            return Err(ActionError::Hardware("relay released"));
        }
        self.drive(true)?;
        let until = now + Duration::minutes(i64::from(duration_minutes));
        // A second activation while on extends the deadline, never shortens it.
        let until = match self.state {
            RelayState::On { until: current } if current > until => current,
            _ => until,
        };
        self.state = RelayState::On { until };
        info!("Relay: ON until {}", until.format("%H:%M:%S"));
        Ok(())
    }

    fn service(&mut self, now: NaiveDateTime) {
        if let RelayState::On { until } = self.state {
            if now >= until {
                match self.drive(false) {
                    Ok(()) => {
                        self.state = RelayState::Off;
                        info!("Relay: OFF (duration elapsed)");
                    }
                    Err(e) => debug!("Relay: auto-off deferred: {}", e),
                }
            }
        }
    }

    fn deactivate(&mut self) -> Result<(), ActionError> {
        if self.state == RelayState::Released {
            return Ok(());
        }
        self.drive(false)?;
        self.state = RelayState::Off;
        Ok(())
    }

    fn cleanup(&mut self) {
        if self.state == RelayState::Released {
            return;
        }
        if let Err(e) = self.deactivate() {
            warn!("Relay: cleanup could not switch off: {}", e);
        }
        self.state = RelayState::Released;
        info!("Relay: released");
    }
}

// ── Host pin ──────────────────────────────────────────────────

/// Output pin for hosts without GPIO: remembers and logs the level.
#[derive(Debug, Default)]
pub struct LogPin {
    high: bool,
}

impl LogPin {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_high(&self) -> bool {
        self.high
    }
}

impl ErrorType for LogPin {
    type Error = core::convert::Infallible;
}

impl OutputPin for LogPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        debug!("LogPin: low");
        self.high = false;
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        debug!("LogPin: high");
        self.high = true;
        Ok(())
    }
}
