//! Motor enable driver.
//!
//! Turns a boolean on/off intent into the pin level the motor driver
//! board expects.  The polarity is fixed at construction.
//!
//! ## Safety contract
//!
//! The motor must only run while the machine is Running.  Enforced by the
//! state machine; this driver is a dumb actuator.  `set(false)` must work
//! from any path, including when the output is already off, so every call
//! rewrites the pin instead of short-circuiting on cached state.

use embedded_hal::digital::OutputPin;
use log::{info, warn};

use crate::config::OutputPolarity;

pub struct MotorDriver<P: OutputPin> {
    pin: P,
    polarity: OutputPolarity,
    on: bool,
}

impl<P: OutputPin> MotorDriver<P> {
    /// Take ownership of the enable pin and deassert it.
    pub fn new(pin: P, polarity: OutputPolarity) -> Self {
        let mut driver = Self {
            pin,
            polarity,
            on: false,
        };
        driver.set(false);
        info!("Motor: ready ({:?}), off", polarity);
        driver
    }

    /// Drive the output.  Idempotent.
    pub fn set(&mut self, on: bool) {
        let result = if self.polarity.level_for(on) {
            self.pin.set_high()
        } else {
            self.pin.set_low()
        };
        if result.is_err() {
            warn!("Motor: pin write failed (on={})", on);
        }
        if on != self.on {
            info!("Motor: {}", if on { "on" } else { "off" });
        }
        self.on = on;
    }

    pub fn is_on(&self) -> bool {
        self.on
    }

    pub fn polarity(&self) -> OutputPolarity {
        self.polarity
    }

    /// Borrow the underlying pin (host tests inspect its level).
    pub fn pin(&self) -> &P {
        &self.pin
    }
}
