//! Hardware adapter — bridges real peripherals to domain port traits.
//!
//! Binds the interrupt-fed [`PulseCounter`] / [`DebounceWindow`] pair and
//! the [`MotorDriver`] behind [`PulseSource`] and [`MotorPort`].  The
//! counter and window are borrowed (they are `static`s shared with the
//! ISR); the motor driver is owned.

use embedded_hal::digital::OutputPin;

use crate::app::ports::{MotorPort, PulseSource};
use crate::drivers::motor::MotorDriver;
use crate::sensors::{DebounceWindow, PulseCounter};

/// Concrete adapter that combines all hardware behind port traits.
pub struct HardwareAdapter<'a, P: OutputPin> {
    counter: &'a PulseCounter,
    debounce: &'a DebounceWindow,
    motor: MotorDriver<P>,
}

impl<'a, P: OutputPin> HardwareAdapter<'a, P> {
    pub fn new(counter: &'a PulseCounter, debounce: &'a DebounceWindow, motor: MotorDriver<P>) -> Self {
        Self {
            counter,
            debounce,
            motor,
        }
    }

    pub fn motor(&self) -> &MotorDriver<P> {
        &self.motor
    }
}

// ── PulseSource implementation ────────────────────────────────

impl<P: OutputPin> PulseSource for HardwareAdapter<'_, P> {
    fn read_count(&self) -> u32 {
        self.counter.read()
    }

    fn reset_count(&mut self) {
        self.counter.reset();
    }

    fn apply_debounce_ms(&mut self, ms: u16) {
        self.debounce.set_ms(ms);
    }
}

// ── MotorPort implementation ──────────────────────────────────

impl<P: OutputPin> MotorPort for HardwareAdapter<'_, P> {
    fn set_motor(&mut self, on: bool) {
        self.motor.set(on);
    }

    fn is_motor_on(&self) -> bool {
        self.motor.is_on()
    }
}
