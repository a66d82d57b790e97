//! Sensor subsystem.
//!
//! The machine has exactly one sensor: the item/pulse sensor, handled in
//! interrupt context by [`pulse`].  The control loop never touches the
//! GPIO directly; it only reads the counter the ISR maintains.

pub mod pulse;

pub use pulse::{DebounceWindow, EdgeVerdict, PulseCapture, PulseCounter};
