//! Unified error and fault types for the SpoolCount firmware.
//!
//! Two different things live here:
//!
//! - [`Error`] — startup failures that abort `main`.  Storage errors never
//!   get here: the settings layer falls back to defaults instead.  `Copy`
//!   so it travels without allocation.
//! - [`Fault`] — operator-visible machine faults.  A fault is not a return
//!   value: it parks the state machine in `Error` until a human resets it.

use core::fmt;

use crate::drivers::hw_init::HwInitError;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Peripheral initialisation failed.
    Init(HwInitError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Init(e) => write!(f, "init: {e}"),
        }
    }
}

impl core::error::Error for Error {}

impl From<HwInitError> for Error {
    fn from(e: HwInitError) -> Self {
        Self::Init(e)
    }
}

// ---------------------------------------------------------------------------
// Machine faults
// ---------------------------------------------------------------------------

/// Faults that latch the production state machine in `Error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// Running, but no accepted pulse within the no-pulse timeout.
    SensorStall,
}

impl Fault {
    /// Operator-facing message shown while the fault is latched.
    pub const fn message(self) -> &'static str {
        match self {
            Self::SensorStall => "no pulses detected, check sensor/belt",
        }
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}
