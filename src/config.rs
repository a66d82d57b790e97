//! Operating parameters and board configuration.
//!
//! [`OperatingParameters`] are the two operator-tunable values (target
//! count and debounce interval).  They are persisted in NVS and are
//! always kept inside their declared bounds: every constructor either
//! uses the defaults or clamps.
//!
//! [`BoardConfig`] describes how the board is wired (signal polarities)
//! and is resolved once at startup.  The safety constants below are
//! deliberately not part of any config struct — they are not tunable.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Fixed safety / timing constants
// ---------------------------------------------------------------------------

/// Absolute minimum spacing between two accepted sensor edges (µs).
/// Applied before, and independently of, the configurable debounce.
pub const HARD_DEBOUNCE_FLOOR_US: u32 = 500;

/// No accepted pulse for longer than this while Running → Error (ms).
pub const NO_PULSE_TIMEOUT_MS: u32 = 5_000;

/// Control loop period (ms).
pub const CONTROL_TICK_MS: u32 = 80;

/// Task watchdog timeout for the main loop (ms).
pub const WATCHDOG_TIMEOUT_MS: u32 = 2_000;

/// Capacity of the operator-visible error message.
pub const ERROR_MESSAGE_CAP: usize = 64;

// ---------------------------------------------------------------------------
// Parameter bounds
// ---------------------------------------------------------------------------

pub const TARGET_COUNT_MIN: u32 = 1;
pub const TARGET_COUNT_MAX: u32 = 999_999;
pub const TARGET_COUNT_DEFAULT: u32 = 120;

pub const DEBOUNCE_MS_MIN: u16 = 1;
pub const DEBOUNCE_MS_MAX: u16 = 100;
pub const DEBOUNCE_MS_DEFAULT: u16 = 5;

// ---------------------------------------------------------------------------
// OperatingParameters
// ---------------------------------------------------------------------------

/// Operator-tunable production parameters.
///
/// Fields are private so a value outside the bounds cannot be built
/// outside this module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperatingParameters {
    target_count: u32,
    debounce_ms: u16,
}

impl Default for OperatingParameters {
    fn default() -> Self {
        Self {
            target_count: TARGET_COUNT_DEFAULT,
            debounce_ms: DEBOUNCE_MS_DEFAULT,
        }
    }
}

impl OperatingParameters {
    /// Build from raw (possibly out-of-range) values, clamping each field
    /// to the nearest bound.
    pub fn clamped(target_count: u64, debounce_ms: u64) -> Self {
        Self {
            target_count: clamp_target(target_count),
            debounce_ms: clamp_debounce(debounce_ms),
        }
    }

    pub fn target_count(&self) -> u32 {
        self.target_count
    }

    pub fn debounce_ms(&self) -> u16 {
        self.debounce_ms
    }

    /// Configurable debounce window in microseconds.
    pub fn debounce_us(&self) -> u32 {
        u32::from(self.debounce_ms) * 1000
    }

    /// True if both fields are inside their bounds.  Always true for
    /// values built through this module; useful after deserialisation.
    pub fn is_valid(&self) -> bool {
        (TARGET_COUNT_MIN..=TARGET_COUNT_MAX).contains(&self.target_count)
            && (DEBOUNCE_MS_MIN..=DEBOUNCE_MS_MAX).contains(&self.debounce_ms)
    }

    /// Re-clamp (used on values that came in through serde).
    pub fn sanitized(self) -> Self {
        Self::clamped(self.target_count.into(), self.debounce_ms.into())
    }

    /// `min(count, target) * 100 / target`.  `target_count >= 1` holds for
    /// every value of this type, so no zero guard is needed here.
    pub fn progress_percent(&self, count: u32) -> u8 {
        let done = u64::from(count.min(self.target_count));
        (done * 100 / u64::from(self.target_count)) as u8
    }
}

pub fn clamp_target(raw: u64) -> u32 {
    raw.clamp(u64::from(TARGET_COUNT_MIN), u64::from(TARGET_COUNT_MAX)) as u32
}

pub fn clamp_debounce(raw: u64) -> u16 {
    raw.clamp(u64::from(DEBOUNCE_MS_MIN), u64::from(DEBOUNCE_MS_MAX)) as u16
}

/// Parse an operator-entered number the way a numeric text field does.
///
/// Leading whitespace and a `+` sign are accepted; parsing stops at the
/// first non-digit.  No digits (or a leading `-`) yields `0`, which the
/// clamp then lifts to the lower bound.  Saturates instead of overflowing.
pub fn parse_operator_input(text: &str) -> u64 {
    let s = text.trim_start();
    let s = s.strip_prefix('+').unwrap_or(s);
    s.bytes()
        .take_while(u8::is_ascii_digit)
        .fold(0u64, |acc, d| {
            acc.saturating_mul(10).saturating_add(u64::from(d - b'0'))
        })
}

// ---------------------------------------------------------------------------
// Board wiring
// ---------------------------------------------------------------------------

/// Electrical polarity of the pulse sensor input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputPolarity {
    /// Idle high with pull-up; a pulse is a falling edge.
    ActiveLow,
    /// Idle low with pull-down; a pulse is a rising edge.
    ActiveHigh,
}

impl InputPolarity {
    pub fn pull_up(self) -> bool {
        matches!(self, Self::ActiveLow)
    }

    pub fn triggers_on_falling_edge(self) -> bool {
        matches!(self, Self::ActiveLow)
    }
}

/// Electrical polarity of the motor driver enable line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputPolarity {
    ActiveHigh,
    ActiveLow,
}

impl OutputPolarity {
    /// Pin level (`true` = high) that produces the requested motor state.
    pub fn level_for(self, on: bool) -> bool {
        match self {
            Self::ActiveHigh => on,
            Self::ActiveLow => !on,
        }
    }
}

/// How this particular board is wired.
#[derive(Debug, Clone, Copy)]
pub struct BoardConfig {
    pub sensor_polarity: InputPolarity,
    pub motor_polarity: OutputPolarity,
    /// Telemetry report interval (milliseconds).
    pub telemetry_interval_ms: u32,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            sensor_polarity: InputPolarity::ActiveLow,
            motor_polarity: OutputPolarity::ActiveHigh,
            telemetry_interval_ms: 1_000,
        }
    }
}

impl BoardConfig {
    /// Telemetry interval expressed in control ticks (at least one).
    pub fn telemetry_interval_ticks(&self) -> u32 {
        (self.telemetry_interval_ms / CONTROL_TICK_MS).max(1)
    }
}
