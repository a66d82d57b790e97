//! Pulse capture and counter handoff.
//!
//! The sensor ISR calls [`pulse_isr_handler`] on every raw edge.  The
//! handler runs two filters against the time since the last *accepted*
//! edge and, if both pass, bumps the shared [`PulseCounter`]:
//!
//! ```text
//!  raw edge ──▶ elapsed < 500 µs floor? ──yes──▶ drop
//!                     │ no
//!                     ▼
//!              elapsed < debounce_ms×1000? ──yes──▶ drop
//!                     │ no
//!                     ▼
//!              last_accepted = now; count += 1
//! ```
//!
//! Everything here is lock-free and O(1): ESP-IDF GPIO ISRs cannot
//! allocate or block.  Timestamps are 32-bit microseconds and wrap every
//! ~71.6 minutes; `wrapping_sub` gives the correct elapsed time across the
//! wrap without special-casing.
//!
//! ## Ownership across contexts
//!
//! | Item                | Written by        | Read by            |
//! |---------------------|-------------------|--------------------|
//! | `PulseCounter`      | ISR (+1), main (reset) | main          |
//! | `DebounceWindow`    | main (settings commit) | ISR           |
//! | last-accepted stamp | ISR only          | ISR only           |

use core::sync::atomic::{AtomicBool, AtomicU16, AtomicU32, Ordering};

use crate::config::{self, HARD_DEBOUNCE_FLOOR_US};

// ---------------------------------------------------------------------------
// Counter handoff
// ---------------------------------------------------------------------------

/// Monotonic accepted-pulse counter shared between the ISR and the main loop.
///
/// A 32-bit atomic cannot tear on the ESP32-S3, so reads need no critical
/// section.  Only the ISR increments; only the main loop resets, and only
/// while the machine is not running.
pub struct PulseCounter {
    count: AtomicU32,
}

impl Default for PulseCounter {
    fn default() -> Self {
        Self::new()
    }
}

impl PulseCounter {
    pub const fn new() -> Self {
        Self {
            count: AtomicU32::new(0),
        }
    }

    /// Current accepted-pulse count.  Main context only.
    pub fn read(&self) -> u32 {
        self.count.load(Ordering::Acquire)
    }

    /// Zero the counter.  Main context only, never while Running.
    pub fn reset(&self) {
        self.count.store(0, Ordering::Release);
    }

    fn increment(&self) {
        self.count.fetch_add(1, Ordering::AcqRel);
    }
}

// ---------------------------------------------------------------------------
// Debounce window (main → ISR)
// ---------------------------------------------------------------------------

/// Configurable debounce interval, published by the main loop and read by
/// the ISR on every edge.  A change takes effect from the next edge.
pub struct DebounceWindow {
    ms: AtomicU16,
}

impl DebounceWindow {
    pub const fn new(ms: u16) -> Self {
        Self {
            ms: AtomicU16::new(ms),
        }
    }

    /// Publish a new interval.  Out-of-range values are clamped.
    pub fn set_ms(&self, ms: u16) {
        self.ms
            .store(config::clamp_debounce(ms.into()), Ordering::Release);
    }

    pub fn ms(&self) -> u16 {
        self.ms.load(Ordering::Acquire)
    }

    fn window_us(&self) -> u32 {
        u32::from(self.ms.load(Ordering::Relaxed)) * 1000
    }
}

// ---------------------------------------------------------------------------
// Edge filter
// ---------------------------------------------------------------------------

/// Outcome of one raw edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeVerdict {
    Accepted,
    /// Closer than the fixed electrical floor to the last accepted edge.
    BelowHardFloor,
    /// Closer than the configured debounce interval.
    BelowDebounce,
}

/// Dual-policy debounce filter feeding a [`PulseCounter`].
///
/// The last-accepted timestamp is atomic only so the filter can live in a
/// `static`; it has exactly one writer (the ISR).
pub struct PulseCapture<'a> {
    counter: &'a PulseCounter,
    debounce: &'a DebounceWindow,
    last_accepted_us: AtomicU32,
    seen_edge: AtomicBool,
}

impl<'a> PulseCapture<'a> {
    pub const fn new(counter: &'a PulseCounter, debounce: &'a DebounceWindow) -> Self {
        Self {
            counter,
            debounce,
            last_accepted_us: AtomicU32::new(0),
            seen_edge: AtomicBool::new(false),
        }
    }

    /// Filter one raw edge observed at `now_us`.
    ///
    /// Never allocates, never blocks, cannot fail.  The first edge after
    /// construction has no predecessor and is always accepted.
    pub fn on_edge(&self, now_us: u32) -> EdgeVerdict {
        if self.seen_edge.load(Ordering::Relaxed) {
            let elapsed = now_us.wrapping_sub(self.last_accepted_us.load(Ordering::Relaxed));
            if elapsed < HARD_DEBOUNCE_FLOOR_US {
                return EdgeVerdict::BelowHardFloor;
            }
            if elapsed < self.debounce.window_us() {
                return EdgeVerdict::BelowDebounce;
            }
        }

        self.last_accepted_us.store(now_us, Ordering::Relaxed);
        self.seen_edge.store(true, Ordering::Relaxed);
        self.counter.increment();
        EdgeVerdict::Accepted
    }
}

// ---------------------------------------------------------------------------
// ISR-side singletons
// ---------------------------------------------------------------------------

/// Accepted pulses since the last reset.
pub static PULSE_COUNTER: PulseCounter = PulseCounter::new();

/// Debounce interval seen by the ISR.  Primed from NVS at boot.
pub static DEBOUNCE_WINDOW: DebounceWindow = DebounceWindow::new(config::DEBOUNCE_MS_DEFAULT);

/// `static` because ESP-IDF ISR callbacks cannot capture state.
static PULSE_CAPTURE: PulseCapture<'static> = PulseCapture::new(&PULSE_COUNTER, &DEBOUNCE_WINDOW);

/// Called from the sensor GPIO ISR with the edge timestamp (µs, wrapping).
pub fn pulse_isr_handler(now_us: u32) {
    let _ = PULSE_CAPTURE.on_edge(now_us);
}
