//! No-pulse stall watchdog.
//!
//! While the motor runs, pulses must keep arriving.  The watchdog is fed
//! the observed count every control tick and remembers the last tick at
//! which the count changed.  If that moment lies more than
//! [`NO_PULSE_TIMEOUT_MS`](crate::config::NO_PULSE_TIMEOUT_MS) in the
//! past, the belt/sensor is considered stalled.
//!
//! The watchdog is polled, not event driven: it can only fire on a tick.
//! All time arithmetic uses wrapping `u32` milliseconds.

use log::debug;

/// Tracks the last time the pulse count moved.
#[derive(Debug, Clone, Copy)]
pub struct StallWatchdog {
    timeout_ms: u32,
    last_count: u32,
    last_pulse_seen_ms: u32,
}

impl StallWatchdog {
    pub fn new(timeout_ms: u32) -> Self {
        Self {
            timeout_ms,
            last_count: 0,
            last_pulse_seen_ms: 0,
        }
    }

    /// Restart the timeout window from `now_ms` with `count` as baseline.
    /// Called on every entry into Running and after a counter reset.
    pub fn rearm(&mut self, count: u32, now_ms: u32) {
        self.last_count = count;
        self.last_pulse_seen_ms = now_ms;
    }

    /// Record the count observed this tick.  Returns `true` if it changed.
    pub fn observe(&mut self, count: u32, now_ms: u32) -> bool {
        if count == self.last_count {
            return false;
        }
        self.last_count = count;
        self.last_pulse_seen_ms = now_ms;
        true
    }

    /// Milliseconds since the count last moved.
    pub fn silent_for_ms(&self, now_ms: u32) -> u32 {
        now_ms.wrapping_sub(self.last_pulse_seen_ms)
    }

    /// True once the silence strictly exceeds the timeout.
    pub fn expired(&self, now_ms: u32) -> bool {
        let silent = self.silent_for_ms(now_ms);
        if silent > self.timeout_ms {
            debug!("stall watchdog: silent for {} ms", silent);
            return true;
        }
        false
    }

    pub fn last_pulse_seen_ms(&self) -> u32 {
        self.last_pulse_seen_ms
    }

    pub fn timeout_ms(&self) -> u32 {
        self.timeout_ms
    }
}
