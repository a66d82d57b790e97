//! Fixed-period control-loop ticker.
//!
//! The main loop polls [`Ticker::poll`] on every pass; it returns `true`
//! once per elapsed period.  Deadlines advance by exactly one period so
//! the tick rate does not drift with loop jitter.
//!
//! ```text
//!  now ─────┬────────┬────────┬──────────────────────┬────────▶
//!          due      due      due                   (late by ≥ 1 period)
//!           ✓        ✓        ✓                      ✓  resync, skipped += n
//! ```
//!
//! If the loop falls a whole period or more behind, the ticker fires once
//! and re-anchors on `now` instead of bursting catch-up ticks: the state
//! machine only cares about the latest count and the current time.
//!
//! Time is wrapping `u32` ms.  A deadline is "reached" when
//! `now - due` (wrapping) lies in the lower half of the range.

use log::warn;

pub struct Ticker {
    period_ms: u32,
    next_due_ms: u32,
    skipped: u32,
}

impl Ticker {
    /// First tick fires one period after `now_ms`.
    pub fn new(period_ms: u32, now_ms: u32) -> Self {
        let period_ms = period_ms.max(1);
        Self {
            period_ms,
            next_due_ms: now_ms.wrapping_add(period_ms),
            skipped: 0,
        }
    }

    /// `true` if a period boundary has passed since the last tick.
    pub fn poll(&mut self, now_ms: u32) -> bool {
        let late = now_ms.wrapping_sub(self.next_due_ms);
        if late > u32::MAX / 2 {
            // Deadline still in the future.
            return false;
        }

        if late >= self.period_ms {
            let missed = late / self.period_ms;
            self.skipped = self.skipped.saturating_add(missed);
            warn!("Ticker: overrun by {} ms, skipped {} period(s)", late, missed);
            self.next_due_ms = now_ms.wrapping_add(self.period_ms);
        } else {
            self.next_due_ms = self.next_due_ms.wrapping_add(self.period_ms);
        }
        true
    }

    /// Total periods dropped by overrun resyncs.
    pub fn skipped(&self) -> u32 {
        self.skipped
    }

    pub fn period_ms(&self) -> u32 {
        self.period_ms
    }

    /// Milliseconds until the next tick (0 if already due).
    pub fn remaining_ms(&self, now_ms: u32) -> u32 {
        let ahead = self.next_due_ms.wrapping_sub(now_ms);
        if ahead > u32::MAX / 2 { 0 } else { ahead }
    }
}
