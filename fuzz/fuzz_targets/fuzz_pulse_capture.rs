//! Fuzz target: `PulseCapture` edge filter
//!
//! Treats the input as a debounce setting followed by little-endian u32
//! inter-edge gaps (µs) and verifies:
//! - No panics across timestamp wrap
//! - Accepted edges are never closer than max(500 µs, debounce)
//! - The counter equals the number of accepted edges
//!
//! cargo fuzz run fuzz_pulse_capture

#![no_main]

use libfuzzer_sys::fuzz_target;
use spoolcount::config::HARD_DEBOUNCE_FLOOR_US;
use spoolcount::sensors::{DebounceWindow, EdgeVerdict, PulseCapture, PulseCounter};

fuzz_target!(|data: &[u8]| {
    let Some((&debounce, rest)) = data.split_first() else {
        return;
    };

    let counter = PulseCounter::new();
    let window = DebounceWindow::new(0);
    window.set_ms(u16::from(debounce));
    let capture = PulseCapture::new(&counter, &window);
    let min_gap = HARD_DEBOUNCE_FLOOR_US.max(u32::from(window.ms()) * 1000);

    let mut now: u32 = 0;
    let mut last: Option<u32> = None;
    let mut accepted = 0u32;

    for chunk in rest.chunks_exact(4) {
        let gap = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        now = now.wrapping_add(gap);
        if capture.on_edge(now) == EdgeVerdict::Accepted {
            if let Some(prev) = last {
                assert!(now.wrapping_sub(prev) >= min_gap);
            }
            last = Some(now);
            accepted += 1;
        }
    }

    assert_eq!(counter.read(), accepted);
});
