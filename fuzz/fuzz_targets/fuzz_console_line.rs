//! Fuzz target: console command parser and line assembly
//!
//! Feeds arbitrary bytes through `ConsoleUi` and `AppCommand::parse` and
//! verifies:
//! - No panics on any byte sequence
//! - Every parsed settings entry clamps into range
//!
//! cargo fuzz run fuzz_console_line

#![no_main]

use libfuzzer_sys::fuzz_target;
use spoolcount::adapters::console::ConsoleUi;
use spoolcount::app::commands::AppCommand;
use spoolcount::app::ports::UiPort;
use spoolcount::config::OperatingParameters;

fuzz_target!(|data: &[u8]| {
    if let Ok(text) = core::str::from_utf8(data) {
        if let Some(AppCommand::ConfirmSettings(input)) = AppCommand::parse(text) {
            assert!(OperatingParameters::clamped(input.target, input.debounce_ms).is_valid());
        }
    }

    let mut ui = ConsoleUi::new();
    for chunk in data.chunks(64) {
        ui.feed(chunk);
        while ui.poll_command().is_some() {}
    }
});
