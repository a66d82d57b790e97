//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the ESP-IDF logger (which goes to UART / USB-CDC in production).
//! Telemetry lines carry the presentation snapshot as one JSON object so
//! a host script can scrape them.

use log::{info, warn};

use crate::app::events::{AppEvent, PresentationSnapshot};
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`] to the serial console.
#[derive(Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

/// Render a snapshot as a single-line JSON object.
pub fn snapshot_json(snapshot: &PresentationSnapshot) -> Option<String> {
    serde_json::to_string(snapshot).ok()
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Telemetry(snapshot) => match snapshot_json(snapshot) {
                Some(json) => info!("TELEM | {}", json),
                None => warn!("TELEM | snapshot serialisation failed"),
            },
            AppEvent::StateChanged { from, to } => {
                info!("STATE | {} -> {}", from.label(), to.label());
            }
            AppEvent::FaultRaised(fault) => {
                info!("FAULT | raised: {}", fault);
            }
            AppEvent::FaultCleared => {
                info!("FAULT | cleared");
            }
            AppEvent::SettingsApplied(p) => {
                info!(
                    "PARAM | applied target={} debounce={}ms",
                    p.target_count(),
                    p.debounce_ms()
                );
            }
            AppEvent::SettingsSaveFailed(e) => {
                info!("PARAM | save failed: {}", e);
            }
            AppEvent::CounterReset { discarded } => {
                info!("COUNT | reset (discarded {})", discarded);
            }
            AppEvent::Started { state, params } => {
                info!(
                    "START | initial_state={} target={} debounce={}ms",
                    state.label(),
                    params.target_count(),
                    params.debounce_ms()
                );
            }
        }
    }
}
