//! Outbound application events and the presentation snapshot.
//!
//! The [`AppService`](super::service::AppService) emits these through the
//! [`EventSink`](super::ports::EventSink) port.  Adapters on the other
//! side decide what to do with them — log to serial, record in a test.

use heapless::String;
use serde::Serialize;

use crate::config::{ERROR_MESSAGE_CAP, OperatingParameters};
use crate::error::Fault;
use crate::fsm::StateId;

/// Structured events emitted by the application core.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// The application service has started (carries initial state and
    /// the parameters loaded from storage).
    Started {
        state: StateId,
        params: OperatingParameters,
    },

    /// The FSM transitioned between states.
    StateChanged { from: StateId, to: StateId },

    /// A fault latched the machine in Error.
    FaultRaised(Fault),

    /// The latched fault was cleared by Reset.
    FaultCleared,

    /// New parameters were persisted and applied.
    SettingsApplied(OperatingParameters),

    /// Persisting parameters failed; the editor stays open.
    SettingsSaveFailed(super::ports::SettingsError),

    /// The pulse counter was zeroed (carries the count discarded).
    CounterReset { discarded: u32 },

    /// Periodic telemetry snapshot.
    Telemetry(PresentationSnapshot),
}

/// Read-only view of the machine for the operator display.
///
/// Recomputed at the end of every tick; latest wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PresentationSnapshot {
    pub current_count: u32,
    pub target_count: u32,
    pub state: StateId,
    pub state_label: &'static str,
    /// `min(count, target) * 100 / target`, never above 100.
    pub progress_percent: u8,
    /// Empty unless `state == Error`.
    pub error_message: String<ERROR_MESSAGE_CAP>,
    pub motor_on: bool,
    /// Values shown in the settings editor while it is open.
    pub settings_draft: Option<OperatingParameters>,
}

impl PresentationSnapshot {
    /// Snapshot of a freshly booted machine.
    pub fn initial(params: &OperatingParameters) -> Self {
        Self {
            current_count: 0,
            target_count: params.target_count(),
            state: StateId::Idle,
            state_label: StateId::Idle.label(),
            progress_percent: 0,
            error_message: String::new(),
            motor_on: false,
            settings_draft: None,
        }
    }
}
