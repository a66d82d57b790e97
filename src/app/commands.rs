//! Inbound commands to the application service.
//!
//! These represent actions requested by the operator (display, serial
//! console) that the [`AppService`](super::service::AppService)
//! interprets and acts upon.  A command that is invalid in the current
//! state is ignored, never an error.

use crate::config::parse_operator_input;
use crate::fsm::MachineCommand;

/// Commands that external adapters can send into the application core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppCommand {
    /// Start a batch, or resume a stopped one.
    Start,

    /// Pause the running batch, keeping the count.
    Stop,

    /// Return to Idle and clear the counter (the only way out of Error).
    Reset,

    /// Operator confirmed the batch-complete notice.
    Acknowledge,

    /// Open the settings editor with the current values as a draft.
    OpenSettings,

    /// Close the settings editor without saving.
    CancelSettings,

    /// Clamp, persist and apply the edited values.
    ConfirmSettings(SettingsInput),

    /// Re-emit the current snapshot (console `status`).
    Status,
}

impl AppCommand {
    /// The state-machine command this maps to, if any.
    pub fn machine_command(self) -> Option<MachineCommand> {
        match self {
            Self::Start => Some(MachineCommand::Start),
            Self::Stop => Some(MachineCommand::Stop),
            Self::Reset => Some(MachineCommand::Reset),
            Self::Acknowledge => Some(MachineCommand::Acknowledge),
            Self::OpenSettings | Self::CancelSettings | Self::ConfirmSettings(_) | Self::Status => {
                None
            }
        }
    }

    /// Parse one console line.  Unknown words yield `None`.
    ///
    /// ```text
    /// start | stop | reset | ack | settings | cancel | status
    /// save <target> <debounce_ms>
    /// ```
    pub fn parse(line: &str) -> Option<Self> {
        let mut words = line.split_whitespace();
        let cmd = match words.next()?.to_ascii_lowercase().as_str() {
            "start" => Self::Start,
            "stop" => Self::Stop,
            "reset" => Self::Reset,
            "ack" => Self::Acknowledge,
            "settings" => Self::OpenSettings,
            "cancel" => Self::CancelSettings,
            "status" => Self::Status,
            "save" => {
                let target = words.next().unwrap_or("");
                let debounce = words.next().unwrap_or("");
                Self::ConfirmSettings(SettingsInput::from_text(target, debounce))
            }
            _ => return None,
        };
        Some(cmd)
    }
}

/// Raw, unvalidated values from the settings editor.
///
/// Kept as wide integers so out-of-range entries survive until the
/// service clamps them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettingsInput {
    pub target: u64,
    pub debounce_ms: u64,
}

impl SettingsInput {
    pub fn from_values(target: u64, debounce_ms: u64) -> Self {
        Self {
            target,
            debounce_ms,
        }
    }

    /// Build from the editor's text fields.  Non-numeric text reads as 0.
    pub fn from_text(target: &str, debounce_ms: &str) -> Self {
        Self::from_values(
            parse_operator_input(target),
            parse_operator_input(debounce_ms),
        )
    }
}
