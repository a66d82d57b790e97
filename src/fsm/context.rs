//! Shared mutable context threaded through every FSM handler.
//!
//! `FsmContext` is the blackboard the state handlers read from and write
//! to: the observed pulse count, the current time, operating parameters,
//! the stall watchdog, and the output commands the application service
//! applies to the hardware after each tick or command.

use heapless::String;

use crate::config::{ERROR_MESSAGE_CAP, NO_PULSE_TIMEOUT_MS, OperatingParameters};
use crate::error::Fault;
use crate::safety::StallWatchdog;

// ---------------------------------------------------------------------------
// Output commands (written by state handlers; consumed by the service)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default)]
pub struct OutputCommands {
    /// Desired motor state.
    pub motor_on: bool,
    /// Zero the pulse counter before the next read.  Latched until the
    /// service has applied it.
    pub reset_counter: bool,
}

// ---------------------------------------------------------------------------
// FsmContext
// ---------------------------------------------------------------------------

pub struct FsmContext {
    // -- Timing --
    /// Control-loop time of the current tick / command (ms, wrapping).
    pub now_ms: u32,

    // -- Inputs --
    /// Latest count read through the counter handoff.
    pub count: u32,
    /// Active operating parameters.
    pub params: OperatingParameters,
    /// No-pulse watchdog.
    pub stall: StallWatchdog,

    // -- Outputs --
    pub commands: OutputCommands,

    // -- Fault --
    /// Latched fault; `Some` exactly while in `Error`.
    pub fault: Option<Fault>,
    /// Operator-facing rendering of `fault`.
    pub error_message: String<ERROR_MESSAGE_CAP>,
}

impl FsmContext {
    pub fn new(params: OperatingParameters) -> Self {
        Self {
            now_ms: 0,
            count: 0,
            params,
            stall: StallWatchdog::new(NO_PULSE_TIMEOUT_MS),
            commands: OutputCommands::default(),
            fault: None,
            error_message: String::new(),
        }
    }

    /// True once the observed count has reached the target.
    pub fn target_reached(&self) -> bool {
        self.count >= self.params.target_count()
    }

    /// Latch a fault and render its message.
    pub fn latch_fault(&mut self, fault: Fault) {
        self.fault = Some(fault);
        self.error_message.clear();
        // Messages are compile-time constants sized under the cap.
        let _ = self.error_message.push_str(fault.message());
    }

    pub fn clear_fault(&mut self) {
        self.fault = None;
        self.error_message.clear();
    }
}
