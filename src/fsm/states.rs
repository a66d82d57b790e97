//! Concrete state handler functions and table builder.
//!
//! Each state is defined by plain `fn` pointers — no closures, no dynamic
//! dispatch, no heap.
//!
//! ```text
//!            Start                      count ≥ target
//!   IDLE ───────────▶ RUNNING ──────────────────────────▶ DONE
//!    ▲ ▲               │   ▲ │                              │
//!    │ │          Stop │   │ │ no pulse > 5 s               │ Ack / Reset
//!    │ │               ▼   │ ▼                              │
//!    │ └──── Reset ── STOPPED  ERROR ──── Reset ──▶ IDLE ◀──┘
//!    │                 Start ▲
//!    └── Reset (self: clears stray counts)
//! ```
//!
//! Entering Idle always clears the counter; leaving Running always drops
//! the motor.  `Error` accepts `Reset` and nothing else.

use super::context::FsmContext;
use super::{MachineCommand, StateDescriptor, StateId};
use crate::error::Fault;
use log::{error, info, warn};

// ═══════════════════════════════════════════════════════════════════════════
//  Table builder
// ═══════════════════════════════════════════════════════════════════════════

/// Build the static state table.  Called once at startup.
pub fn build_state_table() -> [StateDescriptor; StateId::COUNT] {
    [
        // Index 0 — Idle
        StateDescriptor {
            id: StateId::Idle,
            name: "Idle",
            on_enter: Some(idle_enter),
            on_exit: None,
            on_update: stay,
            on_command: idle_command,
        },
        // Index 1 — Running
        StateDescriptor {
            id: StateId::Running,
            name: "Running",
            on_enter: Some(running_enter),
            on_exit: Some(running_exit),
            on_update: running_update,
            on_command: running_command,
        },
        // Index 2 — Done
        StateDescriptor {
            id: StateId::Done,
            name: "Done",
            on_enter: Some(done_enter),
            on_exit: None,
            on_update: stay,
            on_command: done_command,
        },
        // Index 3 — Stopped
        StateDescriptor {
            id: StateId::Stopped,
            name: "Stopped",
            on_enter: Some(stopped_enter),
            on_exit: None,
            on_update: stay,
            on_command: stopped_command,
        },
        // Index 4 — Error
        StateDescriptor {
            id: StateId::Error,
            name: "Error",
            on_enter: Some(error_enter),
            on_exit: Some(error_exit),
            on_update: error_update,
            on_command: error_command,
        },
    ]
}

/// Update handler for states that only move on operator commands.
fn stay(_ctx: &mut FsmContext) -> Option<StateId> {
    None
}

// ═══════════════════════════════════════════════════════════════════════════
//  IDLE
// ═══════════════════════════════════════════════════════════════════════════

fn idle_enter(ctx: &mut FsmContext) {
    ctx.commands.motor_on = false;
    ctx.commands.reset_counter = true;
    info!(
        "IDLE: ready, target {} pulses",
        ctx.params.target_count()
    );
}

fn idle_command(_ctx: &mut FsmContext, cmd: MachineCommand) -> Option<StateId> {
    match cmd {
        MachineCommand::Start => Some(StateId::Running),
        // Re-enter Idle to discard pulses counted while idle.
        MachineCommand::Reset => Some(StateId::Idle),
        MachineCommand::Stop | MachineCommand::Acknowledge => None,
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  RUNNING — motor on, counting towards target
// ═══════════════════════════════════════════════════════════════════════════

fn running_enter(ctx: &mut FsmContext) {
    ctx.commands.motor_on = true;
    // Fresh stall window on start *and* on resume from Stopped.
    let (count, now) = (ctx.count, ctx.now_ms);
    ctx.stall.rearm(count, now);
    info!(
        "RUNNING: motor on at {}/{}",
        ctx.count,
        ctx.params.target_count()
    );
}

fn running_exit(ctx: &mut FsmContext) {
    ctx.commands.motor_on = false;
    info!("RUNNING: motor off at {} pulses", ctx.count);
}

fn running_update(ctx: &mut FsmContext) -> Option<StateId> {
    if ctx.target_reached() {
        info!(
            "RUNNING: target reached ({}/{})",
            ctx.count,
            ctx.params.target_count()
        );
        return Some(StateId::Done);
    }

    if ctx.stall.expired(ctx.now_ms) {
        error!(
            "RUNNING: no pulse for {} ms (limit {} ms)",
            ctx.stall.silent_for_ms(ctx.now_ms),
            ctx.stall.timeout_ms()
        );
        ctx.latch_fault(Fault::SensorStall);
        return Some(StateId::Error);
    }

    None
}

fn running_command(_ctx: &mut FsmContext, cmd: MachineCommand) -> Option<StateId> {
    match cmd {
        MachineCommand::Stop => Some(StateId::Stopped),
        MachineCommand::Start | MachineCommand::Reset | MachineCommand::Acknowledge => None,
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  DONE — batch complete, waiting for the operator
// ═══════════════════════════════════════════════════════════════════════════

fn done_enter(ctx: &mut FsmContext) {
    ctx.commands.motor_on = false;
    info!("DONE: batch of {} complete", ctx.count);
}

fn done_command(_ctx: &mut FsmContext, cmd: MachineCommand) -> Option<StateId> {
    match cmd {
        MachineCommand::Acknowledge | MachineCommand::Reset => Some(StateId::Idle),
        MachineCommand::Start | MachineCommand::Stop => None,
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  STOPPED — paused by the operator, count kept
// ═══════════════════════════════════════════════════════════════════════════

fn stopped_enter(ctx: &mut FsmContext) {
    ctx.commands.motor_on = false;
    info!("STOPPED: paused at {}/{}", ctx.count, ctx.params.target_count());
}

fn stopped_command(_ctx: &mut FsmContext, cmd: MachineCommand) -> Option<StateId> {
    match cmd {
        MachineCommand::Start => Some(StateId::Running),
        MachineCommand::Reset => Some(StateId::Idle),
        MachineCommand::Stop | MachineCommand::Acknowledge => None,
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  ERROR — latched fault, motor held off until Reset
// ═══════════════════════════════════════════════════════════════════════════

fn error_enter(ctx: &mut FsmContext) {
    ctx.commands.motor_on = false;
    warn!("ERROR: motor disabled: {}", ctx.error_message);
}

fn error_exit(ctx: &mut FsmContext) {
    ctx.commands.motor_on = false;
    ctx.clear_fault();
    info!("ERROR: reset by operator");
}

fn error_update(ctx: &mut FsmContext) -> Option<StateId> {
    // Hold the output low every tick, not just on entry.
    ctx.commands.motor_on = false;
    None
}

fn error_command(_ctx: &mut FsmContext, cmd: MachineCommand) -> Option<StateId> {
    match cmd {
        MachineCommand::Reset => Some(StateId::Idle),
        MachineCommand::Start | MachineCommand::Stop | MachineCommand::Acknowledge => None,
    }
}
