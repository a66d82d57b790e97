//! Function-pointer finite state machine engine.
//!
//! Classic embedded FSM pattern, one table row per state:
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  StateTable                                                       │
//! │  ┌─────────┬──────────┬─────────┬─────────────┬────────────────┐  │
//! │  │ StateId │ on_enter │ on_exit │ on_update   │ on_command     │  │
//! │  ├─────────┼──────────┼─────────┼─────────────┼────────────────┤  │
//! │  │ Idle    │ fn(ctx)  │    —    │ fn(ctx)->?  │ fn(ctx,cmd)->? │  │
//! │  │ Running │ fn(ctx)  │ fn(ctx) │ fn(ctx)->?  │ fn(ctx,cmd)->? │  │
//! │  │ Done    │ fn(ctx)  │    —    │ fn(ctx)->?  │ fn(ctx,cmd)->? │  │
//! │  │ Stopped │ fn(ctx)  │    —    │ fn(ctx)->?  │ fn(ctx,cmd)->? │  │
//! │  │ Error   │ fn(ctx)  │ fn(ctx) │ fn(ctx)->?  │ fn(ctx,cmd)->? │  │
//! │  └─────────┴──────────┴─────────┴─────────────┴────────────────┘  │
//! └───────────────────────────────────────────────────────────────────┘
//! ```
//!
//! `on_update` runs once per control tick; `on_command` runs when the
//! operator issues a command.  Either may return `Some(next)`, in which
//! case the engine runs `on_exit` for the current state, then `on_enter`
//! for the next.  The `on_command` column *is* the transition table: a
//! command a state does not list is ignored, which is how `Error` accepts
//! nothing but `Reset`.

pub mod context;
pub mod states;

use context::FsmContext;
use log::{debug, info};
use serde::Serialize;

// ---------------------------------------------------------------------------
// State identity
// ---------------------------------------------------------------------------

/// Operator-visible machine states.
/// Must stay in sync with the state table built in [`states::build_state_table`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[repr(u8)]
pub enum StateId {
    Idle = 0,
    Running = 1,
    Done = 2,
    Stopped = 3,
    Error = 4,
}

impl StateId {
    /// Total number of states — used to size the table array.
    pub const COUNT: usize = 5;

    /// Convert an index back to `StateId`.  Panics on out-of-range in
    /// debug builds; returns `Error` in release (safe fallback).
    pub fn from_index(idx: usize) -> Self {
        match idx {
            0 => Self::Idle,
            1 => Self::Running,
            2 => Self::Done,
            3 => Self::Stopped,
            4 => Self::Error,
            _ => {
                debug_assert!(false, "invalid state index: {idx}");
                Self::Error
            }
        }
    }

    /// Label shown on the operator display.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Idle => "IDLE",
            Self::Running => "RUNNING",
            Self::Done => "DONE",
            Self::Stopped => "STOPPED",
            Self::Error => "ERROR",
        }
    }
}

/// Operator commands the state machine itself interprets.
///
/// Settings commands never reach the FSM; the application service gates
/// them on the current state instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MachineCommand {
    Start,
    Stop,
    Reset,
    /// Operator confirmed the "batch complete" notice.
    Acknowledge,
}

// ---------------------------------------------------------------------------
// Function-pointer type aliases
// ---------------------------------------------------------------------------

/// Signature for `on_enter` and `on_exit` actions.
pub type StateActionFn = fn(&mut FsmContext);

/// Per-tick update handler.  `Some(next)` triggers a transition.
pub type StateUpdateFn = fn(&mut FsmContext) -> Option<StateId>;

/// Command handler.  `Some(next)` triggers a transition; `None` ignores.
pub type StateCommandFn = fn(&mut FsmContext, MachineCommand) -> Option<StateId>;

// ---------------------------------------------------------------------------
// State descriptor (one row in the table)
// ---------------------------------------------------------------------------

/// Static descriptor for a single FSM state.
/// Stored in a fixed-size array — no heap, no `dyn`.
pub struct StateDescriptor {
    pub id: StateId,
    pub name: &'static str,
    pub on_enter: Option<StateActionFn>,
    pub on_exit: Option<StateActionFn>,
    pub on_update: StateUpdateFn,
    pub on_command: StateCommandFn,
}

// ---------------------------------------------------------------------------
// FSM engine
// ---------------------------------------------------------------------------

/// The finite state machine engine.
pub struct Fsm {
    /// Fixed-size table indexed by `StateId as usize`.
    table: [StateDescriptor; StateId::COUNT],
    current: usize,
}

impl Fsm {
    pub fn new(table: [StateDescriptor; StateId::COUNT], initial: StateId) -> Self {
        debug_assert!(
            table.iter().enumerate().all(|(i, row)| row.id as usize == i),
            "state table out of order"
        );
        Self {
            table,
            current: initial as usize,
        }
    }

    /// Run the initial `on_enter` for the starting state.
    /// Call once after construction, before the first `tick()`.
    pub fn start(&mut self, ctx: &mut FsmContext) {
        info!("FSM starting in state: {}", self.table[self.current].name);
        if let Some(enter) = self.table[self.current].on_enter {
            enter(ctx);
        }
    }

    /// Advance the FSM by one control tick.  Returns the transition taken,
    /// if any, as `(from, to)`.
    pub fn tick(&mut self, ctx: &mut FsmContext) -> Option<(StateId, StateId)> {
        let next = (self.table[self.current].on_update)(ctx)?;
        Some(self.transition(next, ctx))
    }

    /// Offer an operator command to the current state.  Returns the
    /// transition taken, or `None` if the state ignored the command.
    pub fn dispatch(
        &mut self,
        cmd: MachineCommand,
        ctx: &mut FsmContext,
    ) -> Option<(StateId, StateId)> {
        let row = &self.table[self.current];
        match (row.on_command)(ctx, cmd) {
            Some(next) => Some(self.transition(next, ctx)),
            None => {
                debug!("FSM: {:?} ignored in {}", cmd, row.name);
                None
            }
        }
    }

    /// The current state's identity.
    pub fn current_state(&self) -> StateId {
        StateId::from_index(self.current)
    }

    // -----------------------------------------------------------------------
    // Internal
    // -----------------------------------------------------------------------

    fn transition(&mut self, next_id: StateId, ctx: &mut FsmContext) -> (StateId, StateId) {
        let from = self.current_state();
        let next_idx = next_id as usize;

        info!(
            "FSM transition: {} -> {}",
            self.table[self.current].name, self.table[next_idx].name
        );

        if let Some(exit) = self.table[self.current].on_exit {
            exit(ctx);
        }

        self.current = next_idx;

        if let Some(enter) = self.table[self.current].on_enter {
            enter(ctx);
        }

        (from, next_id)
    }
}
