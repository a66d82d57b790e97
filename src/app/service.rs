//! Application service — the hexagonal core.
//!
//! [`AppService`] is the controller aggregate: it owns the FSM, its
//! context (count, parameters, stall watchdog, fault), the settings edit
//! session and the presentation snapshot.  All I/O flows through port
//! traits injected at call sites, making the entire service testable with
//! mock adapters.
//!
//! ```text
//!  PulseSource ──▶ ┌──────────────────────────┐ ──▶ EventSink
//!                  │        AppService         │
//!    MotorPort ◀── │  FSM · Stall · Settings   │ ◀── ParamsPort
//!                  └──────────────────────────┘
//! ```

use log::{debug, info, warn};

use crate::config::{BoardConfig, OperatingParameters};
use crate::fsm::context::FsmContext;
use crate::fsm::states::build_state_table;
use crate::fsm::{Fsm, StateId};

use super::commands::{AppCommand, SettingsInput};
use super::events::{AppEvent, PresentationSnapshot};
use super::ports::{EventSink, MotorPort, ParamsPort, PulseSource};

// ───────────────────────────────────────────────────────────────
// AppService
// ───────────────────────────────────────────────────────────────

/// The application service orchestrates all domain logic.
pub struct AppService {
    fsm: Fsm,
    ctx: FsmContext,
    /// Open settings editor, holding the values it shows.
    settings_draft: Option<OperatingParameters>,
    /// A failed save may have left unapplied values in the store; set
    /// until the active parameters have been written back.
    store_diverged: bool,
    snapshot: PresentationSnapshot,
    telemetry_every: u32,
    ticks_since_telemetry: u32,
    tick_count: u64,
}

impl AppService {
    /// Construct the service from the loaded parameters.
    ///
    /// Does **not** start the FSM — call [`start`](Self::start) next.
    pub fn new(params: OperatingParameters, board: &BoardConfig) -> Self {
        let params = params.sanitized();
        Self {
            fsm: Fsm::new(build_state_table(), StateId::Idle),
            ctx: FsmContext::new(params),
            settings_draft: None,
            store_diverged: false,
            snapshot: PresentationSnapshot::initial(&params),
            telemetry_every: board.telemetry_interval_ticks(),
            ticks_since_telemetry: 0,
            tick_count: 0,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Enter Idle: motor off, counter cleared, debounce published.
    pub fn start(
        &mut self,
        now_ms: u32,
        hw: &mut (impl PulseSource + MotorPort),
        sink: &mut impl EventSink,
    ) {
        self.ctx.now_ms = now_ms;
        hw.apply_debounce_ms(self.ctx.params.debounce_ms());
        self.fsm.start(&mut self.ctx);
        self.settle(None, hw, sink);
        sink.emit(&AppEvent::Started {
            state: self.fsm.current_state(),
            params: self.ctx.params,
        });
        self.refresh_snapshot();
        info!("AppService started in {:?}", self.fsm.current_state());
    }

    // ── Per-tick orchestration ────────────────────────────────

    /// Run one control cycle: read count → stall bookkeeping → FSM →
    /// motor → snapshot.
    ///
    /// The `hw` parameter satisfies **both** [`PulseSource`] and
    /// [`MotorPort`] — this avoids a double mutable borrow while keeping
    /// the port boundary explicit.
    pub fn tick(
        &mut self,
        now_ms: u32,
        hw: &mut (impl PulseSource + MotorPort),
        sink: &mut impl EventSink,
    ) {
        self.tick_count += 1;
        self.ctx.now_ms = now_ms;

        // 1–2. Refresh count; a change moves the last-pulse timestamp.
        let count = hw.read_count();
        self.ctx.count = count;
        self.ctx.stall.observe(count, now_ms);

        // 3–4. Target / stall evaluation (pure state logic).
        let transition = self.fsm.tick(&mut self.ctx);

        // Apply outputs, then publish.
        self.settle(transition, hw, sink);
        self.refresh_snapshot();

        self.ticks_since_telemetry += 1;
        if self.ticks_since_telemetry >= self.telemetry_every {
            self.ticks_since_telemetry = 0;
            sink.emit(&AppEvent::Telemetry(self.snapshot.clone()));
        }
    }

    // ── Command handling ──────────────────────────────────────

    /// Process an operator command.  Commands that are invalid in the
    /// current state are ignored.
    pub fn handle_command(
        &mut self,
        cmd: AppCommand,
        now_ms: u32,
        hw: &mut (impl PulseSource + MotorPort),
        params: &mut impl ParamsPort,
        sink: &mut impl EventSink,
    ) {
        self.ctx.now_ms = now_ms;

        if let Some(mc) = cmd.machine_command() {
            let transition = self.fsm.dispatch(mc, &mut self.ctx);
            self.settle(transition, hw, sink);
        } else {
            match cmd {
                AppCommand::OpenSettings => self.open_settings(),
                AppCommand::CancelSettings => {
                    if self.settings_draft.take().is_some() {
                        info!("Settings edit cancelled");
                    }
                }
                AppCommand::ConfirmSettings(input) => {
                    self.confirm_settings(input, hw, params, sink);
                }
                AppCommand::Status => {
                    sink.emit(&AppEvent::Telemetry(self.snapshot.clone()));
                }
                AppCommand::Start | AppCommand::Stop | AppCommand::Reset | AppCommand::Acknowledge => {}
            }
        }

        if self.store_diverged && !matches!(cmd, AppCommand::ConfirmSettings(_)) {
            self.restore_stored_params(params);
        }

        self.refresh_snapshot();
    }

    // ── Queries ───────────────────────────────────────────────

    /// Latest presentation snapshot.
    pub fn snapshot(&self) -> &PresentationSnapshot {
        &self.snapshot
    }

    /// Current FSM state.
    pub fn state(&self) -> StateId {
        self.fsm.current_state()
    }

    /// Active operating parameters.
    pub fn params(&self) -> OperatingParameters {
        self.ctx.params
    }

    /// Whether the settings editor is open.
    pub fn settings_open(&self) -> bool {
        self.settings_draft.is_some()
    }

    /// Total control ticks executed since startup.
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    // ── Internal ──────────────────────────────────────────────

    /// Push FSM output commands to the hardware and emit the events that
    /// describe what just happened.
    fn settle(
        &mut self,
        transition: Option<(StateId, StateId)>,
        hw: &mut (impl PulseSource + MotorPort),
        sink: &mut impl EventSink,
    ) {
        // Motor first, every time: idempotent, and the fault path must
        // not depend on a transition having been observed.
        hw.set_motor(self.ctx.commands.motor_on);

        if let Some((from, to)) = transition {
            sink.emit(&AppEvent::StateChanged { from, to });
            if from == StateId::Error {
                sink.emit(&AppEvent::FaultCleared);
            }
            if to == StateId::Error {
                if let Some(fault) = self.ctx.fault {
                    warn!("Fault raised: {}", fault);
                    sink.emit(&AppEvent::FaultRaised(fault));
                }
            }
            if matches!(to, StateId::Running | StateId::Error) && self.settings_draft.take().is_some() {
                info!("Settings edit closed by transition to {:?}", to);
            }
        }

        if self.ctx.commands.reset_counter {
            self.ctx.commands.reset_counter = false;
            debug_assert!(self.fsm.current_state() != StateId::Running);
            let discarded = hw.read_count();
            hw.reset_count();
            self.ctx.count = 0;
            self.ctx.stall.rearm(0, self.ctx.now_ms);
            sink.emit(&AppEvent::CounterReset { discarded });
        }
    }

    fn open_settings(&mut self) {
        match self.fsm.current_state() {
            StateId::Idle | StateId::Stopped | StateId::Done => {
                self.settings_draft = Some(self.ctx.params);
                info!("Settings edit opened");
            }
            state => debug!("Settings ignored in {:?}", state),
        }
    }

    fn confirm_settings(
        &mut self,
        input: SettingsInput,
        hw: &mut impl PulseSource,
        params: &mut impl ParamsPort,
        sink: &mut impl EventSink,
    ) {
        if self.settings_draft.is_none() {
            debug!("ConfirmSettings without an open editor ignored");
            return;
        }

        let new = OperatingParameters::clamped(input.target, input.debounce_ms);
        // The editor shows the clamped values whether or not the save works.
        self.settings_draft = Some(new);

        match params.save(&new) {
            Ok(()) => {
                self.store_diverged = false;
                self.ctx.params = new;
                hw.apply_debounce_ms(new.debounce_ms());
                self.settings_draft = None;
                info!(
                    "Settings applied: target={} debounce={} ms",
                    new.target_count(),
                    new.debounce_ms()
                );
                sink.emit(&AppEvent::SettingsApplied(new));
            }
            Err(e) => {
                warn!("Settings save failed: {}", e);
                sink.emit(&AppEvent::SettingsSaveFailed(e));
                // Puts may have landed before the failure; the store must
                // only ever hold the parameters that are running.
                self.restore_stored_params(params);
            }
        }
    }

    /// Write the active parameters back over whatever a failed save left.
    fn restore_stored_params(&mut self, params: &mut impl ParamsPort) {
        match params.save(&self.ctx.params) {
            Ok(()) => {
                if self.store_diverged {
                    info!("Settings: stored values restored to the active parameters");
                }
                self.store_diverged = false;
            }
            Err(e) => {
                debug!("Settings: restore failed ({}), retrying on next command", e);
                self.store_diverged = true;
            }
        }
    }

    fn refresh_snapshot(&mut self) {
        let state = self.fsm.current_state();
        let params = &self.ctx.params;
        self.snapshot = PresentationSnapshot {
            current_count: self.ctx.count,
            target_count: params.target_count(),
            state,
            state_label: state.label(),
            progress_percent: params.progress_percent(self.ctx.count),
            error_message: self.ctx.error_message.clone(),
            motor_on: self.ctx.commands.motor_on,
            settings_draft: self.settings_draft,
        };
    }
}
