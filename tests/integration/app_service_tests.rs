//! Integration tests for the pulse capture → AppService → FSM → motor pipeline.
//!
//! These run on the host (x86_64) and drive the real ISR-side filter, the
//! real state machine and the real settings repository, with only the
//! pins and the flash store mocked.

use crate::mock_hw::{MockHardware, MockStore, RecordingSink};

use spoolcount::adapters::settings::SettingsRepository;
use spoolcount::app::commands::AppCommand;
use spoolcount::app::events::AppEvent;
use spoolcount::app::service::AppService;
use spoolcount::config::{BoardConfig, CONTROL_TICK_MS, NO_PULSE_TIMEOUT_MS, OperatingParameters};
use spoolcount::error::Fault;
use spoolcount::fsm::StateId;
use spoolcount::sensors::EdgeVerdict;

struct Rig {
    app: AppService,
    hw: MockHardware,
    settings: SettingsRepository<MockStore>,
    sink: RecordingSink,
}

impl Rig {
    fn new(target: u64, debounce_ms: u64) -> Self {
        let params = OperatingParameters::clamped(target, debounce_ms);
        let mut app = AppService::new(params, &BoardConfig::default());
        let mut hw = MockHardware::new(params.debounce_ms());
        let mut sink = RecordingSink::new();
        app.start(0, &mut hw, &mut sink);
        Self {
            app,
            hw,
            settings: SettingsRepository::new(MockStore::new()),
            sink,
        }
    }

    fn cmd(&mut self, cmd: AppCommand, now_ms: u32) {
        self.app
            .handle_command(cmd, now_ms, &mut self.hw, &mut self.settings, &mut self.sink);
    }

    fn tick(&mut self, now_ms: u32) {
        self.app.tick(now_ms, &mut self.hw, &mut self.sink);
        assert_eq!(
            self.hw.motor_on(),
            self.app.state() == StateId::Running,
            "motor must be on iff Running (state {:?})",
            self.app.state()
        );
    }

    fn transitions(&self) -> Vec<(StateId, StateId)> {
        self.sink
            .events
            .iter()
            .filter_map(|e| match e {
                AppEvent::StateChanged { from, to } => Some((*from, *to)),
                _ => None,
            })
            .collect()
    }

    /// Drive the machine into Error via a stall.
    fn stall_into_error(&mut self) {
        self.cmd(AppCommand::Start, 0);
        self.tick(NO_PULSE_TIMEOUT_MS + 1);
        assert_eq!(self.app.state(), StateId::Error);
    }
}

// ── Boot ──────────────────────────────────────────────────────

#[test]
fn boots_idle_with_motor_off_and_counter_cleared() {
    let rig = Rig::new(10, 5);
    assert_eq!(rig.app.state(), StateId::Idle);
    assert_eq!(rig.hw.motor_calls, vec![false]);
    assert_eq!(rig.hw.resets, 1);
    assert!(matches!(
        rig.sink.events.last(),
        Some(AppEvent::Started { state: StateId::Idle, .. })
    ));
}

// ── Batch to completion ───────────────────────────────────────

#[test]
fn five_edges_ten_ms_apart_complete_a_batch_of_five() {
    let mut rig = Rig::new(5, 5);
    rig.cmd(AppCommand::Start, 0);
    assert_eq!(rig.app.state(), StateId::Running);
    assert!(rig.hw.motor_on());

    for i in 0..5u32 {
        let t = 10 + i * 10;
        rig.hw.edge(t * 1_000);
        rig.tick(t);
        if i < 4 {
            assert_eq!(rig.app.state(), StateId::Running, "after edge {}", i + 1);
            assert!(rig.hw.motor_on());
        }
    }

    assert_eq!(rig.app.state(), StateId::Done);
    assert!(!rig.hw.motor_on());
    assert_eq!(rig.app.snapshot().current_count, 5);
    assert_eq!(rig.app.snapshot().progress_percent, 100);
    assert_eq!(rig.app.snapshot().state_label, "DONE");
    assert_eq!(
        rig.transitions(),
        vec![
            (StateId::Idle, StateId::Running),
            (StateId::Running, StateId::Done)
        ]
    );
}

#[test]
fn bounces_inside_debounce_do_not_count() {
    let mut rig = Rig::new(100, 5);
    rig.cmd(AppCommand::Start, 0);
    // Each real pulse followed by two bounces 1 ms and 3 ms later.
    for i in 0..10u32 {
        let t_us = 1_000_000 + i * 20_000;
        rig.hw.edge(t_us);
        rig.hw.edge(t_us + 1_000);
        rig.hw.edge(t_us + 3_000);
    }
    rig.tick(1_300);
    assert_eq!(rig.app.snapshot().current_count, 10);
}

#[test]
fn hard_floor_applies_before_the_debounce_window() {
    let mut rig = Rig::new(100, 1);
    rig.cmd(AppCommand::Start, 0);
    assert_eq!(rig.hw.edge(50_000), EdgeVerdict::Accepted);
    for t in [50_100, 50_200, 50_300, 50_400] {
        assert_eq!(rig.hw.edge(t), EdgeVerdict::BelowHardFloor);
    }
    // Past the floor but still inside the 1 ms window.
    assert_eq!(rig.hw.edge(50_600), EdgeVerdict::BelowDebounce);
    assert_eq!(rig.hw.edge(51_000), EdgeVerdict::Accepted);
    rig.tick(80);
    assert_eq!(rig.app.snapshot().current_count, 2);
}

#[test]
fn done_acknowledge_returns_to_idle_and_clears_count() {
    let mut rig = Rig::new(2, 5);
    rig.cmd(AppCommand::Start, 0);
    rig.hw.edges_every_ms(10, 10, 2);
    rig.tick(80);
    assert_eq!(rig.app.state(), StateId::Done);

    rig.cmd(AppCommand::Start, 100); // ignored in Done
    assert_eq!(rig.app.state(), StateId::Done);

    rig.cmd(AppCommand::Acknowledge, 120);
    assert_eq!(rig.app.state(), StateId::Idle);
    assert_eq!(rig.hw.count(), 0);
    assert_eq!(rig.app.snapshot().current_count, 0);
    assert!(rig.sink.events.contains(&AppEvent::CounterReset { discarded: 2 }));
}

#[test]
fn done_reset_also_returns_to_idle() {
    let mut rig = Rig::new(1, 5);
    rig.cmd(AppCommand::Start, 0);
    rig.hw.edge(10_000);
    rig.tick(80);
    assert_eq!(rig.app.state(), StateId::Done);
    rig.cmd(AppCommand::Reset, 100);
    assert_eq!(rig.app.state(), StateId::Idle);
    assert_eq!(rig.hw.count(), 0);
}

// ── Stop / resume ─────────────────────────────────────────────

#[test]
fn stop_and_resume_keep_the_count() {
    let mut rig = Rig::new(10, 5);
    rig.cmd(AppCommand::Start, 0);
    rig.hw.edges_every_ms(10, 10, 3);
    rig.tick(80);
    rig.cmd(AppCommand::Stop, 90);
    assert_eq!(rig.app.state(), StateId::Stopped);
    assert!(!rig.hw.motor_on());

    let resets_before = rig.hw.resets;
    rig.cmd(AppCommand::Start, 30_000);
    assert_eq!(rig.app.state(), StateId::Running);
    assert!(rig.hw.motor_on());
    assert_eq!(rig.hw.resets, resets_before);

    rig.tick(30_080);
    assert_eq!(rig.app.snapshot().current_count, 3);
}

#[test]
fn resume_after_long_pause_does_not_trip_the_stall_watchdog() {
    let mut rig = Rig::new(10, 5);
    rig.cmd(AppCommand::Start, 0);
    rig.cmd(AppCommand::Stop, 100);
    rig.cmd(AppCommand::Start, 60_000);
    rig.tick(60_000 + NO_PULSE_TIMEOUT_MS);
    assert_eq!(rig.app.state(), StateId::Running);
    rig.tick(60_000 + NO_PULSE_TIMEOUT_MS + 1);
    assert_eq!(rig.app.state(), StateId::Error);
}

#[test]
fn stopped_reset_clears_count() {
    let mut rig = Rig::new(10, 5);
    rig.cmd(AppCommand::Start, 0);
    rig.hw.edges_every_ms(10, 10, 4);
    rig.tick(80);
    rig.cmd(AppCommand::Stop, 100);
    rig.cmd(AppCommand::Reset, 200);
    assert_eq!(rig.app.state(), StateId::Idle);
    assert_eq!(rig.hw.count(), 0);
    assert_eq!(rig.app.snapshot().current_count, 0);
}

#[test]
fn reset_in_idle_discards_stray_pulses() {
    let mut rig = Rig::new(10, 5);
    rig.hw.edges_every_ms(10, 10, 3);
    rig.tick(80);
    assert_eq!(rig.app.snapshot().current_count, 3);
    rig.cmd(AppCommand::Reset, 100);
    assert_eq!(rig.app.state(), StateId::Idle);
    assert_eq!(rig.app.snapshot().current_count, 0);
}

// ── Stall fault ───────────────────────────────────────────────

#[test]
fn silence_longer_than_timeout_latches_error() {
    let mut rig = Rig::new(10, 5);
    rig.cmd(AppCommand::Start, 0);
    rig.hw.edge(1_000_000);
    rig.tick(1_000);
    assert_eq!(rig.app.snapshot().current_count, 1);

    // Last pulse seen at the 1 000 ms tick.
    rig.tick(1_000 + NO_PULSE_TIMEOUT_MS);
    assert_eq!(rig.app.state(), StateId::Running);
    rig.tick(1_000 + NO_PULSE_TIMEOUT_MS + 1);

    assert_eq!(rig.app.state(), StateId::Error);
    assert!(!rig.hw.motor_on());
    let snap = rig.app.snapshot();
    assert_eq!(snap.state_label, "ERROR");
    assert_eq!(snap.error_message.as_str(), "no pulses detected, check sensor/belt");
    assert!(rig.sink.events.contains(&AppEvent::FaultRaised(Fault::SensorStall)));
}

#[test]
fn error_accepts_only_reset() {
    let mut rig = Rig::new(10, 5);
    rig.stall_into_error();

    for (i, cmd) in [
        AppCommand::Start,
        AppCommand::Stop,
        AppCommand::Acknowledge,
        AppCommand::OpenSettings,
    ]
    .into_iter()
    .enumerate()
    {
        rig.cmd(cmd, 6_000 + i as u32);
        assert_eq!(rig.app.state(), StateId::Error);
        assert!(!rig.hw.motor_on());
    }
    assert!(!rig.app.settings_open());

    // Pulses arriving while in Error change nothing.
    rig.hw.edges_every_ms(7_000, 10, 5);
    for k in 1..20u32 {
        rig.tick(7_000 + k * CONTROL_TICK_MS);
    }
    assert_eq!(rig.app.state(), StateId::Error);

    rig.cmd(AppCommand::Reset, 9_000);
    assert_eq!(rig.app.state(), StateId::Idle);
    assert!(!rig.hw.motor_on());
    assert!(rig.app.snapshot().error_message.is_empty());
    assert_eq!(rig.app.snapshot().current_count, 0);
    assert!(rig.sink.events.contains(&AppEvent::FaultCleared));
}

#[test]
fn machine_can_run_again_after_error_reset() {
    let mut rig = Rig::new(2, 5);
    rig.stall_into_error();
    rig.cmd(AppCommand::Reset, 6_000);
    rig.cmd(AppCommand::Start, 6_100);
    rig.hw.edges_every_ms(6_200, 10, 2);
    rig.tick(6_300);
    assert_eq!(rig.app.state(), StateId::Done);
}

// ── Telemetry / snapshot ──────────────────────────────────────

#[test]
fn snapshot_refreshes_every_tick() {
    let mut rig = Rig::new(8, 5);
    rig.cmd(AppCommand::Start, 0);
    for i in 1..=4u32 {
        rig.hw.edge(i * 80_000);
        rig.tick(i * 80);
        let snap = rig.app.snapshot();
        assert_eq!(snap.current_count, i);
        assert_eq!(snap.target_count, 8);
        assert_eq!(snap.progress_percent, (i * 100 / 8) as u8);
        assert!(snap.motor_on);
        assert_eq!(snap.state, StateId::Running);
    }
}

#[test]
fn status_command_emits_current_snapshot() {
    let mut rig = Rig::new(8, 5);
    rig.cmd(AppCommand::Status, 10);
    let last = rig.sink.events.last().cloned();
    assert!(matches!(last, Some(AppEvent::Telemetry(s)) if s.state == StateId::Idle && s.target_count == 8));
}
