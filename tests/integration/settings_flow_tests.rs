//! Settings edit session, persistence and reload.

use crate::mock_hw::{MockHardware, MockStore, RecordingSink, Stored};

use spoolcount::adapters::settings::{KEY_DEBOUNCE, KEY_TARGET, SettingsRepository};
use spoolcount::app::commands::{AppCommand, SettingsInput};
use spoolcount::app::events::AppEvent;
use spoolcount::app::ports::{ParamsPort, SettingsError, StorageError};
use spoolcount::app::service::AppService;
use spoolcount::config::{BoardConfig, NO_PULSE_TIMEOUT_MS, OperatingParameters};
use spoolcount::fsm::StateId;

fn boot(store: MockStore) -> (AppService, MockHardware, SettingsRepository<MockStore>, RecordingSink) {
    let settings = SettingsRepository::new(store);
    let params = settings.load();
    let mut app = AppService::new(params, &BoardConfig::default());
    let mut hw = MockHardware::new(params.debounce_ms());
    let mut sink = RecordingSink::new();
    app.start(0, &mut hw, &mut sink);
    (app, hw, settings, sink)
}

fn confirm(target: u64, debounce_ms: u64) -> AppCommand {
    AppCommand::ConfirmSettings(SettingsInput::from_values(target, debounce_ms))
}

#[test]
fn out_of_range_entry_is_clamped_persisted_and_applied() {
    let (mut app, mut hw, mut settings, mut sink) = boot(MockStore::new());

    app.handle_command(AppCommand::OpenSettings, 10, &mut hw, &mut settings, &mut sink);
    assert!(app.settings_open());
    assert_eq!(app.snapshot().settings_draft, Some(OperatingParameters::default()));

    app.handle_command(confirm(0, 500), 20, &mut hw, &mut settings, &mut sink);

    let expected = OperatingParameters::clamped(1, 100);
    assert!(!app.settings_open());
    assert_eq!(app.params(), expected);
    assert_eq!(app.snapshot().target_count, 1);
    assert_eq!(hw.debounce_ms(), 100);
    assert_eq!(settings.store().values.get(KEY_TARGET), Some(&Stored::U32(1)));
    assert_eq!(settings.store().values.get(KEY_DEBOUNCE), Some(&Stored::U16(100)));
    assert_eq!(settings.store().commits, 1);
    assert!(sink.events.contains(&AppEvent::SettingsApplied(expected)));
}

#[test]
fn text_entry_goes_through_the_same_clamp() {
    let (mut app, mut hw, mut settings, mut sink) = boot(MockStore::new());
    app.handle_command(AppCommand::OpenSettings, 10, &mut hw, &mut settings, &mut sink);
    let input = SettingsInput::from_text("  +250abc", "-3");
    app.handle_command(AppCommand::ConfirmSettings(input), 20, &mut hw, &mut settings, &mut sink);
    assert_eq!(app.params(), OperatingParameters::clamped(250, 1));
}

#[test]
fn save_failure_keeps_the_editor_open_and_old_params_active() {
    let (mut app, mut hw, mut settings, mut sink) = boot(MockStore::new());
    let before = app.params();

    settings.store_mut().fail_commit = Some(StorageError::Full);
    app.handle_command(AppCommand::OpenSettings, 10, &mut hw, &mut settings, &mut sink);
    app.handle_command(confirm(50, 8), 20, &mut hw, &mut settings, &mut sink);

    assert!(app.settings_open());
    assert_eq!(app.params(), before);
    assert_eq!(hw.debounce_ms(), before.debounce_ms());
    assert_eq!(
        app.snapshot().settings_draft,
        Some(OperatingParameters::clamped(50, 8))
    );
    assert!(sink.events.contains(&AppEvent::SettingsSaveFailed(SettingsError::Storage(
        StorageError::Full
    ))));

    // Retry once the store recovers.
    settings.store_mut().fail_commit = None;
    app.handle_command(confirm(50, 8), 30, &mut hw, &mut settings, &mut sink);
    assert!(!app.settings_open());
    assert_eq!(app.params(), OperatingParameters::clamped(50, 8));
    assert_eq!(hw.debounce_ms(), 8);
}

#[test]
fn cancel_after_failed_commit_leaves_only_active_values_in_flash() {
    let (mut app, mut hw, mut settings, mut sink) = boot(MockStore::new());
    let active = app.params();

    // Both puts land, then the commit fails.
    settings.store_mut().fail_commit = Some(StorageError::Full);
    app.handle_command(AppCommand::OpenSettings, 10, &mut hw, &mut settings, &mut sink);
    app.handle_command(confirm(50, 8), 20, &mut hw, &mut settings, &mut sink);
    app.handle_command(AppCommand::CancelSettings, 30, &mut hw, &mut settings, &mut sink);

    assert!(!app.settings_open());
    assert_eq!(app.params(), active);

    // Power cycle: what boots must be what was running.
    let (rebooted, _, _, _) = boot(settings.store().clone());
    assert_eq!(rebooted.params(), active);
}

#[test]
fn failed_write_back_is_retried_once_the_store_recovers() {
    let (mut app, mut hw, mut settings, mut sink) = boot(MockStore::new());
    let active = app.params();

    settings.store_mut().fail_commit = Some(StorageError::IoError);
    app.handle_command(AppCommand::OpenSettings, 10, &mut hw, &mut settings, &mut sink);
    app.handle_command(confirm(50, 8), 20, &mut hw, &mut settings, &mut sink);
    assert_eq!(settings.store().commits, 0);

    settings.store_mut().fail_commit = None;
    app.handle_command(AppCommand::CancelSettings, 30, &mut hw, &mut settings, &mut sink);
    assert_eq!(settings.store().commits, 1);
    assert_eq!(settings.load(), active);

    // Nothing left to restore: later commands do not write again.
    app.handle_command(AppCommand::Status, 40, &mut hw, &mut settings, &mut sink);
    assert_eq!(settings.store().commits, 1);
}

#[test]
fn put_failure_surfaces_the_storage_error() {
    let (mut app, mut hw, mut settings, mut sink) = boot(MockStore::new());
    settings.store_mut().fail_puts = Some(StorageError::IoError);
    app.handle_command(AppCommand::OpenSettings, 10, &mut hw, &mut settings, &mut sink);
    app.handle_command(confirm(50, 8), 20, &mut hw, &mut settings, &mut sink);
    assert_eq!(
        sink.count_where(|e| matches!(e, AppEvent::SettingsSaveFailed(_))),
        1
    );
    assert_eq!(settings.store().commits, 0);
}

#[test]
fn cancel_discards_the_draft() {
    let (mut app, mut hw, mut settings, mut sink) = boot(MockStore::new());
    app.handle_command(AppCommand::OpenSettings, 10, &mut hw, &mut settings, &mut sink);
    app.handle_command(AppCommand::CancelSettings, 20, &mut hw, &mut settings, &mut sink);
    assert!(!app.settings_open());

    // A confirm with no open editor is ignored.
    app.handle_command(confirm(42, 9), 30, &mut hw, &mut settings, &mut sink);
    assert_eq!(app.params(), OperatingParameters::default());
    assert_eq!(settings.store().commits, 0);
}

#[test]
fn editor_cannot_open_while_running_or_in_error() {
    let (mut app, mut hw, mut settings, mut sink) = boot(MockStore::new());
    app.handle_command(AppCommand::Start, 0, &mut hw, &mut settings, &mut sink);
    app.handle_command(AppCommand::OpenSettings, 10, &mut hw, &mut settings, &mut sink);
    assert!(!app.settings_open());

    app.tick(NO_PULSE_TIMEOUT_MS + 1, &mut hw, &mut sink);
    assert_eq!(app.state(), StateId::Error);
    app.handle_command(AppCommand::OpenSettings, 6_000, &mut hw, &mut settings, &mut sink);
    assert!(!app.settings_open());
}

#[test]
fn editor_opens_in_stopped_and_done() {
    let (mut app, mut hw, mut settings, mut sink) = boot(MockStore::new());
    app.handle_command(AppCommand::Start, 0, &mut hw, &mut settings, &mut sink);
    app.handle_command(AppCommand::Stop, 10, &mut hw, &mut settings, &mut sink);
    app.handle_command(AppCommand::OpenSettings, 20, &mut hw, &mut settings, &mut sink);
    assert!(app.settings_open());
    app.handle_command(AppCommand::CancelSettings, 30, &mut hw, &mut settings, &mut sink);

    app.handle_command(confirm(1, 5), 40, &mut hw, &mut settings, &mut sink);
    assert!(!app.settings_open(), "confirm without an open editor");

    app.handle_command(AppCommand::OpenSettings, 50, &mut hw, &mut settings, &mut sink);
    app.handle_command(confirm(1, 5), 60, &mut hw, &mut settings, &mut sink);
    app.handle_command(AppCommand::Start, 70, &mut hw, &mut settings, &mut sink);
    hw.edge(100_000);
    app.tick(160, &mut hw, &mut sink);
    assert_eq!(app.state(), StateId::Done);

    app.handle_command(AppCommand::OpenSettings, 200, &mut hw, &mut settings, &mut sink);
    assert!(app.settings_open());
}

#[test]
fn start_closes_an_open_editor() {
    let (mut app, mut hw, mut settings, mut sink) = boot(MockStore::new());
    app.handle_command(AppCommand::OpenSettings, 10, &mut hw, &mut settings, &mut sink);
    app.handle_command(AppCommand::Start, 20, &mut hw, &mut settings, &mut sink);
    assert_eq!(app.state(), StateId::Running);
    assert!(!app.settings_open());
    assert_eq!(app.snapshot().settings_draft, None);
}

#[test]
fn new_target_applies_to_the_next_batch() {
    let (mut app, mut hw, mut settings, mut sink) = boot(MockStore::new());
    app.handle_command(AppCommand::OpenSettings, 10, &mut hw, &mut settings, &mut sink);
    app.handle_command(confirm(3, 5), 20, &mut hw, &mut settings, &mut sink);
    app.handle_command(AppCommand::Start, 30, &mut hw, &mut settings, &mut sink);

    hw.edges_every_ms(40, 10, 2);
    app.tick(80, &mut hw, &mut sink);
    assert_eq!(app.state(), StateId::Running);
    hw.edge(90_000);
    app.tick(160, &mut hw, &mut sink);
    assert_eq!(app.state(), StateId::Done);
}

#[test]
fn saved_values_survive_a_reboot() {
    let (mut app, mut hw, mut settings, mut sink) = boot(MockStore::new());
    app.handle_command(AppCommand::OpenSettings, 10, &mut hw, &mut settings, &mut sink);
    app.handle_command(confirm(777, 12), 20, &mut hw, &mut settings, &mut sink);

    // Power cycle: same flash contents, fresh everything else.
    let flash = settings.store().clone();
    let (app2, hw2, _, _) = boot(flash);
    assert_eq!(app2.params(), OperatingParameters::clamped(777, 12));
    assert_eq!(app2.snapshot().target_count, 777);
    assert_eq!(hw2.debounce_ms(), 12);
}

#[test]
fn stored_values_load_at_boot() {
    let store = MockStore::new()
        .with_u32(KEY_TARGET, 2_000_000)
        .with_u16(KEY_DEBOUNCE, 0);
    let (app, _, _, _) = boot(store);
    assert_eq!(app.params(), OperatingParameters::clamped(999_999, 1));
}

#[test]
fn unreadable_store_falls_back_to_defaults() {
    let mut store = MockStore::new().with_u32(KEY_TARGET, 50);
    store.fail_reads = Some(StorageError::Unavailable);
    let settings = SettingsRepository::new(store);
    assert_eq!(settings.load(), OperatingParameters::default());
}
