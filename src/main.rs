//! SpoolCount Firmware — Main Entry Point
//!
//! Hexagonal architecture: one interrupt source plus a single cooperative
//! control loop.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  HardwareAdapter      LogEventSink   SettingsRepository        │
//! │  (PulseSource+Motor)  (EventSink)    (ParamsPort over NVS)     │
//! │  ConsoleUi            Esp32TimeAdapter                         │
//! │  (UiPort)             (clock)                                  │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │              AppService (pure logic)                   │    │
//! │  │  FSM · Stall watchdog · Settings session               │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! │                                                                │
//! │  Pulse ISR ──atomic──▶ PULSE_COUNTER ◀── Ticker (80 ms)        │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use anyhow::Result;
use esp_idf_hal::delay::FreeRtos;
use log::{error, info};

use spoolcount::adapters::console::ConsoleUi;
use spoolcount::adapters::hardware::HardwareAdapter;
use spoolcount::adapters::log_sink::LogEventSink;
use spoolcount::adapters::nvs::{NvsStore, SETTINGS_NAMESPACE};
use spoolcount::adapters::settings::SettingsRepository;
use spoolcount::adapters::time::Esp32TimeAdapter;
use spoolcount::app::ports::{ParamsPort, UiPort};
use spoolcount::app::service::AppService;
use spoolcount::config::{BoardConfig, CONTROL_TICK_MS, WATCHDOG_TIMEOUT_MS};
use spoolcount::drivers::{hw_init, motor::MotorDriver, watchdog::Watchdog};
use spoolcount::error::Error;
use spoolcount::pins;
use spoolcount::sensors::pulse::{DEBOUNCE_WINDOW, PULSE_COUNTER};
use spoolcount::ticker::Ticker;

/// Main-loop idle between polls.  Well under one control tick so
/// commands are handled promptly.
const LOOP_IDLE_MS: u32 = 5;

// ── Main ──────────────────────────────────────────────────────

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  SpoolCount v{}                      ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    let board = BoardConfig::default();
    let clock = Esp32TimeAdapter::new();

    // ── 2. Motor output first, deasserted ─────────────────────
    let motor_pin = hw_init::init_motor_output(
        pins::MOTOR_ENABLE_GPIO,
        board.motor_polarity.level_for(false),
    )
    .map_err(Error::from)?;
    let motor = MotorDriver::new(motor_pin, board.motor_polarity);

    // ── 3. Operating parameters (defaults on any storage failure) ──
    let store = NvsStore::open(SETTINGS_NAMESPACE).unwrap_or_else(|e| {
        error!("NVS open failed ({}), settings will not persist", e);
        NvsStore::detached()
    });
    let mut settings = SettingsRepository::new(store);
    let params = settings.load();

    // ── 4. Prime the ISR's debounce window, then arm the ISR ──
    DEBOUNCE_WINDOW.set_ms(params.debounce_ms());
    let sensor_ready = hw_init::init_sensor_input(pins::PULSE_SENSOR_GPIO, board.sensor_polarity)
        .and_then(|()| hw_init::init_isr_service(pins::PULSE_SENSOR_GPIO, board.sensor_polarity));
    if let Err(e) = sensor_ready {
        // No pulses will arrive; a started batch stalls into Error.
        error!("Pulse sensor init failed: {}", e);
    }

    // ── 5. Construct adapters ─────────────────────────────────
    let mut hw = HardwareAdapter::new(&PULSE_COUNTER, &DEBOUNCE_WINDOW, motor);
    let mut log_sink = LogEventSink::new();
    let mut ui = ConsoleUi::new(pins::CONSOLE_UART_PORT).map_err(Error::from)?;
    let watchdog = Watchdog::new(WATCHDOG_TIMEOUT_MS);

    // ── 6. Construct app service (enters Idle) ────────────────
    let mut app = AppService::new(params, &board);
    let now = clock.now_ms();
    app.start(now, &mut hw, &mut log_sink);
    ui.present(app.snapshot());

    let mut ticker = Ticker::new(CONTROL_TICK_MS, now);

    info!("System ready. Entering control loop ({} ms tick).", ticker.period_ms());

    // ── 7. Control loop ───────────────────────────────────────
    loop {
        let now = clock.now_ms();

        // Operator commands are synchronous; at most one per pass.
        if let Some(cmd) = ui.poll_command() {
            app.handle_command(cmd, now, &mut hw, &mut settings, &mut log_sink);
            ui.present(app.snapshot());
        }

        if ticker.poll(now) {
            app.tick(now, &mut hw, &mut log_sink);
            ui.present(app.snapshot());
        }

        watchdog.feed();
        FreeRtos::delay_ms(LOOP_IDLE_MS.min(ticker.remaining_ms(clock.now_ms()).max(1)));
    }
}
