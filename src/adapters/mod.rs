//! Adapters — concrete implementations of the hexagonal port traits.
//!
//! | Adapter     | Implements          | Connects to                  |
//! |-------------|---------------------|------------------------------|
//! | `console`   | UiPort              | Console UART (operator)      |
//! | `hardware`  | PulseSource         | ISR pulse counter / debounce |
//! |             | MotorPort           | Motor enable GPIO            |
//! | `log_sink`  | EventSink           | Serial log output            |
//! | `nvs`       | SettingsStore       | NVS / in-memory store        |
//! | `settings`  | ParamsPort          | any SettingsStore            |
//! | `time`      | —                   | ESP32 system timer           |

pub mod console;
pub mod hardware;
pub mod log_sink;
pub mod nvs;
pub mod settings;
pub mod time;
