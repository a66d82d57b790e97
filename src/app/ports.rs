//! Port traits — the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ AppService (domain)
//! ```
//!
//! Driven adapters (pulse handoff, motor, event sinks, settings storage)
//! implement these traits.  The [`AppService`](super::service::AppService)
//! consumes them via generics, so the domain core never touches hardware
//! directly.
//!
//! ## Contract notes
//!
//! - **PulseSource** implementations are called from the main context only.
//!   The ISR writes the counter directly; it never goes through a port.
//! - **ParamsPort::save** receives already-clamped values; it persists both
//!   fields or reports an error so the caller can retry.
//! - All port errors are typed — callers must handle every variant explicitly.

use crate::config::OperatingParameters;

use super::commands::AppCommand;
use super::events::{AppEvent, PresentationSnapshot};

// ───────────────────────────────────────────────────────────────
// Pulse source port (driven adapter: counter handoff → domain)
// ───────────────────────────────────────────────────────────────

/// Main-context view of the interrupt-fed pulse counter.
pub trait PulseSource {
    /// Torn-free read of the accepted-pulse count.
    fn read_count(&self) -> u32;

    /// Zero the counter.  The service only calls this while not Running.
    fn reset_count(&mut self);

    /// Publish a new debounce interval to the interrupt side.
    fn apply_debounce_ms(&mut self, ms: u16);
}

// ───────────────────────────────────────────────────────────────
// Motor port (driven adapter: domain → hardware)
// ───────────────────────────────────────────────────────────────

/// Write-side port for the single motor enable output.
pub trait MotorPort {
    /// Idempotent: writing the same value twice is a no-op electrically.
    fn set_motor(&mut self, on: bool);

    /// Last commanded motor state.
    fn is_motor_on(&self) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`]s through this port.  Adapters
/// decide where they go (serial log, test recorder, ...).
pub trait EventSink {
    fn emit(&mut self, event: &AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Operator UI port (driving adapter: operator ↔ domain)
// ───────────────────────────────────────────────────────────────

/// The operator surface.  The display toolkit lives behind this trait;
/// the firmware only hands it snapshots and polls it for commands.
pub trait UiPort {
    /// Render the latest snapshot.  Called after every control tick.
    fn present(&mut self, snapshot: &PresentationSnapshot);

    /// Non-blocking: return a pending operator command, if any.
    fn poll_command(&mut self) -> Option<AppCommand>;
}

// ───────────────────────────────────────────────────────────────
// Settings store port (driven adapter: domain ↔ NVS)
// ───────────────────────────────────────────────────────────────

/// Opaque key-value store for small unsigned integers.
///
/// Namespacing is the implementation's concern; keys are short ASCII
/// strings (`"ziel"`, `"debms"`).  A missing key reads as `Ok(None)`.
pub trait SettingsStore {
    fn get_u32(&self, key: &str) -> Result<Option<u32>, StorageError>;

    fn get_u16(&self, key: &str) -> Result<Option<u16>, StorageError>;

    fn put_u32(&mut self, key: &str, value: u32) -> Result<(), StorageError>;

    fn put_u16(&mut self, key: &str, value: u16) -> Result<(), StorageError>;

    /// Flush staged writes to flash.
    fn commit(&mut self) -> Result<(), StorageError>;
}

// ───────────────────────────────────────────────────────────────
// Operating parameters port (domain ↔ validated persistence)
// ───────────────────────────────────────────────────────────────

/// Loads and persists [`OperatingParameters`].
pub trait ParamsPort {
    /// Never fails visibly: missing or unreadable values fall back to the
    /// defaults, and the result is always within bounds.
    fn load(&self) -> OperatingParameters;

    /// Persist both fields.  `Err` means the caller should retry.
    fn save(&mut self, params: &OperatingParameters) -> Result<(), SettingsError>;
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`SettingsStore`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    /// Requested key does not exist.
    NotFound,
    /// The key exists but holds a different integer width.
    TypeMismatch,
    /// Storage partition is full.
    Full,
    /// Generic I/O error.
    IoError,
    /// The store was never opened (init failed).
    Unavailable,
}

/// Errors from [`ParamsPort::save`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsError {
    /// A put or the commit failed; nothing is known to be durable.
    Storage(StorageError),
}

impl From<StorageError> for SettingsError {
    fn from(e: StorageError) -> Self {
        Self::Storage(e)
    }
}

impl core::fmt::Display for StorageError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "key not found"),
            Self::TypeMismatch => write!(f, "type mismatch"),
            Self::Full => write!(f, "storage full"),
            Self::IoError => write!(f, "I/O error"),
            Self::Unavailable => write!(f, "storage unavailable"),
        }
    }
}

impl core::fmt::Display for SettingsError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Storage(e) => write!(f, "write failed: {e}"),
        }
    }
}
