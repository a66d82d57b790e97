//! Mock adapters for integration tests.
//!
//! `MockHardware` runs the real ISR-side [`PulseCapture`] against its own
//! counter and debounce window, and records every motor write so tests can
//! assert on the full command history without touching GPIO registers.

use spoolcount::app::events::AppEvent;
use spoolcount::app::ports::{EventSink, MotorPort, PulseSource, SettingsStore, StorageError};
use spoolcount::sensors::{DebounceWindow, EdgeVerdict, PulseCapture, PulseCounter};
use std::collections::HashMap;

// ── MockHardware ──────────────────────────────────────────────

pub struct MockHardware {
    counter: &'static PulseCounter,
    window: &'static DebounceWindow,
    capture: PulseCapture<'static>,
    /// Every `set_motor` call, in order.
    pub motor_calls: Vec<bool>,
    motor_on: bool,
    pub resets: u32,
}

#[allow(dead_code)]
impl MockHardware {
    pub fn new(debounce_ms: u16) -> Self {
        // Leaked so the capture can borrow them like the firmware's statics.
        let counter: &'static PulseCounter = Box::leak(Box::new(PulseCounter::new()));
        let window: &'static DebounceWindow = Box::leak(Box::new(DebounceWindow::new(debounce_ms)));
        Self {
            counter,
            window,
            capture: PulseCapture::new(counter, window),
            motor_calls: Vec::new(),
            motor_on: false,
            resets: 0,
        }
    }

    /// Simulate a raw sensor edge at `now_us`, as the ISR would see it.
    pub fn edge(&self, now_us: u32) -> EdgeVerdict {
        self.capture.on_edge(now_us)
    }

    /// Edges at `start_ms + i * gap_ms` for `i in 0..n`.
    pub fn edges_every_ms(&self, start_ms: u32, gap_ms: u32, n: u32) {
        for i in 0..n {
            self.edge((start_ms + i * gap_ms) * 1_000);
        }
    }

    pub fn count(&self) -> u32 {
        self.counter.read()
    }

    pub fn debounce_ms(&self) -> u16 {
        self.window.ms()
    }

    pub fn motor_on(&self) -> bool {
        self.motor_on
    }
}

impl PulseSource for MockHardware {
    fn read_count(&self) -> u32 {
        self.counter.read()
    }

    fn reset_count(&mut self) {
        self.resets += 1;
        self.counter.reset();
    }

    fn apply_debounce_ms(&mut self, ms: u16) {
        self.window.set_ms(ms);
    }
}

impl MotorPort for MockHardware {
    fn set_motor(&mut self, on: bool) {
        self.motor_calls.push(on);
        self.motor_on = on;
    }

    fn is_motor_on(&self) -> bool {
        self.motor_on
    }
}

// ── MockStore ─────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stored {
    U16(u16),
    U32(u32),
}

/// In-memory settings store with injectable failures.
#[derive(Debug, Clone, Default)]
pub struct MockStore {
    pub values: HashMap<String, Stored>,
    /// Every put fails with this error while set.
    pub fail_puts: Option<StorageError>,
    /// Commit fails with this error while set.
    pub fail_commit: Option<StorageError>,
    /// Reads fail with this error while set.
    pub fail_reads: Option<StorageError>,
    pub commits: u32,
}

#[allow(dead_code)]
impl MockStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_u32(mut self, key: &str, v: u32) -> Self {
        self.values.insert(key.to_owned(), Stored::U32(v));
        self
    }

    pub fn with_u16(mut self, key: &str, v: u16) -> Self {
        self.values.insert(key.to_owned(), Stored::U16(v));
        self
    }
}

impl SettingsStore for MockStore {
    fn get_u32(&self, key: &str) -> Result<Option<u32>, StorageError> {
        if let Some(e) = self.fail_reads {
            return Err(e);
        }
        match self.values.get(key) {
            None => Ok(None),
            Some(Stored::U32(v)) => Ok(Some(*v)),
            Some(Stored::U16(_)) => Err(StorageError::TypeMismatch),
        }
    }

    fn get_u16(&self, key: &str) -> Result<Option<u16>, StorageError> {
        if let Some(e) = self.fail_reads {
            return Err(e);
        }
        match self.values.get(key) {
            None => Ok(None),
            Some(Stored::U16(v)) => Ok(Some(*v)),
            Some(Stored::U32(_)) => Err(StorageError::TypeMismatch),
        }
    }

    fn put_u32(&mut self, key: &str, value: u32) -> Result<(), StorageError> {
        if let Some(e) = self.fail_puts {
            return Err(e);
        }
        self.values.insert(key.to_owned(), Stored::U32(value));
        Ok(())
    }

    fn put_u16(&mut self, key: &str, value: u16) -> Result<(), StorageError> {
        if let Some(e) = self.fail_puts {
            return Err(e);
        }
        self.values.insert(key.to_owned(), Stored::U16(value));
        Ok(())
    }

    fn commit(&mut self) -> Result<(), StorageError> {
        if let Some(e) = self.fail_commit {
            return Err(e);
        }
        self.commits += 1;
        Ok(())
    }
}

// ── RecordingSink ─────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<AppEvent>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count_where(&self, f: impl Fn(&AppEvent) -> bool) -> usize {
        self.events.iter().filter(|e| f(e)).count()
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}
