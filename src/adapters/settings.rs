//! Operating-parameter persistence.
//!
//! Implements [`ParamsPort`] on top of any [`SettingsStore`]:
//!
//! | Field          | Key     | Width |
//! |----------------|---------|-------|
//! | target count   | `ziel`  | u32   |
//! | debounce (ms)  | `debms` | u16   |
//!
//! `load()` never fails: each field independently falls back to its
//! default when missing or unreadable, and every value is clamped.
//! `save()` writes both keys and commits; any failure is reported so the
//! caller keeps the edit open and retries.

use log::{info, warn};

use crate::app::ports::{ParamsPort, SettingsError, SettingsStore};
use crate::config::{DEBOUNCE_MS_DEFAULT, OperatingParameters, TARGET_COUNT_DEFAULT};

pub const KEY_TARGET: &str = "ziel";
pub const KEY_DEBOUNCE: &str = "debms";

pub struct SettingsRepository<S: SettingsStore> {
    store: S,
}

impl<S: SettingsStore> SettingsRepository<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }
}

impl<S: SettingsStore> ParamsPort for SettingsRepository<S> {
    fn load(&self) -> OperatingParameters {
        let target = match self.store.get_u32(KEY_TARGET) {
            Ok(Some(v)) => v,
            Ok(None) => TARGET_COUNT_DEFAULT,
            Err(e) => {
                warn!("Settings: read '{}' failed ({}), using default", KEY_TARGET, e);
                TARGET_COUNT_DEFAULT
            }
        };
        let debounce = match self.store.get_u16(KEY_DEBOUNCE) {
            Ok(Some(v)) => v,
            Ok(None) => DEBOUNCE_MS_DEFAULT,
            Err(e) => {
                warn!("Settings: read '{}' failed ({}), using default", KEY_DEBOUNCE, e);
                DEBOUNCE_MS_DEFAULT
            }
        };

        let params = OperatingParameters::clamped(target.into(), debounce.into());
        if params.target_count() != target || params.debounce_ms() != debounce {
            warn!(
                "Settings: stored values out of range (target={}, debounce={}), clamped",
                target, debounce
            );
        }
        info!(
            "Settings: loaded target={} debounce={} ms",
            params.target_count(),
            params.debounce_ms()
        );
        params
    }

    fn save(&mut self, params: &OperatingParameters) -> Result<(), SettingsError> {
        debug_assert!(params.is_valid());
        self.store.put_u32(KEY_TARGET, params.target_count())?;
        self.store.put_u16(KEY_DEBOUNCE, params.debounce_ms())?;
        self.store.commit()?;
        info!(
            "Settings: saved target={} debounce={} ms",
            params.target_count(),
            params.debounce_ms()
        );
        Ok(())
    }
}
