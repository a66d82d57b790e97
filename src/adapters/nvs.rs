//! NVS (Non-Volatile Storage) adapter.
//!
//! Implements [`SettingsStore`] over one ESP-IDF NVS namespace.  Only
//! fixed-width unsigned integers are stored, so there is no blob codec:
//! `nvs_get_u32` / `nvs_set_u16` map straight onto the port.
//!
//! - On target the namespace handle is opened once and kept for the
//!   lifetime of the adapter; `commit()` flushes it.
//! - On host an in-memory map stands in, with the same type-mismatch
//!   behaviour as real NVS (a key written as u16 cannot be read as u32).
//! - If NVS cannot be opened at boot the adapter is *detached*: every
//!   call returns [`StorageError::Unavailable`] and the settings layer
//!   falls back to defaults.

use crate::app::ports::{SettingsStore, StorageError};
use log::{info, warn};

#[cfg(not(target_os = "espidf"))]
use std::collections::HashMap;

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

/// NVS namespace for all SpoolCount settings (max 15 chars).
pub const SETTINGS_NAMESPACE: &str = "spoolcnt";

/// NVS keys and namespaces are limited to 15 bytes + NUL.
const NVS_KEY_BUF: usize = 16;

// Bindgen emits the error codes as u32; calls return esp_err_t.
#[cfg(target_os = "espidf")]
const OK: esp_err_t = ESP_OK as esp_err_t;
#[cfg(target_os = "espidf")]
const NOT_FOUND: esp_err_t = ESP_ERR_NVS_NOT_FOUND as esp_err_t;
#[cfg(target_os = "espidf")]
const TYPE_MISMATCH: esp_err_t = ESP_ERR_NVS_TYPE_MISMATCH as esp_err_t;
#[cfg(target_os = "espidf")]
const NOT_ENOUGH_SPACE: esp_err_t = ESP_ERR_NVS_NOT_ENOUGH_SPACE as esp_err_t;
#[cfg(target_os = "espidf")]
const INVALID_HANDLE: esp_err_t = ESP_ERR_NVS_INVALID_HANDLE as esp_err_t;

#[cfg(not(target_os = "espidf"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SimValue {
    U16(u16),
    U32(u32),
}

pub struct NvsStore {
    #[cfg(target_os = "espidf")]
    handle: Option<nvs_handle_t>,
    #[cfg(not(target_os = "espidf"))]
    store: Option<HashMap<String, SimValue>>,
    commits: u32,
}

/// NUL-terminated copy of `s`, truncated to the NVS key limit.
fn c_key(s: &str) -> [u8; NVS_KEY_BUF] {
    let mut buf = [0u8; NVS_KEY_BUF];
    let bytes = s.as_bytes();
    let len = bytes.len().min(NVS_KEY_BUF - 1);
    buf[..len].copy_from_slice(&bytes[..len]);
    buf
}

impl NvsStore {
    /// Initialise NVS flash and open `namespace` read-write.
    ///
    /// On first boot or after a version mismatch the NVS partition is
    /// erased and re-initialised automatically.
    #[cfg(target_os = "espidf")]
    pub fn open(namespace: &str) -> Result<Self, StorageError> {
        // SAFETY: nvs_flash_init / nvs_flash_erase / nvs_open are called
        // from the single main-task context before any other NVS access.
        unsafe {
            let ret = nvs_flash_init();
            if ret == ESP_ERR_NVS_NO_FREE_PAGES as esp_err_t
                || ret == ESP_ERR_NVS_NEW_VERSION_FOUND as esp_err_t
            {
                warn!("NVS: erasing and re-initialising flash partition");
                if nvs_flash_erase() != OK || nvs_flash_init() != OK {
                    return Err(StorageError::Unavailable);
                }
            } else if ret != OK {
                return Err(StorageError::Unavailable);
            }

            let ns = c_key(namespace);
            let mut handle: nvs_handle_t = 0;
            let ret = nvs_open(
                ns.as_ptr() as *const _,
                nvs_open_mode_t_NVS_READWRITE,
                &mut handle,
            );
            if ret != OK {
                warn!("NVS: open '{}' failed ({})", namespace, ret);
                return Err(StorageError::Unavailable);
            }
            info!("NvsStore: namespace '{}' open", namespace);
            Ok(Self {
                handle: Some(handle),
                commits: 0,
            })
        }
    }

    /// Simulation backend: an empty in-memory namespace.
    #[cfg(not(target_os = "espidf"))]
    pub fn open(namespace: &str) -> Result<Self, StorageError> {
        info!("NvsStore: simulation backend for '{}'", namespace);
        Ok(Self {
            store: Some(HashMap::new()),
            commits: 0,
        })
    }

    /// A store that failed to open.  Every operation reports `Unavailable`.
    pub fn detached() -> Self {
        warn!("NvsStore: running detached, settings will not persist");
        Self {
            #[cfg(target_os = "espidf")]
            handle: None,
            #[cfg(not(target_os = "espidf"))]
            store: None,
            commits: 0,
        }
    }

    /// Number of successful commits (diagnostics).
    pub fn commit_count(&self) -> u32 {
        self.commits
    }

    #[cfg(target_os = "espidf")]
    fn handle(&self) -> Result<nvs_handle_t, StorageError> {
        self.handle.ok_or(StorageError::Unavailable)
    }

    #[cfg(not(target_os = "espidf"))]
    fn map(&self) -> Result<&HashMap<String, SimValue>, StorageError> {
        self.store.as_ref().ok_or(StorageError::Unavailable)
    }

    #[cfg(not(target_os = "espidf"))]
    fn map_mut(&mut self) -> Result<&mut HashMap<String, SimValue>, StorageError> {
        self.store.as_mut().ok_or(StorageError::Unavailable)
    }
}

/// Map an NVS return code to the port error.
#[cfg(target_os = "espidf")]
fn storage_error(ret: esp_err_t) -> StorageError {
    match ret {
        NOT_FOUND => StorageError::NotFound,
        TYPE_MISMATCH => StorageError::TypeMismatch,
        NOT_ENOUGH_SPACE => StorageError::Full,
        INVALID_HANDLE => StorageError::Unavailable,
        _ => StorageError::IoError,
    }
}

#[cfg(target_os = "espidf")]
impl SettingsStore for NvsStore {
    fn get_u32(&self, key: &str) -> Result<Option<u32>, StorageError> {
        let handle = self.handle()?;
        let k = c_key(key);
        let mut value: u32 = 0;
        // SAFETY: handle is open; key buffer is NUL-terminated.
        let ret = unsafe { nvs_get_u32(handle, k.as_ptr() as *const _, &mut value) };
        match ret {
            OK => Ok(Some(value)),
            NOT_FOUND => Ok(None),
            e => Err(storage_error(e)),
        }
    }

    fn get_u16(&self, key: &str) -> Result<Option<u16>, StorageError> {
        let handle = self.handle()?;
        let k = c_key(key);
        let mut value: u16 = 0;
        // SAFETY: as above.
        let ret = unsafe { nvs_get_u16(handle, k.as_ptr() as *const _, &mut value) };
        match ret {
            OK => Ok(Some(value)),
            NOT_FOUND => Ok(None),
            e => Err(storage_error(e)),
        }
    }

    fn put_u32(&mut self, key: &str, value: u32) -> Result<(), StorageError> {
        let handle = self.handle()?;
        let k = c_key(key);
        // SAFETY: as above.
        let ret = unsafe { nvs_set_u32(handle, k.as_ptr() as *const _, value) };
        if ret != OK {
            return Err(storage_error(ret));
        }
        Ok(())
    }

    fn put_u16(&mut self, key: &str, value: u16) -> Result<(), StorageError> {
        let handle = self.handle()?;
        let k = c_key(key);
        // SAFETY: as above.
        let ret = unsafe { nvs_set_u16(handle, k.as_ptr() as *const _, value) };
        if ret != OK {
            return Err(storage_error(ret));
        }
        Ok(())
    }

    fn commit(&mut self) -> Result<(), StorageError> {
        let handle = self.handle()?;
        // SAFETY: handle is open.
        let ret = unsafe { nvs_commit(handle) };
        if ret != OK {
            return Err(storage_error(ret));
        }
        self.commits = self.commits.wrapping_add(1);
        Ok(())
    }
}

#[cfg(not(target_os = "espidf"))]
impl SettingsStore for NvsStore {
    fn get_u32(&self, key: &str) -> Result<Option<u32>, StorageError> {
        match self.map()?.get(key) {
            None => Ok(None),
            Some(SimValue::U32(v)) => Ok(Some(*v)),
            Some(SimValue::U16(_)) => Err(StorageError::TypeMismatch),
        }
    }

    fn get_u16(&self, key: &str) -> Result<Option<u16>, StorageError> {
        match self.map()?.get(key) {
            None => Ok(None),
            Some(SimValue::U16(v)) => Ok(Some(*v)),
            Some(SimValue::U32(_)) => Err(StorageError::TypeMismatch),
        }
    }

    fn put_u32(&mut self, key: &str, value: u32) -> Result<(), StorageError> {
        self.map_mut()?.insert(key.to_owned(), SimValue::U32(value));
        Ok(())
    }

    fn put_u16(&mut self, key: &str, value: u16) -> Result<(), StorageError> {
        self.map_mut()?.insert(key.to_owned(), SimValue::U16(value));
        Ok(())
    }

    fn commit(&mut self) -> Result<(), StorageError> {
        self.map()?;
        self.commits = self.commits.wrapping_add(1);
        Ok(())
    }
}

#[cfg(target_os = "espidf")]
impl Drop for NvsStore {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            // SAFETY: handle was returned by nvs_open and is closed once.
            unsafe { nvs_close(handle) };
        }
    }
}
