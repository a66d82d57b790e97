//! Serial operator console.
//!
//! Stand-in for the touch display: implements [`UiPort`] by reading line
//! commands from the console UART and logging snapshot changes.
//!
//! ```text
//!  UART RX ──▶ rx deque ──▶ line buffer ──'\n'──▶ AppCommand::parse
//! ```
//!
//! Polling never blocks.  Bytes that arrive after a complete line stay in
//! the rx deque for the next poll, so at most one command is returned per
//! call.

use heapless::{Deque, Vec};
use log::{info, warn};

use crate::app::commands::AppCommand;
use crate::app::events::PresentationSnapshot;
use crate::app::ports::UiPort;
#[cfg(target_os = "espidf")]
use crate::drivers::hw_init::HwInitError;

const LINE_CAP: usize = 48;
const RX_CAP: usize = 128;

pub struct ConsoleUi {
    #[cfg(target_os = "espidf")]
    port: i32,
    rx: Deque<u8, RX_CAP>,
    line: Vec<u8, LINE_CAP>,
    /// Set after an overlong line until its terminator is seen.
    discarding: bool,
    last_presented: Option<PresentationSnapshot>,
}

impl ConsoleUi {
    /// Install the UART driver on `port` (RX buffer only, no event queue).
    #[cfg(target_os = "espidf")]
    pub fn new(port: i32) -> Result<Self, HwInitError> {
        use esp_idf_svc::sys::*;
        // SAFETY: called once from main(); ESP_ERR_INVALID_STATE means the
        // driver is already installed, which is fine for reading.
        let ret = unsafe {
            uart_driver_install(port, (RX_CAP * 2) as i32, 0, 0, core::ptr::null_mut(), 0)
        };
        if ret != ESP_OK as i32 && ret != ESP_ERR_INVALID_STATE as i32 {
            return Err(HwInitError::UartInstallFailed(ret));
        }
        info!("Console: UART{} ready", port);
        Ok(Self {
            port,
            rx: Deque::new(),
            line: Vec::new(),
            discarding: false,
            last_presented: None,
        })
    }

    /// Simulation console: input arrives through [`feed`](Self::feed).
    #[cfg(not(target_os = "espidf"))]
    pub fn new() -> Self {
        Self {
            rx: Deque::new(),
            line: Vec::new(),
            discarding: false,
            last_presented: None,
        }
    }

    /// Queue raw input bytes (host simulation and tests).  Bytes beyond
    /// the rx capacity are dropped.
    pub fn feed(&mut self, bytes: &[u8]) {
        for &b in bytes {
            if self.rx.push_back(b).is_err() {
                warn!("Console: rx overflow, input dropped");
                break;
            }
        }
    }

    #[cfg(target_os = "espidf")]
    fn fill_rx(&mut self) {
        let mut buf = [0u8; 32];
        let room = (RX_CAP - self.rx.len()).min(buf.len());
        if room == 0 {
            return;
        }
        // SAFETY: the driver was installed in new(); zero ticks to wait
        // makes this a non-blocking read of at most `room` bytes.
        let n = unsafe {
            esp_idf_svc::sys::uart_read_bytes(self.port, buf.as_mut_ptr().cast(), room as u32, 0)
        };
        if n > 0 {
            self.feed(&buf[..n as usize]);
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn fill_rx(&mut self) {}

    /// Consume buffered bytes until a full line parses or the deque runs dry.
    fn next_command(&mut self) -> Option<AppCommand> {
        while let Some(b) = self.rx.pop_front() {
            match b {
                b'\r' | b'\n' => {
                    if core::mem::take(&mut self.discarding) {
                        self.line.clear();
                        continue;
                    }
                    if self.line.is_empty() {
                        continue;
                    }
                    let cmd = core::str::from_utf8(&self.line)
                        .ok()
                        .and_then(AppCommand::parse);
                    if cmd.is_none() {
                        warn!(
                            "Console: unknown command '{}'",
                            core::str::from_utf8(&self.line).unwrap_or("?")
                        );
                    }
                    self.line.clear();
                    if cmd.is_some() {
                        return cmd;
                    }
                }
                _ if self.discarding => {}
                _ => {
                    if self.line.push(b).is_err() {
                        warn!("Console: line too long, discarded");
                        self.line.clear();
                        self.discarding = true;
                    }
                }
            }
        }
        None
    }
}

#[cfg(not(target_os = "espidf"))]
impl Default for ConsoleUi {
    fn default() -> Self {
        Self::new()
    }
}

impl UiPort for ConsoleUi {
    fn present(&mut self, snapshot: &PresentationSnapshot) {
        if self.last_presented.as_ref() == Some(snapshot) {
            return;
        }
        if snapshot.error_message.is_empty() {
            info!(
                "UI | {:<7} {}/{} ({}%) motor={}",
                snapshot.state_label,
                snapshot.current_count,
                snapshot.target_count,
                snapshot.progress_percent,
                if snapshot.motor_on { "ON" } else { "off" },
            );
        } else {
            info!(
                "UI | {:<7} {}/{} ({}%) ! {}",
                snapshot.state_label,
                snapshot.current_count,
                snapshot.target_count,
                snapshot.progress_percent,
                snapshot.error_message,
            );
        }
        if let Some(draft) = snapshot.settings_draft {
            info!(
                "UI | settings: target={} debounce={}ms  (save <target> <ms> | cancel)",
                draft.target_count(),
                draft.debounce_ms()
            );
        }
        self.last_presented = Some(snapshot.clone());
    }

    fn poll_command(&mut self) -> Option<AppCommand> {
        self.fill_rx();
        self.next_command()
    }
}
