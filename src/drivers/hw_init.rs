//! One-shot hardware peripheral initialization.
//!
//! Configures the motor enable output, the pulse sensor input and the
//! GPIO ISR service using raw ESP-IDF sys calls.  Called once from
//! `main()` in this order: motor output (deasserted) → sensor input →
//! ISR service.  On host builds every function is a logged no-op and
//! [`GpioOutput`] records its level in memory.

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

#[cfg(target_os = "espidf")]
use log::info;

use embedded_hal::digital::{ErrorKind, ErrorType, OutputPin};

use crate::config::InputPolarity;

// ── Error types ───────────────────────────────────────────────

/// Errors during one-shot peripheral initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HwInitError {
    GpioConfigFailed(i32),
    IsrInstallFailed(i32),
    IsrHandlerFailed(i32),
    UartInstallFailed(i32),
}

impl core::fmt::Display for HwInitError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::GpioConfigFailed(rc) => write!(f, "GPIO config failed (rc={})", rc),
            Self::IsrInstallFailed(rc) => write!(f, "GPIO ISR service install failed (rc={})", rc),
            Self::IsrHandlerFailed(rc) => write!(f, "GPIO ISR handler add failed (rc={})", rc),
            Self::UartInstallFailed(rc) => write!(f, "UART driver install failed (rc={})", rc),
        }
    }
}

impl core::error::Error for HwInitError {}

/// A GPIO level write was rejected by the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GpioError(pub i32);

impl embedded_hal::digital::Error for GpioError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Other
    }
}

// ── Motor output ──────────────────────────────────────────────

/// Configure `gpio` as a push-pull output and drive `idle_level`
/// immediately, before anything else can assert it.
#[cfg(target_os = "espidf")]
pub fn init_motor_output(gpio: i32, idle_level: bool) -> Result<GpioOutput, HwInitError> {
    let cfg = gpio_config_t {
        pin_bit_mask: 1u64 << gpio,
        mode: gpio_mode_t_GPIO_MODE_OUTPUT,
        pull_up_en: gpio_pullup_t_GPIO_PULLUP_DISABLE,
        pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
        intr_type: gpio_int_type_t_GPIO_INTR_DISABLE,
    };
    // SAFETY: called once from main() before the control loop starts.
    let ret = unsafe { gpio_config(&cfg) };
    if ret != ESP_OK as i32 {
        return Err(HwInitError::GpioConfigFailed(ret));
    }
    let mut out = GpioOutput { gpio, level: !idle_level };
    if let Err(GpioError(rc)) = out.write(idle_level) {
        return Err(HwInitError::GpioConfigFailed(rc));
    }
    info!("hw_init: motor output GPIO{} idle level {}", gpio, u8::from(idle_level));
    Ok(out)
}

#[cfg(not(target_os = "espidf"))]
pub fn init_motor_output(gpio: i32, idle_level: bool) -> Result<GpioOutput, HwInitError> {
    log::info!("hw_init(sim): motor output GPIO{} idle level {}", gpio, u8::from(idle_level));
    Ok(GpioOutput::new(gpio, idle_level))
}

/// Raw single-pin output.  Implements [`OutputPin`] so the motor driver
/// stays hardware-agnostic.
#[derive(Debug)]
pub struct GpioOutput {
    gpio: i32,
    level: bool,
}

impl GpioOutput {
    /// Wrap an already-configured pin.  On host this is the whole "driver".
    pub fn new(gpio: i32, level: bool) -> Self {
        Self { gpio, level }
    }

    pub fn gpio(&self) -> i32 {
        self.gpio
    }

    /// Last level successfully written (`true` = high).
    pub fn level(&self) -> bool {
        self.level
    }

    #[cfg(target_os = "espidf")]
    fn write(&mut self, high: bool) -> Result<(), GpioError> {
        // SAFETY: the pin was configured as an output in init_motor_output();
        // only the main loop owns this handle.
        let ret = unsafe { gpio_set_level(self.gpio, u32::from(high)) };
        if ret != ESP_OK as i32 {
            return Err(GpioError(ret));
        }
        self.level = high;
        Ok(())
    }

    #[cfg(not(target_os = "espidf"))]
    fn write(&mut self, high: bool) -> Result<(), GpioError> {
        self.level = high;
        Ok(())
    }
}

impl ErrorType for GpioOutput {
    type Error = GpioError;
}

impl OutputPin for GpioOutput {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.write(false)
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.write(true)
    }
}

// ── Sensor input ──────────────────────────────────────────────

/// Configure the pulse sensor pin: pull and edge follow the polarity.
#[cfg(target_os = "espidf")]
pub fn init_sensor_input(gpio: i32, polarity: InputPolarity) -> Result<(), HwInitError> {
    let (pull_up_en, pull_down_en) = if polarity.pull_up() {
        (gpio_pullup_t_GPIO_PULLUP_ENABLE, gpio_pulldown_t_GPIO_PULLDOWN_DISABLE)
    } else {
        (gpio_pullup_t_GPIO_PULLUP_DISABLE, gpio_pulldown_t_GPIO_PULLDOWN_ENABLE)
    };
    let cfg = gpio_config_t {
        pin_bit_mask: 1u64 << gpio,
        mode: gpio_mode_t_GPIO_MODE_INPUT,
        pull_up_en,
        pull_down_en,
        intr_type: sensor_edge(polarity),
    };
    // SAFETY: called once from main() before the ISR is registered.
    let ret = unsafe { gpio_config(&cfg) };
    if ret != ESP_OK as i32 {
        return Err(HwInitError::GpioConfigFailed(ret));
    }
    info!("hw_init: sensor input GPIO{} ({:?})", gpio, polarity);
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn init_sensor_input(gpio: i32, polarity: InputPolarity) -> Result<(), HwInitError> {
    log::info!("hw_init(sim): sensor input GPIO{} ({:?})", gpio, polarity);
    Ok(())
}

#[cfg(target_os = "espidf")]
fn sensor_edge(polarity: InputPolarity) -> gpio_int_type_t {
    if polarity.triggers_on_falling_edge() {
        gpio_int_type_t_GPIO_INTR_NEGEDGE
    } else {
        gpio_int_type_t_GPIO_INTR_POSEDGE
    }
}

// ── GPIO ISR Service ──────────────────────────────────────────

#[cfg(target_os = "espidf")]
use crate::sensors::pulse::pulse_isr_handler;

#[cfg(target_os = "espidf")]
unsafe extern "C" fn pulse_gpio_isr(_arg: *mut core::ffi::c_void) {
    // SAFETY: esp_timer_get_time is a timer counter read; safe in ISR context.
    // Truncation to u32 gives the wrapping µs clock the filter expects.
    let now_us = unsafe { esp_timer_get_time() } as u32;
    pulse_isr_handler(now_us);
}

/// Install the per-pin GPIO ISR service and register the pulse handler.
/// Call after [`init_sensor_input`] and after the debounce window has
/// been primed from storage.
#[cfg(target_os = "espidf")]
pub fn init_isr_service(gpio: i32, polarity: InputPolarity) -> Result<(), HwInitError> {
    // SAFETY: gpio_install_isr_service is idempotent; ESP_ERR_INVALID_STATE
    // means it was already installed (acceptable).  The handler is a static
    // function that only touches lock-free atomics.
    unsafe {
        let ret = gpio_install_isr_service(0);
        if ret != ESP_OK as i32 && ret != ESP_ERR_INVALID_STATE as i32 {
            return Err(HwInitError::IsrInstallFailed(ret));
        }

        // Edge type was set by gpio_config() in init_sensor_input().
        let ret = gpio_isr_handler_add(gpio, Some(pulse_gpio_isr), core::ptr::null_mut());
        if ret != ESP_OK as i32 {
            return Err(HwInitError::IsrHandlerFailed(ret));
        }
        let ret = gpio_intr_enable(gpio);
        if ret != ESP_OK as i32 {
            return Err(HwInitError::IsrHandlerFailed(ret));
        }
    }
    info!(
        "hw_init: ISR service installed (pulse sensor GPIO{}, {:?})",
        gpio, polarity
    );
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn init_isr_service(gpio: i32, polarity: InputPolarity) -> Result<(), HwInitError> {
    log::info!("hw_init(sim): ISR service skipped (GPIO{}, {:?})", gpio, polarity);
    Ok(())
}
