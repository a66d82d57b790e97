//! GPIO pin assignments for the SpoolCount controller board.
//!
//! Single source of truth — every driver references this module rather than
//! hard-coding pin numbers.  Polarity of each signal lives in
//! [`BoardConfig`](crate::config::BoardConfig), not here.

// ---------------------------------------------------------------------------
// Pulse sensor (photo-sensor / proximity switch on the conveyor or winder)
// ---------------------------------------------------------------------------

/// Digital input, interrupt on the edge that matches the sensor polarity.
pub const PULSE_SENSOR_GPIO: i32 = 17;

// ---------------------------------------------------------------------------
// Motor driver
// ---------------------------------------------------------------------------

/// Digital output to the motor driver / contactor enable input.
pub const MOTOR_ENABLE_GPIO: i32 = 18;

// ---------------------------------------------------------------------------
// UART console
// ---------------------------------------------------------------------------

/// UART port used for the operator console (the boot console UART).
pub const CONSOLE_UART_PORT: i32 = 0;
