//! # Hardware Abstraction
//!
//! Trait seams between the transmitter core and the hardware it runs on:
//! pin inputs, the millisecond clock, status displays (led, buzzer) and the
//! command session hooks.
//!
//! Host-side implementations used by the bench binary live in [`bench`].

use crate::transmitter::status::StatusCode;

pub mod bench;

/// Number of digital pins addressable through [`InputPins`].
pub const DIGITAL_PINS: usize = 14;

/// Number of analog pins addressable through [`InputPins`].
pub const ANALOG_PINS: usize = 8;

/// Raw pin inputs.
///
/// Switches are wired with pull-up resistors: an open switch reads high.
pub trait InputPins: Send {
    /// Read a digital pin level.
    fn digital_read(&mut self, pin: u8) -> bool;

    /// Read a 10-bit analog pin value (0-1023).
    ///
    /// A conversion takes about 100 microseconds on the target, which bounds
    /// how many samples a tick can afford.
    fn analog_read(&mut self, pin: u8) -> u16;
}

/// Monotonic millisecond counter that wraps around on overflow.
pub trait Clock {
    /// Milliseconds since start, modulo 2^32.
    fn millis(&self) -> u32;
}

/// Status code output (led, buzzer).
#[cfg_attr(test, mockall::automock)]
pub trait StatusDisplay: Send {
    /// Play `code`, repeated `repeat` times with `on_duration_ms` long marks.
    fn set_code(&mut self, code: StatusCode, repeat: u8, on_duration_ms: u16);
}

/// Hooks of the interactive configuration session.
#[cfg_attr(test, mockall::automock)]
pub trait CommandSession: Send {
    /// Called once when the transmitter enters command mode.
    fn on_enter_session(&mut self);

    /// Called once when the transmitter leaves command mode.
    fn on_exit_session(&mut self);
}
