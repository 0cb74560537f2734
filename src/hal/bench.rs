//! Host-side collaborators for running the transmitter on a bench
//!
//! Pin levels come from the `[bench]` configuration section, displays and
//! session hooks report through `tracing`.

use std::time::Instant;
use tracing::info;

use super::{Clock, CommandSession, InputPins, StatusDisplay, ANALOG_PINS, DIGITAL_PINS};
use crate::config::BenchConfig;
use crate::transmitter::status::StatusCode;

/// Fixed pin levels taken from the bench configuration
#[derive(Debug, Clone)]
pub struct BenchInputs {
    digital: [bool; DIGITAL_PINS],
    analog: [u16; ANALOG_PINS],
}

impl BenchInputs {
    /// Pins not listed in the configuration read low / 0.
    pub fn from_config(bench: &BenchConfig) -> Self {
        let mut digital = [false; DIGITAL_PINS];
        for &pin in &bench.digital_high {
            if let Some(level) = digital.get_mut(pin as usize) {
                *level = true;
            }
        }

        let mut analog = [0; ANALOG_PINS];
        for (slot, &value) in analog.iter_mut().zip(&bench.analog) {
            *slot = value.min(1023);
        }

        Self { digital, analog }
    }
}

impl InputPins for BenchInputs {
    fn digital_read(&mut self, pin: u8) -> bool {
        self.digital.get(pin as usize).copied().unwrap_or(false)
    }

    fn analog_read(&mut self, pin: u8) -> u16 {
        self.analog.get(pin as usize).copied().unwrap_or(0)
    }
}

/// Millisecond clock relative to its creation, wrapping at 2^32
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    start: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn millis(&self) -> u32 {
        // Truncation is the wrap-around
        self.start.elapsed().as_millis() as u32
    }
}

/// Status display that logs every new code
#[derive(Debug, Clone)]
pub struct LogDisplay {
    name: &'static str,
}

impl LogDisplay {
    pub fn new(name: &'static str) -> Self {
        Self { name }
    }
}

impl StatusDisplay for LogDisplay {
    fn set_code(&mut self, code: StatusCode, repeat: u8, on_duration_ms: u16) {
        info!(
            "{} shows code '{}' (repeat {}, {}ms)",
            self.name, code, repeat, on_duration_ms
        );
    }
}

/// Command session hooks that only log
#[derive(Debug, Clone, Default)]
pub struct LogSession;

impl CommandSession for LogSession {
    fn on_enter_session(&mut self) {
        info!("Command session opened");
    }

    fn on_exit_session(&mut self) {
        info!("Command session closed");
    }
}
