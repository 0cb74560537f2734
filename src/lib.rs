//! # RC Transmitter Library
//!
//! Turns a pilot's potentiometers and switches into servo pulse widths,
//! with throttle arming and low battery safety checks.
//!
//! The [`transmitter::Transmitter`] runs once per scheduler tick: it reads
//! the controls, shapes each channel (dual rate, expo, subtrim, end points,
//! reverse) and publishes a complete pulse frame to a [`output::PulseOutput`]
//! that keeps re-emitting it between ticks.

pub mod config;
pub mod error;
pub mod hal;
pub mod output;
pub mod settings;
pub mod transmitter;
