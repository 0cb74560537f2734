//! # Configuration Module
//!
//! Handles loading and validating the transmitter configuration from TOML
//! files. The settings edited by the pilot (datasets, calibration) live in
//! a separate settings file, see [`crate::settings::storage`].

use serde::de::Error;
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::error::{Result, TxError};
use crate::hal::{ANALOG_PINS, DIGITAL_PINS};

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub scheduler: SchedulerConfig,
    pub safety: SafetyConfig,
    pub pins: PinConfig,
    pub display: DisplayConfig,
    pub model_select: ModelSelectConfig,
    pub storage: StorageConfig,
    #[serde(default)]
    pub bench: BenchConfig,
}

/// Tick scheduling configuration
#[derive(Debug, Deserialize, Clone)]
pub struct SchedulerConfig {
    /// Period of the transmitter refresh, milliseconds
    #[serde(default = "default_tick_period_ms")]
    pub tick_period_ms: u64,

    /// Period at which the last pulse frame is re-emitted, milliseconds
    #[serde(default = "default_frame_period_ms")]
    pub frame_period_ms: u64,
}

/// Safety monitor configuration
#[derive(Debug, Deserialize, Clone)]
pub struct SafetyConfig {
    /// Warm-up sample budget of the throttle check
    #[serde(default = "default_sample_budget")]
    pub throttle_samples: u32,

    /// Warm-up sample budget of the battery check
    #[serde(default = "default_sample_budget")]
    pub battery_samples: u32,

    #[serde(default = "default_battery_check_enabled")]
    pub battery_check_enabled: bool,

    #[serde(default = "default_battery_check_period_ms")]
    pub battery_check_period_ms: u32,

    /// Engaging throttle cut disarms the engine until the throttle is low
    #[serde(default = "default_disarm_on_throttle_cut")]
    pub disarm_on_throttle_cut: bool,
}

/// Pin assignment configuration
///
/// Potentiometer `n` is read from analog pin `n - 1 + pot_pin_offset`,
/// switch `n` from digital pin `n + switch_pin_offset`.
#[derive(Debug, Deserialize, Clone)]
pub struct PinConfig {
    /// Opened = transmission, closed = command mode
    #[serde(default = "default_mode_switch_pin")]
    pub mode_switch: u8,

    /// Opened = throttle cut, closed = throttle enabled
    #[serde(default = "default_throttle_cut_switch_pin")]
    pub throttle_cut_switch: u8,

    /// Opened = dual rate on
    #[serde(default = "default_dual_rate_switch_pin")]
    pub dual_rate_switch: u8,

    /// Opened = explicit dataset, closed = switch dataset
    #[serde(default = "default_model_switch_pin")]
    pub model_switch: u8,

    /// Analog pin behind the battery voltage divider
    #[serde(default = "default_battery_sense_pin")]
    pub battery_sense: u8,

    #[serde(default)]
    pub pot_pin_offset: u8,

    #[serde(default = "default_switch_pin_offset")]
    pub switch_pin_offset: u8,
}

/// Status display configuration
#[derive(Debug, Deserialize, Clone)]
pub struct DisplayConfig {
    #[serde(default = "default_alarm_repeat")]
    pub alarm_repeat: u8,

    #[serde(default = "default_alarm_on_ms")]
    pub alarm_on_ms: u16,

    #[serde(default = "default_mode_repeat")]
    pub mode_repeat: u8,

    #[serde(default = "default_mode_on_ms")]
    pub mode_on_ms: u16,
}

/// How the model switch selects the resident dataset
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ModelSelectStrategy {
    /// Model switch open selects the explicit dataset, closed the switch dataset
    Switch,
    /// Always use the explicit dataset, the model switch is ignored
    Explicit,
}

/// Model selection configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ModelSelectConfig {
    #[serde(default = "default_model_select_strategy")]
    pub strategy: ModelSelectStrategy,
}

/// Settings storage configuration
#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    #[serde(default = "default_settings_path")]
    pub settings_path: String,
}

/// Simulated pin levels for the host bench
#[derive(Debug, Deserialize, Clone, Default)]
pub struct BenchConfig {
    /// Digital pins reading high
    #[serde(default)]
    pub digital_high: Vec<u8>,

    /// Analog pin values, indexed by analog pin number
    #[serde(default)]
    pub analog: Vec<u16>,
}

// Default value functions
fn default_tick_period_ms() -> u64 { 20 }
fn default_frame_period_ms() -> u64 { 20 }

fn default_sample_budget() -> u32 { 31 }
fn default_battery_check_enabled() -> bool { true }
fn default_battery_check_period_ms() -> u32 { 5000 }
fn default_disarm_on_throttle_cut() -> bool { true }

fn default_mode_switch_pin() -> u8 { 9 }
fn default_throttle_cut_switch_pin() -> u8 { 11 }
fn default_dual_rate_switch_pin() -> u8 { 12 }
fn default_model_switch_pin() -> u8 { 8 }
fn default_battery_sense_pin() -> u8 { 7 }
fn default_switch_pin_offset() -> u8 { 1 }

fn default_alarm_repeat() -> u8 { 10 }
fn default_alarm_on_ms() -> u16 { 400 }
fn default_mode_repeat() -> u8 { 3 }
fn default_mode_on_ms() -> u16 { 800 }

fn default_model_select_strategy() -> ModelSelectStrategy { ModelSelectStrategy::Switch }

fn default_settings_path() -> String { "config/settings.toml".to_string() }

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_period_ms: default_tick_period_ms(),
            frame_period_ms: default_frame_period_ms(),
        }
    }
}

impl Default for SafetyConfig {
    fn default() -> Self {
        Self {
            throttle_samples: default_sample_budget(),
            battery_samples: default_sample_budget(),
            battery_check_enabled: default_battery_check_enabled(),
            battery_check_period_ms: default_battery_check_period_ms(),
            disarm_on_throttle_cut: default_disarm_on_throttle_cut(),
        }
    }
}

impl Default for PinConfig {
    fn default() -> Self {
        Self {
            mode_switch: default_mode_switch_pin(),
            throttle_cut_switch: default_throttle_cut_switch_pin(),
            dual_rate_switch: default_dual_rate_switch_pin(),
            model_switch: default_model_switch_pin(),
            battery_sense: default_battery_sense_pin(),
            pot_pin_offset: 0,
            switch_pin_offset: default_switch_pin_offset(),
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            alarm_repeat: default_alarm_repeat(),
            alarm_on_ms: default_alarm_on_ms(),
            mode_repeat: default_mode_repeat(),
            mode_on_ms: default_mode_on_ms(),
        }
    }
}

impl Default for ModelSelectConfig {
    fn default() -> Self {
        Self {
            strategy: default_model_select_strategy(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            settings_path: default_settings_path(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            scheduler: SchedulerConfig::default(),
            safety: SafetyConfig::default(),
            pins: PinConfig::default(),
            display: DisplayConfig::default(),
            model_select: ModelSelectConfig::default(),
            storage: StorageConfig::default(),
            bench: BenchConfig::default(),
        }
    }
}

impl PinConfig {
    /// Analog pin of potentiometer `number` (1-based).
    #[must_use]
    pub fn pot_pin(&self, number: u8) -> u8 {
        number - 1 + self.pot_pin_offset
    }

    /// Digital pin of switch `number` (1-based).
    #[must_use]
    pub fn switch_pin(&self, number: u8) -> u8 {
        number + self.switch_pin_offset
    }
}

fn invalid(message: impl std::fmt::Display) -> TxError {
    TxError::Config(toml::de::Error::custom(message))
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use rc_transmitter::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    pub fn validate(&self) -> Result<()> {
        if self.scheduler.tick_period_ms == 0 || self.scheduler.tick_period_ms > 1000 {
            return Err(invalid("tick_period_ms must be between 1 and 1000"));
        }

        if self.scheduler.frame_period_ms == 0 || self.scheduler.frame_period_ms > 1000 {
            return Err(invalid("frame_period_ms must be between 1 and 1000"));
        }

        // Each analog sample costs ~100us, keep the loops within one tick
        for (name, value) in [
            ("throttle_samples", self.safety.throttle_samples),
            ("battery_samples", self.safety.battery_samples),
        ] {
            if value == 0 || value > 100 {
                return Err(invalid(format!("{} must be between 1 and 100", name)));
            }
        }

        if self.safety.battery_check_enabled
            && (self.safety.battery_check_period_ms < 100
                || self.safety.battery_check_period_ms > 600_000)
        {
            return Err(invalid(
                "battery_check_period_ms must be between 100 and 600000",
            ));
        }

        for (name, pin) in [
            ("mode_switch", self.pins.mode_switch),
            ("throttle_cut_switch", self.pins.throttle_cut_switch),
            ("dual_rate_switch", self.pins.dual_rate_switch),
            ("model_switch", self.pins.model_switch),
        ] {
            if pin as usize >= DIGITAL_PINS {
                return Err(invalid(format!(
                    "{} pin {} is out of bounds (must be 0-{})",
                    name,
                    pin,
                    DIGITAL_PINS - 1
                )));
            }
        }

        if self.pins.battery_sense as usize >= ANALOG_PINS {
            return Err(invalid(format!(
                "battery_sense pin must be 0-{}",
                ANALOG_PINS - 1
            )));
        }

        let last_pot_pin = crate::settings::NPOTS - 1 + self.pins.pot_pin_offset as usize;
        if last_pot_pin >= ANALOG_PINS {
            return Err(invalid("pot_pin_offset maps potentiometers past the analog pins"));
        }

        let last_switch_pin = crate::settings::NSWITCHES + self.pins.switch_pin_offset as usize;
        if last_switch_pin >= DIGITAL_PINS {
            return Err(invalid("switch_pin_offset maps switches past the digital pins"));
        }

        if self.display.alarm_on_ms == 0 || self.display.mode_on_ms == 0 {
            return Err(invalid("display on durations must be greater than 0"));
        }

        if self.storage.settings_path.is_empty() {
            return Err(invalid("settings_path cannot be empty"));
        }

        for &pin in &self.bench.digital_high {
            if pin as usize >= DIGITAL_PINS {
                return Err(invalid(format!(
                    "bench digital pin {} is out of bounds (must be 0-{})",
                    pin,
                    DIGITAL_PINS - 1
                )));
            }
        }

        if self.bench.analog.len() > ANALOG_PINS {
            return Err(invalid(format!(
                "bench analog lists at most {} pins",
                ANALOG_PINS
            )));
        }

        if self.bench.analog.iter().any(|&v| v > 1023) {
            return Err(invalid("bench analog values must be between 0 and 1023"));
        }

        Ok(())
    }
}
