//! # Transmitter Controller
//!
//! Owns the session state of the transmitter and runs the per-tick refresh:
//!
//! 1. Reload the settings when the model switch selects another dataset
//! 2. Read the dual rate and throttle cut switches
//! 3. Derive the run mode, firing the command session hooks on edges
//! 4. Reload the settings after a commit while in command mode
//! 5. Disarm on throttle cut, re-arm once the throttle check passes
//! 6. Run the battery check every battery period
//! 7. Push the status code when it changes
//! 8. Compute and publish the pulse frame
//!
//! Faults never escape a tick. A storage failure at boot latches command
//! mode and the `P` status for the session; later load failures are logged
//! and force command mode until a reload succeeds.
//!
//! ## Usage
//!
//! ```no_run
//! use rc_transmitter::config::Config;
//! use rc_transmitter::hal::bench::{BenchInputs, LogDisplay, LogSession};
//! use rc_transmitter::output::PulseBuffer;
//! use rc_transmitter::settings::storage::TomlStorage;
//! use rc_transmitter::transmitter::{Peripherals, Transmitter};
//!
//! let config = Config::default();
//! let peripherals = Peripherals {
//!     inputs: Box::new(BenchInputs::from_config(&config.bench)),
//!     storage: Box::new(TomlStorage::new(&config.storage.settings_path)),
//!     session: Box::new(LogSession),
//!     displays: vec![Box::new(LogDisplay::new("led"))],
//!     output: Box::new(PulseBuffer::new()),
//! };
//!
//! let mut tx = Transmitter::start(&config, peripherals);
//! let frame = tx.tick(0);
//! println!("{:?}", frame);
//! ```

pub mod control;
pub mod mode;
pub mod pulse;
pub mod safety;
pub mod status;

use tracing::{debug, error, info};

use crate::config::{Config, ModelSelectStrategy, PinConfig, SafetyConfig};
use crate::error::Result;
use crate::hal::{CommandSession, InputPins, StatusDisplay};
use crate::output::{PulseFrame, PulseOutput};
use crate::settings::storage::SettingsStorage;
use crate::settings::{GlobalVariables, Settings, CHANNELS};

use mode::{ModeTracker, RunMode, SessionEdge};
use pulse::PulseContext;
use safety::{Alarm, BatteryMonitor, ThrottleMonitor};
use status::{StatusCode, StatusPublisher};

/// Collaborators the transmitter drives.
pub struct Peripherals {
    pub inputs: Box<dyn InputPins>,
    pub storage: Box<dyn SettingsStorage>,
    pub session: Box<dyn CommandSession>,
    /// Led, buzzer; every display receives the same codes.
    pub displays: Vec<Box<dyn StatusDisplay>>,
    pub output: Box<dyn PulseOutput>,
}

/// Transmitter session.
pub struct Transmitter {
    pins: PinConfig,
    safety: SafetyConfig,
    strategy: ModelSelectStrategy,
    peripherals: Peripherals,

    settings: Settings,
    /// Selected dataset index, shown as the transmission status digit.
    current_dataset: u8,
    /// Index of the dataset actually resident in `settings`.
    loaded_dataset: Option<u8>,
    settings_loaded: bool,
    storage_failed: bool,
    pending_commit: bool,

    mode: ModeTracker,
    alarm: Alarm,
    dual_rate: bool,
    throttle_cut: bool,
    engine_armed: bool,

    throttle: ThrottleMonitor,
    battery: BatteryMonitor,
    last_battery_check: u32,
    status: StatusPublisher,
}

/// Dataset selected by the model switch under `strategy`.
fn select_dataset(
    inputs: &mut dyn InputPins,
    pins: &PinConfig,
    strategy: ModelSelectStrategy,
    globals: &GlobalVariables,
) -> u8 {
    match strategy {
        ModelSelectStrategy::Explicit => globals.explicit_dataset,
        ModelSelectStrategy::Switch => {
            if inputs.digital_read(pins.model_switch) {
                globals.explicit_dataset
            } else {
                globals.switch_dataset
            }
        }
    }
}

impl Transmitter {
    /// Creates the session and loads the settings.
    ///
    /// The storage integrity check runs first. When it fails the session
    /// starts with default settings, the storage failure alarm and no
    /// further reloads.
    ///
    /// # Arguments
    ///
    /// * `config` - Transmitter configuration
    /// * `peripherals` - Collaborators to drive
    pub fn start(config: &Config, peripherals: Peripherals) -> Self {
        let mut tx = Self {
            pins: config.pins.clone(),
            safety: config.safety.clone(),
            strategy: config.model_select.strategy,
            peripherals,
            settings: Settings::default(),
            current_dataset: 0,
            loaded_dataset: None,
            settings_loaded: false,
            storage_failed: false,
            pending_commit: false,
            mode: ModeTracker::new(),
            alarm: Alarm::None,
            dual_rate: false,
            throttle_cut: false,
            engine_armed: false,
            throttle: ThrottleMonitor::new(0, config.safety.throttle_samples),
            battery: BatteryMonitor::new(0, config.safety.battery_samples),
            last_battery_check: 0,
            status: StatusPublisher::new(&config.display),
        };

        if tx.peripherals.storage.check_valid() {
            tx.load_settings();
        } else {
            error!("Settings storage failed its integrity check, command mode until reset");
            tx.storage_failed = true;
            tx.alarm = Alarm::StorageFailure;
        }

        let globals = &tx.settings.globals;
        tx.throttle = ThrottleMonitor::new(globals.throttle_security, tx.safety.throttle_samples);
        tx.battery = BatteryMonitor::new(globals.battery_threshold, tx.safety.battery_samples);

        info!(
            "Transmitter started (dataset {}, settings loaded: {})",
            tx.current_dataset, tx.settings_loaded
        );
        tx
    }

    /// Notifies that the settings were edited; they are reloaded on the next
    /// tick spent in command mode.
    pub fn commit_changes(&mut self) {
        debug!("Settings commit pending");
        self.pending_commit = true;
    }

    /// Runs one scheduler tick: refreshes the state, then computes and
    /// publishes the pulse frame.
    ///
    /// `now_ms` is the wrapping millisecond clock.
    pub fn tick(&mut self, now_ms: u32) -> PulseFrame {
        self.refresh(now_ms);
        let frame = self.compute_frame();
        self.peripherals.output.publish(&frame);
        frame
    }

    /// Updates the session state from the switches, the settings and the
    /// safety checks, and refreshes the status code.
    pub fn refresh(&mut self, now_ms: u32) {
        if !self.storage_failed {
            let selected = select_dataset(
                self.peripherals.inputs.as_mut(),
                &self.pins,
                self.strategy,
                &self.settings.globals,
            );
            if selected != self.current_dataset {
                debug!("Model switch selects dataset {}", selected);
                self.current_dataset = selected;
                self.load_settings();
            }
        }

        let inputs = self.peripherals.inputs.as_mut();
        self.dual_rate = inputs.digital_read(self.pins.dual_rate_switch);
        self.throttle_cut = inputs.digital_read(self.pins.throttle_cut_switch);
        let mode_switch_open = inputs.digital_read(self.pins.mode_switch);

        let previous = self.mode.current();
        let (mode, edge) = self.mode.update(mode_switch_open, self.settings_loaded);
        if mode != previous {
            info!("Run mode {:?} -> {:?}", previous, mode);
        }
        match edge {
            Some(SessionEdge::Enter) => self.peripherals.session.on_enter_session(),
            Some(SessionEdge::Exit) => self.peripherals.session.on_exit_session(),
            None => {}
        }

        if mode == RunMode::Command && self.pending_commit {
            self.pending_commit = false;
            if !self.storage_failed {
                info!("Reloading committed settings");
                self.load_settings();
            }
        }

        if self.throttle_cut && self.safety.disarm_on_throttle_cut {
            // Latched disarmed until the cut is released
            if self.engine_armed {
                info!("Throttle cut engaged, engine disarmed");
                self.engine_armed = false;
            }
        } else if !self.engine_armed {
            self.engine_armed = self.check_throttle();
            if self.engine_armed {
                info!("Engine armed");
            }
        }

        if self.safety.battery_check_enabled
            && now_ms.wrapping_sub(self.last_battery_check) >= self.safety.battery_check_period_ms
        {
            self.check_battery();
            self.last_battery_check = now_ms;
        }

        self.status.refresh(
            self.alarm,
            mode,
            self.current_dataset,
            &mut self.peripherals.displays,
        );
    }

    /// Reads the input control of `channel` (0-based), `0..=1023`.
    pub fn read_control(&mut self, channel: usize) -> u16 {
        control::read_control(
            self.peripherals.inputs.as_mut(),
            &self.pins,
            &self.settings,
            channel,
        )
    }

    /// Pulse width of `channel` for control value `raw`, microseconds.
    ///
    /// Out-of-range channels yield 0.
    #[must_use]
    pub fn compute_channel_pulse(&self, channel: usize, raw: u16) -> u16 {
        match self.settings.dataset.channels.get(channel) {
            Some(chan) => pulse::compute_channel_pulse(channel, raw, chan, &self.pulse_context()),
            None => 0,
        }
    }

    /// Reads every channel and computes the complete pulse frame.
    pub fn compute_frame(&mut self) -> PulseFrame {
        let mut frame = [0; CHANNELS];
        for (channel, pulse) in frame.iter_mut().enumerate() {
            let raw = self.read_control(channel);
            *pulse = self.compute_channel_pulse(channel, raw);
        }
        debug!("Frame {:?}", frame);
        frame
    }

    #[must_use]
    pub fn run_mode(&self) -> RunMode {
        self.mode.current()
    }

    #[must_use]
    pub fn alarm(&self) -> Alarm {
        self.alarm
    }

    #[must_use]
    pub fn engine_armed(&self) -> bool {
        self.engine_armed
    }

    #[must_use]
    pub fn current_dataset(&self) -> u8 {
        self.current_dataset
    }

    #[must_use]
    pub fn settings_loaded(&self) -> bool {
        self.settings_loaded
    }

    #[must_use]
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Last status code pushed to the displays.
    #[must_use]
    pub fn shown_status(&self) -> Option<StatusCode> {
        self.status.shown()
    }

    fn pulse_context(&self) -> PulseContext {
        PulseContext {
            throttle_cut: self.throttle_cut,
            engine_armed: self.engine_armed,
            dual_rate: self.dual_rate,
            throttle_channel: self.settings.dataset.model.throttle_index(),
        }
    }

    fn load_settings(&mut self) {
        if let Err(e) = self.try_load_settings() {
            error!("Failed to load settings: {}", e);
            self.settings_loaded = false;
        }
    }

    /// Loads the globals, selects the dataset they designate and loads it.
    ///
    /// The selected index is kept even when the dataset fails to load, so a
    /// missing dataset is not retried every tick. The previous settings stay
    /// resident until a load succeeds: frames computed meanwhile use the
    /// previous model, while the status shows command mode.
    fn try_load_settings(&mut self) -> Result<()> {
        let globals = self.peripherals.storage.load_globals()?;
        let index = select_dataset(
            self.peripherals.inputs.as_mut(),
            &self.pins,
            self.strategy,
            &globals,
        );
        self.current_dataset = index;

        let dataset = self.peripherals.storage.load_dataset(index)?;
        self.settings = Settings { globals, dataset };
        self.settings_loaded = true;

        if self.loaded_dataset != Some(index) {
            if self.engine_armed {
                info!("Dataset changed, engine disarmed");
            }
            self.engine_armed = false;
            self.loaded_dataset = Some(index);
            info!("Dataset {} loaded", index);
        } else {
            debug!("Dataset {} reloaded", index);
        }
        Ok(())
    }

    fn check_throttle(&mut self) -> bool {
        let Some(channel) = self.settings.dataset.model.throttle_index() else {
            self.alarm.clear_throttle();
            return true;
        };

        let threshold = self.settings.globals.throttle_security;
        let inputs = self.peripherals.inputs.as_mut();
        let pins = &self.pins;
        let settings = &self.settings;
        self.throttle.check(threshold, &mut self.alarm, || {
            control::read_control(&mut *inputs, pins, settings, channel)
        })
    }

    fn check_battery(&mut self) {
        let threshold = self.settings.globals.battery_threshold;
        let pin = self.pins.battery_sense;
        let inputs = self.peripherals.inputs.as_mut();
        let ok = self
            .battery
            .check(threshold, &mut self.alarm, || inputs.analog_read(pin));
        debug!("Battery check: average {}, ok: {}", self.battery.average(), ok);
    }
}
