//! # Settings Module
//!
//! Typed tables for the transmitter settings: the global variables shared by
//! every dataset, and the model, mixer and channel variables of one dataset.
//!
//! ## Dimensions
//!
//! | Constant | Value | Meaning |
//! |----------|-------|---------|
//! | `CHANNELS` | 6 | Transmitted channels |
//! | `NPOTS` | 6 | Potentiometers wired to analog pins |
//! | `NSWITCHES` | 1 | User switches wired to digital pins |
//! | `NMIXERS` | 4 | Virtual mixer channels per dataset |
//! | `NDATASETS` | 10 | Selectable datasets (models) |
//!
//! Potentiometer, switch and mixer numbers are 1-based; 0 means "not
//! configured". Out-of-range numbers are accepted here and degrade to a
//! neutral value when the control is read.

use serde::Deserialize;

use crate::error::{Result, TxError};

pub mod storage;

/// Number of transmitted channels.
pub const CHANNELS: usize = 6;

/// Number of potentiometers installed in the transmitter.
pub const NPOTS: usize = 6;

/// Number of user switches installed in the transmitter.
pub const NSWITCHES: usize = 1;

/// Number of mixers per dataset.
pub const NMIXERS: usize = 4;

/// Number of datasets; indices are rendered as a single digit.
pub const NDATASETS: u8 = 10;

/// Full scale of a calibrated control value.
pub const CONTROL_MAX: u16 = 1023;

/// Center of a calibrated control value.
pub const CONTROL_CENTER: u16 = 512;

/// Accepted pulse width range, microseconds.
pub const PULSE_WIDTH_MIN: u16 = 500;
/// Accepted pulse width range, microseconds.
pub const PULSE_WIDTH_MAX: u16 = 2500;

/// Calibration bounds of one potentiometer (raw 10-bit readings).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct PotCalibration {
    /// Lowest raw value returned by the potentiometer.
    #[serde(default)]
    pub low: u16,
    /// Highest raw value returned by the potentiometer.
    #[serde(default = "default_cal_high")]
    pub high: u16,
}

impl Default for PotCalibration {
    fn default() -> Self {
        Self {
            low: 0,
            high: CONTROL_MAX,
        }
    }
}

/// Session-wide variables, shared by all datasets.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GlobalVariables {
    /// Calibration bounds, one entry per potentiometer.
    #[serde(default)]
    pub calibration: [PotCalibration; NPOTS],

    /// Throttle security threshold: the throttle control must read below
    /// this value before the engine is armed.
    #[serde(default = "default_throttle_security")]
    pub throttle_security: u16,

    /// Battery threshold on the raw battery sense reading.
    #[serde(default = "default_battery_threshold")]
    pub battery_threshold: u16,

    /// Dataset selected explicitly (model switch open).
    #[serde(default)]
    pub explicit_dataset: u8,

    /// Dataset selected when the model switch is closed.
    #[serde(default)]
    pub switch_dataset: u8,
}

impl Default for GlobalVariables {
    fn default() -> Self {
        Self {
            calibration: [PotCalibration::default(); NPOTS],
            throttle_security: default_throttle_security(),
            battery_threshold: default_battery_threshold(),
            explicit_dataset: 0,
            switch_dataset: 0,
        }
    }
}

/// Per-model variables.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct ModelVariables {
    /// Throttle channel number, 1-based; 0 means the model has no throttle.
    #[serde(default)]
    pub throttle_channel: u8,
}

impl ModelVariables {
    /// Returns the 0-based throttle channel index, if one is configured.
    #[must_use]
    pub fn throttle_index(&self) -> Option<usize> {
        let number = self.throttle_channel as usize;
        (1..=CHANNELS).contains(&number).then(|| number - 1)
    }
}

/// One virtual mixer: a weighted sum of two potentiometers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct MixerVariables {
    /// First input potentiometer number, 1-based (0 = unused).
    #[serde(default)]
    pub input1: u8,
    /// First input weight, percent.
    #[serde(default)]
    pub weight1: i8,
    /// Second input potentiometer number, 1-based (0 = unused).
    #[serde(default)]
    pub input2: u8,
    /// Second input weight, percent.
    #[serde(default)]
    pub weight2: i8,
}

/// Kind of input control driving a channel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControlType {
    /// Channel disabled, always reads 0.
    #[default]
    Off,
    /// Potentiometer.
    Analog,
    /// On/off switch.
    Digital,
    /// Virtual mixer.
    Mixer,
}

/// Per-channel variables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct ChannelVariables {
    /// Input control type.
    #[serde(default)]
    pub control_type: ControlType,

    /// Input control number (potentiometer, switch or mixer), 1-based.
    #[serde(default)]
    pub control_number: u8,

    /// Dual rate, percent of travel (100 = full travel).
    #[serde(default = "default_percent")]
    pub dual_rate: u8,

    /// Exponential, percent (0 = none, 25 = medium, 50 = strong).
    #[serde(default)]
    pub expo: u8,

    /// Subtrim, roughly -100..=100; each step is 10 control units.
    #[serde(default)]
    pub subtrim: i8,

    /// Low end point, percent of the lower half travel.
    #[serde(default = "default_percent")]
    pub end_point_low: u8,

    /// High end point, percent of the upper half travel.
    #[serde(default = "default_percent")]
    pub end_point_high: u8,

    /// Pulse width at control value 0, microseconds.
    #[serde(default = "default_pulse_low")]
    pub pulse_low: u16,

    /// Pulse width at control value 1023, microseconds.
    #[serde(default = "default_pulse_high")]
    pub pulse_high: u16,

    /// Reverse the output direction.
    #[serde(default)]
    pub reverse: bool,
}

impl Default for ChannelVariables {
    fn default() -> Self {
        Self {
            control_type: ControlType::Off,
            control_number: 0,
            dual_rate: default_percent(),
            expo: 0,
            subtrim: 0,
            end_point_low: default_percent(),
            end_point_high: default_percent(),
            pulse_low: default_pulse_low(),
            pulse_high: default_pulse_high(),
            reverse: false,
        }
    }
}

/// One complete model configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dataset {
    /// Model variables.
    pub model: ModelVariables,
    /// Mixer variables.
    pub mixers: [MixerVariables; NMIXERS],
    /// Channel variables.
    pub channels: [ChannelVariables; CHANNELS],
}

/// Settings resident in working memory: the globals and one dataset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Settings {
    /// Global variables.
    pub globals: GlobalVariables,
    /// Resident dataset.
    pub dataset: Dataset,
}

fn default_cal_high() -> u16 { CONTROL_MAX }
fn default_throttle_security() -> u16 { 100 }
fn default_battery_threshold() -> u16 { 0 }
fn default_percent() -> u8 { 100 }
fn default_pulse_low() -> u16 { 1000 }
fn default_pulse_high() -> u16 { 2000 }

fn invalid(message: String) -> TxError {
    TxError::InvalidSettings(message)
}

impl GlobalVariables {
    /// Range-checks the global variables.
    ///
    /// # Errors
    ///
    /// Returns [`TxError::InvalidSettings`] describing the first bad value.
    pub fn validate(&self) -> Result<()> {
        for (idx, cal) in self.calibration.iter().enumerate() {
            if cal.high > CONTROL_MAX || cal.low >= cal.high {
                return Err(invalid(format!(
                    "potentiometer {} calibration must satisfy low < high <= {} (got {}..{})",
                    idx + 1,
                    CONTROL_MAX,
                    cal.low,
                    cal.high
                )));
            }
        }

        if self.throttle_security > CONTROL_MAX {
            return Err(invalid(format!(
                "throttle_security must be at most {}",
                CONTROL_MAX
            )));
        }

        if self.battery_threshold > CONTROL_MAX {
            return Err(invalid(format!(
                "battery_threshold must be at most {}",
                CONTROL_MAX
            )));
        }

        for (name, value) in [
            ("explicit_dataset", self.explicit_dataset),
            ("switch_dataset", self.switch_dataset),
        ] {
            if value >= NDATASETS {
                return Err(invalid(format!(
                    "{} must be below {} (got {})",
                    name, NDATASETS, value
                )));
            }
        }

        Ok(())
    }
}

impl Dataset {
    /// Range-checks the dataset.
    ///
    /// Control, mixer input and throttle numbers outside their tables are
    /// tolerated by the control reader and only the throttle channel is
    /// bounded here.
    ///
    /// # Errors
    ///
    /// Returns [`TxError::InvalidSettings`] describing the first bad value.
    pub fn validate(&self) -> Result<()> {
        if self.model.throttle_channel as usize > CHANNELS {
            return Err(invalid(format!(
                "throttle_channel must be between 0 and {}",
                CHANNELS
            )));
        }

        for (idx, mixer) in self.mixers.iter().enumerate() {
            for weight in [mixer.weight1, mixer.weight2] {
                if !(-100..=100).contains(&weight) {
                    return Err(invalid(format!(
                        "mixer {} weights must be between -100 and 100",
                        idx + 1
                    )));
                }
            }
        }

        for (idx, chan) in self.channels.iter().enumerate() {
            let number = idx + 1;
            for (name, value) in [
                ("dual_rate", chan.dual_rate),
                ("expo", chan.expo),
                ("end_point_low", chan.end_point_low),
                ("end_point_high", chan.end_point_high),
            ] {
                if value > 100 {
                    return Err(invalid(format!(
                        "channel {} {} must be between 0 and 100 (got {})",
                        number, name, value
                    )));
                }
            }

            if !(-100..=100).contains(&chan.subtrim) {
                return Err(invalid(format!(
                    "channel {} subtrim must be between -100 and 100",
                    number
                )));
            }

            for (name, value) in [("pulse_low", chan.pulse_low), ("pulse_high", chan.pulse_high)] {
                if !(PULSE_WIDTH_MIN..=PULSE_WIDTH_MAX).contains(&value) {
                    return Err(invalid(format!(
                        "channel {} {} must be between {} and {} us",
                        number, name, PULSE_WIDTH_MIN, PULSE_WIDTH_MAX
                    )));
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_throttle_index_is_zero_based() {
        let model = ModelVariables { throttle_channel: 3 };
        assert_eq!(model.throttle_index(), Some(2));
    }

    #[test]
    fn test_throttle_index_none_when_unset() {
        let model = ModelVariables { throttle_channel: 0 };
        assert_eq!(model.throttle_index(), None);
    }

    #[test]
    fn test_throttle_index_none_when_out_of_range() {
        let model = ModelVariables {
            throttle_channel: CHANNELS as u8 + 1,
        };
        assert_eq!(model.throttle_index(), None);
    }

    #[test]
    fn test_default_channel_is_full_travel() {
        let chan = ChannelVariables::default();
        assert_eq!(chan.control_type, ControlType::Off);
        assert_eq!(chan.dual_rate, 100);
        assert_eq!(chan.end_point_low, 100);
        assert_eq!(chan.end_point_high, 100);
        assert_eq!(chan.pulse_low, 1000);
        assert_eq!(chan.pulse_high, 2000);
        assert!(!chan.reverse);
    }

    #[test]
    fn test_default_globals_are_valid() {
        assert!(GlobalVariables::default().validate().is_ok());
    }

    #[test]
    fn test_default_dataset_is_valid() {
        assert!(Dataset::default().validate().is_ok());
    }

    #[test]
    fn test_degenerate_calibration_rejected() {
        let mut globals = GlobalVariables::default();
        globals.calibration[2] = PotCalibration { low: 600, high: 600 };
        assert!(globals.validate().is_err());
    }

    #[test]
    fn test_calibration_above_full_scale_rejected() {
        let mut globals = GlobalVariables::default();
        globals.calibration[0] = PotCalibration { low: 0, high: 1024 };
        assert!(globals.validate().is_err());
    }

    #[test]
    fn test_dataset_selector_out_of_range_rejected() {
        let mut globals = GlobalVariables::default();
        globals.switch_dataset = NDATASETS;
        assert!(globals.validate().is_err());
    }

    #[test]
    fn test_throttle_channel_out_of_range_rejected() {
        let mut dataset = Dataset::default();
        dataset.model.throttle_channel = CHANNELS as u8 + 1;
        assert!(dataset.validate().is_err());
    }

    #[test]
    fn test_percentages_above_100_rejected() {
        let mut dataset = Dataset::default();
        dataset.channels[1].expo = 101;
        assert!(dataset.validate().is_err());

        let mut dataset = Dataset::default();
        dataset.channels[4].end_point_high = 120;
        assert!(dataset.validate().is_err());
    }

    #[test]
    fn test_subtrim_out_of_range_rejected() {
        let mut dataset = Dataset::default();
        dataset.channels[0].subtrim = -101;
        assert!(dataset.validate().is_err());
    }

    #[test]
    fn test_mixer_weight_out_of_range_rejected() {
        let mut dataset = Dataset::default();
        dataset.mixers[3].weight2 = 127;
        assert!(dataset.validate().is_err());
    }

    #[test]
    fn test_pulse_width_out_of_range_rejected() {
        let mut dataset = Dataset::default();
        dataset.channels[5].pulse_high = 3000;
        assert!(dataset.validate().is_err());
    }

    #[test]
    fn test_reversed_pulse_range_accepted() {
        let mut dataset = Dataset::default();
        dataset.channels[0].pulse_low = 2000;
        dataset.channels[0].pulse_high = 1000;
        assert!(dataset.validate().is_ok());
    }

    #[test]
    fn test_unconfigured_control_numbers_accepted() {
        let mut dataset = Dataset::default();
        dataset.channels[0].control_type = ControlType::Analog;
        dataset.channels[0].control_number = 42;
        dataset.mixers[0].input1 = 99;
        assert!(dataset.validate().is_ok());
    }
}
