//! # Control Reader
//!
//! Resolves the input control of a channel to a calibrated value in
//! `0..=1023`.
//!
//! | Control | Value |
//! |---------|-------|
//! | Analog | Calibrated potentiometer reading |
//! | Digital | 1023 when the switch pin reads high, else 0 |
//! | Mixer | `512 + Σ (pot - 512) * weight / 100`, clamped |
//! | Off | 0, no hardware access |
//!
//! Unconfigured or out-of-range control numbers never fail: they read 0,
//! or the center value for mixers.

use super::pulse::map_range;
use crate::config::PinConfig;
use crate::hal::InputPins;
use crate::settings::{
    ControlType, GlobalVariables, MixerVariables, Settings, CONTROL_CENTER, CONTROL_MAX, NMIXERS,
    NPOTS, NSWITCHES,
};

/// Reads the input control of `channel` (0-based).
///
/// # Arguments
///
/// * `pins` - Pin inputs
/// * `pin_map` - Potentiometer and switch pin assignment
/// * `settings` - Resident settings
/// * `channel` - Channel index, `0..CHANNELS`
///
/// Returns a value in `0..=1023`.
pub fn read_control(
    pins: &mut dyn InputPins,
    pin_map: &PinConfig,
    settings: &Settings,
    channel: usize,
) -> u16 {
    let Some(chan) = settings.dataset.channels.get(channel) else {
        return 0;
    };

    match chan.control_type {
        ControlType::Off => 0,
        ControlType::Analog => {
            read_potentiometer(pins, pin_map, &settings.globals, chan.control_number)
        }
        ControlType::Digital => read_switch(pins, pin_map, chan.control_number),
        ControlType::Mixer => {
            let number = chan.control_number as usize;
            if (1..=NMIXERS).contains(&number) {
                let mixer = &settings.dataset.mixers[number - 1];
                read_mixer(pins, pin_map, &settings.globals, mixer)
            } else {
                CONTROL_CENTER
            }
        }
    }
}

/// Reads potentiometer `number` (1-based) and applies its calibration.
///
/// The raw reading is clamped into the calibration interval, then remapped
/// onto `0..=1023`. Invalid numbers and degenerate intervals read 0.
pub fn read_potentiometer(
    pins: &mut dyn InputPins,
    pin_map: &PinConfig,
    globals: &GlobalVariables,
    number: u8,
) -> u16 {
    if !(1..=NPOTS).contains(&(number as usize)) {
        return 0;
    }

    let cal = globals.calibration[number as usize - 1];
    if cal.high <= cal.low {
        return 0;
    }

    let raw = pins.analog_read(pin_map.pot_pin(number));
    let clamped = raw.clamp(cal.low, cal.high);
    map_range(
        i64::from(clamped),
        i64::from(cal.low),
        i64::from(cal.high),
        0,
        i64::from(CONTROL_MAX),
    ) as u16
}

fn read_switch(pins: &mut dyn InputPins, pin_map: &PinConfig, number: u8) -> u16 {
    if !(1..=NSWITCHES).contains(&(number as usize)) {
        return 0;
    }

    if pins.digital_read(pin_map.switch_pin(number)) {
        CONTROL_MAX
    } else {
        0
    }
}

fn read_mixer(
    pins: &mut dyn InputPins,
    pin_map: &PinConfig,
    globals: &GlobalVariables,
    mixer: &MixerVariables,
) -> u16 {
    let mut sum: i32 = 0;
    for (input, weight) in [(mixer.input1, mixer.weight1), (mixer.input2, mixer.weight2)] {
        if (1..=NPOTS).contains(&(input as usize)) {
            let value = read_potentiometer(pins, pin_map, globals, input);
            sum += (i32::from(value) - i32::from(CONTROL_CENTER)) * i32::from(weight);
        }
    }

    (i32::from(CONTROL_CENTER) + sum / 100).clamp(0, i32::from(CONTROL_MAX)) as u16
}
