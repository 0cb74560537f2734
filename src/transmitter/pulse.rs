//! # Channel Pulse Computer
//!
//! Turns a control value (`0..=1023`) into a pulse width in microseconds.
//! Stages run in this order:
//!
//! 1. **Throttle cut** - the throttle channel reads 0 while throttle cut is
//!    engaged or the engine is disarmed
//! 2. **Rate shaping** - with dual rate engaged and outside the throttle
//!    channel: exponential when expo is set, otherwise the dual rate
//!    travel reduction
//! 3. **Subtrim** - shifts the value by 10 units per trim step
//! 4. **End points** - clamps the value into the configured travel
//! 5. **Reverse** - swaps the pulse width bounds
//! 6. **Mapping** - linear map onto the pulse width range
//!
//! ## Exponential
//!
//! The value is normalized to `v` in `[-1, 1]` and shaped with
//! `v * e^|k v| / e^k` where `k = expo / 10`. Extremes are preserved and
//! the center region gets finer resolution.
//!
//! ## Dual Rate
//!
//! The travel is reduced around the center with the anchors
//! `51200 - rate * 512` and `51100 + rate * 512`, in hundredths. The
//! anchors are not symmetric around 51150, so a reduced travel sits
//! slightly below center (a 50% rate covers 256..=767).
//!
//! ## Usage
//!
//! ```
//! use rc_transmitter::settings::ChannelVariables;
//! use rc_transmitter::transmitter::pulse::{compute_channel_pulse, PulseContext};
//!
//! let chan = ChannelVariables::default();
//! let ctx = PulseContext::default();
//!
//! assert_eq!(compute_channel_pulse(0, 0, &chan, &ctx), 1000);
//! ```

use crate::settings::{ChannelVariables, CONTROL_CENTER, CONTROL_MAX};

/// Switch and arming state the pulse pipeline depends on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PulseContext {
    /// Throttle cut switch engaged.
    pub throttle_cut: bool,
    /// Engine armed latch.
    pub engine_armed: bool,
    /// Dual rate switch engaged.
    pub dual_rate: bool,
    /// 0-based throttle channel of the resident model, if any.
    pub throttle_channel: Option<usize>,
}

/// Integer linear remap of `x` from `[in_min, in_max]` onto
/// `[out_min, out_max]`, truncating toward zero.
///
/// The output range may be descending. Values outside the input range are
/// extrapolated, not clamped. A zero-width input range maps to `out_min`.
///
/// # Examples
///
/// ```
/// use rc_transmitter::transmitter::pulse::map_range;
///
/// assert_eq!(map_range(512, 0, 1023, 1000, 2000), 1500);
/// assert_eq!(map_range(0, 0, 1023, 2000, 1000), 2000);
/// ```
#[must_use]
pub fn map_range(x: i64, in_min: i64, in_max: i64, out_min: i64, out_max: i64) -> i64 {
    if in_max == in_min {
        return out_min;
    }
    (x - in_min) * (out_max - out_min) / (in_max - in_min) + out_min
}

/// Computes the pulse width of `channel` (0-based) for control value `raw`.
///
/// # Arguments
///
/// * `channel` - Channel index, compared against the throttle channel
/// * `raw` - Control value, `0..=1023`
/// * `chan` - Channel variables of the resident dataset
/// * `ctx` - Switch and arming state
///
/// Returns a pulse width within `[pulse_low, pulse_high]` (in either order).
#[must_use]
pub fn compute_channel_pulse(
    channel: usize,
    raw: u16,
    chan: &ChannelVariables,
    ctx: &PulseContext,
) -> u16 {
    let is_throttle = ctx.throttle_channel == Some(channel);
    let mut value = raw.min(CONTROL_MAX);

    if is_throttle && (ctx.throttle_cut || !ctx.engine_armed) {
        value = 0;
    }

    if ctx.dual_rate && !is_throttle {
        value = if chan.expo != 0 {
            apply_expo(value, chan.expo)
        } else if chan.dual_rate != 100 {
            apply_dual_rate(value, chan.dual_rate)
        } else {
            value
        };
    }

    if chan.subtrim != 0 {
        value = apply_subtrim(value, chan.subtrim);
    }

    value = apply_end_points(value, chan.end_point_low, chan.end_point_high);

    let (low, high) = if chan.reverse {
        (chan.pulse_high, chan.pulse_low)
    } else {
        (chan.pulse_low, chan.pulse_high)
    };

    let pulse = map_range(
        i64::from(value),
        0,
        i64::from(CONTROL_MAX),
        i64::from(low),
        i64::from(high),
    );
    pulse.clamp(i64::from(low.min(high)), i64::from(low.max(high))) as u16
}

/// Exponential curve, `expo` in percent.
#[must_use]
pub fn apply_expo(value: u16, expo: u8) -> u16 {
    let k = f32::from(expo) / 10.0;
    let v = 2.0 * (f32::from(value) / f32::from(CONTROL_MAX) - 0.5);
    let shaped = v * (k * v).abs().exp() / k.exp();
    let result = i32::from(CONTROL_CENTER) + (511.5 * shaped) as i32;
    result.clamp(0, i32::from(CONTROL_MAX)) as u16
}

/// Dual rate travel reduction, `rate` in percent of full travel.
#[must_use]
pub fn apply_dual_rate(value: u16, rate: u8) -> u16 {
    let offset = i64::from(rate) << 9;
    let scaled = map_range(
        i64::from(value),
        0,
        i64::from(CONTROL_MAX),
        51200 - offset,
        51100 + offset,
    ) / 100;
    scaled.clamp(0, i64::from(CONTROL_MAX)) as u16
}

/// Shifts `value` by `10 * trim` in 16-bit unsigned arithmetic.
///
/// A result that wrapped below zero reads as 0; anything above full scale
/// is capped at 1023.
#[must_use]
pub fn apply_subtrim(value: u16, trim: i8) -> u16 {
    let shifted = value.wrapping_add((10 * i16::from(trim)) as u16);
    if shifted > i16::MAX as u16 {
        0
    } else {
        shifted.min(CONTROL_MAX)
    }
}

/// Clamps `value` into the travel allowed by the end points (percent).
#[must_use]
pub fn apply_end_points(value: u16, end_point_low: u8, end_point_high: u8) -> u16 {
    let low = 5 * (100 - u16::from(end_point_low.min(100)));
    let high = 511 + 5 * u16::from(end_point_high);
    if value < low {
        low
    } else if value > high {
        high
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_travel() -> ChannelVariables {
        ChannelVariables::default()
    }

    fn no_travel() -> ChannelVariables {
        ChannelVariables {
            end_point_low: 0,
            end_point_high: 0,
            ..ChannelVariables::default()
        }
    }

    fn armed() -> PulseContext {
        PulseContext {
            engine_armed: true,
            ..PulseContext::default()
        }
    }

    // ==================== Mapping Tests ====================

    #[test]
    fn test_map_range_ascending_and_descending() {
        assert_eq!(map_range(0, 0, 1023, 1000, 2000), 1000);
        assert_eq!(map_range(1023, 0, 1023, 1000, 2000), 2000);
        assert_eq!(map_range(0, 0, 1023, 2000, 1000), 2000);
        assert_eq!(map_range(1023, 0, 1023, 2000, 1000), 1000);
    }

    #[test]
    fn test_map_range_truncates() {
        // 511 * 1000 / 1023 = 499.51
        assert_eq!(map_range(511, 0, 1023, 1000, 2000), 1499);
    }

    #[test]
    fn test_map_range_zero_width_input() {
        assert_eq!(map_range(5, 3, 3, 10, 20), 10);
    }

    // ==================== End-to-End Tests ====================

    #[test]
    fn test_midpoint_is_1500() {
        let pulse = compute_channel_pulse(0, 512, &no_travel(), &armed());
        assert!((1499..=1501).contains(&pulse), "got {}", pulse);
    }

    #[test]
    fn test_reversed_midpoint_and_extremes() {
        let chan = ChannelVariables {
            reverse: true,
            ..full_travel()
        };

        let mid = compute_channel_pulse(0, 512, &chan, &armed());
        assert!((1499..=1501).contains(&mid), "got {}", mid);

        let low = compute_channel_pulse(0, 0, &chan, &armed());
        assert_eq!(low, 2000);

        // End point high caps the value at 1011
        let high = compute_channel_pulse(0, 1023, &chan, &armed());
        assert!((1000..=1015).contains(&high), "got {}", high);
    }

    #[test]
    fn test_output_in_range_for_all_inputs() {
        let configs = [
            full_travel(),
            no_travel(),
            ChannelVariables {
                reverse: true,
                subtrim: -100,
                ..full_travel()
            },
            ChannelVariables {
                pulse_low: 2200,
                pulse_high: 800,
                subtrim: 100,
                expo: 50,
                ..full_travel()
            },
            ChannelVariables {
                dual_rate: 30,
                reverse: true,
                pulse_low: 900,
                pulse_high: 2100,
                ..full_travel()
            },
        ];
        let ctx = PulseContext {
            dual_rate: true,
            ..armed()
        };

        for chan in &configs {
            let (lo, hi) = (
                chan.pulse_low.min(chan.pulse_high),
                chan.pulse_low.max(chan.pulse_high),
            );
            for raw in 0..=1023 {
                let pulse = compute_channel_pulse(0, raw, chan, &ctx);
                assert!(lo <= pulse && pulse <= hi, "raw {} gave {}", raw, pulse);
            }
        }
    }

    #[test]
    fn test_reversal_is_involution() {
        let chan = ChannelVariables {
            reverse: true,
            ..full_travel()
        };
        let twice = ChannelVariables {
            reverse: !chan.reverse,
            ..chan
        };

        for raw in (0..=1023).step_by(31) {
            assert_eq!(
                compute_channel_pulse(0, raw, &twice, &armed()),
                compute_channel_pulse(0, raw, &full_travel(), &armed())
            );
        }
    }

    #[test]
    fn test_reversal_mirrors_output() {
        let forward = full_travel();
        let reversed = ChannelVariables {
            reverse: true,
            ..full_travel()
        };

        for raw in (0..=1023).step_by(17) {
            let a = compute_channel_pulse(0, raw, &forward, &armed());
            let b = compute_channel_pulse(0, raw, &reversed, &armed());
            assert!((i32::from(a) + i32::from(b) - 3000).abs() <= 1);
        }
    }

    // ==================== Throttle Cut Tests ====================

    #[test]
    fn test_throttle_cut_forces_low_pulse() {
        let ctx = PulseContext {
            throttle_cut: true,
            engine_armed: true,
            dual_rate: false,
            throttle_channel: Some(2),
        };
        assert_eq!(compute_channel_pulse(2, 1023, &full_travel(), &ctx), 1000);
        // Other channels unaffected
        assert_eq!(compute_channel_pulse(1, 1023, &no_travel(), &ctx), 1499);
    }

    #[test]
    fn test_disarmed_engine_forces_low_pulse() {
        let ctx = PulseContext {
            throttle_channel: Some(0),
            ..PulseContext::default()
        };
        assert_eq!(compute_channel_pulse(0, 800, &full_travel(), &ctx), 1000);
    }

    #[test]
    fn test_rate_shaping_skips_throttle_channel() {
        let chan = ChannelVariables {
            dual_rate: 50,
            ..full_travel()
        };
        let ctx = PulseContext {
            dual_rate: true,
            throttle_channel: Some(0),
            ..armed()
        };
        assert_eq!(
            compute_channel_pulse(0, 0, &chan, &ctx),
            compute_channel_pulse(0, 0, &full_travel(), &armed())
        );
    }

    // ==================== Rate Shaping Tests ====================

    #[test]
    fn test_dual_rate_100_is_noop() {
        let ctx = PulseContext {
            dual_rate: true,
            ..armed()
        };
        for raw in (0..=1023).step_by(7) {
            assert_eq!(
                compute_channel_pulse(0, raw, &full_travel(), &ctx),
                compute_channel_pulse(0, raw, &full_travel(), &armed())
            );
        }
    }

    #[test]
    fn test_dual_rate_anchors() {
        assert_eq!(apply_dual_rate(0, 50), 256);
        assert_eq!(apply_dual_rate(1023, 50), 767);
        // Zero travel collapses just below center
        assert_eq!(apply_dual_rate(0, 0), 512);
        assert_eq!(apply_dual_rate(1023, 0), 511);
    }

    #[test]
    fn test_dual_rate_only_when_switch_engaged() {
        let chan = ChannelVariables {
            dual_rate: 50,
            ..full_travel()
        };
        assert_eq!(compute_channel_pulse(0, 0, &chan, &armed()), 1000);

        let ctx = PulseContext {
            dual_rate: true,
            ..armed()
        };
        // 256 * 1000 / 1023
        assert_eq!(compute_channel_pulse(0, 0, &chan, &ctx), 1250);
    }

    #[test]
    fn test_expo_keeps_extremes_and_center() {
        assert_eq!(apply_expo(512, 50), 512);
        assert!(apply_expo(1023, 50) >= 1022);
        assert!(apply_expo(0, 50) <= 1);
    }

    #[test]
    fn test_expo_softens_center() {
        // Three quarters of the way up reads closer to center
        let shaped = apply_expo(767, 25);
        assert!(shaped < 767 && shaped > 512, "got {}", shaped);
    }

    #[test]
    fn test_expo_takes_precedence_over_dual_rate() {
        let chan = ChannelVariables {
            expo: 25,
            dual_rate: 50,
            ..full_travel()
        };
        let ctx = PulseContext {
            dual_rate: true,
            ..armed()
        };
        // Dual rate alone would lift the low extreme to 1250
        assert!(compute_channel_pulse(0, 0, &chan, &ctx) <= 1001);
    }

    // ==================== Subtrim Tests ====================

    #[test]
    fn test_subtrim_shifts_by_ten_per_step() {
        assert_eq!(apply_subtrim(500, 5), 550);
        assert_eq!(apply_subtrim(500, -5), 450);
    }

    #[test]
    fn test_subtrim_underflow_reads_zero() {
        assert_eq!(apply_subtrim(30, -10), 0);
        assert_eq!(apply_subtrim(0, -100), 0);
    }

    #[test]
    fn test_subtrim_caps_at_full_scale() {
        assert_eq!(apply_subtrim(1000, 10), 1023);
    }

    // ==================== End Point Tests ====================

    #[test]
    fn test_end_points_bounds() {
        assert_eq!(apply_end_points(0, 100, 100), 0);
        assert_eq!(apply_end_points(1023, 100, 100), 1011);
        assert_eq!(apply_end_points(0, 50, 50), 250);
        assert_eq!(apply_end_points(1023, 50, 50), 761);
        assert_eq!(apply_end_points(600, 0, 0), 511);
        assert_eq!(apply_end_points(100, 0, 0), 500);
    }
}
