//! # Status Codes
//!
//! Single-character codes played by the status displays (led and buzzer
//! Morse patterns).
//!
//! | Code | Meaning |
//! |------|---------|
//! | `P` | Settings storage failed its integrity check |
//! | `T` | Throttle security check failed |
//! | `B` | Low battery |
//! | `C` | Command mode |
//! | `0`-`9` | Transmitting with the given dataset |
//!
//! Alarms take precedence over mode codes, in the order of the table.

use std::fmt;
use tracing::info;

use super::mode::RunMode;
use super::safety::Alarm;
use crate::config::DisplayConfig;
use crate::hal::StatusDisplay;

/// Character code shown by the status displays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusCode(u8);

impl StatusCode {
    pub const STORAGE_FAILURE: Self = Self(b'P');
    pub const THROTTLE_ALARM: Self = Self(b'T');
    pub const BATTERY_ALARM: Self = Self(b'B');
    pub const COMMAND: Self = Self(b'C');

    /// Digit code of a dataset index (0-9).
    #[must_use]
    pub fn dataset(index: u8) -> Self {
        Self(b'0' + index % 10)
    }

    #[must_use]
    pub fn as_char(self) -> char {
        self.0 as char
    }

    /// Derives the code for the current state.
    ///
    /// Returns `None` before the first run mode has been decided and no
    /// alarm is pending.
    #[must_use]
    pub fn for_state(alarm: Alarm, mode: RunMode, dataset: u8) -> Option<Self> {
        match alarm {
            Alarm::StorageFailure => Some(Self::STORAGE_FAILURE),
            Alarm::Throttle => Some(Self::THROTTLE_ALARM),
            Alarm::Battery => Some(Self::BATTERY_ALARM),
            Alarm::None => match mode {
                RunMode::Command => Some(Self::COMMAND),
                RunMode::Transmission => Some(Self::dataset(dataset)),
                RunMode::Init => None,
            },
        }
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// Repeat count and mark duration a code is played with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayProfile {
    pub repeat: u8,
    pub on_duration_ms: u16,
}

/// Pushes status codes to the displays when they change.
#[derive(Debug, Clone)]
pub struct StatusPublisher {
    shown: Option<StatusCode>,
    alarm_profile: DisplayProfile,
    mode_profile: DisplayProfile,
}

impl StatusPublisher {
    pub fn new(config: &DisplayConfig) -> Self {
        Self {
            shown: None,
            alarm_profile: DisplayProfile {
                repeat: config.alarm_repeat,
                on_duration_ms: config.alarm_on_ms,
            },
            mode_profile: DisplayProfile {
                repeat: config.mode_repeat,
                on_duration_ms: config.mode_on_ms,
            },
        }
    }

    /// Last code pushed to the displays.
    #[must_use]
    pub fn shown(&self) -> Option<StatusCode> {
        self.shown
    }

    /// Recomputes the code and pushes it if it differs from the shown one.
    ///
    /// Returns the code that was pushed, if any.
    pub fn refresh(
        &mut self,
        alarm: Alarm,
        mode: RunMode,
        dataset: u8,
        displays: &mut [Box<dyn StatusDisplay>],
    ) -> Option<StatusCode> {
        let code = StatusCode::for_state(alarm, mode, dataset)?;
        if self.shown == Some(code) {
            return None;
        }

        let profile = if alarm == Alarm::None {
            self.mode_profile
        } else {
            self.alarm_profile
        };

        info!("Status code '{}' ({:?}, {:?})", code, alarm, mode);
        for display in displays.iter_mut() {
            display.set_code(code, profile.repeat, profile.on_duration_ms);
        }
        self.shown = Some(code);
        Some(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::MockStatusDisplay;
    use mockall::predicate::eq;

    fn publisher() -> StatusPublisher {
        StatusPublisher::new(&DisplayConfig::default())
    }

    #[test]
    fn test_alarm_precedence() {
        for mode in [RunMode::Init, RunMode::Command, RunMode::Transmission] {
            assert_eq!(
                StatusCode::for_state(Alarm::StorageFailure, mode, 3),
                Some(StatusCode::STORAGE_FAILURE)
            );
            assert_eq!(
                StatusCode::for_state(Alarm::Throttle, mode, 3),
                Some(StatusCode::THROTTLE_ALARM)
            );
            assert_eq!(
                StatusCode::for_state(Alarm::Battery, mode, 3),
                Some(StatusCode::BATTERY_ALARM)
            );
        }
    }

    #[test]
    fn test_mode_codes() {
        assert_eq!(
            StatusCode::for_state(Alarm::None, RunMode::Command, 3),
            Some(StatusCode::COMMAND)
        );
        assert_eq!(
            StatusCode::for_state(Alarm::None, RunMode::Transmission, 3),
            Some(StatusCode::dataset(3))
        );
        assert_eq!(StatusCode::for_state(Alarm::None, RunMode::Init, 3), None);
    }

    #[test]
    fn test_dataset_digits() {
        assert_eq!(StatusCode::dataset(0).as_char(), '0');
        assert_eq!(StatusCode::dataset(9).as_char(), '9');
        assert_eq!(StatusCode::dataset(7).to_string(), "7");
    }

    #[test]
    fn test_pushes_to_every_display_with_mode_profile() {
        let mut led = MockStatusDisplay::new();
        led.expect_set_code()
            .with(eq(StatusCode::dataset(0)), eq(3), eq(800))
            .times(1)
            .return_const(());
        let mut buzzer = MockStatusDisplay::new();
        buzzer
            .expect_set_code()
            .with(eq(StatusCode::dataset(0)), eq(3), eq(800))
            .times(1)
            .return_const(());

        let mut displays: Vec<Box<dyn StatusDisplay>> = vec![Box::new(led), Box::new(buzzer)];
        let mut publisher = publisher();

        // Nothing has been shown yet, so dataset 0 is a change
        let pushed = publisher.refresh(Alarm::None, RunMode::Transmission, 0, &mut displays);
        assert_eq!(pushed, Some(StatusCode::dataset(0)));
    }

    #[test]
    fn test_alarm_uses_alarm_profile() {
        let mut led = MockStatusDisplay::new();
        led.expect_set_code()
            .with(eq(StatusCode::THROTTLE_ALARM), eq(10), eq(400))
            .times(1)
            .return_const(());

        let mut displays: Vec<Box<dyn StatusDisplay>> = vec![Box::new(led)];
        publisher().refresh(Alarm::Throttle, RunMode::Transmission, 1, &mut displays);
    }

    #[test]
    fn test_unchanged_code_not_pushed_again() {
        let mut led = MockStatusDisplay::new();
        led.expect_set_code().times(1).return_const(());

        let mut displays: Vec<Box<dyn StatusDisplay>> = vec![Box::new(led)];
        let mut publisher = publisher();

        assert!(publisher
            .refresh(Alarm::None, RunMode::Command, 1, &mut displays)
            .is_some());
        assert!(publisher
            .refresh(Alarm::None, RunMode::Command, 2, &mut displays)
            .is_none());
        assert_eq!(publisher.shown(), Some(StatusCode::COMMAND));
    }

    #[test]
    fn test_init_without_alarm_pushes_nothing() {
        let mut led = MockStatusDisplay::new();
        led.expect_set_code().times(0);

        let mut displays: Vec<Box<dyn StatusDisplay>> = vec![Box::new(led)];
        let mut publisher = publisher();
        assert!(publisher
            .refresh(Alarm::None, RunMode::Init, 0, &mut displays)
            .is_none());
        assert_eq!(publisher.shown(), None);
    }
}
