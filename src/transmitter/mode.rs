//! Run mode derivation with edge detection.
//!
//! ```text
//!  Init ──► Transmission ◄──► Command
//!    └──────────────────────────▲
//! ```
//!
//! `Init` only exists until the first tick and is never re-entered.

/// Operating mode of the transmitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunMode {
    /// Before the first tick.
    #[default]
    Init,
    /// Pulses are sent to the receiver.
    Transmission,
    /// Settings are edited through the command session.
    Command,
}

/// Session hook to fire after a mode change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEdge {
    Enter,
    Exit,
}

/// Tracks the run mode between ticks.
#[derive(Debug, Clone, Default)]
pub struct ModeTracker {
    current: RunMode,
}

impl ModeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn current(&self) -> RunMode {
        self.current
    }

    /// Derives the run mode from the mode switch.
    ///
    /// `switch_open` is the mode switch level (open reads high). When the
    /// settings are not loaded, command mode is forced whatever the switch
    /// says. Returns the new mode and the session edge crossed, if any.
    pub fn update(&mut self, switch_open: bool, settings_loaded: bool) -> (RunMode, Option<SessionEdge>) {
        let mode = if settings_loaded && switch_open {
            RunMode::Transmission
        } else {
            RunMode::Command
        };

        let edge = match (self.current, mode) {
            (previous, RunMode::Command) if previous != RunMode::Command => Some(SessionEdge::Enter),
            (RunMode::Command, RunMode::Transmission) => Some(SessionEdge::Exit),
            _ => None,
        };

        self.current = mode;
        (mode, edge)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_in_init() {
        assert_eq!(ModeTracker::new().current(), RunMode::Init);
    }

    #[test]
    fn test_init_to_transmission_has_no_edge() {
        let mut tracker = ModeTracker::new();
        assert_eq!(tracker.update(true, true), (RunMode::Transmission, None));
    }

    #[test]
    fn test_init_to_command_enters_session() {
        let mut tracker = ModeTracker::new();
        assert_eq!(
            tracker.update(false, true),
            (RunMode::Command, Some(SessionEdge::Enter))
        );
    }

    #[test]
    fn test_settings_not_loaded_forces_command() {
        let mut tracker = ModeTracker::new();
        assert_eq!(
            tracker.update(true, false),
            (RunMode::Command, Some(SessionEdge::Enter))
        );
        assert_eq!(tracker.update(true, false), (RunMode::Command, None));
    }

    #[test]
    fn test_edges_fire_once_per_transition() {
        let mut tracker = ModeTracker::new();
        tracker.update(true, true);

        assert_eq!(tracker.update(false, true).1, Some(SessionEdge::Enter));
        assert_eq!(tracker.update(false, true).1, None);
        assert_eq!(tracker.update(true, true).1, Some(SessionEdge::Exit));
        assert_eq!(tracker.update(true, true).1, None);
    }

    #[test]
    fn test_init_never_reentered() {
        let mut tracker = ModeTracker::new();
        for (open, loaded) in [(true, true), (false, true), (true, false), (true, true)] {
            let (mode, _) = tracker.update(open, loaded);
            assert_ne!(mode, RunMode::Init);
        }
    }
}
