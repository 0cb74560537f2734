//! # Safety Monitor
//!
//! Throttle security and battery checks, each built on an IIR rolling
//! average with a smoothing weight of 1/8 per sample:
//!
//! `average = (7 * average + sample) / 8`
//!
//! Both averages are seeded at twice their threshold, so a fresh monitor
//! starts out "unsafe" for the throttle and "ok" for the battery until
//! enough samples have been taken.
//!
//! ## Sampling
//!
//! A check samples its input in a tight synchronous loop. The first check
//! takes the whole warm-up budget (31 samples by default); the sample
//! counter is kept across checks, so later checks take a single fresh
//! sample each while the average keeps its history. Each analog sample
//! costs about 100 microseconds on the target.
//!
//! ## Alarm Precedence
//!
//! - An unsafe throttle overwrites any alarm.
//! - Low battery is only raised when no alarm is pending.
//! - Clearing only ever clears the alarm kind the check owns.
//! - A storage failure is never cleared.

use tracing::{debug, warn};

/// Current alarm. Only one alarm is pending at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Alarm {
    #[default]
    None,
    /// Settings failed to load at boot; cleared by a device reset only.
    StorageFailure,
    /// Throttle control above the security threshold.
    Throttle,
    /// Battery voltage at or below its threshold.
    Battery,
}

impl Alarm {
    /// Throttle alarm has top priority and overwrites any other alarm.
    pub fn raise_throttle(&mut self) {
        *self = Alarm::Throttle;
    }

    pub fn clear_throttle(&mut self) {
        if *self == Alarm::Throttle {
            *self = Alarm::None;
        }
    }

    /// Battery alarm never preempts another alarm.
    pub fn raise_battery(&mut self) {
        if *self == Alarm::None {
            *self = Alarm::Battery;
        }
    }

    pub fn clear_battery(&mut self) {
        if *self == Alarm::Battery {
            *self = Alarm::None;
        }
    }
}

/// Exponential moving average with a 1/8 smoothing weight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RollingAverage {
    average: u32,
}

impl RollingAverage {
    pub fn new(seed: u32) -> Self {
        Self { average: seed }
    }

    #[must_use]
    pub fn value(&self) -> u32 {
        self.average
    }

    pub fn push(&mut self, sample: u16) -> u32 {
        self.average = (7 * self.average + u32::from(sample)) >> 3;
        self.average
    }
}

/// Persistent sample counter bounding the sampling loops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleBudget {
    budget: u32,
    taken: u32,
}

impl SampleBudget {
    pub fn new(budget: u32) -> Self {
        Self {
            budget: budget.max(1),
            taken: 0,
        }
    }

    /// Number of samples the next pass takes: the remaining warm-up
    /// samples, and at least one.
    #[must_use]
    pub fn pass_len(&self) -> u32 {
        self.budget - self.taken
    }

    fn complete_pass(&mut self) {
        self.taken = self.budget - 1;
    }
}

/// Throttle security check.
#[derive(Debug, Clone)]
pub struct ThrottleMonitor {
    average: RollingAverage,
    samples: SampleBudget,
}

impl ThrottleMonitor {
    /// `threshold` is the throttle security threshold the average is
    /// seeded from.
    pub fn new(threshold: u16, budget: u32) -> Self {
        Self {
            average: RollingAverage::new(2 * u32::from(threshold)),
            samples: SampleBudget::new(budget),
        }
    }

    #[must_use]
    pub fn average(&self) -> u32 {
        self.average.value()
    }

    /// Samples the throttle control through `read` and updates `alarm`.
    ///
    /// Returns true when the throttle is safe, i.e. the average is strictly
    /// below `threshold`.
    pub fn check(&mut self, threshold: u16, alarm: &mut Alarm, mut read: impl FnMut() -> u16) -> bool {
        let mut sample = 0;
        for _ in 0..self.samples.pass_len() {
            sample = read();
            self.average.push(sample);
        }
        self.samples.complete_pass();

        let safe = self.average.value() < u32::from(threshold);
        if safe {
            alarm.clear_throttle();
        } else {
            if *alarm != Alarm::Throttle {
                warn!(
                    "Throttle security check failed: average {} >= {} (last sample {})",
                    self.average.value(),
                    threshold,
                    sample
                );
            }
            alarm.raise_throttle();
        }
        safe
    }
}

/// Battery voltage check with glitch rejection.
#[derive(Debug, Clone)]
pub struct BatteryMonitor {
    average: RollingAverage,
    samples: SampleBudget,
    last_accepted: u16,
}

impl BatteryMonitor {
    /// `threshold` is the battery threshold the average is seeded from.
    pub fn new(threshold: u16, budget: u32) -> Self {
        Self {
            average: RollingAverage::new(2 * u32::from(threshold)),
            samples: SampleBudget::new(budget),
            last_accepted: 0,
        }
    }

    #[must_use]
    pub fn average(&self) -> u32 {
        self.average.value()
    }

    /// Samples the battery sense input through `read` and updates `alarm`.
    ///
    /// A sample below half the previously accepted one is a misread and is
    /// left out of the average. Returns true when the average is strictly
    /// above `threshold`.
    pub fn check(&mut self, threshold: u16, alarm: &mut Alarm, mut read: impl FnMut() -> u16) -> bool {
        for _ in 0..self.samples.pass_len() {
            let sample = read();
            if sample >= self.last_accepted >> 1 {
                self.average.push(sample);
                self.last_accepted = sample;
            } else {
                debug!(
                    "Ignoring battery sample {} (last accepted {})",
                    sample, self.last_accepted
                );
            }
        }
        self.samples.complete_pass();

        let ok = self.average.value() > u32::from(threshold);
        if ok {
            alarm.clear_battery();
        } else {
            if *alarm == Alarm::None {
                warn!(
                    "Low battery: average {} <= {}",
                    self.average.value(),
                    threshold
                );
            }
            alarm.raise_battery();
        }
        ok
    }
}
