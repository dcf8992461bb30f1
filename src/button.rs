//! Pulse timing and classification for the shutdown button.
//!
//! A press is measured in fixed ticks. Arming contributes one tick and every
//! high sample adds another, so a line held high for `T` ticks measures
//! `0.1 + 0.1 * T` seconds.

use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Sampling granularity for both pulse accumulation and cancellation checks.
pub const TICK: Duration = Duration::from_millis(100);

/// Shortest press that reboots.
pub const REBOOT_MIN: Duration = Duration::from_secs(2);
/// Corrected mode: presses at or above this no longer reboot.
pub const REBOOT_MAX: Duration = Duration::from_secs(3);
/// Shortest press that powers off.
pub const SHUTDOWN_MIN: Duration = Duration::from_secs(4);

/// Digital input wired to the button, configured once with a pull-down.
#[cfg_attr(test, mockall::automock)]
pub trait ButtonPin: Send {
    /// Re-arms rising-edge detection for the next press.
    fn arm_rising_edge(&mut self) -> Result<()>;

    /// Current level of the line.
    fn is_high(&self) -> bool;
}

/// What a classified press asks the system to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerAction {
    Reboot,
    Shutdown,
}

/// How pulse durations are mapped to power actions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ThresholdMode {
    /// `d >= 2 || d <= 3` reboots, which holds for every press, and
    /// `d >= 4` additionally powers off after the reboot attempt.
    Literal,
    /// `[2, 3)` reboots, `>= 4` powers off, everything else is ignored.
    #[default]
    Corrected,
}

impl ThresholdMode {
    /// Returns the actions for a pulse, in the order they must run.
    pub fn classify(self, pulse: Duration) -> Vec<PowerAction> {
        match self {
            ThresholdMode::Literal => {
                let mut actions = Vec::with_capacity(2);
                if pulse >= REBOOT_MIN || pulse <= REBOOT_MAX {
                    actions.push(PowerAction::Reboot);
                }
                if pulse >= SHUTDOWN_MIN {
                    actions.push(PowerAction::Shutdown);
                }
                actions
            }
            ThresholdMode::Corrected => {
                if pulse >= SHUTDOWN_MIN {
                    vec![PowerAction::Shutdown]
                } else if pulse >= REBOOT_MIN && pulse < REBOOT_MAX {
                    vec![PowerAction::Reboot]
                } else {
                    Vec::new()
                }
            }
        }
    }
}

/// Where the watcher is within one press-and-release cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PulseState {
    /// No press observed yet.
    Idle,
    /// Rising-edge detection has been re-armed.
    Arming,
    /// Sleeping one tick before the first level check.
    WaitingForPress,
    /// Line is high; one tick is added per high sample.
    Measuring { ticks: u32 },
    /// Line went low; the pulse duration is final.
    Classifying { ticks: u32 },
}

/// Step-wise pulse measurement driven by level samples.
///
/// Ticks are counted as integers so `40` samples are exactly four seconds;
/// summing `0.1` floats would drift below the threshold.
#[derive(Debug, Clone)]
pub struct PulseTimer {
    state: PulseState,
}

impl Default for PulseTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl PulseTimer {
    pub fn new() -> Self {
        Self {
            state: PulseState::Idle,
        }
    }

    pub fn state(&self) -> PulseState {
        self.state
    }

    /// Edge detection has been armed for the next press.
    pub fn armed(&mut self) {
        self.state = PulseState::Arming;
    }

    /// The settle tick after arming is about to be slept.
    pub fn waiting(&mut self) {
        self.state = PulseState::WaitingForPress;
    }

    /// Feeds one level sample taken after a tick has elapsed.
    ///
    /// Returns the pulse duration once the line has been seen high and then
    /// low. A low first sample means nothing was pressed and the timer goes
    /// back to idle.
    pub fn sample(&mut self, high: bool) -> Option<Duration> {
        match (self.state, high) {
            (PulseState::WaitingForPress, true) => {
                self.state = PulseState::Measuring { ticks: 2 };
                None
            }
            (PulseState::WaitingForPress, false) => {
                self.state = PulseState::Idle;
                None
            }
            (PulseState::Measuring { ticks }, true) => {
                self.state = PulseState::Measuring { ticks: ticks + 1 };
                None
            }
            (PulseState::Measuring { ticks }, false) => {
                self.state = PulseState::Classifying { ticks };
                Some(ticks_to_duration(ticks))
            }
            _ => None,
        }
    }

    /// Drops any partially measured pulse.
    pub fn reset(&mut self) {
        self.state = PulseState::Idle;
    }
}

/// Duration of `ticks` ticks.
pub fn ticks_to_duration(ticks: u32) -> Duration {
    TICK * ticks
}
