//! Fan actuator abstraction and the speed policy.

use anyhow::{Result, anyhow};
use async_trait::async_trait;

/// Readings strictly above this raise the fan to full speed.
pub const FAN_TRIGGER_CELSIUS: f64 = 50.0;

/// Speed commanded once the trigger is exceeded.
pub const FULL_SPEED: FanSpeed = FanSpeed(100);

/// Fan duty in percent, always within `0..=100`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct FanSpeed(u8);

impl FanSpeed {
    pub fn new(percent: u8) -> Result<Self> {
        if percent > 100 {
            return Err(anyhow!("fan speed {percent}% is above 100%"));
        }
        Ok(Self(percent))
    }

    pub fn percent(self) -> u8 {
        self.0
    }
}

/// Hardware that can be told how fast the fan should spin.
///
/// # Example
///
/// ```no_run
/// use argononed::fan_controller::{FanActuator, FanSpeed};
/// use anyhow::Result;
///
/// struct Silent;
///
/// #[async_trait::async_trait]
/// impl FanActuator for Silent {
///     async fn set_speed(&self, _speed: FanSpeed) -> Result<()> { Ok(()) }
/// }
/// ```
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FanActuator: Send + Sync {
    async fn set_speed(&self, speed: FanSpeed) -> Result<()>;
}

/// Maps a reading to a fan command.
///
/// Raise-only: there is no command that lowers or stops the fan, so once at
/// full speed it stays there until the board is power cycled.
pub fn command_for(celsius: f64) -> Option<FanSpeed> {
    (celsius > FAN_TRIGGER_CELSIUS).then_some(FULL_SPEED)
}
