//! Argon One case: fan MCU on the SMBus and the power button on a GPIO line.

pub mod bus_io;
pub mod pin_io;
pub mod protocol;

use std::sync::Mutex;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use rppal::{gpio::InputPin, i2c::I2c};

use crate::{
    config::{ButtonCfg, FanCfg},
    fan_controller::{FanActuator, FanSpeed},
};

use bus_io::BusIO;
use protocol::Command;

/// Fan MCU reachable through an SMBus handle.
///
/// # Example
///
/// ```no_run
/// use argononed::config::FanCfg;
/// use argononed::drivers::argon_one::ArgonFan;
/// use argononed::fan_controller::{FanActuator, FULL_SPEED};
///
/// # async fn example() -> anyhow::Result<()> {
/// let fan = ArgonFan::open(&FanCfg::default())?;
/// fan.set_speed(FULL_SPEED).await?;
/// # Ok(())
/// # }
/// ```
pub struct ArgonFan<B: BusIO = I2c> {
    bus: Mutex<B>,
    register: u8,
}

impl ArgonFan<I2c> {
    /// Opens the bus once; the handle is owned by the fan controller worker.
    pub fn open(cfg: &FanCfg) -> Result<Self> {
        Ok(Self::with_bus(
            bus_io::open_bus(cfg.bus, cfg.address)?,
            cfg.register,
        ))
    }
}

impl<B: BusIO> ArgonFan<B> {
    pub fn with_bus(bus: B, register: u8) -> Self {
        Self {
            bus: Mutex::new(bus),
            register,
        }
    }
}

#[async_trait]
impl<B: BusIO> FanActuator for ArgonFan<B> {
    async fn set_speed(&self, speed: FanSpeed) -> Result<()> {
        let payload = Command::SetFanSpeed { speed }.to_bytes();
        self.bus
            .lock()
            .map_err(|_| anyhow!("fan bus lock poisoned"))?
            .block_write(self.register, &payload)
    }
}

/// Opens the shutdown button line as a pulled-down input.
pub fn open_button(cfg: &ButtonCfg) -> Result<InputPin> {
    pin_io::open_pin(cfg.pin)
}
