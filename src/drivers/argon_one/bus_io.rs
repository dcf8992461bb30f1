use anyhow::{Context, Result};
use rppal::i2c::I2c;

/// SMBus primitive used by the fan driver.
#[cfg_attr(test, mockall::automock)]
pub trait BusIO: Send + 'static {
    fn block_write(&mut self, command: u8, payload: &[u8]) -> Result<()>;
}

impl BusIO for I2c {
    fn block_write(&mut self, command: u8, payload: &[u8]) -> Result<()> {
        I2c::block_write(self, command, payload)
            .with_context(|| format!("SMBus block write to register {command:#04x} failed"))
    }
}

/// Opens `/dev/i2c-<bus>` and selects the fan MCU.
pub fn open_bus(bus: u8, address: u16) -> Result<I2c> {
    let mut i2c = I2c::with_bus(bus).with_context(|| format!("/dev/i2c-{bus} unavailable"))?;
    i2c.set_slave_address(address)
        .with_context(|| format!("failed selecting smbus address {address:#04x}"))?;
    Ok(i2c)
}
