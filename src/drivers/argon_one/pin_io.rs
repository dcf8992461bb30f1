use anyhow::{Context, Result};
use rppal::gpio::{Gpio, InputPin, Trigger};

use crate::button::ButtonPin;

impl ButtonPin for InputPin {
    fn arm_rising_edge(&mut self) -> Result<()> {
        self.set_interrupt(Trigger::RisingEdge, None)
            .context("failed arming rising-edge detection")
    }

    fn is_high(&self) -> bool {
        InputPin::is_high(self)
    }
}

/// Configures `pin` as an input with the pull-down bias enabled.
pub fn open_pin(pin: u8) -> Result<InputPin> {
    Ok(Gpio::new()
        .context("gpio controller unavailable")?
        .get(pin)
        .with_context(|| format!("failed acquiring gpio {pin}"))?
        .into_input_pulldown())
}
