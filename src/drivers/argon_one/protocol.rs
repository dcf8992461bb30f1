use crate::fan_controller::FanSpeed;

/// Requests understood by the Argon One fan MCU.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    SetFanSpeed { speed: FanSpeed },
}

impl Command {
    /// Block-write payload: the speed as a little-endian `u32`.
    pub fn to_bytes(self) -> [u8; 4] {
        match self {
            Command::SetFanSpeed { speed } => u32::from(speed.percent()).to_le_bytes(),
        }
    }
}
