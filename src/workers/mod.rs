//! The three control-loop workers and their common trait.

pub mod button_watch;
pub mod fan_control;
pub mod temperature;
pub mod traits;

pub use button_watch::ButtonWatcher;
pub use fan_control::FanControlWorker;
pub use temperature::TemperaturePoller;
pub use traits::{Worker, spawn_worker};
