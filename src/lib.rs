//! # argononed
//!
//! A Linux daemon for the Argon One Raspberry Pi case: it drives the case fan
//! over SMBus and turns power-button presses into reboot or power-off.
//!
//! ## Features
//!
//! - **Async Architecture**: three Tokio workers under one supervisor
//! - **Fan Control**: raise-only policy, full speed above 50°C
//! - **Power Button**: pulse length measured in 100 ms ticks
//! - **Fail Fast**: the first worker failure stops the whole process
//!
//! ## Architecture
//!
//! - [`Supervisor`](supervisor::Supervisor) - owns workers and cancellation
//! - [`TemperaturePoller`](workers::TemperaturePoller) - samples every 5 s
//! - [`FanControlWorker`](workers::FanControlWorker) - applies readings to the fan
//! - [`ButtonWatcher`](workers::ButtonWatcher) - classifies button pulses
//!
//! ## Example
//!
//! ```no_run
//! use argononed::{application::Application, config::Config, supervisor::wait_for_signal};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let (config, _) = Config::load(None)?;
//!     let outcome = Application::builder()
//!         .with_config(config)
//!         .build()?
//!         .run(wait_for_signal())
//!         .await?;
//!     println!("{outcome}");
//!     Ok(())
//! }
//! ```

pub mod application;
pub mod button;
pub mod cli;
pub mod config;
pub mod drivers;
pub mod event;
pub mod fan_controller;
pub mod logging;
pub mod power;
pub mod sensors;
pub mod service;
pub mod supervisor;
pub mod task_manager;
pub mod workers;
