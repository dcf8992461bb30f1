//! Application entry point and builder pattern implementation.

use std::future::Future;

use anyhow::{Context, Result};
use tokio::sync::mpsc;

use crate::{
    button::ButtonPin,
    config::Config,
    drivers::argon_one::{self, ArgonFan},
    fan_controller::FanActuator,
    logging::{Logger, SystemLog},
    power::{PowerControl, SystemPower},
    sensors::{CommandSource, TemperatureSource},
    supervisor::{Outcome, Supervisor},
    workers::{ButtonWatcher, FanControlWorker, TemperaturePoller, Worker},
};

/// Readings are handed over through a single slot.
const READING_CAPACITY: usize = 1;

/// External collaborators the workers talk to.
pub struct Hardware {
    pub temperature: Box<dyn TemperatureSource>,
    pub fan: Box<dyn FanActuator>,
    pub button: Box<dyn ButtonPin>,
    pub power: Box<dyn PowerControl>,
}

impl Hardware {
    /// Opens the GPIO line and the SMBus. Either failing stops startup.
    pub fn open(config: &Config) -> Result<Self> {
        let button = argon_one::open_button(&config.button).context("failed opening gpio")?;
        let fan = ArgonFan::open(&config.fan).context("failed opening smbus")?;
        let temperature = CommandSource::new(&config.temperature.command)?;

        Ok(Self {
            temperature: Box::new(temperature),
            fan: Box::new(fan),
            button: Box::new(button),
            power: Box::new(SystemPower::new(&config.power)),
        })
    }
}

/// The wired-up controller, ready to run.
///
/// # Example
///
/// ```no_run
/// use argononed::{application::Application, config::Config, supervisor::wait_for_signal};
///
/// # async fn example() -> anyhow::Result<()> {
/// let outcome = Application::builder()
///     .with_config(Config::default())
///     .build()?
///     .run(wait_for_signal())
///     .await?;
/// println!("{outcome}");
/// # Ok(())
/// # }
/// ```
pub struct Application {
    config: Config,
    hardware: Hardware,
    log: Logger,
}

impl Application {
    /// Creates a new ApplicationBuilder for constructing Application instances.
    pub fn builder() -> ApplicationBuilder {
        ApplicationBuilder::new()
    }

    /// Runs the three workers until `shutdown` resolves or one of them fails.
    pub async fn run<S>(self, shutdown: S) -> Result<Outcome>
    where
        S: Future<Output = Result<String>>,
    {
        let Hardware {
            temperature,
            fan,
            button,
            power,
        } = self.hardware;
        let (readings_tx, readings_rx) = mpsc::channel(READING_CAPACITY);

        let workers: Vec<Box<dyn Worker>> = vec![
            Box::new(TemperaturePoller::new(
                temperature,
                readings_tx,
                self.log.clone(),
            )),
            Box::new(FanControlWorker::new(fan, readings_rx, self.log.clone())),
            Box::new(ButtonWatcher::new(
                button,
                power,
                self.config.button.thresholds,
                self.log.clone(),
            )),
        ];

        let mut supervisor = Supervisor::new(self.log.clone());
        supervisor.start(workers);
        supervisor.run_until(shutdown).await
    }
}

/// Builder pattern for creating Application instances.
pub struct ApplicationBuilder {
    config: Option<Config>,
    hardware: Option<Hardware>,
    log: Option<Logger>,
}

impl ApplicationBuilder {
    fn new() -> Self {
        Self {
            config: None,
            hardware: None,
            log: None,
        }
    }

    pub fn with_config(mut self, config: Config) -> Self {
        self.config = Some(config);
        self
    }

    /// Uses the given collaborators instead of opening the real devices.
    pub fn with_hardware(mut self, hardware: Hardware) -> Self {
        self.hardware = Some(hardware);
        self
    }

    pub fn with_logger(mut self, log: Logger) -> Self {
        self.log = Some(log);
        self
    }

    /// Builds the Application, opening the hardware unless it was injected.
    pub fn build(self) -> Result<Application> {
        let config = self.config.unwrap_or_default();
        let hardware = match self.hardware {
            Some(hardware) => hardware,
            None => Hardware::open(&config)?,
        };

        Ok(Application {
            config,
            hardware,
            log: self.log.unwrap_or_else(SystemLog::shared),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        button::{MockButtonPin, PowerAction, ThresholdMode},
        fan_controller::{FULL_SPEED, MockFanActuator},
        logging::testing::MemoryLog,
        power::MockPowerControl,
        sensors::MockTemperatureSource,
    };
    use anyhow::anyhow;
    use mockall::predicate::eq;
    use pretty_assertions::assert_eq;
    use std::time::Duration;
    use tokio::time::{Instant, sleep};

    fn sensor(readings: Vec<f64>) -> MockTemperatureSource {
        let last = readings.last().copied().unwrap_or(20.0);
        let mut readings = readings.into_iter();
        let mut source = MockTemperatureSource::new();
        source
            .expect_read_temperature()
            .returning(move || Ok(readings.next().unwrap_or(last)));
        source
    }

    fn idle_button() -> MockButtonPin {
        let mut pin = MockButtonPin::new();
        pin.expect_arm_rising_edge().returning(|| Ok(()));
        pin.expect_is_high().returning(|| false);
        pin
    }

    fn quiet_power() -> MockPowerControl {
        let mut power = MockPowerControl::new();
        power.expect_perform().never();
        power
    }

    async fn signal_after(delay: Duration) -> Result<String> {
        sleep(delay).await;
        Ok("SIGINT".to_string())
    }

    fn app(hardware: Hardware, config: Config, log: Logger) -> Application {
        Application::builder()
            .with_config(config)
            .with_hardware(hardware)
            .with_logger(log)
            .build()
            .unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn temperature_sequence_raises_fan_once() {
        let start = Instant::now();
        let mut fan = MockFanActuator::new();
        fan.expect_set_speed()
            .with(eq(FULL_SPEED))
            .times(1)
            .returning(move |_| {
                assert_eq!(start.elapsed(), Duration::from_secs(5));
                Ok(())
            });

        let hardware = Hardware {
            temperature: Box::new(sensor(vec![30.0, 55.0, 40.0])),
            fan: Box::new(fan),
            button: Box::new(idle_button()),
            power: Box::new(quiet_power()),
        };
        let log = MemoryLog::new();

        let outcome = app(hardware, Config::default(), log.clone())
            .run(signal_after(Duration::from_secs(12)))
            .await
            .unwrap();

        assert!(outcome.is_success());
        assert!(log.contains_info("Got signal: SIGINT"));
        assert!(log.contains_info("temperature-watch: cancellation requested"));
        assert!(log.contains_info("temperature-handler: cancellation requested"));
        assert!(log.contains_info("button-watch: cancellation requested"));
    }

    #[tokio::test(start_paused = true)]
    async fn button_press_reboots_while_fan_loop_keeps_running() {
        let mut pin = MockButtonPin::new();
        pin.expect_arm_rising_edge().returning(|| Ok(()));
        let mut reads = 0;
        pin.expect_is_high().returning(move || {
            reads += 1;
            reads <= 25
        });
        let mut power = MockPowerControl::new();
        power
            .expect_perform()
            .with(eq(PowerAction::Reboot))
            .times(1)
            .returning(|_| Ok(()));
        let mut fan = MockFanActuator::new();
        fan.expect_set_speed().never();

        let hardware = Hardware {
            temperature: Box::new(sensor(vec![42.0])),
            fan: Box::new(fan),
            button: Box::new(pin),
            power: Box::new(power),
        };
        let mut config = Config::default();
        config.button.thresholds = ThresholdMode::Literal;

        let outcome = app(hardware, config, MemoryLog::new())
            .run(signal_after(Duration::from_secs(10)))
            .await
            .unwrap();

        assert!(outcome.is_success());
    }

    #[tokio::test(start_paused = true)]
    async fn sensor_failure_terminates_every_worker() {
        let mut source = MockTemperatureSource::new();
        let mut calls = 0;
        source.expect_read_temperature().returning(move || {
            calls += 1;
            if calls < 3 {
                Ok(60.0)
            } else {
                Err(anyhow!("temperature output \"garbage\""))
            }
        });
        let mut fan = MockFanActuator::new();
        fan.expect_set_speed().times(2).returning(|_| Ok(()));

        let hardware = Hardware {
            temperature: Box::new(source),
            fan: Box::new(fan),
            button: Box::new(idle_button()),
            power: Box::new(quiet_power()),
        };
        let log = MemoryLog::new();

        let outcome = app(hardware, Config::default(), log.clone())
            .run(std::future::pending())
            .await
            .unwrap();

        match outcome {
            Outcome::Failed(event) => {
                assert_eq!(event.worker, "temperature-poller");
                assert!(format!("{:#}", event.error).contains("garbage"));
            }
            other => panic!("expected failure, got {other}"),
        }
        assert!(log.contains_info("button-watch: cancellation requested"));
        assert!(log.contains_info("temperature-handler: cancellation requested"));
    }

    #[tokio::test(start_paused = true)]
    async fn fan_write_failure_terminates_every_worker() {
        let mut fan = MockFanActuator::new();
        fan.expect_set_speed()
            .returning(|_| Err(anyhow!("remote I/O error")));

        let hardware = Hardware {
            temperature: Box::new(sensor(vec![72.0])),
            fan: Box::new(fan),
            button: Box::new(idle_button()),
            power: Box::new(quiet_power()),
        };

        let outcome = app(hardware, Config::default(), MemoryLog::new())
            .run(std::future::pending())
            .await
            .unwrap();

        match outcome {
            Outcome::Failed(event) => assert_eq!(event.worker, "fan-controller"),
            other => panic!("expected failure, got {other}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn failed_power_command_terminates_every_worker() {
        let mut pin = MockButtonPin::new();
        pin.expect_arm_rising_edge().returning(|| Ok(()));
        let mut reads = 0;
        pin.expect_is_high().returning(move || {
            reads += 1;
            reads <= 50
        });
        let mut power = MockPowerControl::new();
        power
            .expect_perform()
            .with(eq(PowerAction::Shutdown))
            .returning(|_| Err(anyhow!("shutdown exited with exit status: 1")));

        let hardware = Hardware {
            temperature: Box::new(sensor(vec![35.0])),
            fan: Box::new(MockFanActuator::new()),
            button: Box::new(pin),
            power: Box::new(power),
        };

        let outcome = app(hardware, Config::default(), MemoryLog::new())
            .run(std::future::pending())
            .await
            .unwrap();

        assert!(!outcome.is_success());
        assert!(outcome.to_string().contains("shutdown request failed"));
    }
}
