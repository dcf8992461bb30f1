use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::{
    fan_controller::{FanActuator, command_for},
    logging::Logger,
    workers::traits::Worker,
};

/// Applies the raise-only policy to each reading.
///
/// A failed bus write is fatal, the same as every other hardware error.
pub struct FanControlWorker {
    fan: Box<dyn FanActuator>,
    readings: mpsc::Receiver<f64>,
    log: Logger,
}

impl FanControlWorker {
    pub fn new(fan: Box<dyn FanActuator>, readings: mpsc::Receiver<f64>, log: Logger) -> Self {
        Self {
            fan,
            readings,
            log,
        }
    }
}

#[async_trait]
impl Worker for FanControlWorker {
    fn name(&self) -> &'static str {
        "fan-controller"
    }

    async fn run(mut self: Box<Self>, cancel: CancellationToken) -> Result<()> {
        loop {
            let celsius = tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    self.log.info("temperature-handler: cancellation requested");
                    return Ok(());
                }
                reading = self.readings.recv() => match reading {
                    Some(celsius) => celsius,
                    None => {
                        self.log.info("temperature-handler: reading source closed");
                        return Ok(());
                    }
                },
            };

            if let Some(speed) = command_for(celsius) {
                self.log.info(&format!(
                    "temperature {celsius:.1}°C, setting fan to {}%",
                    speed.percent()
                ));
                self.fan
                    .set_speed(speed)
                    .await
                    .with_context(|| format!("failed setting fan speed to {}%", speed.percent()))?;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        fan_controller::{FULL_SPEED, MockFanActuator},
        logging::testing::MemoryLog,
    };
    use anyhow::anyhow;
    use mockall::predicate::eq;

    async fn drive(readings: &[f64], fan: MockFanActuator) -> Result<()> {
        let (tx, rx) = mpsc::channel(1);
        let worker = Box::new(FanControlWorker::new(Box::new(fan), rx, MemoryLog::new()));
        let handle = tokio::spawn(worker.run(CancellationToken::new()));

        for &celsius in readings {
            if tx.send(celsius).await.is_err() {
                break;
            }
        }
        drop(tx);

        handle.await.unwrap()
    }

    #[tokio::test]
    async fn one_command_per_hot_reading() {
        let mut fan = MockFanActuator::new();
        fan.expect_set_speed()
            .with(eq(FULL_SPEED))
            .times(3)
            .returning(|_| Ok(()));

        drive(&[51.0, 70.0, 50.5], fan).await.unwrap();
    }

    #[tokio::test]
    async fn cool_readings_issue_no_command() {
        let mut fan = MockFanActuator::new();
        fan.expect_set_speed().never();

        drive(&[20.0, 49.9, 50.0, -3.0], fan).await.unwrap();
    }

    #[tokio::test]
    async fn fan_is_never_lowered_after_cooling_down() {
        let mut fan = MockFanActuator::new();
        fan.expect_set_speed()
            .withf(|speed| speed.percent() == 100)
            .times(1)
            .returning(|_| Ok(()));

        drive(&[30.0, 55.0, 40.0, 25.0, 10.0], fan).await.unwrap();
    }

    #[tokio::test]
    async fn bus_write_failure_is_fatal() {
        let mut fan = MockFanActuator::new();
        fan.expect_set_speed()
            .times(1)
            .returning(|_| Err(anyhow!("remote I/O error")));

        let error = drive(&[65.0, 66.0], fan).await.unwrap_err();

        assert!(format!("{error:#}").contains("failed setting fan speed to 100%: remote I/O error"));
    }

    #[tokio::test]
    async fn cancellation_stops_waiting_for_readings() {
        let mut fan = MockFanActuator::new();
        fan.expect_set_speed().never();
        let (_tx, rx) = mpsc::channel(1);
        let log = MemoryLog::new();
        let cancel = CancellationToken::new();
        let worker = Box::new(FanControlWorker::new(Box::new(fan), rx, log.clone()));

        let handle = tokio::spawn(worker.run(cancel.clone()));
        cancel.cancel();
        handle.await.unwrap().unwrap();

        assert!(log.contains_info("temperature-handler: cancellation requested"));
    }

    #[tokio::test]
    async fn pending_reading_is_ignored_once_cancelled() {
        let mut fan = MockFanActuator::new();
        fan.expect_set_speed().never();
        let (tx, rx) = mpsc::channel(1);
        tx.send(90.0).await.unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let worker = Box::new(FanControlWorker::new(Box::new(fan), rx, MemoryLog::new()));

        worker.run(cancel).await.unwrap();
    }
}
