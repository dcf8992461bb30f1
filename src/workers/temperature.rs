use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::{logging::Logger, sensors::TemperatureSource, workers::traits::Worker};

/// Pause between two temperature samples.
pub const SAMPLE_INTERVAL: Duration = Duration::from_secs(5);

/// Samples the temperature source and forwards every reading.
///
/// A failed read is fatal: the poller stops instead of letting the fan run
/// blind on stale data.
pub struct TemperaturePoller {
    source: Box<dyn TemperatureSource>,
    readings: mpsc::Sender<f64>,
    log: Logger,
}

impl TemperaturePoller {
    pub fn new(
        source: Box<dyn TemperatureSource>,
        readings: mpsc::Sender<f64>,
        log: Logger,
    ) -> Self {
        Self {
            source,
            readings,
            log,
        }
    }
}

#[async_trait]
impl Worker for TemperaturePoller {
    fn name(&self) -> &'static str {
        "temperature-poller"
    }

    async fn run(self: Box<Self>, cancel: CancellationToken) -> Result<()> {
        loop {
            if cancel.is_cancelled() {
                break;
            }

            let celsius = self
                .source
                .read_temperature()
                .await
                .context("temperature read failed")?;

            // A reading taken while cancellation arrived is discarded.
            if cancel.is_cancelled() {
                break;
            }

            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                sent = self.readings.send(celsius) => {
                    if sent.is_err() {
                        self.log.info("temperature-watch: reading consumer is gone");
                        return Ok(());
                    }
                }
            }

            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                () = tokio::time::sleep(SAMPLE_INTERVAL) => {}
            }
        }

        self.log.info("temperature-watch: cancellation requested");
        Ok(())
    }
}
