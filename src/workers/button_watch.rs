use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::{
    button::{ButtonPin, PowerAction, PulseState, PulseTimer, TICK, ThresholdMode},
    logging::Logger,
    power::PowerControl,
    workers::traits::Worker,
};

/// Watches the power button and turns presses into reboot or power-off.
///
/// Every outer iteration re-arms edge detection, waits one tick and then
/// samples the line each tick while it stays high. Cancellation is checked at
/// the top of the loop and races every tick, so the worst-case stop latency
/// is one tick plus a power command already in flight.
pub struct ButtonWatcher {
    pin: Box<dyn ButtonPin>,
    power: Box<dyn PowerControl>,
    mode: ThresholdMode,
    log: Logger,
}

impl ButtonWatcher {
    pub fn new(
        pin: Box<dyn ButtonPin>,
        power: Box<dyn PowerControl>,
        mode: ThresholdMode,
        log: Logger,
    ) -> Self {
        Self {
            pin,
            power,
            mode,
            log,
        }
    }

    /// Measures one press. `Ok(None)` covers both "nothing pressed" and
    /// "cancelled mid-press"; the caller re-checks the token.
    async fn measure(
        &mut self,
        timer: &mut PulseTimer,
        cancel: &CancellationToken,
    ) -> Result<Option<Duration>> {
        self.pin.arm_rising_edge()?;
        timer.armed();
        timer.waiting();

        loop {
            if !wait_tick(cancel).await {
                timer.reset();
                return Ok(None);
            }

            if let Some(pulse) = timer.sample(self.pin.is_high()) {
                return Ok(Some(pulse));
            }

            if timer.state() == PulseState::Idle {
                return Ok(None);
            }
        }
    }
}

#[async_trait]
impl Worker for ButtonWatcher {
    fn name(&self) -> &'static str {
        "button-watcher"
    }

    async fn run(mut self: Box<Self>, cancel: CancellationToken) -> Result<()> {
        let mut timer = PulseTimer::new();

        while !cancel.is_cancelled() {
            let pulse = self
                .measure(&mut timer, &cancel)
                .await
                .context("button line unavailable")?;

            // A pulse that ends as cancellation arrives is dropped.
            if cancel.is_cancelled() {
                break;
            }

            if let Some(pulse) = pulse {
                act(self.power.as_ref(), self.mode, &self.log, pulse).await?;
            }
            timer.reset();
        }

        self.log.info("button-watch: cancellation requested");
        Ok(())
    }
}

/// Runs every action for the pulse in order; the first error wins.
async fn act(
    power: &dyn PowerControl,
    mode: ThresholdMode,
    log: &Logger,
    pulse: Duration,
) -> Result<()> {
    let mut first_error = None;

    for action in mode.classify(pulse) {
        log.info(&format!(
            "button-watch: {:.1}s press, requesting {}",
            pulse.as_secs_f64(),
            describe(action)
        ));

        if let Err(e) = power.perform(action).await {
            let e = e.context(format!("{} request failed", describe(action)));
            log.error(&format!("button-watch: {e:#}"));
            first_error.get_or_insert(e);
        }
    }

    first_error.map_or(Ok(()), Err)
}

/// Sleeps one tick. Returns `false` if cancelled first.
async fn wait_tick(cancel: &CancellationToken) -> bool {
    tokio::select! {
        biased;
        () = cancel.cancelled() => false,
        () = tokio::time::sleep(TICK) => true,
    }
}

fn describe(action: PowerAction) -> &'static str {
    match action {
        PowerAction::Reboot => "reboot",
        PowerAction::Shutdown => "shutdown",
    }
}
