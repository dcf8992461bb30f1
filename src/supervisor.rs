//! Supervisor: the one place that decides when the whole controller stops.

use std::{fmt, future::Future};

use anyhow::{Context, Result};
use tokio::{
    signal::unix::{SignalKind, signal},
    sync::mpsc,
};

use crate::{
    event::{FailureEvent, failure_channel},
    logging::Logger,
    task_manager::TaskManager,
    workers::{Worker, spawn_worker},
};

/// Why the control loop ended.
#[derive(Debug)]
pub enum Outcome {
    /// An OS signal asked for a graceful stop.
    Interrupted(String),
    /// A worker failed; the first failure observed is kept.
    Failed(FailureEvent),
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Interrupted(_))
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Interrupted(signal) => write!(f, "Process finished after {signal}"),
            Outcome::Failed(event) => write!(f, "failed: {event}"),
        }
    }
}

/// Owns the workers and the cancellation token.
///
/// Fail fast: the first failure event or OS signal cancels every worker. No
/// retries happen in-process; the service manager restarts the daemon.
pub struct Supervisor {
    task_manager: TaskManager,
    failures: mpsc::Receiver<FailureEvent>,
    log: Logger,
}

impl Supervisor {
    pub fn new(log: Logger) -> Self {
        let (sender, failures) = failure_channel();
        Self {
            task_manager: TaskManager::new(log.clone(), sender),
            failures,
            log,
        }
    }

    /// Starts every worker concurrently.
    pub fn start(&mut self, workers: Vec<Box<dyn Worker>>) {
        for worker in workers {
            spawn_worker(&mut self.task_manager, worker);
        }
        self.log.info(&format!(
            "Started {} workers",
            self.task_manager.active_count()
        ));
    }

    /// Blocks until `shutdown` resolves or a worker fails, then stops everything.
    pub async fn run_until<S>(mut self, shutdown: S) -> Result<Outcome>
    where
        S: Future<Output = Result<String>>,
    {
        let outcome = tokio::select! {
            received = shutdown => {
                let name = match received {
                    Ok(name) => name,
                    Err(e) => {
                        self.stop().await;
                        return Err(e).context("Failed to listen for shutdown signal");
                    }
                };
                self.log.info(&format!("Got signal: {name}"));
                Outcome::Interrupted(name)
            }
            Some(failure) = self.failures.recv() => {
                self.log.error(&format!("Worker {} failed: {:#}", failure.worker, failure.error));
                Outcome::Failed(failure)
            }
        };

        self.stop().await;
        Ok(outcome)
    }

    async fn stop(&mut self) {
        if let Err(e) = self.task_manager.shutdown_all().await {
            self.log.error(&format!("Error during task shutdown: {e:#}"));
        }
    }
}

/// Resolves with the name of the first termination signal received.
pub async fn wait_for_signal() -> Result<String> {
    let mut interrupt = signal(SignalKind::interrupt()).context("SIGINT handler")?;
    let mut terminate = signal(SignalKind::terminate()).context("SIGTERM handler")?;
    let mut abort = signal(SignalKind::from_raw(libc::SIGABRT)).context("SIGABRT handler")?;

    let name = tokio::select! {
        _ = interrupt.recv() => "SIGINT",
        _ = terminate.recv() => "SIGTERM",
        _ = abort.recv() => "SIGABRT",
    };
    Ok(name.to_string())
}
