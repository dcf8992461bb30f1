//! Task management for the worker lifecycle.

use std::time::Duration;

use anyhow::{Context, Result};
use futures::future::join_all;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::{
    event::{FailureEvent, FailureSender},
    logging::Logger,
};

/// How long shutdown waits for workers to notice cancellation.
pub const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

/// Spawns workers, fans their failures into a single channel and stops them.
///
/// Every task gets a child of the global token. A task that returns an error
/// places it on the failure channel; only failures that cannot be queued are
/// logged here.
pub struct TaskManager {
    tasks: Vec<TaskInfo>,
    pub global_token: CancellationToken,
    failures: FailureSender,
    log: Logger,
}

impl TaskManager {
    /// Creates a new TaskManager reporting failures through `failures`.
    pub fn new(log: Logger, failures: FailureSender) -> Self {
        Self {
            tasks: Vec::new(),
            global_token: CancellationToken::new(),
            failures,
            log,
        }
    }

    /// Spawns and registers a task with the given name.
    pub fn spawn_task<F, Fut>(&mut self, name: &'static str, task_fn: F)
    where
        F: FnOnce(CancellationToken) -> Fut + Send + 'static,
        Fut: std::future::Future<Output = Result<()>> + Send + 'static,
    {
        let token = self.global_token.child_token();
        let failures = self.failures.clone();
        let log = self.log.clone();

        let handle = tokio::spawn(async move {
            log.info(&format!("Starting task: {name}"));
            match task_fn(token).await {
                Ok(()) => log.info(&format!("Task '{name}' stopped")),
                Err(e) => {
                    let summary = format!("{e:#}");
                    // The supervisor logs the failure it receives.
                    if !failures.report(FailureEvent::new(name, e)) {
                        log.error(&format!(
                            "Task '{name}' failed while shutdown was pending: {summary}"
                        ));
                    }
                }
            }
        });

        self.tasks.push(TaskInfo { name, handle });
    }

    /// Cancels every task and waits for them to finish.
    ///
    /// Worker errors were already reported when they happened, so only a
    /// panic or an exceeded timeout makes this fail.
    pub async fn shutdown_all(&mut self) -> Result<()> {
        self.shutdown_within(SHUTDOWN_TIMEOUT).await
    }

    pub async fn shutdown_within(&mut self, limit: Duration) -> Result<()> {
        self.log
            .info(&format!("Stopping all {} tasks", self.tasks.len()));

        self.global_token.cancel();

        let tasks: Vec<_> = self.tasks.drain(..).collect();
        let waits = tasks.into_iter().map(|task| async move {
            match tokio::time::timeout(limit, task.handle).await {
                Ok(Ok(())) => Ok(()),
                Ok(Err(e)) => Err(anyhow::anyhow!("task '{}' panicked: {e}", task.name)),
                Err(_) => Err(anyhow::anyhow!("task '{}' shutdown timeout exceeded", task.name)),
            }
        });

        let mut first_error = None;
        for result in join_all(waits).await {
            if let Err(e) = result {
                self.log.error(&format!("{e:#}"));
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(error) => Err(error).context("Tasks did not stop cleanly"),
            None => {
                self.log.info("All tasks stopped");
                Ok(())
            }
        }
    }

    /// Returns the count of registered tasks.
    pub fn active_count(&self) -> usize {
        self.tasks.len()
    }
}

struct TaskInfo {
    name: &'static str,
    handle: JoinHandle<()>,
}
