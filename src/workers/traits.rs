use anyhow::Result;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::task_manager::TaskManager;

/// A long-running piece of the control loop.
///
/// `run` owns the worker for its whole life and returns when the token is
/// cancelled (`Ok`) or when something fatal happened (`Err`).
///
/// # Example
///
/// ```no_run
/// use argononed::workers::Worker;
/// use tokio_util::sync::CancellationToken;
///
/// struct Idle;
///
/// #[async_trait::async_trait]
/// impl Worker for Idle {
///     fn name(&self) -> &'static str { "idle" }
///
///     async fn run(self: Box<Self>, cancel: CancellationToken) -> anyhow::Result<()> {
///         cancel.cancelled().await;
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Worker: Send + 'static {
    /// Name used in logs and failure events.
    fn name(&self) -> &'static str;

    async fn run(self: Box<Self>, cancel: CancellationToken) -> Result<()>;
}

/// Spawns a boxed worker through the task manager.
pub fn spawn_worker(task_manager: &mut TaskManager, worker: Box<dyn Worker>) {
    let name = worker.name();
    task_manager.spawn_task(name, move |token| worker.run(token));
}
