//! Failure reporting channel shared by all workers.

use std::fmt;

use tokio::sync::mpsc;

/// Only the first failure is guaranteed to reach the supervisor promptly.
const FAILURE_CAPACITY: usize = 1;

/// A fatal error raised by one of the workers.
#[derive(Debug)]
pub struct FailureEvent {
    /// Name of the worker that failed.
    pub worker: &'static str,
    pub error: anyhow::Error,
}

impl FailureEvent {
    pub fn new(worker: &'static str, error: anyhow::Error) -> Self {
        Self { worker, error }
    }
}

impl fmt::Display for FailureEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {:#}", self.worker, self.error)
    }
}

/// Creates the failure channel.
///
/// The sender half is cloned into every spawned worker, the receiver is held
/// by the supervisor.
pub fn failure_channel() -> (FailureSender, mpsc::Receiver<FailureEvent>) {
    let (sender, receiver) = mpsc::channel(FAILURE_CAPACITY);
    (FailureSender { sender }, receiver)
}

/// Multi-producer side of the failure channel.
#[derive(Debug, Clone)]
pub struct FailureSender {
    sender: mpsc::Sender<FailureEvent>,
}

impl FailureSender {
    /// Places a failure on the channel without waiting.
    ///
    /// Returns `false` when the slot is already taken or the supervisor is
    /// gone; in both cases shutdown is already under way and the event is dropped.
    pub fn report(&self, event: FailureEvent) -> bool {
        self.sender.try_send(event).is_ok()
    }
}
