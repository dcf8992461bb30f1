//! Logging capability handed to every worker and the supervisor.
//!
//! Components never talk to the global `log` facade directly. They receive an
//! `Arc<dyn LogSink>` so tests can swap in a recording sink and assert on what
//! was reported.

use std::sync::Arc;

/// Destination for informational and error messages.
pub trait LogSink: Send + Sync {
    fn info(&self, message: &str);
    fn error(&self, message: &str);
}

/// Shared handle type passed around the daemon.
pub type Logger = Arc<dyn LogSink>;

/// Forwards to the `log` facade, which the binary points at syslog.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemLog;

impl SystemLog {
    pub fn shared() -> Logger {
        Arc::new(Self)
    }
}

impl LogSink for SystemLog {
    fn info(&self, message: &str) {
        log::info!("{message}");
    }

    fn error(&self, message: &str) {
        log::error!("{message}");
    }
}
