use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use tokio::process::Command;

use crate::{button::PowerAction, config::PowerCfg};

/// Executes reboot and power-off requests.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PowerControl: Send + Sync {
    async fn perform(&self, action: PowerAction) -> Result<()>;
}

/// Runs the configured system commands.
///
/// A successful reboot never returns in practice. Once started a command is
/// not interrupted by cancellation.
#[derive(Debug, Clone)]
pub struct SystemPower {
    reboot: Vec<String>,
    shutdown: Vec<String>,
}

impl SystemPower {
    pub fn new(cfg: &PowerCfg) -> Self {
        Self {
            reboot: cfg.reboot.clone(),
            shutdown: cfg.shutdown.clone(),
        }
    }

    fn command_for(&self, action: PowerAction) -> &[String] {
        match action {
            PowerAction::Reboot => &self.reboot,
            PowerAction::Shutdown => &self.shutdown,
        }
    }
}

#[async_trait]
impl PowerControl for SystemPower {
    async fn perform(&self, action: PowerAction) -> Result<()> {
        let (program, args) = self
            .command_for(action)
            .split_first()
            .ok_or_else(|| anyhow!("no command configured for {action:?}"))?;

        let status = Command::new(program)
            .args(args)
            .status()
            .await
            .with_context(|| format!("failed to run {program}"))?;

        if status.success() {
            Ok(())
        } else {
            Err(anyhow!("{program} exited with {status}"))
        }
    }
}
