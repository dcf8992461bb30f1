//! systemd unit management for the `install`, `remove`, `start`, `stop` and
//! `status` subcommands.

use std::{
    env, fs,
    path::{Path, PathBuf},
    process::Command,
};

use anyhow::{Context, Result, bail};

pub const SERVICE_NAME: &str = "argononed";
const DESCRIPTION: &str = "Argon One Pi fan and power button controller";
const SYSTEM_UNIT_DIR: &str = "/etc/systemd/system";

/// Installs and drives the daemon's systemd unit.
///
/// Every operation returns a human-readable status line on success.
#[derive(Debug, Clone)]
pub struct ServiceManager {
    unit_dir: PathBuf,
    systemctl: String,
    executable: PathBuf,
}

impl ServiceManager {
    /// Manager for the system unit directory, running the current executable.
    pub fn system() -> Result<Self> {
        let executable = env::current_exe().context("Failed to resolve executable path")?;
        Ok(Self::new(SYSTEM_UNIT_DIR, "systemctl", executable))
    }

    pub fn new(
        unit_dir: impl Into<PathBuf>,
        systemctl: impl Into<String>,
        executable: impl Into<PathBuf>,
    ) -> Self {
        Self {
            unit_dir: unit_dir.into(),
            systemctl: systemctl.into(),
            executable: executable.into(),
        }
    }

    pub fn unit_path(&self) -> PathBuf {
        self.unit_dir.join(format!("{SERVICE_NAME}.service"))
    }

    /// Unit file contents. `config` is passed through to `run` when given.
    pub fn render_unit(&self, config: Option<&Path>) -> String {
        let mut exec = self.executable.display().to_string();
        if let Some(config) = config {
            exec.push_str(&format!(" --config {}", config.display()));
        }
        exec.push_str(" run");

        format!(
            "[Unit]\n\
             Description={DESCRIPTION}\n\
             Requires=multi-user.target\n\
             After=multi-user.target\n\
             \n\
             [Service]\n\
             Type=simple\n\
             ExecStart={exec}\n\
             Restart=on-failure\n\
             \n\
             [Install]\n\
             WantedBy=multi-user.target\n"
        )
    }

    pub fn install(&self, config: Option<&Path>) -> Result<String> {
        let path = self.unit_path();
        if path.exists() {
            bail!("Service has already been installed");
        }

        fs::write(&path, self.render_unit(config))
            .with_context(|| format!("Failed to write unit file: {}", path.display()))?;
        self.systemctl(&["daemon-reload"])?;
        self.systemctl(&["enable", SERVICE_NAME])?;

        Ok(format!("Install {DESCRIPTION}: [OK]"))
    }

    pub fn remove(&self) -> Result<String> {
        let path = self.unit_path();
        if !path.exists() {
            bail!("Service is not installed");
        }

        self.systemctl(&["disable", SERVICE_NAME])?;
        fs::remove_file(&path)
            .with_context(|| format!("Failed to remove unit file: {}", path.display()))?;
        self.systemctl(&["daemon-reload"])?;

        Ok(format!("Removing {DESCRIPTION}: [OK]"))
    }

    pub fn start(&self) -> Result<String> {
        self.ensure_installed()?;
        self.systemctl(&["start", SERVICE_NAME])?;
        Ok(format!("Starting {DESCRIPTION}: [OK]"))
    }

    pub fn stop(&self) -> Result<String> {
        self.ensure_installed()?;
        self.systemctl(&["stop", SERVICE_NAME])?;
        Ok(format!("Stopping {DESCRIPTION}: [OK]"))
    }

    /// `systemctl is-active` exits non-zero for a stopped unit, so the exit
    /// code is not treated as an error here.
    pub fn status(&self) -> Result<String> {
        self.ensure_installed()?;
        let output = Command::new(&self.systemctl)
            .args(["is-active", SERVICE_NAME])
            .output()
            .with_context(|| format!("Failed to run {}", self.systemctl))?;

        let state = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if output.status.success() {
            Ok(format!("Service is running ({state})"))
        } else if state.is_empty() {
            Ok("Service is stopped".to_string())
        } else {
            Ok(format!("Service is stopped ({state})"))
        }
    }

    fn ensure_installed(&self) -> Result<()> {
        if !self.unit_path().exists() {
            bail!("Service is not installed");
        }
        Ok(())
    }

    fn systemctl(&self, args: &[&str]) -> Result<()> {
        let status = Command::new(&self.systemctl)
            .args(args)
            .status()
            .with_context(|| format!("Failed to run {}", self.systemctl))?;

        if !status.success() {
            bail!("{} {} exited with {status}", self.systemctl, args.join(" "));
        }
        Ok(())
    }
}
