use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use tokio::process::Command;

/// Source of the SoC temperature in degrees Celsius.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TemperatureSource: Send + Sync {
    async fn read_temperature(&self) -> Result<f64>;
}

/// Runs the firmware query tool and parses `temp=<float>'C`.
#[derive(Debug, Clone)]
pub struct CommandSource {
    program: String,
    args: Vec<String>,
}

impl CommandSource {
    /// `command` is the program followed by its arguments.
    pub fn new(command: &[String]) -> Result<Self> {
        let (program, args) = command
            .split_first()
            .ok_or_else(|| anyhow!("temperature command is empty"))?;
        Ok(Self {
            program: program.clone(),
            args: args.to_vec(),
        })
    }
}

#[async_trait]
impl TemperatureSource for CommandSource {
    async fn read_temperature(&self) -> Result<f64> {
        let output = Command::new(&self.program)
            .args(&self.args)
            .output()
            .await
            .with_context(|| format!("failed to run {}", self.program))?;

        if !output.status.success() {
            anyhow::bail!("{} exited with {}", self.program, output.status);
        }

        parse_measure_temp(&String::from_utf8_lossy(&output.stdout))
    }
}

/// Parses the `vcgencmd measure_temp` output format.
pub fn parse_measure_temp(output: &str) -> Result<f64> {
    let value = output
        .trim()
        .strip_prefix("temp=")
        .and_then(|rest| rest.strip_suffix("'C"))
        .ok_or_else(|| anyhow!("unexpected temperature output {:?}", output.trim()))?;

    value
        .parse::<f64>()
        .with_context(|| format!("invalid temperature value {value:?}"))
}
