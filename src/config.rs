//! Configuration for the argononed daemon.
//!
//! The file only describes how the board is wired and which system commands
//! to run. Thresholds and sampling intervals are fixed in code.

use std::{
    env, fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::button::ThresholdMode;

/// Highest BCM GPIO line on the 40-pin header.
const MAX_GPIO: u8 = 27;

/// Main configuration structure.
///
/// # Example
///
/// ```yaml
/// version: 1
/// button:
///   pin: 4
///   thresholds: corrected
/// fan:
///   bus: 0
///   address: 0x1a
///   register: 0x1a
/// temperature:
///   command: ["vcgencmd", "measure_temp"]
/// power:
///   reboot: ["reboot"]
///   shutdown: ["shutdown", "now"]
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Configuration version for compatibility checking.
    pub version: u8,

    #[serde(default)]
    pub button: ButtonCfg,

    #[serde(default)]
    pub fan: FanCfg,

    #[serde(default)]
    pub temperature: TemperatureCfg,

    #[serde(default)]
    pub power: PowerCfg,
}

/// Shutdown button wiring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ButtonCfg {
    /// BCM GPIO number of the button line.
    #[serde(default = "defaults::button_pin")]
    pub pin: u8,

    /// How press durations map to power actions.
    #[serde(default)]
    pub thresholds: ThresholdMode,
}

/// Fan controller on the SMBus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FanCfg {
    /// I2C bus number (`/dev/i2c-N`).
    #[serde(default = "defaults::fan_bus")]
    pub bus: u8,

    /// 7-bit slave address of the fan MCU.
    #[serde(default = "defaults::fan_address")]
    pub address: u16,

    /// Command byte of the SMBus block write.
    #[serde(default = "defaults::fan_register")]
    pub register: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemperatureCfg {
    /// Program and arguments printing `temp=<float>'C`.
    #[serde(default = "defaults::temperature_command")]
    pub command: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PowerCfg {
    #[serde(default = "defaults::reboot_command")]
    pub reboot: Vec<String>,

    #[serde(default = "defaults::shutdown_command")]
    pub shutdown: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: 1,
            button: ButtonCfg::default(),
            fan: FanCfg::default(),
            temperature: TemperatureCfg::default(),
            power: PowerCfg::default(),
        }
    }
}

impl Default for ButtonCfg {
    fn default() -> Self {
        Self {
            pin: defaults::button_pin(),
            thresholds: ThresholdMode::default(),
        }
    }
}

impl Default for FanCfg {
    fn default() -> Self {
        Self {
            bus: defaults::fan_bus(),
            address: defaults::fan_address(),
            register: defaults::fan_register(),
        }
    }
}

impl Default for TemperatureCfg {
    fn default() -> Self {
        Self {
            command: defaults::temperature_command(),
        }
    }
}

impl Default for PowerCfg {
    fn default() -> Self {
        Self {
            reboot: defaults::reboot_command(),
            shutdown: defaults::shutdown_command(),
        }
    }
}

impl Config {
    /// Validates the configuration for consistency.
    ///
    /// ```
    /// use argononed::config::Config;
    ///
    /// Config::default().validate()?;
    /// # Ok::<(), anyhow::Error>(())
    /// ```
    pub fn validate(&self) -> Result<()> {
        if self.button.pin > MAX_GPIO {
            anyhow::bail!(
                "Button pin {} is outside the header range 0..={MAX_GPIO}",
                self.button.pin
            );
        }

        if self.fan.address > 0x7f {
            anyhow::bail!("Fan address {:#x} is not a 7-bit address", self.fan.address);
        }

        for (name, command) in [
            ("temperature.command", &self.temperature.command),
            ("power.reboot", &self.power.reboot),
            ("power.shutdown", &self.power.shutdown),
        ] {
            if command.first().is_none_or(|program| program.trim().is_empty()) {
                anyhow::bail!("Command '{name}' must name a program");
            }
        }

        Ok(())
    }

    /// Loads configuration from the given file or the standard locations.
    ///
    /// Search order:
    /// 1. Provided path parameter
    /// 2. `ARGONONED_CONFIG` environment variable
    /// 3. `$XDG_CONFIG_HOME/argononed/config.yml` or `~/.config/argononed/config.yml`
    /// 4. `/etc/argononed/config.yml`
    ///
    /// An explicit path must exist. Without one, a missing file means the
    /// built-in defaults are used.
    pub fn load(path: Option<PathBuf>) -> Result<(Self, Option<PathBuf>)> {
        let config_path = match path {
            Some(p) => Some(p),
            None => locate_config(),
        };

        match config_path {
            Some(p) => Ok((Self::load_from_path(&p)?, Some(p))),
            None => Ok((Self::default(), None)),
        }
    }

    /// Loads configuration from a specific path.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse YAML in: {}", path.display()))?;

        if config.version != 1 {
            anyhow::bail!(
                "Unsupported config version {} in file: {}",
                config.version,
                path.display()
            );
        }

        config
            .validate()
            .with_context(|| format!("Configuration validation failed for: {}", path.display()))?;

        Ok(config)
    }
}

fn locate_config() -> Option<PathBuf> {
    if let Ok(env_path) = env::var("ARGONONED_CONFIG") {
        return Some(PathBuf::from(env_path));
    }

    if let Some(mut cfg_dir) = env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|| env::var_os("HOME").map(|h| Path::new(&h).join(".config")))
    {
        cfg_dir.push("argononed/config.yml");
        if cfg_dir.exists() {
            return Some(cfg_dir);
        }
    }

    let etc = Path::new("/etc/argononed/config.yml");
    etc.exists().then(|| etc.to_path_buf())
}

mod defaults {
    pub fn button_pin() -> u8 {
        4
    }

    pub fn fan_bus() -> u8 {
        0
    }

    pub fn fan_address() -> u16 {
        0x1a
    }

    pub fn fan_register() -> u8 {
        0x1a
    }

    pub fn temperature_command() -> Vec<String> {
        vec!["vcgencmd".into(), "measure_temp".into()]
    }

    pub fn reboot_command() -> Vec<String> {
        vec!["reboot".into()]
    }

    pub fn shutdown_command() -> Vec<String> {
        vec!["shutdown".into(), "now".into()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serial_test::serial;
    use std::io::Write;
    use tempfile::NamedTempFile;

    // Helper function to create temporary config file
    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(content.as_bytes()).unwrap();
        temp_file.flush().unwrap();
        temp_file
    }

    #[test]
    fn defaults_match_argon_one_wiring() {
        let config = Config::default();

        assert_eq!(config.button.pin, 4);
        assert_eq!(config.button.thresholds, ThresholdMode::Corrected);
        assert_eq!(config.fan.bus, 0);
        assert_eq!(config.fan.address, 0x1a);
        assert_eq!(config.temperature.command, vec!["vcgencmd", "measure_temp"]);
        assert_eq!(config.power.shutdown, vec!["shutdown", "now"]);
        config.validate().unwrap();
    }

    #[test]
    fn config_load_valid_yaml() {
        let temp_file = create_temp_config(
            r#"
version: 1
button:
  pin: 17
  thresholds: literal
fan:
  bus: 1
  address: 0x1b
power:
  reboot: ["systemctl", "reboot"]
"#,
        );

        let config = Config::load_from_path(temp_file.path()).unwrap();

        assert_eq!(config.button.pin, 17);
        assert_eq!(config.button.thresholds, ThresholdMode::Literal);
        assert_eq!(config.fan.bus, 1);
        assert_eq!(config.fan.address, 0x1b);
        assert_eq!(config.fan.register, 0x1a);
        assert_eq!(config.power.reboot, vec!["systemctl", "reboot"]);
        assert_eq!(config.power.shutdown, vec!["shutdown", "now"]);
    }

    #[test]
    fn config_minimal_yaml_uses_defaults() {
        let temp_file = create_temp_config("version: 1\n");

        let config = Config::load_from_path(temp_file.path()).unwrap();

        assert_eq!(config, Config::default());
    }

    #[test]
    fn config_rejects_unknown_version() {
        let temp_file = create_temp_config("version: 2\n");

        let error = Config::load_from_path(temp_file.path()).unwrap_err();

        assert!(error.to_string().contains("Unsupported config version 2"));
    }

    #[test]
    fn config_rejects_malformed_yaml() {
        let temp_file = create_temp_config("version: [1\n");

        let error = Config::load_from_path(temp_file.path()).unwrap_err();

        assert!(error.to_string().contains("Failed to parse YAML"));
    }

    #[test]
    fn config_rejects_unknown_threshold_mode() {
        let temp_file = create_temp_config("version: 1\nbutton:\n  thresholds: sometimes\n");

        assert!(Config::load_from_path(temp_file.path()).is_err());
    }

    #[test]
    fn validate_rejects_empty_command() {
        let mut config = Config::default();
        config.power.shutdown = vec![];

        let error = config.validate().unwrap_err();

        assert!(error.to_string().contains("power.shutdown"));
    }

    #[test]
    fn validate_rejects_blank_program() {
        let mut config = Config::default();
        config.temperature.command = vec!["  ".into()];

        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_pin_outside_header() {
        let mut config = Config::default();
        config.button.pin = 40;

        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_ten_bit_address() {
        let mut config = Config::default();
        config.fan.address = 0x1ff;

        assert!(config.validate().is_err());
    }

    #[test]
    fn validation_failure_is_reported_with_path() {
        let temp_file = create_temp_config("version: 1\nbutton:\n  pin: 99\n");

        let error = Config::load_from_path(temp_file.path()).unwrap_err();

        assert!(error.to_string().contains("Configuration validation failed"));
    }

    #[test]
    fn missing_explicit_path_is_an_error() {
        let result = Config::load(Some(PathBuf::from("/nonexistent/argononed.yml")));

        assert!(result.is_err());
    }

    #[test]
    #[serial]
    fn environment_variable_selects_config_file() {
        let temp_file = create_temp_config("version: 1\nbutton:\n  pin: 22\n");
        // SAFETY: serialised with the other tests touching the environment.
        unsafe { env::set_var("ARGONONED_CONFIG", temp_file.path()) };

        let result = Config::load(None);

        unsafe { env::remove_var("ARGONONED_CONFIG") };
        let (config, path) = result.unwrap();
        assert_eq!(config.button.pin, 22);
        assert_eq!(path.as_deref(), Some(temp_file.path()));
    }

    #[test]
    fn serialized_config_round_trips_through_file() {
        let mut config = Config::default();
        config.button.thresholds = ThresholdMode::Literal;
        let yaml = serde_yaml::to_string(&config).unwrap();
        let temp_file = create_temp_config(&yaml);

        let loaded = Config::load_from_path(temp_file.path()).unwrap();

        assert_eq!(loaded, config);
    }
}
