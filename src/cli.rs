use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// argononed: fan and power button daemon for the Argon One Pi case
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// YAML config file path (default: search standard locations)
    #[arg(short = 'c', long = "config", global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Run the controller (default)
    Run {
        /// Detach from the terminal before starting
        #[arg(short = 'd', long = "daemonize", default_value = "false")]
        daemonize: bool,
    },
    /// Install the systemd unit
    Install,
    /// Remove the systemd unit
    Remove,
    /// Start the installed service
    Start,
    /// Stop the installed service
    Stop,
    /// Show whether the service is running
    Status,
}

impl Cli {
    /// The requested subcommand, defaulting to a foreground `run`.
    pub fn command(&self) -> Command {
        self.command
            .clone()
            .unwrap_or(Command::Run { daemonize: false })
    }
}
