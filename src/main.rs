use std::{fs::File, path::PathBuf, process::ExitCode};

use anyhow::{Context, Result, anyhow};
use argononed::{
    application::Application,
    cli::{Cli, Command},
    config::Config,
    service::ServiceManager,
    supervisor::{Outcome, wait_for_signal},
};
use clap::Parser;
use daemonize::Daemonize;
use log::{LevelFilter, error, info};
use syslog::{BasicLogger, Facility, Formatter3164};

const DAEMON_LOG: &str = "/var/tmp/argononed.log";

fn init_log() -> Result<()> {
    syslog::unix(Formatter3164 {
        facility: Facility::LOG_USER,
        hostname: None,
        process: "argononed".into(),
        pid: std::process::id(),
    })
    .map_err(|e| anyhow!("{e}"))
    .and_then(|logger| {
        log::set_boxed_logger(Box::new(BasicLogger::new(logger)))
            .map(|_| log::set_max_level(LevelFilter::Info))
            .map_err(|e| anyhow!("{e}"))
    })
}

fn into_daemon() -> Result<()> {
    File::create(DAEMON_LOG)
        .and_then(|out| Ok((out.try_clone()?, out)))
        .with_context(|| format!("Failed to open {DAEMON_LOG}"))
        .and_then(|(stderr, stdout)| {
            Daemonize::new()
                .stdout(stdout)
                .stderr(stderr)
                .start()
                .map_err(|e| anyhow!("{e}"))
        })
}

/// Builds the runtime after any fork, then runs until a signal or failure.
fn run(cli: &Cli, daemonize: bool) -> Result<String> {
    let (config, path) = Config::load(cli.config.clone())?;

    if daemonize {
        into_daemon()?;
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start tokio runtime")?;

    runtime.block_on(serve(config, path))
}

async fn serve(config: Config, path: Option<PathBuf>) -> Result<String> {
    #[cfg(feature = "tokio-console")]
    console_subscriber::init();

    match path {
        Some(path) => info!("Using configuration {}", path.display()),
        None => info!("No configuration file found, using defaults"),
    }

    let outcome = Application::builder()
        .with_config(config)
        .build()?
        .run(wait_for_signal())
        .await?;

    if let Outcome::Failed(event) = outcome {
        return Err(event.error.context(format!("{} failed", event.worker)));
    }
    Ok(outcome.to_string())
}

/// The daemon needs syslog for its worker logs; the service verbs report on
/// stdout and work without it.
fn manage(cli: &Cli, syslog: Result<()>) -> Result<String> {
    match cli.command() {
        Command::Run { daemonize } => {
            syslog.context("Failed to connect to syslog")?;
            run(cli, daemonize)
        }
        Command::Install => ServiceManager::system()?.install(cli.config.as_deref()),
        Command::Remove => ServiceManager::system()?.remove(),
        Command::Start => ServiceManager::system()?.start(),
        Command::Stop => ServiceManager::system()?.stop(),
        Command::Status => ServiceManager::system()?.status(),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match manage(&cli, init_log()) {
        Ok(status) => {
            info!("{status}");
            println!("{status}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("failed\nError: {e:#}");
            eprintln!("failed\nError: {e:#}");
            ExitCode::FAILURE
        }
    }
}
