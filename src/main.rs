//! cdpconsole - console streamer for Chrome DevTools Protocol targets
//!
//! Main entry point for the cdpconsole CLI.

use std::process::ExitCode;

use clap::Parser;
use tracing::{debug, info, warn};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use cdpconsole_cdp::{Session, SessionEnd, SessionHandle, SessionOptions, StdoutSink};
use cdpconsole_config::{Config, ConfigLoader, ConfigValidator, LoggingConfig};

mod cli;

use cli::Cli;

/// Prefix of the streamer's own status lines on stdout.
const STATUS_PREFIX: &str = "[cdp-console]";

/// Initialize tracing on stderr, plus a daily-rotated file when a log
/// directory is configured.
///
/// `RUST_LOG` takes precedence over the configured level.
fn init_tracing(logging: &LoggingConfig) -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&logging.level)?,
    };

    let file_layer = match &logging.dir {
        Some(log_dir) => {
            std::fs::create_dir_all(log_dir)?;
            let file_appender = RollingFileAppender::builder()
                .rotation(Rotation::DAILY)
                .filename_prefix("cdpconsole")
                .filename_suffix("log")
                .max_log_files(7)
                .build(log_dir)?;

            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

            // The guard flushes the file writer on drop; keep it for the whole run.
            static GUARD: std::sync::OnceLock<tracing_appender::non_blocking::WorkerGuard> =
                std::sync::OnceLock::new();
            let _ = GUARD.set(guard);

            Some(fmt::layer().with_writer(non_blocking).with_ansi(false))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(env_filter)
        // stdout carries the event stream, diagnostics go to stderr
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .with(file_layer)
        .init();

    Ok(())
}

/// Load the configuration file. An explicitly given file must exist; the
/// default one is optional.
fn load_config(cli: &Cli) -> Result<Config, Box<dyn std::error::Error>> {
    let mut config = match &cli.config {
        Some(path) => ConfigLoader::load(path)?,
        None => match ConfigLoader::default_path() {
            Ok(path) => ConfigLoader::load_or_default(&path)?,
            Err(_) => Config::default(),
        },
    };
    cli.apply_overrides(&mut config.session);
    Ok(config)
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            println!("{} Error: {}", STATUS_PREFIX, e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(&cli)?;
    init_tracing(&config.logging)?;

    let warnings = ConfigValidator::validate(&config)?.into_result()?;
    for warning in warnings {
        warn!("{}: {}", warning.path, warning.message);
    }
    if let Some(path) = &cli.config {
        debug!("Loaded config from {}", path.display());
    }

    let options = SessionOptions {
        connect_timeout: config.session.connect_timeout(),
        fetch_timeout: config.session.fetch_timeout(),
        max_depth: config.session.max_depth,
    };

    info!("Connecting to {}", cli.url);
    let session = Session::connect(&cli.url, &options, Box::new(StdoutSink)).await?;
    info!("Connected, streaming console events");

    spawn_signal_listener(session.handle())?;

    match session.run().await? {
        SessionEnd::ChannelClosed => println!("{} Connection closed", STATUS_PREFIX),
        SessionEnd::CloseRequested => info!("Session closed on request"),
    }
    Ok(())
}

/// Close the session on SIGINT or SIGTERM.
#[cfg(unix)]
fn spawn_signal_listener(handle: SessionHandle) -> std::io::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    tokio::spawn(async move {
        tokio::select! {
            _ = sigterm.recv() => info!("Received SIGTERM"),
            _ = sigint.recv() => info!("Received SIGINT"),
        }
        handle.close().await;
    });
    Ok(())
}

/// Close the session on Ctrl+C (non-Unix fallback).
#[cfg(not(unix))]
fn spawn_signal_listener(handle: SessionHandle) -> std::io::Result<()> {
    tokio::spawn(async move {
        if let Ok(()) = tokio::signal::ctrl_c().await {
            info!("Received Ctrl+C");
            handle.close().await;
        }
    });
    Ok(())
}
