//! # sunsinkd
//!
//! Composition root: the only place that knows about every adapter.
//!
//! ## Startup order
//! 1. Parse the command line and load the configuration (fatal on failure)
//! 2. Install the tracing subscriber (stdout, optionally a file)
//! 3. Log suspicious threshold combinations
//! 4. Bind the liveness endpoint (fatal on failure) and serve it in the
//!    background
//! 5. Watch for `SIGINT` / `SIGTERM`
//! 6. Run the control loop until it fails or a signal arrives
//!
//! A telemetry failure ends the loop, stops the liveness endpoint and exits
//! non-zero so that a supervisor restarts the daemon.

mod config;

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::Context;
use clap::Parser;
use sunsink_adapter_influxdb::InfluxTelemetry;
use sunsink_adapter_tapo::TapoGateway;
use sunsink_app::control_loop::ControlLoop;
use sunsink_app::executor::CommandExecutor;
use sunsink_app::telemetry::TelemetryReader;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::Config;

/// Switches a water heater and a space heater on solar surplus.
#[derive(Debug, Parser)]
#[command(name = "sunsinkd", version, about)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, env = "SUNSINK_CONFIG", default_value = "sunsink.toml")]
    config: PathBuf,

    /// Also append logs, without colours, to this file.
    #[arg(long, value_name = "PATH")]
    log_to_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = Config::load(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    init_tracing(&config.logging.filter, cli.log_to_file.as_deref())?;

    if let Err(err) = run(config).await {
        tracing::error!(error = %format_args!("{err:#}"), "sunsinkd stopped");
        return Err(err);
    }
    Ok(())
}

fn init_tracing(filter: &str, log_file: Option<&Path>) -> anyhow::Result<()> {
    let file_layer = match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("failed to open log file {}", path.display()))?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_new(filter).with_context(|| format!("invalid log filter {filter:?}"))?)
        .with(tracing_subscriber::fmt::layer())
        .with(file_layer)
        .try_init()
        .context("failed to install tracing subscriber")?;
    Ok(())
}

async fn run(config: Config) -> anyhow::Result<()> {
    tracing::info!(
        influxdb = %config.influxdb.url,
        water_heater = %config.appliances.water_heater.address,
        space_heater = %config.appliances.space_heater.address,
        interval_secs = config.control.interval_secs,
        "starting sunsinkd"
    );
    for warning in config.thresholds.warnings() {
        tracing::warn!(%warning, "suspicious thresholds");
    }

    let shutdown = CancellationToken::new();

    let bind_addr = config.bind_addr();
    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind liveness endpoint on {bind_addr}"))?;
    let server = tokio::spawn(sunsink_adapter_http_axum::serve(
        listener,
        shutdown.clone(),
    ));
    tokio::spawn(shutdown_signal(shutdown.clone()));

    let telemetry = InfluxTelemetry::new(config.influxdb.clone())
        .context("failed to build InfluxDB client")?;
    let gateway = TapoGateway::new(&config.tapo).context("failed to build Tapo client")?;

    let control = ControlLoop::new(
        TelemetryReader::new(telemetry),
        CommandExecutor::new(gateway, config.cooldown(), shutdown.clone()),
        config.control_settings(),
        shutdown.clone(),
    );
    let outcome = control.run().await;

    shutdown.cancel();
    match server.await {
        Ok(Ok(())) => {}
        Ok(Err(err)) => tracing::warn!(error = %err, "liveness endpoint failed"),
        Err(err) => tracing::warn!(error = %err, "liveness endpoint task panicked"),
    }

    outcome.context("control loop stopped")?;
    tracing::info!("sunsinkd stopped");
    Ok(())
}

/// Cancel `shutdown` on `SIGINT` (Ctrl+C) or, on Unix, `SIGTERM`.
async fn shutdown_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %err, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                tracing::warn!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("received Ctrl+C, shutting down"),
        () = terminate => tracing::info!("received SIGTERM, shutting down"),
        () = shutdown.cancelled() => return,
    }
    shutdown.cancel();
}
