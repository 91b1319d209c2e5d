//! Application entry point for the `purpleair-sensorflow` service.
//!
//! This binary orchestrates the full startup sequence:
//! - Loading configuration from environment variables or `.env`
//! - Initializing structured logging/tracing
//! - Spawning one poller task per configured sensor
//! - Mounting the status API via the `routes` gateway (EMBP pattern)
//! - Binding the Axum HTTP server and serving requests until Ctrl-C
//!
//! # Environment Variables
//! - `PURPLEAIR_SENSORS` (**required**) – `address[=Display Name]`, comma separated
//! - `AQI_CONVERSION`, `AQI_INSTEAD_OF_DENSITY`, `POLL_INTERVAL_SECS`,
//!   `REQUEST_TIMEOUT_SECS`, `LISTEN_ADDR` (optional, see `config`)
//! - `SENSORFLOW_LOG_LEVEL` (optional) – log verbosity (default: `debug`)
//! - `SENSORFLOW_SPAN_EVENTS` (optional) – span event mode for tracing
use std::{env, io::IsTerminal};

use anyhow::{Context as _, Result};
use dotenvy::dotenv;
use tokio::sync::watch;
use tracing::Instrument as _;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;

use purpleair_sensorflow::{
    config,
    poller::{HttpSource, Poller, SystemClock},
    publisher::TracingPublisher,
    routes,
};

// ---

#[tokio::main]
async fn main() -> Result<()> {
    // ---
    dotenv().ok();
    init_tracing();

    let cfg = config::load_from_env()?;
    cfg.log_config();

    let client = reqwest::Client::builder()
        .timeout(cfg.request_timeout)
        .build()
        .context("failed to build HTTP client")?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut handles = Vec::with_capacity(cfg.sensors.len());
    let mut tasks = Vec::with_capacity(cfg.sensors.len());

    for identity in &cfg.sensors {
        let source = HttpSource::new(client.clone(), identity, cfg.request_timeout);
        tracing::info!("Adding sensor: {}", source.url());

        let poller = Poller::new(
            identity.clone(),
            source,
            TracingPublisher,
            SystemClock,
            cfg.timings(),
            cfg.transform_settings(),
        );
        handles.push(poller.handle());

        let span = tracing::info_span!("sensor", address = %identity.address);
        tasks.push(tokio::spawn(
            poller.start(shutdown_rx.clone()).instrument(span),
        ));
    }

    let app = routes::router(handles);

    tracing::info!("Listening on {}", cfg.listen_addr);
    let listener = tokio::net::TcpListener::bind(cfg.listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", cfg.listen_addr))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Pollers finish at most one in-flight fetch before exiting.
    tracing::info!("Shutting down {} poller(s)", tasks.len());
    shutdown_tx.send_replace(true);
    for task in tasks {
        if let Err(e) = task.await {
            tracing::error!("Poller task failed: {}", e);
        }
    }

    Ok(())
}

async fn shutdown_signal() {
    // ---
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}

// ---

/// Install the process-wide `tracing` subscriber.
///
/// Output is compact with target, file and line. `RUST_LOG` wins when set;
/// otherwise `SENSORFLOW_LOG_LEVEL` picks the crate level (default `debug`)
/// while `reqwest`, `hyper` and `hyper_util` stay at `info` so a poll cycle
/// does not drown in connection chatter. `SENSORFLOW_SPAN_EVENTS` selects
/// `full` or `enter_exit` span events (default: close only), which is how the
/// per-sensor `sensor` span reports its lifetime. `FORCE_COLOR` overrides TTY
/// detection.
///
/// Must run before the first log line; `.env` is loaded ahead of it.
fn init_tracing() {
    // ---
    let span_events = match env::var("SENSORFLOW_SPAN_EVENTS").as_deref() {
        Ok("full") => FmtSpan::FULL,
        Ok("enter_exit") => FmtSpan::ENTER | FmtSpan::EXIT,
        _ => FmtSpan::CLOSE,
    };

    let use_color = match env::var("FORCE_COLOR").as_deref() {
        Ok("1") | Ok("true") | Ok("yes") => true,
        Ok("0") | Ok("false") | Ok("no") => false,
        _ => std::io::stdout().is_terminal(),
    };

    // Use RUST_LOG if available, otherwise fall back to SENSORFLOW_LOG_LEVEL
    let env_filter = if env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        let level = match env::var("SENSORFLOW_LOG_LEVEL").ok().as_deref() {
            Some("trace") => "trace",
            Some("debug") => "debug",
            Some("info") => "info",
            Some("warn") => "warn",
            Some("error") => "error",
            _ => "debug",
        };
        EnvFilter::new(format!("{level},reqwest=info,hyper=info,hyper_util=info"))
    };

    tracing_subscriber::fmt()
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_span_events(span_events)
        .with_env_filter(env_filter)
        .with_ansi(use_color)
        .compact()
        .init();
}
