//! Application entry point for the `dots-telemetry` service.
//!
//! This binary orchestrates the full startup sequence, including:
//! - Loading configuration from environment variables or `.env`
//! - Initializing structured logging/tracing
//! - Seeding the in-memory store with the dashboard demo data
//! - Starting the telemetry simulator on its configured interval
//! - Mounting all API routes via the `routes` gateway (EMBP pattern)
//! - Serving until Ctrl-C, then stopping the simulator
//!
//! # Environment Variables
//! See [`dots_telemetry::config::load_from_env`] for the service settings, plus:
//! - `AXUM_LOG_LEVEL` (optional) – log verbosity (default: `debug`)
//! - `AXUM_SPAN_EVENTS` (optional) – span event mode for tracing
//! - `FORCE_COLOR` (optional) – force ANSI colors on or off
use std::env;

use anyhow::Result;
use axum::Router;
use dotenvy::dotenv;
use is_terminal::IsTerminal;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;

use dots_telemetry::{config, routes, DataApi, Simulator, Store};

// ---

#[tokio::main]
async fn main() -> Result<()> {
    // ---
    dotenv().ok();
    init_tracing();

    let cfg = config::load_from_env()?;
    cfg.log_config();

    let store = Store::seeded()
        .with_max_readings(cfg.max_readings)
        .into_shared();
    let api = DataApi::new(store.clone(), cfg.latency());

    let mut simulator = Simulator::new(store, cfg.sim_settings()).await;
    simulator.start(cfg.sim_interval()).await;

    // Build app from routes gateway (EMBP)
    let app: Router = routes::router(api, cfg.clone());

    tracing::info!("Listening on {}", cfg.bind_addr);

    let listener = tokio::net::TcpListener::bind(cfg.bind_addr)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind '{}': {}", cfg.bind_addr, e))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    simulator.stop().await;
    tracing::info!("Shutdown complete");

    Ok(())
}

// ---

async fn shutdown_signal() {
    // ---
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

/// Install the process-wide tracing subscriber.
///
/// Output is compact and carries target, file and line, so simulator ticks
/// (`dots_telemetry::simulator`) and facade calls (`dots_telemetry::api`) are
/// easy to tell apart. Verbosity comes from `RUST_LOG` when set, otherwise
/// from [`filter_directives`]. `AXUM_SPAN_EVENTS=full|enter_exit` widens span
/// events beyond CLOSE; `FORCE_COLOR` overrides TTY colour detection.
fn init_tracing() {
    // ---
    let span_events = match env::var("AXUM_SPAN_EVENTS").as_deref() {
        Ok("full") => FmtSpan::FULL,
        Ok("enter_exit") => FmtSpan::ENTER | FmtSpan::EXIT,
        _ => FmtSpan::CLOSE,
    };

    let use_color = match env::var("FORCE_COLOR").as_deref() {
        Ok("1") | Ok("true") | Ok("yes") => true,
        Ok("0") | Ok("false") | Ok("no") => false,
        _ => std::io::stdout().is_terminal(),
    };

    let env_filter = if env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        let level = env::var("AXUM_LOG_LEVEL").ok();
        EnvFilter::new(filter_directives(level.as_deref()))
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

/// Filter used when `RUST_LOG` is unset.
///
/// `level` (from `AXUM_LOG_LEVEL`) applies to the service; unknown values
/// fall back to `debug`. The simulator is capped at `info` unless `trace` is
/// asked for, since it logs every tick at debug. HTTP internals stay at `info`.
fn filter_directives(level: Option<&str>) -> String {
    // ---
    let level = match level {
        Some(l @ ("trace" | "debug" | "info" | "warn" | "error")) => l,
        _ => "debug",
    };
    let sim_level = match level {
        "trace" => "trace",
        "debug" => "info",
        other => other,
    };
    format!("{level},dots_telemetry::simulator={sim_level},hyper=info")
}
