//! Configuration loader for the `dots-telemetry` service.
//!
//! This module centralizes all runtime configuration values and their defaults,
//! loading from environment variables (with optional `.env` file support
//! provided by the caller). Every variable is optional; malformed values are
//! reported as errors rather than silently replaced by defaults.
//!
use std::env;
use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{anyhow, Result};

use crate::latency::Latency;
use crate::simulator::SimSettings;

/// Parse an optional numeric environment variable with a default value.
macro_rules! parse_env_num {
    ($var_name:expr, $ty:ty, $default:expr) => {
        env::var($var_name)
            .ok()
            .map(|v| v.trim().parse::<$ty>())
            .transpose()
            .map_err(|e| anyhow!("Invalid {}: {}", $var_name, e))?
            .unwrap_or($default)
    };
}

/// Read an optional string environment variable with a default value.
macro_rules! env_or {
    ($var_name:expr, $default:expr) => {
        env::var($var_name).unwrap_or_else(|_| $default.to_string())
    };
}

pub const DEFAULT_TILE_URL: &str = "https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png";

/// Strongly typed application configuration.
///
/// All fields are immutable after loading, ensuring a consistent configuration
/// snapshot for the lifetime of the application.
#[derive(Debug, Clone)]
pub struct Config {
    // ---
    /// Address the HTTP server binds to.
    pub bind_addr: SocketAddr,

    /// Period between simulator ticks, in milliseconds.
    pub sim_interval_ms: u64,

    /// Fixed RNG seed for the simulator. Unset seeds from entropy.
    pub sim_seed: Option<u64>,

    /// Probability that a tick raises an alert.
    pub alert_probability: f64,

    /// Probability that a tick emits a recommendation.
    pub recommendation_probability: f64,

    /// Simulated latency of every data access call, in milliseconds.
    pub api_latency_ms: u64,

    /// Extra uniform latency on top of `api_latency_ms`; 0 keeps it fixed.
    pub api_latency_jitter_ms: u64,

    /// Readings kept in memory; 0 keeps all of them.
    pub max_readings: usize,

    /// Base URL dashboard clients use to reach this API.
    pub api_base_url: String,

    /// Map tile server template used by the dashboard map.
    pub map_tile_url: String,
}

/// Load configuration from environment variables with defaults.
///
/// Optional:
/// - `BIND_ADDR` – listen address (default: `0.0.0.0:8080`)
/// - `SIM_INTERVAL_MS` – simulator period (default: 5000)
/// - `SIM_SEED` – simulator RNG seed (default: random)
/// - `ALERT_PROBABILITY` – per-tick alert chance in [0, 1] (default: 0.3)
/// - `RECOMMENDATION_PROBABILITY` – per-tick recommendation chance (default: 0.2)
/// - `API_LATENCY_MS` – simulated call latency (default: 100)
/// - `API_LATENCY_JITTER_MS` – extra uniform latency (default: 0)
/// - `MAX_READINGS` – reading retention cap, 0 = unbounded (default: 0)
/// - `API_BASE_URL` – client-facing API base (default: `http://localhost:8080`)
/// - `MAP_TILE_URL` – tile server template (default: OpenStreetMap)
///
/// Returns an error if any variable is present but invalid.
pub fn load_from_env() -> Result<Config> {
    // ---
    let bind_addr = env_or!("BIND_ADDR", "0.0.0.0:8080");
    let bind_addr: SocketAddr = bind_addr
        .parse()
        .map_err(|e| anyhow!("Invalid BIND_ADDR '{}': {}", bind_addr, e))?;

    let sim_interval_ms = parse_env_num!("SIM_INTERVAL_MS", u64, 5000);
    let sim_seed = env::var("SIM_SEED")
        .ok()
        .map(|v| v.trim().parse::<u64>())
        .transpose()
        .map_err(|e| anyhow!("Invalid SIM_SEED: {}", e))?;
    let alert_probability = parse_env_num!("ALERT_PROBABILITY", f64, 0.3);
    let recommendation_probability = parse_env_num!("RECOMMENDATION_PROBABILITY", f64, 0.2);
    let api_latency_ms = parse_env_num!("API_LATENCY_MS", u64, 100);
    let api_latency_jitter_ms = parse_env_num!("API_LATENCY_JITTER_MS", u64, 0);
    let max_readings = parse_env_num!("MAX_READINGS", usize, 0);
    let api_base_url = env_or!("API_BASE_URL", "http://localhost:8080");
    let map_tile_url = env_or!("MAP_TILE_URL", DEFAULT_TILE_URL);

    let cfg = Config {
        bind_addr,
        sim_interval_ms,
        sim_seed,
        alert_probability,
        recommendation_probability,
        api_latency_ms,
        api_latency_jitter_ms,
        max_readings,
        api_base_url,
        map_tile_url,
    };
    cfg.validate()?;
    Ok(cfg)
}

impl Default for Config {
    fn default() -> Self {
        Config {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            sim_interval_ms: 5000,
            sim_seed: None,
            alert_probability: 0.3,
            recommendation_probability: 0.2,
            api_latency_ms: 100,
            api_latency_jitter_ms: 0,
            max_readings: 0,
            api_base_url: "http://localhost:8080".to_string(),
            map_tile_url: DEFAULT_TILE_URL.to_string(),
        }
    }
}

impl Config {
    // ---
    /// Reject values that parse but make no sense.
    pub fn validate(&self) -> Result<()> {
        // ---
        for (name, p) in [
            ("ALERT_PROBABILITY", self.alert_probability),
            ("RECOMMENDATION_PROBABILITY", self.recommendation_probability),
        ] {
            if !(0.0..=1.0).contains(&p) {
                return Err(anyhow!("{} must be within [0, 1], got {}", name, p));
            }
        }
        if self.sim_interval_ms == 0 {
            return Err(anyhow!("SIM_INTERVAL_MS must be greater than 0"));
        }
        Ok(())
    }

    pub fn sim_interval(&self) -> Duration {
        Duration::from_millis(self.sim_interval_ms)
    }

    pub fn latency(&self) -> Latency {
        Latency::from_millis(self.api_latency_ms, self.api_latency_jitter_ms)
    }

    pub fn sim_settings(&self) -> SimSettings {
        SimSettings {
            alert_probability: self.alert_probability,
            recommendation_probability: self.recommendation_probability,
            seed: self.sim_seed,
        }
    }

    /// Log the loaded configuration for debugging purposes.
    pub fn log_config(&self) {
        // ---
        let seed = self
            .sim_seed
            .map_or_else(|| "random".to_string(), |s| s.to_string());
        let retention = match self.max_readings {
            0 => "unbounded".to_string(),
            n => n.to_string(),
        };

        tracing::info!("Configuration loaded:");
        tracing::info!("  BIND_ADDR                  : {}", self.bind_addr);
        tracing::info!("  SIM_INTERVAL_MS            : {}", self.sim_interval_ms);
        tracing::info!("  SIM_SEED                   : {}", seed);
        tracing::info!("  ALERT_PROBABILITY          : {}", self.alert_probability);
        tracing::info!("  RECOMMENDATION_PROBABILITY : {}", self.recommendation_probability);
        tracing::info!("  API_LATENCY_MS             : {}", self.api_latency_ms);
        tracing::info!("  API_LATENCY_JITTER_MS      : {}", self.api_latency_jitter_ms);
        tracing::info!("  MAX_READINGS               : {}", retention);
        tracing::info!("  API_BASE_URL               : {}", self.api_base_url);
        tracing::info!("  MAP_TILE_URL               : {}", self.map_tile_url);
    }
}
