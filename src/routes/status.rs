// src/routes/status.rs
//! Liveness and client configuration endpoints.
//!
//! `/health` is used by container orchestrators and CI to check the process
//! answers HTTP; it never touches the store. `/config` hands the dashboard
//! the plain strings it needs to render (API base URL, map tile template).

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use super::AppState;

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
}

#[derive(Serialize)]
struct ClientConfig {
    api_base_url: String,
    map_tile_url: String,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

async fn client_config(State((_, config)): State<AppState>) -> Json<ClientConfig> {
    Json(ClientConfig {
        api_base_url: config.api_base_url,
        map_tile_url: config.map_tile_url,
    })
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/config", get(client_config))
}
