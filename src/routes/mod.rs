//! HTTP gateway over the data access facade.
//!
//! Each sibling module exports a subrouter; this gateway merges them and
//! attaches the shared state, so `main.rs` only sees [`router`] (EMBP).
use axum::Router;

use crate::{Config, DataApi};

mod dashboard;
mod fields;
mod readings;
mod status;

/// Shared state handed to every handler.
pub type AppState = (DataApi, Config);

// ---

pub fn router(api: DataApi, config: Config) -> Router {
    // ---
    Router::new()
        .merge(fields::router())
        .merge(readings::router())
        .merge(dashboard::router())
        .merge(status::router())
        .with_state((api, config))
}
