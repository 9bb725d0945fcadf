use axum::{extract::Query, extract::State, routing::get, Json, Router};
use tracing::info;

use super::AppState;
use crate::{Reading, ReadingsFilter};

// ---

pub fn router() -> Router<AppState> {
    // ---
    Router::new().route("/readings", get(handler))
}

/// Handle `GET /readings?fieldId=&sensorId=&limit=`.
///
/// `sensorId` wins over `fieldId`; `limit` returns the most recent entries.
async fn handler(
    Query(filter): Query<ReadingsFilter>,
    State((api, _)): State<AppState>,
) -> Json<Vec<Reading>> {
    // ---
    info!("GET /readings - {:?}", filter);
    Json(api.fetch_readings(&filter).await)
}
