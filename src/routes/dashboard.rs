//! Dashboard feeds: KPI snapshot, alerts, sensors and recommendations.

use axum::{extract::Query, extract::State, routing::get, Json, Router};
use serde::Deserialize;

use super::AppState;
use crate::{Alert, Kpis, Recommendation, SensorStatus};

// ---

pub fn router() -> Router<AppState> {
    // ---
    Router::new()
        .route("/kpis", get(kpis))
        .route("/alerts", get(alerts))
        .route("/sensors", get(sensors))
        .route("/recommendations", get(recommendations))
}

async fn kpis(State((api, _)): State<AppState>) -> Json<Kpis> {
    Json(api.fetch_kpis().await)
}

async fn alerts(State((api, _)): State<AppState>) -> Json<Vec<Alert>> {
    Json(api.fetch_alerts().await)
}

async fn sensors(State((api, _)): State<AppState>) -> Json<Vec<SensorStatus>> {
    Json(api.fetch_sensors().await)
}

#[derive(Debug, Deserialize)]
struct RecommendationsQuery {
    #[serde(alias = "fieldId")]
    field_id: String,
}

/// Handle `GET /recommendations?fieldId=`.
async fn recommendations(
    Query(params): Query<RecommendationsQuery>,
    State((api, _)): State<AppState>,
) -> Json<Vec<Recommendation>> {
    Json(api.fetch_recommendations(&params.field_id).await)
}
