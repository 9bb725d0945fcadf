//! Field CRUD and per-field thresholds.
//!
//! Unknown ids surface as `404` through [`StoreError`]'s response mapping.

use axum::{
    extract::Path, extract::State, http::StatusCode, routing::get, Json, Router,
};
use tracing::info;

use super::AppState;
use crate::{Field, FieldPatch, NewField, Recommendation, StoreError, Thresholds, ThresholdsPatch};

// ---

pub fn router() -> Router<AppState> {
    // ---
    Router::new()
        .route("/fields", get(list).post(create))
        .route("/fields/{id}", get(fetch).put(update).delete(remove))
        .route(
            "/fields/{id}/thresholds",
            get(fetch_thresholds).put(update_thresholds),
        )
        .route("/fields/{id}/recommendations", get(recommendations))
}

async fn list(State((api, _)): State<AppState>) -> Json<Vec<Field>> {
    Json(api.fetch_fields().await)
}

async fn fetch(
    Path(id): Path<String>,
    State((api, _)): State<AppState>,
) -> Result<Json<Field>, StoreError> {
    Ok(Json(api.fetch_field_by_id(&id).await?))
}

async fn create(
    State((api, _)): State<AppState>,
    Json(data): Json<NewField>,
) -> (StatusCode, Json<Field>) {
    // ---
    info!("POST /fields - {}", data.name);
    (StatusCode::CREATED, Json(api.add_field(data).await))
}

async fn update(
    Path(id): Path<String>,
    State((api, _)): State<AppState>,
    Json(patch): Json<FieldPatch>,
) -> Result<Json<Field>, StoreError> {
    // ---
    info!("PUT /fields/{}", id);
    Ok(Json(api.update_field(&id, patch).await?))
}

async fn remove(
    Path(id): Path<String>,
    State((api, _)): State<AppState>,
) -> Result<StatusCode, StoreError> {
    // ---
    info!("DELETE /fields/{}", id);
    api.delete_field(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn fetch_thresholds(
    Path(id): Path<String>,
    State((api, _)): State<AppState>,
) -> Result<Json<Thresholds>, StoreError> {
    Ok(Json(api.fetch_thresholds(&id).await?))
}

async fn update_thresholds(
    Path(id): Path<String>,
    State((api, _)): State<AppState>,
    Json(patch): Json<ThresholdsPatch>,
) -> Result<Json<Thresholds>, StoreError> {
    Ok(Json(api.update_thresholds(&id, patch).await?))
}

async fn recommendations(
    Path(id): Path<String>,
    State((api, _)): State<AppState>,
) -> Json<Vec<Recommendation>> {
    Json(api.fetch_recommendations(&id).await)
}
