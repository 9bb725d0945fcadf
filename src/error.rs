//! Domain error for lookups against the in-memory store.

use axum::{http::StatusCode, response::IntoResponse, response::Response, Json};
use serde_json::json;
use thiserror::Error;

// ---

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// An id-based lookup matched no stored record.
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// A field update named a sensor the store does not know.
    #[error("unknown sensor: {0}")]
    UnknownSensor(String),

    /// Merged thresholds are negative or have an inverted moisture band.
    #[error("invalid thresholds: {0}")]
    InvalidThresholds(String),
}

impl StoreError {
    // ---
    pub fn field_not_found(id: &str) -> Self {
        StoreError::NotFound {
            kind: "field",
            id: id.to_string(),
        }
    }

    pub fn thresholds_not_found(field_id: &str) -> Self {
        StoreError::NotFound {
            kind: "thresholds",
            id: field_id.to_string(),
        }
    }
}

impl IntoResponse for StoreError {
    fn into_response(self) -> Response {
        // ---
        let status = match self {
            StoreError::NotFound { .. } => StatusCode::NOT_FOUND,
            StoreError::UnknownSensor(_) | StoreError::InvalidThresholds(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    #[test]
    fn test_not_found_message() {
        // ---
        let err = StoreError::field_not_found("field9");
        assert_eq!(err.to_string(), "field not found: field9");

        let err = StoreError::thresholds_not_found("field1");
        assert_eq!(err.to_string(), "thresholds not found: field1");
    }

    #[test]
    fn test_not_found_maps_to_404() {
        // ---
        let response = StoreError::field_not_found("nope").into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_rejected_input_maps_to_422() {
        // ---
        let response = StoreError::UnknownSensor("ghost".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let response = StoreError::InvalidThresholds("x".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
