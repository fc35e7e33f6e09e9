//! HTTP handlers for the server.

pub mod generate;
pub mod templates;
pub mod uploads;

use axum::{Json, http::StatusCode};
use serde_json::{Value, json};

use crate::error::CardsmithError;

pub type ApiError = (StatusCode, Json<Value>);

/// Map a crate error to a status and `{"success": false, ...}` body.
pub fn api_error(e: CardsmithError) -> ApiError {
    let status = match &e {
        CardsmithError::NotFound { .. } | CardsmithError::UnknownElement(_) => StatusCode::NOT_FOUND,
        CardsmithError::Upload(_) | CardsmithError::Persist(_) | CardsmithError::AssetLoad { .. } => {
            StatusCode::BAD_GATEWAY
        }
        CardsmithError::EmptyQrPayload | CardsmithError::Qr(_) | CardsmithError::InvalidEdit(_) => {
            StatusCode::BAD_REQUEST
        }
        // Request bodies are rejected by the extractors; a JSON error here
        // comes from stored data.
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
        tracing::warn!(error = %e, "Request failed");
    }
    let mut body = json!({"success": false, "error": e.to_string()});
    if let Some(step) = e.step() {
        body["step"] = json!(step.name());
    }
    (status, Json(body))
}

pub fn bad_request(message: impl Into<String>) -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({"success": false, "error": message.into()})),
    )
}
