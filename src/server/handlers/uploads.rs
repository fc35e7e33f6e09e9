//! Serving of uploaded files.

use axum::{
    extract::{Path, State},
    http::{StatusCode, header},
    response::IntoResponse,
};
use std::sync::Arc;

use super::super::state::AppState;

/// GET /uploads/*path - An uploaded file, when the store writes to disk.
pub async fn serve(State(state): State<Arc<AppState>>, Path(path): Path<String>) -> impl IntoResponse {
    let Some(root) = &state.uploads_dir else {
        return (StatusCode::NOT_FOUND, "Uploads are not served").into_response();
    };
    let clean_path = path.split('?').next().unwrap_or(&path);
    if clean_path
        .split('/')
        .any(|seg| seg.is_empty() || seg == "." || seg == "..")
    {
        return (StatusCode::NOT_FOUND, "Upload not found").into_response();
    }

    match tokio::fs::read(root.join(clean_path)).await {
        Ok(bytes) => {
            let mime = mime_guess::from_path(clean_path)
                .first_or_octet_stream()
                .to_string();
            (
                [
                    (header::CONTENT_TYPE, mime),
                    (header::CACHE_CONTROL, "public, max-age=31536000".to_string()),
                ],
                bytes,
            )
                .into_response()
        }
        Err(_) => (StatusCode::NOT_FOUND, "Upload not found").into_response(),
    }
}
