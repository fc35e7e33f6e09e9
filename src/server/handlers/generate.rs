//! Generation API handlers.

use axum::{Json, extract::State};
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;

use crate::template::TemplateType;

use super::super::state::AppState;
use super::{ApiError, api_error};

#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    pub template_type: TemplateType,
    pub template_id: String,
    pub record_id: String,
}

#[derive(Debug, Deserialize)]
pub struct BatchRequest {
    pub template_type: TemplateType,
    pub template_id: String,
    pub record_ids: Vec<String>,
}

/// POST /api/generate - Render, upload and persist one output.
pub async fn generate(
    State(state): State<Arc<AppState>>,
    Json(req): Json<GenerateRequest>,
) -> Result<Json<Value>, ApiError> {
    let url = state
        .generator
        .generate(req.template_type, &req.template_id, &req.record_id)
        .await
        .map_err(api_error)?;
    Ok(Json(json!({
        "success": true,
        "url": url,
        "field": req.template_type.url_field(),
    })))
}

/// POST /api/generate/batch - Generate for several records.
pub async fn batch(State(state): State<Arc<AppState>>, Json(req): Json<BatchRequest>) -> Json<Value> {
    let items = state
        .generator
        .generate_batch(req.template_type, &req.template_id, &req.record_ids)
        .await;
    let results: Vec<Value> = items
        .into_iter()
        .map(|item| match item.result {
            Ok(url) => json!({"record_id": item.record_id, "success": true, "url": url}),
            Err(e) => json!({
                "record_id": item.record_id,
                "success": false,
                "error": e.to_string(),
                "step": e.step().map(|s| s.name()),
            }),
        })
        .collect();
    let succeeded = results.iter().filter(|r| r["success"] == true).count();
    Json(json!({
        "success": succeeded == results.len(),
        "succeeded": succeeded,
        "results": results,
    }))
}
