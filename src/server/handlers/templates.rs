//! Template API handlers.

use axum::{
    Json,
    extract::{Path, State},
    http::header,
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::binding::{DataContext, Record};
use crate::editor::{EditorSession, FieldOption, inspector::available_fields};
use crate::error::{CardsmithError, GenerationStep};
use crate::template::TemplateBundle;

use super::super::state::AppState;
use super::{ApiError, api_error, bad_request};

async fn load_bundle(state: &AppState, id: &str) -> Result<TemplateBundle, ApiError> {
    state
        .templates
        .get_template(id)
        .await
        .map_err(api_error)?
        .ok_or_else(|| {
            api_error(CardsmithError::not_found(
                GenerationStep::FetchTemplate,
                format!("template {}", id),
            ))
        })
}

/// GET /api/templates/:id - Template with its elements.
pub async fn get(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<TemplateBundle>, ApiError> {
    load_bundle(&state, &id).await.map(Json)
}

/// PUT /api/templates/:id - Save a template and replace its element set.
pub async fn put(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(bundle): Json<TemplateBundle>,
) -> Result<Json<Value>, ApiError> {
    if bundle.template.id != id {
        return Err(bad_request(format!(
            "Template id {} does not match path {}",
            bundle.template.id, id
        )));
    }
    let cfg = state.generator.config();
    let canvas = (cfg.default_width as f32, cfg.default_height as f32);
    let session = EditorSession::from_bundle(bundle, canvas);
    session
        .save(state.templates.as_ref())
        .await
        .map_err(api_error)?;

    Ok(Json(json!({
        "success": true,
        "elements": session.elements().len(),
    })))
}

/// Body of the preview and fields endpoints. Either a stored record to
/// render for, or inline records per namespace.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct PreviewRequest {
    pub record_id: Option<String>,
    pub records: BTreeMap<String, Record>,
    /// Unsaved edits to preview instead of the stored template.
    pub bundle: Option<TemplateBundle>,
}

impl PreviewRequest {
    async fn context(&self, state: &AppState) -> Result<DataContext, ApiError> {
        if let Some(record_id) = &self.record_id {
            return state
                .generator
                .fetch_context(record_id)
                .await
                .map_err(api_error);
        }
        let cfg = state.generator.config();
        let mut ctx = DataContext::new();
        // Linked first so the target namespace wins collisions.
        for ns in [&cfg.linked_namespace, &cfg.target_namespace] {
            if let Some(record) = self.records.get(ns.as_str()) {
                ctx = ctx.with_namespace(ns.clone(), record.clone());
            }
        }
        for (ns, record) in &self.records {
            if ctx.namespace(ns).is_none() {
                ctx = ctx.with_namespace(ns.clone(), record.clone());
            }
        }
        Ok(ctx)
    }
}

/// POST /api/templates/:id/preview - Render to PNG without uploading.
pub async fn preview(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<PreviewRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let bundle = match &req.bundle {
        Some(bundle) => bundle.clone(),
        None => load_bundle(&state, &id).await?,
    };
    let context = req.context(&state).await?;
    let png = state
        .generator
        .render_preview(&bundle, &context)
        .await
        .map_err(api_error)?;
    Ok(([(header::CONTENT_TYPE, "image/png")], png))
}

/// POST /api/fields - Bindable fields for the binding picker.
pub async fn fields(
    State(state): State<Arc<AppState>>,
    Json(req): Json<PreviewRequest>,
) -> Result<Json<Vec<FieldOption>>, ApiError> {
    let context = req.context(&state).await?;
    Ok(Json(available_fields(&context)))
}
