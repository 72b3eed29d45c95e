//! Template CRUD and stored image serving.
//!
//! The wire format matches the registry records, except that the slot
//! configuration crosses as serialized text (`config_json`): clients parse
//! it once at their own ingestion boundary, mirroring how this server
//! parses incoming configuration exactly once here.

use axum::{
    Json,
    extract::{Multipart, Path, State},
    http::{StatusCode, header},
    response::IntoResponse,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

use crate::error::PhotoboxError;
use crate::geometry::SlotConfig;
use crate::preview::PreviewBox;
use crate::registry::{LayoutType, Template, TemplateUpdate};

use super::super::state::AppState;
use super::{ApiError, error_response};

/// A template as served to clients.
#[derive(Debug, Serialize)]
pub struct ApiTemplate {
    pub id: u64,
    pub name: String,
    pub image_path: String,
    pub layout_type: LayoutType,
    pub config_json: String,
    pub width: u32,
    pub height: u32,
    pub created_at: DateTime<Utc>,
}

impl From<&Template> for ApiTemplate {
    fn from(t: &Template) -> Self {
        Self {
            id: t.id,
            name: t.name.clone(),
            image_path: t.image_path.clone(),
            layout_type: t.layout_type,
            config_json: t.config.to_json(),
            width: t.width,
            height: t.height,
            created_at: t.created_at,
        }
    }
}

/// Fields collected from a multipart template form.
#[derive(Debug, Default)]
struct TemplateForm {
    name: Option<String>,
    config_json: Option<String>,
    layout_type: Option<LayoutType>,
    file: Option<Vec<u8>>,
}

async fn read_form(mut multipart: Multipart) -> Result<TemplateForm, PhotoboxError> {
    let mut form = TemplateForm::default();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| PhotoboxError::Validation(format!("Multipart error: {}", e)))?
    {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "name" => form.name = Some(read_text(field).await?),
            "config_json" => form.config_json = Some(read_text(field).await?),
            "layout_type" => form.layout_type = Some(read_text(field).await?.parse()?),
            "file" => {
                let bytes = field.bytes().await.map_err(|e| {
                    PhotoboxError::Validation(format!("Failed to read file field: {}", e))
                })?;
                form.file = Some(bytes.to_vec());
            }
            _ => {}
        }
    }
    Ok(form)
}

async fn read_text(field: axum::extract::multipart::Field<'_>) -> Result<String, PhotoboxError> {
    field
        .text()
        .await
        .map_err(|e| PhotoboxError::Validation(format!("Failed to read form field: {}", e)))
}

/// GET /api/templates - list all templates, newest first.
pub async fn list(State(state): State<Arc<AppState>>) -> Json<Vec<ApiTemplate>> {
    let registry = state.registry.read().await;
    Json(registry.list().into_iter().map(ApiTemplate::from).collect())
}

/// GET /api/templates/:id - fetch a single template.
pub async fn get(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> Result<Json<ApiTemplate>, ApiError> {
    let registry = state.registry.read().await;
    let template = registry.get(id).map_err(error_response)?;
    Ok(Json(ApiTemplate::from(template)))
}

/// GET /api/templates/:id/preview-box - the percentage box that aligns the
/// live camera preview with the template's slot at any display scale.
pub async fn preview_box(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> Result<Json<PreviewBox>, ApiError> {
    let registry = state.registry.read().await;
    let template = registry.get(id).map_err(error_response)?;
    Ok(Json(PreviewBox::from_config(
        &template.config,
        template.width,
        template.height,
    )))
}

/// POST /api/admin/templates - create a template from a multipart upload.
pub async fn create(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    let form = read_form(multipart).await.map_err(error_response)?;

    let file = form.file.ok_or_else(|| {
        error_response(PhotoboxError::Validation("No file uploaded".to_string()))
    })?;
    let name = form.name.unwrap_or_default();
    // The one place incoming configuration text becomes typed slots.
    let config = match form.config_json {
        Some(text) => SlotConfig::from_json(&text).map_err(error_response)?,
        None => SlotConfig::default(),
    };
    let layout_type = form.layout_type.unwrap_or_default();

    let mut registry = state.registry.write().await;
    let template = registry
        .create(&name, layout_type, config, &file)
        .map_err(error_response)?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "message": "Template created",
            "id": template.id,
            "image_path": template.image_path,
        })),
    ))
}

/// PUT /api/admin/templates/:id - update fields; the image file is optional
/// and replaces (deletes) the stored one when provided.
pub async fn update(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
    multipart: Multipart,
) -> Result<Json<serde_json::Value>, ApiError> {
    let form = read_form(multipart).await.map_err(error_response)?;

    let config = match form.config_json {
        Some(text) => Some(SlotConfig::from_json(&text).map_err(error_response)?),
        None => None,
    };

    let mut registry = state.registry.write().await;
    registry
        .update(
            id,
            TemplateUpdate {
                name: form.name,
                layout_type: form.layout_type,
                config,
                image_bytes: form.file,
            },
        )
        .map_err(error_response)?;

    Ok(Json(serde_json::json!({ "message": "Template updated" })))
}

/// DELETE /api/admin/templates/:id - remove the record and its image file.
pub async fn remove(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let mut registry = state.registry.write().await;
    registry.delete(id).map_err(error_response)?;
    Ok(Json(serde_json::json!({ "message": "Template deleted" })))
}

/// GET /uploads/*path - serve a stored template image from the data dir.
pub async fn serve_upload(
    State(state): State<Arc<AppState>>,
    Path(path): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    // Stored names are flat UUIDs; anything path-like is not ours.
    if path.contains("..") || path.contains('/') {
        return Err(error_response(PhotoboxError::NotFound(
            "No such upload".to_string(),
        )));
    }

    let disk_path = state.config.data_dir.join("uploads").join(&path);
    let bytes = tokio::fs::read(&disk_path).await.map_err(|_| {
        error_response(PhotoboxError::NotFound(format!("No such upload '{}'", path)))
    })?;

    let mime = mime_guess::from_path(&path).first_or_octet_stream().to_string();
    Ok(([(header::CONTENT_TYPE, mime)], bytes))
}
