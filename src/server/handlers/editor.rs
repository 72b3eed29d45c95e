//! Slot editor session handlers.
//!
//! Each open editor is a server-owned [`EditorSession`] keyed by UUID:
//! created when the operator enters the editor view, driven by pointer
//! events, rendered back as a PNG overlay, and disposed on save, close, or
//! expiry. The session - not the page - owns the in-progress rectangle.

use axum::{
    Json,
    extract::{Multipart, Path, State},
    http::{StatusCode, header},
    response::IntoResponse,
};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::compositor::encode_png;
use crate::editor::EditorSession;
use crate::error::PhotoboxError;
use crate::geometry::Point;
use crate::registry::{LayoutType, TemplateUpdate};

use super::super::state::{AppState, EditorEntry};
use super::templates::ApiTemplate;
use super::{ApiError, error_response};

/// POST /api/editor - open an editing session.
///
/// Multipart fields: `file` (a new template image) and/or `template_id`
/// (edit an existing template; a `file` alongside replaces its artwork).
pub async fn open(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<serde_json::Value>, ApiError> {
    let mut file: Option<Vec<u8>> = None;
    let mut template_id: Option<u64> = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        error_response(PhotoboxError::Validation(format!("Multipart error: {}", e)))
    })? {
        match field.name().unwrap_or("") {
            "file" => {
                let bytes = field.bytes().await.map_err(|e| {
                    error_response(PhotoboxError::Validation(format!(
                        "Failed to read file field: {}",
                        e
                    )))
                })?;
                file = Some(bytes.to_vec());
            }
            "template_id" => {
                let text = field.text().await.map_err(|e| {
                    error_response(PhotoboxError::Validation(format!(
                        "Failed to read form field: {}",
                        e
                    )))
                })?;
                let id = text.trim().parse::<u64>().map_err(|_| {
                    error_response(PhotoboxError::Validation(format!(
                        "Invalid template id '{}'",
                        text
                    )))
                })?;
                template_id = Some(id);
            }
            _ => {}
        }
    }

    let session = match template_id {
        Some(id) => {
            // Edit flow: load the stored template and its image.
            let (disk_path, slot) = {
                let registry = state.registry.read().await;
                let template = registry.get(id).map_err(error_response)?;
                (
                    registry.image_disk_path(template),
                    template.config.primary().copied(),
                )
            };
            let bytes = tokio::fs::read(&disk_path)
                .await
                .map_err(|e| error_response(PhotoboxError::Io(e)))?;
            let image = tokio::task::spawn_blocking(move || {
                image::load_from_memory(&bytes)
                    .map_err(|e| PhotoboxError::Image(format!("Failed to decode image: {}", e)))
            })
            .await
            .map_err(|e| error_response(PhotoboxError::Image(format!("Task error: {}", e))))?
            .map_err(error_response)?;

            let mut session = EditorSession::for_template(image, id, slot.as_ref());
            if let Some(bytes) = file {
                session.replace_image(bytes).map_err(error_response)?;
            }
            session
        }
        None => {
            let bytes = file.ok_or_else(|| {
                error_response(PhotoboxError::Validation("No image file chosen".to_string()))
            })?;
            EditorSession::for_new_upload(bytes).map_err(error_response)?
        }
    };

    let id = Uuid::new_v4();
    let (width, height) = session.image_size();
    let rect = session.rect().copied();

    let mut editors = state.editors.write().await;
    editors.insert(id, EditorEntry::new(session));

    Ok(Json(serde_json::json!({
        "id": id.to_string(),
        "width": width,
        "height": height,
        "rect": rect,
    })))
}

/// A pointer event from the editing surface, in image coordinates.
#[derive(Debug, Deserialize)]
pub struct PointerEvent {
    /// "down", "move", or "up"
    pub phase: String,
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
}

/// POST /api/editor/:id/pointer - drive the drag/resize gesture machine.
pub async fn pointer(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(event): Json<PointerEvent>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let id = parse_session_id(&id)?;
    let mut editors = state.editors.write().await;
    let entry = editors.get_mut(&id).ok_or_else(session_gone)?;
    entry.touch();

    let pt = Point::new(event.x, event.y);
    match event.phase.as_str() {
        "down" => entry.session.pointer_down(pt),
        "move" => entry.session.pointer_move(pt),
        "up" => entry.session.pointer_up(),
        other => {
            return Err(error_response(PhotoboxError::Validation(format!(
                "Unknown pointer phase '{}'",
                other
            ))));
        }
    }

    Ok(Json(serde_json::json!({ "rect": entry.session.rect() })))
}

/// GET /api/editor/:id/preview - the editing surface as a PNG: image at
/// natural size with the slot rectangle overlay.
pub async fn preview(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_session_id(&id)?;
    let canvas = {
        let mut editors = state.editors.write().await;
        let entry = editors.get_mut(&id).ok_or_else(session_gone)?;
        entry.touch();
        entry.session.render_overlay()
    };

    // Encode off the async thread
    let png_bytes = tokio::task::spawn_blocking(move || encode_png(&canvas))
        .await
        .map_err(|e| error_response(PhotoboxError::Image(format!("Task error: {}", e))))?
        .map_err(error_response)?;

    Ok(([(header::CONTENT_TYPE, "image/png")], png_bytes))
}

#[derive(Debug, Deserialize)]
pub struct SaveForm {
    pub name: String,
}

/// POST /api/editor/:id/save - validate, persist through the registry, and
/// dispose of the session.
///
/// Validation failures leave the session open so the operator can fix the
/// form and try again.
pub async fn save(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(form): Json<SaveForm>,
) -> Result<(StatusCode, Json<ApiTemplate>), ApiError> {
    let id = parse_session_id(&id)?;

    let (template_id, request) = {
        let mut editors = state.editors.write().await;
        let entry = editors.get_mut(&id).ok_or_else(session_gone)?;
        entry.touch();
        let request = entry.session.save(&form.name).map_err(error_response)?;
        (entry.session.template_id(), request)
    };

    let (status, response) = {
        let mut registry = state.registry.write().await;
        match template_id {
            Some(tid) => {
                let template = registry
                    .update(
                        tid,
                        TemplateUpdate {
                            name: Some(request.name),
                            // The editor only produces single-slot layouts
                            layout_type: Some(LayoutType::Single),
                            config: Some(request.config),
                            image_bytes: request.image_bytes,
                        },
                    )
                    .map_err(error_response)?;
                (StatusCode::OK, ApiTemplate::from(template))
            }
            None => {
                let image_bytes = request.image_bytes.ok_or_else(|| {
                    error_response(PhotoboxError::Validation(
                        "No image in editor session".to_string(),
                    ))
                })?;
                let template = registry
                    .create(&request.name, LayoutType::Single, request.config, &image_bytes)
                    .map_err(error_response)?;
                (StatusCode::CREATED, ApiTemplate::from(template))
            }
        }
    };

    state.editors.write().await.remove(&id);
    Ok((status, Json(response)))
}

/// DELETE /api/editor/:id - abandon the session.
pub async fn close(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let id = parse_session_id(&id)?;
    state.editors.write().await.remove(&id);
    Ok(Json(serde_json::json!({ "message": "Editor session closed" })))
}

fn parse_session_id(id: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(id).map_err(|_| {
        error_response(PhotoboxError::Validation("Invalid session ID".to_string()))
    })
}

fn session_gone() -> ApiError {
    error_response(PhotoboxError::NotFound(
        "Editor session not found or expired".to_string(),
    ))
}
