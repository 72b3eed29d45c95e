//! Capture flow handlers.
//!
//! The server holds one [`CaptureMachine`] - the kiosk model: one camera,
//! one subject at a time. The browser owns the physical webcam; it reports
//! acquisition results (with the generation token handed out by `select`)
//! and posts frames into the live stream. Compositing happens here, in raw
//! pixel space, so the on-screen preview scale can never leak into the
//! exported photo.

use axum::{
    Json,
    extract::{Multipart, State},
    http::{StatusCode, header},
    response::IntoResponse,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::capture::{CameraStream, CaptureState};
use crate::compositor;
use crate::error::PhotoboxError;
use crate::preview::PreviewBox;

use super::super::state::AppState;
use super::{ApiError, error_response};

/// GET /api/capture/state - current flow state plus the preview box the
/// client needs to align the live video with the slot.
pub async fn status(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let capture = state.capture.read().await;
    let name = capture.state().name();
    let template_id = capture.template_id();
    let has_frame = capture.latest_frame().is_some();
    drop(capture);

    let preview_box = match template_id {
        Some(id) => {
            let registry = state.registry.read().await;
            registry
                .get(id)
                .map(|t| PreviewBox::from_config(&t.config, t.width, t.height))
                .ok()
        }
        None => None,
    };

    Json(serde_json::json!({
        "state": name,
        "template_id": template_id,
        "has_frame": has_frame,
        "preview_box": preview_box,
    }))
}

#[derive(Debug, Deserialize)]
pub struct SelectForm {
    pub template_id: u64,
}

/// POST /api/capture/select - pick a template and start camera
/// acquisition. Returns the generation token the stream must carry.
pub async fn select(
    State(state): State<Arc<AppState>>,
    Json(form): Json<SelectForm>,
) -> Result<Json<serde_json::Value>, ApiError> {
    // A template that does not exist never starts the camera.
    {
        let registry = state.registry.read().await;
        registry.get(form.template_id).map_err(error_response)?;
    }

    let mut capture = state.capture.write().await;
    let generation = capture.select_template(form.template_id);
    Ok(Json(serde_json::json!({ "generation": generation })))
}

#[derive(Debug, Deserialize)]
pub struct GenerationForm {
    pub generation: u64,
}

/// POST /api/capture/attach - the camera came up; attach its stream.
/// A stale generation (the user already navigated away) is rejected and
/// the stream is never retained.
pub async fn attach(
    State(state): State<Arc<AppState>>,
    Json(form): Json<GenerationForm>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let mut capture = state.capture.write().await;
    capture
        .attach_stream(CameraStream::new(form.generation))
        .map_err(error_response)?;
    Ok(Json(serde_json::json!({ "state": capture.state().name() })))
}

/// POST /api/capture/fail - camera acquisition failed (permission denied,
/// no device). The flow returns to browsing.
pub async fn fail(
    State(state): State<Arc<AppState>>,
    Json(form): Json<GenerationForm>,
) -> Json<serde_json::Value> {
    let mut capture = state.capture.write().await;
    capture.acquisition_failed(form.generation);
    tracing::warn!(generation = form.generation, "camera acquisition failed");
    Json(serde_json::json!({ "state": capture.state().name() }))
}

/// POST /api/capture/frame - push the latest camera frame (multipart
/// `frame` field) into the live stream.
pub async fn frame(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<serde_json::Value>, ApiError> {
    let mut frame_data: Option<Vec<u8>> = None;
    while let Some(field) = multipart.next_field().await.map_err(|e| {
        error_response(PhotoboxError::Validation(format!("Multipart error: {}", e)))
    })? {
        if field.name().unwrap_or("") == "frame" {
            let bytes = field.bytes().await.map_err(|e| {
                error_response(PhotoboxError::Validation(format!(
                    "Failed to read frame: {}",
                    e
                )))
            })?;
            frame_data = Some(bytes.to_vec());
            break;
        }
    }
    let bytes = frame_data.ok_or_else(|| {
        error_response(PhotoboxError::Validation("No frame field found".to_string()))
    })?;

    // Decode off the async thread; a frame is a full camera image.
    let frame = tokio::task::spawn_blocking(move || {
        image::load_from_memory(&bytes)
            .map_err(|e| PhotoboxError::Image(format!("Failed to decode frame: {}", e)))
    })
    .await
    .map_err(|e| error_response(PhotoboxError::Image(format!("Task error: {}", e))))?
    .map_err(error_response)?;

    let mut capture = state.capture.write().await;
    capture.push_frame(frame).map_err(error_response)?;
    Ok(Json(serde_json::json!({ "state": capture.state().name() })))
}

/// POST /api/capture/shoot - composite the latest frame into the selected
/// template and move to Captured.
pub async fn shoot(
    State(state): State<Arc<AppState>>,
) -> Result<Json<serde_json::Value>, ApiError> {
    // Snapshot the frame and generation without holding the lock across
    // I/O; the generation lets the machine reject this composite if the
    // user navigates away while it is being produced.
    let (template_id, generation, frame) = {
        let capture = state.capture.read().await;
        match capture.state() {
            CaptureState::Previewing { template_id, .. } => {
                let frame = capture.latest_frame().cloned().ok_or_else(|| {
                    error_response(PhotoboxError::Camera(
                        "No camera frame received yet".to_string(),
                    ))
                })?;
                (*template_id, capture.generation(), frame)
            }
            _ => {
                return Err(error_response(PhotoboxError::Camera(
                    "Nothing is being previewed".to_string(),
                )));
            }
        }
    };

    let (disk_path, slots) = {
        let registry = state.registry.read().await;
        let template = registry.get(template_id).map_err(error_response)?;
        (
            registry.image_disk_path(template),
            template.config.clamped(template.width, template.height).slots,
        )
    };

    // The template must be fully read and decoded before any pixel is
    // touched; compositing never runs on a partial image.
    let bytes = tokio::fs::read(&disk_path)
        .await
        .map_err(|e| error_response(PhotoboxError::Io(e)))?;
    let png = tokio::task::spawn_blocking(move || {
        let template_img = image::load_from_memory(&bytes)
            .map_err(|e| PhotoboxError::Image(format!("Failed to decode template: {}", e)))?;
        compositor::composite_png(&template_img, &frame, &slots)
    })
    .await
    .map_err(|e| error_response(PhotoboxError::Image(format!("Task error: {}", e))))?
    .map_err(error_response)?;

    let mut capture = state.capture.write().await;
    capture.captured(generation, png).map_err(error_response)?;
    tracing::info!(template_id, "photo captured");
    Ok(Json(serde_json::json!({ "state": capture.state().name() })))
}

/// GET /api/capture/photo - download the composited photo.
pub async fn photo(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let capture = state.capture.read().await;
    let bytes = capture
        .photo()
        .ok_or_else(|| {
            error_response(PhotoboxError::NotFound("No captured photo".to_string()))
        })?
        .to_vec();

    let filename = format!("photobox-{}.png", chrono::Utc::now().timestamp_millis());
    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "image/png".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        bytes,
    ))
}

/// POST /api/capture/retake - discard the photo and restart the camera.
pub async fn retake(
    State(state): State<Arc<AppState>>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let mut capture = state.capture.write().await;
    let generation = capture.retake().map_err(error_response)?;
    Ok(Json(serde_json::json!({ "generation": generation })))
}

/// POST /api/capture/back - stop everything and return to the gallery.
pub async fn back(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let mut capture = state.capture.write().await;
    capture.back();
    Json(serde_json::json!({ "state": capture.state().name() }))
}
