//! HTTP handlers for the server.

pub mod capture;
pub mod editor;
pub mod templates;

use axum::Json;
use axum::http::StatusCode;

use crate::error::PhotoboxError;

/// Error payload shape shared by every API endpoint.
pub(super) type ApiError = (StatusCode, Json<serde_json::Value>);

/// Map a domain error onto the wire: validation 400, missing resources 404,
/// camera/flow conflicts 409, everything else 500.
pub(super) fn error_response(err: PhotoboxError) -> ApiError {
    let status = match &err {
        PhotoboxError::Validation(_) => StatusCode::BAD_REQUEST,
        PhotoboxError::NotFound(_) => StatusCode::NOT_FOUND,
        PhotoboxError::Camera(_) => StatusCode::CONFLICT,
        PhotoboxError::Image(_) | PhotoboxError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(serde_json::json!({ "message": err.to_string() })))
}
