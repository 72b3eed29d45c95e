//! Static file serving for the frontend.

use axum::{
    extract::{Path, State},
    http::{StatusCode, header},
    response::{Html, IntoResponse},
};
use include_dir::{Dir, include_dir};
use std::sync::Arc;

use super::state::AppState;

/// Embedded frontend distribution files.
static FRONTEND_DIST: Dir = include_dir!("$CARGO_MANIFEST_DIR/frontend/dist");

/// Serve GET / - the photobooth gallery/capture page.
pub async fn index_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    serve_page(&state, "index.html")
}

/// Serve GET /admin - the template dashboard.
pub async fn admin_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    serve_page(&state, "admin.html")
}

/// Serve GET /editor - the slot editor page (create and edit flows).
pub async fn editor_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    serve_page(&state, "editor.html")
}

/// Serve an embedded page with cache-busting parameters injected into
/// script/link tags.
fn serve_page(state: &AppState, name: &str) -> axum::response::Response {
    match FRONTEND_DIST.get_file(name) {
        Some(file) => {
            let contents = String::from_utf8_lossy(file.contents());
            let cache_bust = format!("?v={}", state.boot_time);
            let busted = contents
                .replace(".js\"", &format!(".js{}\"", cache_bust))
                .replace(".css\"", &format!(".css{}\"", cache_bust));
            Html(busted).into_response()
        }
        None => (StatusCode::NOT_FOUND, "Frontend not built").into_response(),
    }
}

/// Serve static assets from the assets directory.
pub async fn asset_handler(Path(path): Path<String>) -> impl IntoResponse {
    // Strip query params if present
    let clean_path = path.split('?').next().unwrap_or(&path);
    let file_path = format!("assets/{}", clean_path);

    match FRONTEND_DIST.get_file(&file_path) {
        Some(file) => {
            let mime = mime_guess::from_path(clean_path)
                .first_or_octet_stream()
                .to_string();
            // Long cache headers are safe with cache busting
            (
                [
                    (header::CONTENT_TYPE, mime),
                    (header::CACHE_CONTROL, "public, max-age=31536000".to_string()),
                ],
                file.contents().to_vec(),
            )
                .into_response()
        }
        None => (StatusCode::NOT_FOUND, "Asset not found").into_response(),
    }
}
