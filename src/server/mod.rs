//! # HTTP Server for the Photobooth
//!
//! Serves the template gallery, the admin dashboard, the slot editor, and
//! the capture flow over HTTP.
//!
//! ## Usage
//!
//! ```bash
//! photobox serve --listen 0.0.0.0:5000 --data-dir ./data
//! ```
//!
//! Then open http://localhost:5000 in a browser for the booth, or
//! http://localhost:5000/admin for template management.

mod handlers;
mod state;
mod static_files;

pub use state::ServerConfig;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{delete, get, post, put},
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tower_http::trace::TraceLayer;

use crate::error::PhotoboxError;
use state::{AppState, SESSION_EXPIRATION_SECS};

/// Body limit for image uploads and camera frames.
const UPLOAD_LIMIT: usize = 50 * 1024 * 1024;

/// Start the HTTP server.
///
/// ## Example
///
/// ```no_run
/// use photobox::server::{serve, ServerConfig};
///
/// # async fn example() -> Result<(), photobox::error::PhotoboxError> {
/// let config = ServerConfig {
///     listen_addr: "0.0.0.0:5000".to_string(),
///     data_dir: "./data".into(),
/// };
///
/// serve(config).await?;
/// # Ok(())
/// # }
/// ```
pub async fn serve(config: ServerConfig) -> Result<(), PhotoboxError> {
    let app_state = Arc::new(AppState::new(config.clone())?);

    // Spawn background editor-session cleanup task
    tokio::spawn(cleanup_sessions(app_state.clone()));

    let app = Router::new()
        // Frontend
        .route("/", get(static_files::index_handler))
        .route("/admin", get(static_files::admin_handler))
        .route("/editor", get(static_files::editor_handler))
        .route("/assets/*path", get(static_files::asset_handler))
        // Stored template images
        .route("/uploads/*path", get(handlers::templates::serve_upload))
        // Template API
        .route("/api/templates", get(handlers::templates::list))
        .route("/api/templates/:id", get(handlers::templates::get))
        .route(
            "/api/templates/:id/preview-box",
            get(handlers::templates::preview_box),
        )
        .route(
            "/api/admin/templates",
            post(handlers::templates::create).layer(DefaultBodyLimit::max(UPLOAD_LIMIT)),
        )
        .route(
            "/api/admin/templates/:id",
            put(handlers::templates::update)
                .delete(handlers::templates::remove)
                .layer(DefaultBodyLimit::max(UPLOAD_LIMIT)),
        )
        // Editor API
        .route(
            "/api/editor",
            post(handlers::editor::open).layer(DefaultBodyLimit::max(UPLOAD_LIMIT)),
        )
        .route("/api/editor/:id/pointer", post(handlers::editor::pointer))
        .route("/api/editor/:id/preview", get(handlers::editor::preview))
        .route("/api/editor/:id/save", post(handlers::editor::save))
        .route("/api/editor/:id", delete(handlers::editor::close))
        // Capture API
        .route("/api/capture/state", get(handlers::capture::status))
        .route("/api/capture/select", post(handlers::capture::select))
        .route("/api/capture/attach", post(handlers::capture::attach))
        .route("/api/capture/fail", post(handlers::capture::fail))
        .route(
            "/api/capture/frame",
            post(handlers::capture::frame).layer(DefaultBodyLimit::max(UPLOAD_LIMIT)),
        )
        .route("/api/capture/shoot", post(handlers::capture::shoot))
        .route("/api/capture/photo", get(handlers::capture::photo))
        .route("/api/capture/retake", post(handlers::capture::retake))
        .route("/api/capture/back", post(handlers::capture::back))
        .layer(TraceLayer::new_for_http())
        .with_state(app_state);

    tracing::info!(listen = %config.listen_addr, data_dir = %config.data_dir.display(), "photobox server starting");

    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Background task to dispose of expired editor sessions.
async fn cleanup_sessions(state: Arc<AppState>) {
    let mut interval = tokio::time::interval(Duration::from_secs(60));
    let expiration = Duration::from_secs(SESSION_EXPIRATION_SECS);

    loop {
        interval.tick().await;
        let now = Instant::now();

        let mut editors = state.editors.write().await;
        let before = editors.len();
        editors.retain(|_, entry| now.duration_since(entry.last_accessed) < expiration);
        let after = editors.len();
        if before != after {
            tracing::info!(
                expired = before - after,
                remaining = after,
                "cleaned up editor sessions"
            );
        }
    }
}
