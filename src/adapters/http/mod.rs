//! HTTP inbound adapter.
//!
//! JSON for metadata, server-sent events for download progress, and the
//! downloads directory served as static files.

pub mod download;
mod error;
pub mod video_info;

use crate::application::DownloadService;
use crate::ports::MediaExtractor;
use axum::http::HeaderName;
use axum::routing::{get, post};
use axum::Router;
use download::DOWNLOAD_ID_HEADER;
use std::path::Path;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

async fn health() -> &'static str {
    "ok"
}

pub fn router<E>(service: Arc<DownloadService<E>>, downloads_dir: &Path) -> Router
where
    E: MediaExtractor + 'static,
{
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
        .expose_headers([HeaderName::from_static(DOWNLOAD_ID_HEADER)]);

    Router::new()
        .route("/health", get(health))
        .route("/api/video-info", post(video_info::handle::<E>))
        .route(
            "/api/download",
            post(download::post::<E>).get(download::get::<E>),
        )
        .route("/api/downloads/:id/events", get(download::attach::<E>))
        .nest_service("/downloads", ServeDir::new(downloads_dir))
        .with_state(service)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
