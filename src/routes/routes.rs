//! Defines the routes of the upload service.
//!
//! ## Structure
//! - `GET  /`        — HTML upload form
//! - `POST /upload`  — multipart upload (`study`, `year`, `code`, `type`,
//!   `answers`, optional `date`, and the `file` part)
//! - `GET  /healthz` — liveness
//! - `GET  /readyz`  — readiness (probes the archive backend)

use crate::{
    handlers::{
        form_handlers::upload_form,
        health_handlers::{healthz, readyz},
        upload_handlers::upload_document,
    },
    services::uploader::Uploader,
};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};

/// Build and return the router for the upload service.
///
/// The router carries the shared `Uploader` to all handlers. Request bodies are
/// capped at `max_upload_bytes`.
pub fn routes(max_upload_bytes: usize) -> Router<Uploader> {
    Router::new()
        // health endpoints (mounted at root)
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/", get(upload_form))
        .route("/upload", post(upload_document))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
}
