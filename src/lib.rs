//! Exam archive upload service.
//!
//! Accepts a PDF plus a few descriptive form fields, derives a deterministic
//! object key from them and stores the file under that key, refusing to
//! overwrite anything already archived.

use axum::Router;

pub mod config;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;
pub mod storage;

pub use services::uploader::Uploader;

/// Build the application router with its shared state attached.
pub fn app(uploader: Uploader, max_upload_bytes: usize) -> Router {
    routes::routes::routes(max_upload_bytes).with_state(uploader)
}
