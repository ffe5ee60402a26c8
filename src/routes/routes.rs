//! Defines routes for the browser-facing file manager.
//!
//! ## Structure
//! - **Pages**
//!   - `GET  /`                   — sign-in page or root listing
//!   - `GET  /directory/{*path}`  — listing of a directory
//!
//! - **Mutations** (form posts, redirect back to a listing)
//!   - `POST /add-directory`
//!   - `POST /upload-file`
//!   - `POST /download-file`
//!   - `POST /delete-file`
//!   - `POST /delete-directory`
//!
//! The wildcard `*path` allows nested paths like `reports/2025/`.

use crate::handlers::{
    AppState,
    file_handlers::{
        add_directory, delete_directory, delete_file, download_file, root, upload_file,
        view_directory, view_root_directory,
    },
    health_handlers::{healthz, readyz},
};
use axum::{
    Router,
    routing::{get, post},
};

/// Build the router. State is supplied by the caller via `with_state`.
pub fn routes() -> Router<AppState> {
    Router::new()
        // health endpoints (mounted at root)
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        // pages
        .route("/", get(root))
        .route("/directory/", get(view_root_directory))
        .route("/directory/{*path}", get(view_directory))
        // mutations
        .route("/add-directory", post(add_directory))
        .route("/upload-file", post(upload_file))
        .route("/download-file", post(download_file))
        .route("/delete-file", post(delete_file))
        .route("/delete-directory", post(delete_directory))
}
