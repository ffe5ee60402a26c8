//! HTTP layer: shared state, identity extractors, pages and mutations.

pub mod auth;
pub mod file_handlers;
pub mod health_handlers;
pub mod views;

use crate::services::{file_manager::FileManager, identity::IdentityVerifier};
use std::sync::Arc;

/// State shared by every handler. Holds only stateless client handles.
#[derive(Clone)]
pub struct AppState {
    pub manager: FileManager,
    pub verifier: Arc<dyn IdentityVerifier>,
}

impl AppState {
    pub fn new(manager: FileManager, verifier: Arc<dyn IdentityVerifier>) -> Self {
        Self { manager, verifier }
    }
}
