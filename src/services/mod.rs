//! Namespace services and the collaborator interfaces they depend on.

pub mod directory_service;
pub mod disk_store;
pub mod error;
pub mod file_manager;
pub mod file_service;
pub mod identity;
pub mod lister;
pub mod metadata_store;
pub mod object_store;
pub mod paths;
pub mod reconcile;
pub mod user_service;
