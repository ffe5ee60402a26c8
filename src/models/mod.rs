//! Core data models for the file manager.
//!
//! `object` describes entries in the flat object namespace; `records` holds the
//! advisory documents mirrored into the metadata store.

pub mod object;
pub mod records;
