//! Shared types and utilities for package imports.
//!
//! This crate provides functionality used across all package-import crates:
//! - Size thresholds and naming constants
//! - Pure object key derivation (dataset keys, basenames, package names)
//! - Shared error types

pub mod constants;
pub mod error;
pub mod keys;

// Re-export commonly used items at crate root
pub use constants::*;
pub use error::KeyError;
pub use keys::{
    archive_key, basename, checksum_sidecar_key, dataset_key, destination_key,
    directory_marker_key, join_key, root_package_name, sanitize_base_name, storage_locator,
};
