//! AWS SDK S3 backend for package import storage.
//!
//! This crate provides a `StorageClient` implementation using the AWS SDK for Rust.
//! It supports every S3 operation a package migration needs: listing, server-side
//! copy, multipart copy and delete. Custom S3-compatible endpoints are supported
//! through `StorageSettings`.
//!
//! # Example
//!
//! ```ignore
//! use package_import_storage::{ImportSettings, MigrationOrchestrator, StorageSettings};
//! use package_import_storage_crt::CrtStorageClient;
//!
//! let client = CrtStorageClient::new(StorageSettings::from_env()?).await?;
//! let orchestrator = MigrationOrchestrator::new(&client, ImportSettings::from_env()?);
//! let stats = orchestrator.migrate(&dataset, "ds1/").await?;
//! ```

mod client;
mod error;

pub use client::{encode_copy_source, CrtStorageClient};
pub use error::CrtError;
