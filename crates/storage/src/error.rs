//! Error types for storage operations.

use package_import_common::KeyError;
use package_import_model::PreconditionError;
use thiserror::Error;

/// Errors that can occur during object store operations.
#[derive(Error, Debug, Clone)]
pub enum StorageError {
    /// Object not found.
    #[error("Object not found: s3://{bucket}/{key}")]
    NotFound { bucket: String, key: String },

    /// Access denied.
    #[error("Access denied to s3://{bucket}/{key}: {message}")]
    AccessDenied {
        bucket: String,
        key: String,
        message: String,
    },

    /// Network or service error. `retryable` marks transient failures.
    #[error("Network error: {message}")]
    NetworkError { message: String, retryable: bool },

    /// A multipart copy failed after its session was opened.
    ///
    /// `aborted` is false when the abort call failed too, which leaves an
    /// orphaned multipart upload in the destination bucket.
    #[error("Multipart copy to s3://{bucket}/{key} failed (upload {upload_id}, aborted: {aborted}): {source}")]
    MultipartCopyFailed {
        bucket: String,
        key: String,
        upload_id: String,
        aborted: bool,
        source: Box<StorageError>,
    },

    /// Invalid configuration.
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// Other error.
    #[error("{message}")]
    Other { message: String },
}

impl StorageError {
    /// Check if this error is transient (the whole operation may be retried).
    pub fn is_retryable(&self) -> bool {
        match self {
            StorageError::NetworkError { retryable, .. } => *retryable,
            StorageError::MultipartCopyFailed { source, .. } => source.is_retryable(),
            StorageError::NotFound { .. } => false,
            StorageError::AccessDenied { .. } => false,
            StorageError::InvalidConfig { .. } => false,
            StorageError::Other { .. } => false,
        }
    }

    /// Check if this error means the object does not exist.
    pub fn is_not_found(&self) -> bool {
        match self {
            StorageError::NotFound { .. } => true,
            StorageError::MultipartCopyFailed { source, .. } => source.is_not_found(),
            _ => false,
        }
    }

    /// Create a NotFound error.
    pub fn not_found(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        StorageError::NotFound {
            bucket: bucket.into(),
            key: key.into(),
        }
    }
}

/// Errors that abort a dataset migration.
///
/// Objects migrated before the failure stay in the destination and are gone
/// from the source; nothing is rolled back.
#[derive(Error, Debug, Clone)]
pub enum MigrationError {
    /// The dataset cannot receive an import.
    #[error(transparent)]
    Precondition(#[from] PreconditionError),

    /// A destination key could not be derived.
    #[error("Invalid object key: {0}")]
    InvalidKey(#[from] KeyError),

    /// Listing the staging prefix failed.
    #[error("Failed to list s3://{bucket}/{prefix}: {source}")]
    Listing {
        bucket: String,
        prefix: String,
        source: StorageError,
    },

    /// Copying one object failed.
    #[error("Failed to copy s3://{bucket}/{key}: {source}")]
    Copy {
        bucket: String,
        key: String,
        source: StorageError,
    },

    /// The copy landed but the source could not be deleted; the object now
    /// exists in both locations and must be reconciled by hand.
    #[error("Copied s3://{bucket}/{key} but failed to delete it from the staging bucket: {source}")]
    SourceNotDeleted {
        bucket: String,
        key: String,
        source: StorageError,
    },
}

impl MigrationError {
    /// Check if retrying the migration may succeed without outside changes.
    pub fn is_retryable(&self) -> bool {
        match self {
            MigrationError::Listing { source, .. }
            | MigrationError::Copy { source, .. }
            | MigrationError::SourceNotDeleted { source, .. } => source.is_retryable(),
            MigrationError::Precondition(_) | MigrationError::InvalidKey(_) => false,
        }
    }
}

/// Why a checksum could not be recovered from the sidecar manifest.
///
/// Not fatal: registration proceeds with an empty checksum.
#[derive(Error, Debug, Clone)]
pub enum ChecksumUnavailable {
    /// The sidecar has no line for the archive.
    #[error("No checksum entry for {archive} in s3://{bucket}/{key}")]
    NoMatchingEntry {
        bucket: String,
        key: String,
        archive: String,
    },

    /// The sidecar could not be read.
    #[error("Failed to read checksum sidecar s3://{bucket}/{key}: {source}")]
    ReadFailed {
        bucket: String,
        key: String,
        source: StorageError,
    },

    /// The sidecar is not UTF-8 text.
    #[error("Checksum sidecar s3://{bucket}/{key} is not valid UTF-8")]
    InvalidEncoding { bucket: String, key: String },
}
