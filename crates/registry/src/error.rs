//! Error types for package registration and import.

use package_import_common::KeyError;
use package_import_model::PreconditionError;
use package_import_storage::{MigrationError, StorageError};
use thiserror::Error;

/// An identifier service call did not yield a registered identifier.
///
/// Not fatal: the package file is still created, without a confirmed
/// persistent identifier.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistrationError {
    /// The identifier service failed.
    #[error("Identifier service error: {message}")]
    Service { message: String },

    /// The service answered but did not confirm the identifier.
    #[error("Registration of {identifier} not confirmed (response: {response:?})")]
    Unconfirmed {
        identifier: String,
        response: String,
    },
}

/// Errors that abort a package import.
#[derive(Error, Debug, Clone)]
pub enum ImportError {
    /// Moving the staged objects failed.
    #[error(transparent)]
    Migration(#[from] MigrationError),

    /// The package archive is not in the permanent bucket.
    #[error("Package archive not found: s3://{bucket}/{key}")]
    PackageNotFound { bucket: String, key: String },

    /// The dataset cannot receive a package file.
    #[error(transparent)]
    Precondition(#[from] PreconditionError),

    /// A key could not be derived from the dataset or base name.
    #[error("Invalid object key: {0}")]
    InvalidKey(#[from] KeyError),

    /// A store call made during registration failed.
    #[error("Storage error: {0}")]
    Store(#[from] StorageError),
}

impl ImportError {
    /// Check if retrying the import may succeed without outside changes.
    pub fn is_retryable(&self) -> bool {
        match self {
            ImportError::Migration(err) => err.is_retryable(),
            ImportError::Store(err) => err.is_retryable(),
            ImportError::PackageNotFound { .. }
            | ImportError::Precondition(_)
            | ImportError::InvalidKey(_) => false,
        }
    }
}
