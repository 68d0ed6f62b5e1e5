//! Error types for CRT storage operations.

use aws_sdk_s3::config::http::HttpResponse;
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use package_import_storage::StorageError;
use thiserror::Error;

/// Service error codes worth retrying, whatever their HTTP status.
const RETRYABLE_CODES: &[&str] = &[
    "InternalError",
    "RequestTimeout",
    "ServiceUnavailable",
    "SlowDown",
];

/// Errors specific to the CRT storage client.
#[derive(Error, Debug)]
pub enum CrtError {
    /// AWS SDK error.
    #[error("AWS SDK error: {message}")]
    SdkError {
        message: String,
        code: Option<String>,
        retryable: bool,
    },

    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl CrtError {
    /// Classify an SDK error.
    ///
    /// Timeouts, dispatch failures and unreadable responses are retryable.
    /// Service errors are retryable for 5xx and 429 statuses and for the
    /// codes in `RETRYABLE_CODES`. Everything else is not. Responses without
    /// an error code (HEAD has no body) get one from their status.
    pub fn from_sdk<E>(err: SdkError<E, HttpResponse>) -> Self
    where
        E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
    {
        let status: Option<u16> = err.raw_response().map(|raw| raw.status().as_u16());
        let code: Option<String> = err.code().map(str::to_string).or_else(|| match status {
            Some(404) => Some("NotFound".to_string()),
            Some(403) => Some("Forbidden".to_string()),
            _ => None,
        });

        let retryable: bool = match &err {
            SdkError::TimeoutError(_) | SdkError::DispatchFailure(_) | SdkError::ResponseError(_) => {
                true
            }
            SdkError::ServiceError(_) => {
                status.is_some_and(|status| status >= 500 || status == 429)
                    || code
                        .as_deref()
                        .is_some_and(|code| RETRYABLE_CODES.contains(&code))
            }
            _ => false,
        };

        CrtError::SdkError {
            message: DisplayErrorContext(&err).to_string(),
            code,
            retryable,
        }
    }

    /// Convert into a `StorageError` for the object at `bucket`/`key`.
    pub fn into_storage_error(self, bucket: &str, key: &str) -> StorageError {
        match self {
            CrtError::SdkError {
                code: Some(code), ..
            } if code == "NoSuchKey" || code == "NotFound" => StorageError::not_found(bucket, key),
            CrtError::SdkError {
                message,
                code: Some(code),
                ..
            } if code == "AccessDenied" || code == "Forbidden" => StorageError::AccessDenied {
                bucket: bucket.to_string(),
                key: key.to_string(),
                message,
            },
            other => other.into(),
        }
    }
}

impl From<CrtError> for StorageError {
    fn from(err: CrtError) -> Self {
        match err {
            CrtError::SdkError {
                message, retryable, ..
            } => StorageError::NetworkError { message, retryable },
            CrtError::ConfigError(message) => StorageError::InvalidConfig { message },
        }
    }
}
