//! Shared data structures and configuration for storage operations.

use std::fmt;

use package_import_common::{LARGE_OBJECT_THRESHOLD, MULTIPART_PART_SIZE};
use serde::{Deserialize, Serialize};

use crate::error::StorageError;

/// Signing region used with a custom endpoint when none is configured.
/// Custom S3 implementations generally ignore it.
pub const DEFAULT_CUSTOM_ENDPOINT_REGION: &str = "dataverse";

/// Environment variable: custom S3-compatible endpoint URL.
pub const ENV_ENDPOINT_URL: &str = "PACKAGE_IMPORT_S3_ENDPOINT_URL";
/// Environment variable: signing region.
pub const ENV_REGION: &str = "PACKAGE_IMPORT_S3_REGION";
/// Environment variable: path-style access flag.
pub const ENV_PATH_STYLE_ACCESS: &str = "PACKAGE_IMPORT_S3_PATH_STYLE_ACCESS";
/// Environment variable: staging bucket written by the upstream packager.
pub const ENV_SOURCE_BUCKET: &str = "PACKAGE_IMPORT_SOURCE_BUCKET";
/// Environment variable: permanent bucket owned by the repository.
pub const ENV_DESTINATION_BUCKET: &str = "PACKAGE_IMPORT_DESTINATION_BUCKET";
/// Environment variable: multipart threshold in bytes.
pub const ENV_LARGE_OBJECT_THRESHOLD: &str = "PACKAGE_IMPORT_LARGE_OBJECT_THRESHOLD";
/// Environment variable: multipart part size in bytes.
pub const ENV_PART_SIZE: &str = "PACKAGE_IMPORT_PART_SIZE";

/// Connection settings for the object store client.
///
/// Read once and handed to the client constructor.
#[derive(Debug, Clone, Default)]
pub struct StorageSettings {
    /// Signing region. `None` uses the SDK default provider chain.
    pub region: Option<String>,
    /// Custom endpoint for S3-compatible stores.
    pub endpoint_url: Option<String>,
    /// Address buckets as `endpoint/bucket` instead of `bucket.endpoint`.
    pub force_path_style: bool,
    /// Static credentials. `None` uses the SDK default credential chain.
    pub credentials: Option<AwsCredentials>,
}

impl StorageSettings {
    /// Load settings from the process environment.
    ///
    /// # Errors
    /// Never fails today; returns `Result` to match `ImportSettings::from_env`.
    pub fn from_env() -> Result<Self, StorageError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load settings through a variable lookup function.
    ///
    /// An empty endpoint counts as unset. The signing region defaults to
    /// `DEFAULT_CUSTOM_ENDPOINT_REGION` only when a custom endpoint is set.
    /// Path-style access is enabled only by a case-insensitive "true".
    ///
    /// # Arguments
    /// * `lookup` - Returns the value of a variable, if set
    pub fn from_lookup<F>(lookup: F) -> Result<Self, StorageError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let endpoint_url: Option<String> = lookup(ENV_ENDPOINT_URL)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());

        let region: Option<String> = match lookup(ENV_REGION).filter(|v| !v.trim().is_empty()) {
            Some(region) => Some(region.trim().to_string()),
            None if endpoint_url.is_some() => Some(DEFAULT_CUSTOM_ENDPOINT_REGION.to_string()),
            None => None,
        };

        let force_path_style: bool = lookup(ENV_PATH_STYLE_ACCESS)
            .map(|v| v.trim().eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        Ok(Self {
            region,
            endpoint_url,
            force_path_style,
            credentials: None,
        })
    }

    /// Set the signing region.
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    /// Set a custom endpoint.
    pub fn with_endpoint_url(mut self, endpoint_url: impl Into<String>) -> Self {
        self.endpoint_url = Some(endpoint_url.into());
        self
    }

    /// Enable or disable path-style access.
    pub fn with_force_path_style(mut self, force_path_style: bool) -> Self {
        self.force_path_style = force_path_style;
        self
    }

    /// Use static credentials.
    pub fn with_credentials(mut self, credentials: AwsCredentials) -> Self {
        self.credentials = Some(credentials);
        self
    }
}

/// AWS credentials.
#[derive(Clone)]
pub struct AwsCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: Option<String>,
}

impl fmt::Debug for AwsCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AwsCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("session_token", &self.session_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Buckets and size policy for a package import.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportSettings {
    /// Staging bucket the upstream packager writes to.
    pub source_bucket: String,
    /// Permanent bucket owned by the repository.
    pub destination_bucket: String,
    /// Objects strictly larger than this are copied with multipart copy.
    pub large_object_threshold: u64,
    /// Size of each multipart part (last part may be shorter).
    pub part_size: u64,
}

impl ImportSettings {
    /// Create settings with the default threshold and part size.
    pub fn new(source_bucket: impl Into<String>, destination_bucket: impl Into<String>) -> Self {
        Self {
            source_bucket: source_bucket.into(),
            destination_bucket: destination_bucket.into(),
            large_object_threshold: LARGE_OBJECT_THRESHOLD,
            part_size: MULTIPART_PART_SIZE,
        }
    }

    /// Set the multipart threshold.
    pub fn with_large_object_threshold(mut self, threshold: u64) -> Self {
        self.large_object_threshold = threshold;
        self
    }

    /// Set the multipart part size.
    pub fn with_part_size(mut self, part_size: u64) -> Self {
        self.part_size = part_size;
        self
    }

    /// Load settings from the process environment.
    ///
    /// # Errors
    /// Returns `StorageError::InvalidConfig` if a bucket is missing or a size
    /// is not a positive integer.
    pub fn from_env() -> Result<Self, StorageError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load settings through a variable lookup function.
    ///
    /// # Arguments
    /// * `lookup` - Returns the value of a variable, if set
    pub fn from_lookup<F>(lookup: F) -> Result<Self, StorageError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let source_bucket: String = required(&lookup, ENV_SOURCE_BUCKET)?;
        let destination_bucket: String = required(&lookup, ENV_DESTINATION_BUCKET)?;

        let mut settings = Self::new(source_bucket, destination_bucket);
        if let Some(threshold) = optional_size(&lookup, ENV_LARGE_OBJECT_THRESHOLD)? {
            settings.large_object_threshold = threshold;
        }
        if let Some(part_size) = optional_size(&lookup, ENV_PART_SIZE)? {
            settings.part_size = part_size;
        }
        Ok(settings)
    }
}

fn required<F>(lookup: &F, name: &str) -> Result<String, StorageError>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(name)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| StorageError::InvalidConfig {
            message: format!("{} is not set", name),
        })
}

fn optional_size<F>(lookup: &F, name: &str) -> Result<Option<u64>, StorageError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(name).map(|v| v.trim().to_string()) {
        None => Ok(None),
        Some(v) if v.is_empty() => Ok(None),
        Some(v) => match v.parse::<u64>() {
            Ok(0) | Err(_) => Err(StorageError::InvalidConfig {
                message: format!("{} must be a positive integer, got `{}`", name, v),
            }),
            Ok(n) => Ok(Some(n)),
        },
    }
}

/// A bucket/key pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectLocation {
    pub bucket: String,
    pub key: String,
}

impl ObjectLocation {
    /// Create a new object location.
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }
}

impl fmt::Display for ObjectLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s3://{}/{}", self.bucket, self.key)
    }
}

/// A part acknowledged by the store during a multipart copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedPart {
    /// 1-based part number.
    pub part_number: i32,
    /// Integrity tag (ETag) returned for the part.
    pub etag: String,
}

/// Aggregated statistics of a completed migration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationStatistics {
    /// Objects found under the staging prefix.
    pub objects_listed: u64,
    /// Objects copied with a single copy request.
    pub single_copies: u64,
    /// Objects copied with multipart copy.
    pub multipart_copies: u64,
    /// Parts copied across all multipart copies.
    pub parts_copied: u64,
    /// Bytes copied (listing sizes).
    pub bytes_copied: u64,
    /// Directory markers moved to the dataset's marker key.
    /// Also counted in `single_copies`.
    pub directory_markers: u64,
}

impl MigrationStatistics {
    /// Number of objects moved into the permanent bucket.
    pub fn objects_migrated(&self) -> u64 {
        self.single_copies + self.multipart_copies
    }
}
