//! AWS SDK S3 client implementation.

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_credential_types::Credentials;
use aws_sdk_s3::config::http::HttpResponse;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::error::SdkError;
use aws_sdk_s3::operation::head_object::HeadObjectError;
use aws_sdk_s3::types::{CompletedMultipartUpload, CompletedPart as S3CompletedPart};
use aws_sdk_s3::Client as S3Client;

use package_import_storage::{
    CompletedPart, ObjectInfo, ObjectLocation, ObjectPage, PartRange, StorageClient, StorageError,
    StorageSettings,
};

use crate::error::CrtError;

/// StorageClient implementation using AWS SDK for Rust.
///
/// The SDK client pools connections and is cheap to share, so one instance
/// can serve concurrent imports.
pub struct CrtStorageClient {
    /// The underlying S3 client.
    s3_client: S3Client,
}

impl CrtStorageClient {
    /// Create a new CRT storage client.
    ///
    /// Region and credentials fall back to the SDK default provider chains
    /// when not set in `settings`.
    ///
    /// # Arguments
    /// * `settings` - Region, endpoint, addressing style and optional credentials
    ///
    /// # Errors
    /// Returns `StorageError::InvalidConfig` for an endpoint that is not an
    /// http(s) URL.
    pub async fn new(settings: StorageSettings) -> Result<Self, StorageError> {
        if let Some(ref endpoint) = settings.endpoint_url {
            if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
                return Err(CrtError::ConfigError(format!(
                    "endpoint URL must start with http:// or https://, got {}",
                    endpoint
                ))
                .into());
            }
        }

        let mut config_loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(ref region) = settings.region {
            config_loader = config_loader.region(Region::new(region.clone()));
        }
        if let Some(ref creds) = settings.credentials {
            let credentials = Credentials::new(
                &creds.access_key_id,
                &creds.secret_access_key,
                creds.session_token.clone(),
                None,
                "package-import",
            );
            config_loader = config_loader.credentials_provider(credentials);
        }
        let sdk_config = config_loader.load().await;

        let mut s3_config =
            aws_sdk_s3::config::Builder::from(&sdk_config).force_path_style(settings.force_path_style);
        if let Some(ref endpoint) = settings.endpoint_url {
            log::info!(
                "Using custom S3 endpoint {} (path style: {})",
                endpoint,
                settings.force_path_style
            );
            s3_config = s3_config.endpoint_url(endpoint);
        }

        Ok(Self {
            s3_client: S3Client::from_conf(s3_config.build()),
        })
    }

    /// Create a client from an existing S3Client (for testing).
    ///
    /// # Arguments
    /// * `s3_client` - Pre-configured S3 client
    pub fn from_client(s3_client: S3Client) -> Self {
        Self { s3_client }
    }
}

/// Build the `x-amz-copy-source` value for an object.
///
/// The key is percent-encoded byte-wise except for unreserved characters
/// and `/`.
pub fn encode_copy_source(source: &ObjectLocation) -> String {
    let mut encoded = String::with_capacity(source.bucket.len() + source.key.len() + 1);
    encoded.push_str(&source.bucket);
    encoded.push('/');
    for byte in source.key.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' | b'/' => {
                encoded.push(byte as char)
            }
            _ => encoded.push_str(&format!("%{:02X}", byte)),
        }
    }
    encoded
}

/// Outcome of a failed HEAD: a missing object is `Ok(None)`, anything else
/// is classified like every other SDK error.
fn head_failure(
    bucket: &str,
    key: &str,
    err: SdkError<HeadObjectError, HttpResponse>,
) -> Result<Option<u64>, StorageError> {
    match CrtError::from_sdk(err).into_storage_error(bucket, key) {
        StorageError::NotFound { .. } => Ok(None),
        other => Err(other),
    }
}

#[async_trait]
impl StorageClient for CrtStorageClient {
    async fn head_object(&self, bucket: &str, key: &str) -> Result<Option<u64>, StorageError> {
        match self.s3_client.head_object().bucket(bucket).key(key).send().await {
            Ok(output) => Ok(Some(
                output.content_length().map(|l| l.max(0) as u64).unwrap_or(0),
            )),
            Err(err) => head_failure(bucket, key, err),
        }
    }

    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StorageError> {
        let response = self
            .s3_client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|err| CrtError::from_sdk(err).into_storage_error(bucket, key))?;

        let data: Vec<u8> = response
            .body
            .collect()
            .await
            .map_err(|e| StorageError::NetworkError {
                message: e.to_string(),
                retryable: true,
            })?
            .into_bytes()
            .to_vec();

        Ok(data)
    }

    async fn list_objects_page(
        &self,
        bucket: &str,
        prefix: &str,
        continuation_token: Option<&str>,
    ) -> Result<ObjectPage, StorageError> {
        let response = self
            .s3_client
            .list_objects_v2()
            .bucket(bucket)
            .prefix(prefix)
            .set_continuation_token(continuation_token.map(str::to_string))
            .send()
            .await
            .map_err(|err| CrtError::from_sdk(err).into_storage_error(bucket, prefix))?;

        let objects: Vec<ObjectInfo> = response
            .contents()
            .iter()
            .map(|obj| ObjectInfo {
                key: obj.key().unwrap_or_default().to_string(),
                size: obj.size().map(|s| s.max(0) as u64).unwrap_or(0),
                last_modified: obj
                    .last_modified()
                    .and_then(|dt| dt.to_millis().ok())
                    .map(|ms| ms / 1000),
                etag: obj.e_tag().map(|s| s.to_string()),
            })
            .collect();

        let next_continuation_token: Option<String> = if response.is_truncated() == Some(true) {
            response.next_continuation_token().map(str::to_string)
        } else {
            None
        };

        Ok(ObjectPage {
            objects,
            next_continuation_token,
        })
    }

    async fn copy_object(
        &self,
        source: &ObjectLocation,
        destination: &ObjectLocation,
    ) -> Result<(), StorageError> {
        self.s3_client
            .copy_object()
            .copy_source(encode_copy_source(source))
            .bucket(&destination.bucket)
            .key(&destination.key)
            .send()
            .await
            .map_err(|err| CrtError::from_sdk(err).into_storage_error(&source.bucket, &source.key))?;
        Ok(())
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> Result<(), StorageError> {
        self.s3_client
            .delete_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|err| CrtError::from_sdk(err).into_storage_error(bucket, key))?;
        Ok(())
    }

    async fn create_multipart_upload(
        &self,
        destination: &ObjectLocation,
    ) -> Result<String, StorageError> {
        let output = self
            .s3_client
            .create_multipart_upload()
            .bucket(&destination.bucket)
            .key(&destination.key)
            .send()
            .await
            .map_err(|err| {
                CrtError::from_sdk(err).into_storage_error(&destination.bucket, &destination.key)
            })?;

        output
            .upload_id()
            .map(str::to_string)
            .ok_or_else(|| StorageError::Other {
                message: format!("No upload id returned for {}", destination),
            })
    }

    async fn upload_part_copy(
        &self,
        source: &ObjectLocation,
        destination: &ObjectLocation,
        upload_id: &str,
        part: &PartRange,
    ) -> Result<String, StorageError> {
        let output = self
            .s3_client
            .upload_part_copy()
            .copy_source(encode_copy_source(source))
            .copy_source_range(part.http_range())
            .bucket(&destination.bucket)
            .key(&destination.key)
            .upload_id(upload_id)
            .part_number(part.part_number)
            .send()
            .await
            .map_err(|err| CrtError::from_sdk(err).into_storage_error(&source.bucket, &source.key))?;

        output
            .copy_part_result()
            .and_then(|result| result.e_tag())
            .map(str::to_string)
            .ok_or_else(|| StorageError::Other {
                message: format!(
                    "No ETag returned for part {} of {}",
                    part.part_number, destination
                ),
            })
    }

    async fn complete_multipart_upload(
        &self,
        destination: &ObjectLocation,
        upload_id: &str,
        parts: &[CompletedPart],
    ) -> Result<(), StorageError> {
        let completed_parts: Vec<S3CompletedPart> = parts
            .iter()
            .map(|part| {
                S3CompletedPart::builder()
                    .part_number(part.part_number)
                    .e_tag(&part.etag)
                    .build()
            })
            .collect();

        self.s3_client
            .complete_multipart_upload()
            .bucket(&destination.bucket)
            .key(&destination.key)
            .upload_id(upload_id)
            .multipart_upload(
                CompletedMultipartUpload::builder()
                    .set_parts(Some(completed_parts))
                    .build(),
            )
            .send()
            .await
            .map_err(|err| {
                CrtError::from_sdk(err).into_storage_error(&destination.bucket, &destination.key)
            })?;
        Ok(())
    }

    async fn abort_multipart_upload(
        &self,
        destination: &ObjectLocation,
        upload_id: &str,
    ) -> Result<(), StorageError> {
        self.s3_client
            .abort_multipart_upload()
            .bucket(&destination.bucket)
            .key(&destination.key)
            .upload_id(upload_id)
            .send()
            .await
            .map_err(|err| {
                CrtError::from_sdk(err).into_storage_error(&destination.bucket, &destination.key)
            })?;
        Ok(())
    }
}
