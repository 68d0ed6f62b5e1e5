//! Storage traits/interfaces for object store operations.

use async_trait::async_trait;

use crate::error::StorageError;
use crate::plan::PartRange;
use crate::types::{CompletedPart, ObjectLocation};

/// Information about an object from list operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectInfo {
    /// Object key.
    pub key: String,
    /// Object size in bytes.
    pub size: u64,
    /// Last modified timestamp (Unix epoch seconds).
    pub last_modified: Option<i64>,
    /// ETag.
    pub etag: Option<String>,
}

/// One page of a listing.
#[derive(Debug, Clone, Default)]
pub struct ObjectPage {
    /// Objects on this page.
    pub objects: Vec<ObjectInfo>,
    /// Token for the next page; `None` on the last page.
    pub next_continuation_token: Option<String>,
}

/// Low-level object store operations - implemented by each backend.
///
/// Implementations may be shared across concurrent imports of different
/// datasets. No call retries on its own; transient failures are reported
/// through `StorageError::is_retryable`.
#[async_trait]
pub trait StorageClient: Send + Sync {
    /// Check if an object exists and return its size.
    /// Returns None if object doesn't exist.
    async fn head_object(&self, bucket: &str, key: &str) -> Result<Option<u64>, StorageError>;

    /// Check if an object exists.
    async fn object_exists(&self, bucket: &str, key: &str) -> Result<bool, StorageError> {
        Ok(self.head_object(bucket, key).await?.is_some())
    }

    /// Download object to bytes.
    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StorageError>;

    /// List one page of objects with prefix.
    ///
    /// # Arguments
    /// * `bucket` - Bucket to list
    /// * `prefix` - Key prefix
    /// * `continuation_token` - Token from the previous page, `None` for the first page
    async fn list_objects_page(
        &self,
        bucket: &str,
        prefix: &str,
        continuation_token: Option<&str>,
    ) -> Result<ObjectPage, StorageError>;

    /// List all objects with prefix, following pagination to the end.
    ///
    /// Not resumable: a failure on any page fails the whole listing.
    async fn list_objects(
        &self,
        bucket: &str,
        prefix: &str,
    ) -> Result<Vec<ObjectInfo>, StorageError> {
        let mut objects: Vec<ObjectInfo> = Vec::new();
        let mut continuation_token: Option<String> = None;

        loop {
            let page: ObjectPage = self
                .list_objects_page(bucket, prefix, continuation_token.as_deref())
                .await?;
            objects.extend(page.objects);

            match page.next_continuation_token {
                Some(token) if continuation_token.as_deref() == Some(token.as_str()) => {
                    return Err(StorageError::Other {
                        message: format!(
                            "Listing s3://{}/{} returned the same continuation token twice",
                            bucket, prefix
                        ),
                    });
                }
                Some(token) => {
                    log::debug!("Listing s3://{}/{}: going to next page", bucket, prefix);
                    continuation_token = Some(token);
                }
                None => break,
            }
        }

        Ok(objects)
    }

    /// Server-side copy of a whole object in one request.
    async fn copy_object(
        &self,
        source: &ObjectLocation,
        destination: &ObjectLocation,
    ) -> Result<(), StorageError>;

    /// Delete an object.
    async fn delete_object(&self, bucket: &str, key: &str) -> Result<(), StorageError>;

    /// Open a multipart upload at the destination.
    ///
    /// # Returns
    /// The upload id issued by the store.
    async fn create_multipart_upload(
        &self,
        destination: &ObjectLocation,
    ) -> Result<String, StorageError>;

    /// Copy a byte range of the source into one part of an open upload.
    ///
    /// # Returns
    /// The integrity tag (ETag) of the copied part.
    async fn upload_part_copy(
        &self,
        source: &ObjectLocation,
        destination: &ObjectLocation,
        upload_id: &str,
        part: &PartRange,
    ) -> Result<String, StorageError>;

    /// Finish an upload from its parts, listed in increasing part order.
    async fn complete_multipart_upload(
        &self,
        destination: &ObjectLocation,
        upload_id: &str,
        parts: &[CompletedPart],
    ) -> Result<(), StorageError>;

    /// Discard an open upload and the parts copied so far.
    async fn abort_multipart_upload(
        &self,
        destination: &ObjectLocation,
        upload_id: &str,
    ) -> Result<(), StorageError>;
}
