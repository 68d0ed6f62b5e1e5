//! In-memory `StorageClient`.
//!
//! Holds buckets as maps of key -> bytes and implements the full multipart
//! protocol, with a configurable listing page size and injectable failures.
//! Used as the backend in tests and for dry runs of an import.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use crate::error::StorageError;
use crate::plan::PartRange;
use crate::traits::{ObjectInfo, ObjectPage, StorageClient};
use crate::types::{CompletedPart, ObjectLocation};

/// Default number of keys per listing page (same as S3).
pub const DEFAULT_PAGE_SIZE: usize = 1000;

/// An operation that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailPoint {
    HeadObject,
    GetObject,
    ListObjects,
    CopyObject,
    DeleteObject,
    CreateMultipartUpload,
    /// Copy of the given part number.
    UploadPartCopy(i32),
    CompleteMultipartUpload,
    AbortMultipartUpload,
}

#[derive(Debug)]
struct PendingUpload {
    destination: ObjectLocation,
    /// part number -> (etag, bytes)
    parts: BTreeMap<i32, (String, Vec<u8>)>,
}

#[derive(Debug, Default)]
struct MemoryState {
    /// bucket -> key -> bytes
    buckets: HashMap<String, BTreeMap<String, Vec<u8>>>,
    uploads: HashMap<String, PendingUpload>,
    failures: HashSet<FailPoint>,
    operations: u64,
}

/// A `StorageClient` backed by process memory.
#[derive(Debug)]
pub struct MemoryStorageClient {
    state: Mutex<MemoryState>,
    page_size: usize,
}

impl Default for MemoryStorageClient {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStorageClient {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MemoryState::default()),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Set the number of keys returned per listing page.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Store an object directly (not counted as an operation).
    pub fn put(&self, bucket: &str, key: &str, data: impl Into<Vec<u8>>) {
        self.lock()
            .buckets
            .entry(bucket.to_string())
            .or_default()
            .insert(key.to_string(), data.into());
    }

    /// Read an object directly (not counted as an operation).
    pub fn get(&self, bucket: &str, key: &str) -> Option<Vec<u8>> {
        self.lock()
            .buckets
            .get(bucket)
            .and_then(|objects| objects.get(key))
            .cloned()
    }

    /// All keys of a bucket, sorted.
    pub fn keys(&self, bucket: &str) -> Vec<String> {
        self.lock()
            .buckets
            .get(bucket)
            .map(|objects| objects.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Make every future call of an operation fail with a transient error.
    pub fn fail_on(&self, point: FailPoint) {
        self.lock().failures.insert(point);
    }

    /// Remove all injected failures.
    pub fn clear_failures(&self) {
        self.lock().failures.clear();
    }

    /// Number of `StorageClient` calls made so far.
    pub fn operation_count(&self) -> u64 {
        self.lock().operations
    }

    /// Number of multipart uploads neither completed nor aborted.
    pub fn pending_upload_count(&self) -> usize {
        self.lock().uploads.len()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Count the call and apply any injected failure.
    fn begin(&self, point: FailPoint) -> Result<MutexGuard<'_, MemoryState>, StorageError> {
        let mut state = self.lock();
        state.operations += 1;
        if state.failures.contains(&point) {
            return Err(StorageError::NetworkError {
                message: format!("injected failure: {:?}", point),
                retryable: true,
            });
        }
        Ok(state)
    }
}

impl MemoryState {
    fn object(&self, bucket: &str, key: &str) -> Option<&Vec<u8>> {
        self.buckets.get(bucket).and_then(|objects| objects.get(key))
    }

    fn upload(
        &mut self,
        destination: &ObjectLocation,
        upload_id: &str,
    ) -> Result<&mut PendingUpload, StorageError> {
        match self.uploads.get_mut(upload_id) {
            Some(upload) if upload.destination == *destination => Ok(upload),
            _ => Err(StorageError::Other {
                message: format!("NoSuchUpload: {} for {}", upload_id, destination),
            }),
        }
    }
}

#[async_trait]
impl StorageClient for MemoryStorageClient {
    async fn head_object(&self, bucket: &str, key: &str) -> Result<Option<u64>, StorageError> {
        let state = self.begin(FailPoint::HeadObject)?;
        let size: Option<u64> = state.object(bucket, key).map(|data| data.len() as u64);
        Ok(size)
    }

    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StorageError> {
        let state = self.begin(FailPoint::GetObject)?;
        let data: Option<Vec<u8>> = state.object(bucket, key).cloned();
        data.ok_or_else(|| StorageError::not_found(bucket, key))
    }

    async fn list_objects_page(
        &self,
        bucket: &str,
        prefix: &str,
        continuation_token: Option<&str>,
    ) -> Result<ObjectPage, StorageError> {
        let state = self.begin(FailPoint::ListObjects)?;
        let Some(objects) = state.buckets.get(bucket) else {
            return Ok(ObjectPage::default());
        };

        // The token is the last key of the previous page.
        let mut matching = objects
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .filter(|(key, _)| continuation_token.map_or(true, |token| key.as_str() > token));

        let page: Vec<ObjectInfo> = matching
            .by_ref()
            .take(self.page_size)
            .map(|(key, data)| ObjectInfo {
                key: key.clone(),
                size: data.len() as u64,
                last_modified: None,
                etag: None,
            })
            .collect();

        let next_continuation_token: Option<String> = match matching.next() {
            Some(_) => page.last().map(|info| info.key.clone()),
            None => None,
        };

        Ok(ObjectPage {
            objects: page,
            next_continuation_token,
        })
    }

    async fn copy_object(
        &self,
        source: &ObjectLocation,
        destination: &ObjectLocation,
    ) -> Result<(), StorageError> {
        let mut state = self.begin(FailPoint::CopyObject)?;
        let data: Vec<u8> = state
            .object(&source.bucket, &source.key)
            .cloned()
            .ok_or_else(|| StorageError::not_found(&source.bucket, &source.key))?;
        state
            .buckets
            .entry(destination.bucket.clone())
            .or_default()
            .insert(destination.key.clone(), data);
        Ok(())
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> Result<(), StorageError> {
        let mut state = self.begin(FailPoint::DeleteObject)?;
        // Deleting a missing key succeeds, as in S3.
        if let Some(objects) = state.buckets.get_mut(bucket) {
            objects.remove(key);
        }
        Ok(())
    }

    async fn create_multipart_upload(
        &self,
        destination: &ObjectLocation,
    ) -> Result<String, StorageError> {
        let mut state = self.begin(FailPoint::CreateMultipartUpload)?;
        let upload_id: String = uuid::Uuid::new_v4().simple().to_string();
        state.uploads.insert(
            upload_id.clone(),
            PendingUpload {
                destination: destination.clone(),
                parts: BTreeMap::new(),
            },
        );
        Ok(upload_id)
    }

    async fn upload_part_copy(
        &self,
        source: &ObjectLocation,
        destination: &ObjectLocation,
        upload_id: &str,
        part: &PartRange,
    ) -> Result<String, StorageError> {
        let mut state = self.begin(FailPoint::UploadPartCopy(part.part_number))?;
        let data: &Vec<u8> = state
            .object(&source.bucket, &source.key)
            .ok_or_else(|| StorageError::not_found(&source.bucket, &source.key))?;

        if part.first_byte > part.last_byte || part.last_byte >= data.len() as u64 {
            return Err(StorageError::Other {
                message: format!(
                    "InvalidRange: {} for {} ({} bytes)",
                    part.http_range(),
                    source,
                    data.len()
                ),
            });
        }
        let bytes: Vec<u8> = data[part.first_byte as usize..=part.last_byte as usize].to_vec();

        let etag: String = format!("\"{}\"", uuid::Uuid::new_v4().simple());
        state
            .upload(destination, upload_id)?
            .parts
            .insert(part.part_number, (etag.clone(), bytes));
        Ok(etag)
    }

    async fn complete_multipart_upload(
        &self,
        destination: &ObjectLocation,
        upload_id: &str,
        parts: &[CompletedPart],
    ) -> Result<(), StorageError> {
        let mut state = self.begin(FailPoint::CompleteMultipartUpload)?;
        let upload: &mut PendingUpload = state.upload(destination, upload_id)?;

        if parts.is_empty() {
            return Err(StorageError::Other {
                message: format!("MalformedXML: no parts for upload {}", upload_id),
            });
        }
        if parts.windows(2).any(|w| w[0].part_number >= w[1].part_number) {
            return Err(StorageError::Other {
                message: format!("InvalidPartOrder: upload {}", upload_id),
            });
        }

        let mut assembled: Vec<u8> = Vec::new();
        for part in parts {
            match upload.parts.get(&part.part_number) {
                Some((etag, bytes)) if *etag == part.etag => assembled.extend_from_slice(bytes),
                _ => {
                    return Err(StorageError::Other {
                        message: format!(
                            "InvalidPart: part {} of upload {}",
                            part.part_number, upload_id
                        ),
                    })
                }
            }
        }

        state.uploads.remove(upload_id);
        state
            .buckets
            .entry(destination.bucket.clone())
            .or_default()
            .insert(destination.key.clone(), assembled);
        Ok(())
    }

    async fn abort_multipart_upload(
        &self,
        destination: &ObjectLocation,
        upload_id: &str,
    ) -> Result<(), StorageError> {
        let mut state = self.begin(FailPoint::AbortMultipartUpload)?;
        state.upload(destination, upload_id)?;
        state.uploads.remove(upload_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_list_paginates() {
        let client = MemoryStorageClient::new().with_page_size(2);
        for name in ["a", "b", "c", "d", "e"] {
            client.put("bucket", &format!("ds1/{}", name), vec![0u8; 3]);
        }
        client.put("bucket", "other/x", vec![0u8; 1]);

        let first = client.list_objects_page("bucket", "ds1/", None).await.unwrap();
        assert_eq!(first.objects.len(), 2);
        assert_eq!(first.next_continuation_token.as_deref(), Some("ds1/b"));

        let all = client.list_objects("bucket", "ds1/").await.unwrap();
        let keys: Vec<&str> = all.iter().map(|o| o.key.as_str()).collect();
        assert_eq!(keys, vec!["ds1/a", "ds1/b", "ds1/c", "ds1/d", "ds1/e"]);
        assert!(all.iter().all(|o| o.size == 3));
    }

    #[tokio::test]
    async fn test_list_exact_page_boundary() {
        let client = MemoryStorageClient::new().with_page_size(2);
        client.put("bucket", "p/a", vec![1]);
        client.put("bucket", "p/b", vec![2]);

        let page = client.list_objects_page("bucket", "p/", None).await.unwrap();
        assert_eq!(page.objects.len(), 2);
        assert!(page.next_continuation_token.is_none());
    }

    #[tokio::test]
    async fn test_list_unknown_bucket_is_empty() {
        let client = MemoryStorageClient::new();
        assert!(client.list_objects("nope", "").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_copy_and_delete() {
        let client = MemoryStorageClient::new();
        client.put("src", "k", b"abc".to_vec());

        client
            .copy_object(&ObjectLocation::new("src", "k"), &ObjectLocation::new("dst", "k2"))
            .await
            .unwrap();
        client.delete_object("src", "k").await.unwrap();

        assert_eq!(client.get("dst", "k2"), Some(b"abc".to_vec()));
        assert!(!client.object_exists("src", "k").await.unwrap());
        assert_eq!(client.operation_count(), 3);
    }

    #[tokio::test]
    async fn test_get_missing_is_not_found() {
        let client = MemoryStorageClient::new();
        let err = client.get_object("b", "k").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_complete_rejects_out_of_order_parts() {
        let client = MemoryStorageClient::new();
        client.put("src", "k", vec![7u8; 20]);
        let src = ObjectLocation::new("src", "k");
        let dst = ObjectLocation::new("dst", "k");

        let upload_id = client.create_multipart_upload(&dst).await.unwrap();
        let e1 = client
            .upload_part_copy(&src, &dst, &upload_id, &PartRange { part_number: 1, first_byte: 0, last_byte: 9 })
            .await
            .unwrap();
        let e2 = client
            .upload_part_copy(&src, &dst, &upload_id, &PartRange { part_number: 2, first_byte: 10, last_byte: 19 })
            .await
            .unwrap();

        let reversed = vec![
            CompletedPart { part_number: 2, etag: e2.clone() },
            CompletedPart { part_number: 1, etag: e1.clone() },
        ];
        assert!(client
            .complete_multipart_upload(&dst, &upload_id, &reversed)
            .await
            .is_err());

        let ordered = vec![
            CompletedPart { part_number: 1, etag: e1 },
            CompletedPart { part_number: 2, etag: e2 },
        ];
        client
            .complete_multipart_upload(&dst, &upload_id, &ordered)
            .await
            .unwrap();
        assert_eq!(client.get("dst", "k"), Some(vec![7u8; 20]));
    }

    #[tokio::test]
    async fn test_injected_failure_is_transient() {
        let client = MemoryStorageClient::new();
        client.fail_on(FailPoint::ListObjects);
        let err = client.list_objects("b", "").await.unwrap_err();
        assert!(err.is_retryable());

        client.clear_failures();
        assert!(client.list_objects("b", "").await.is_ok());
    }
}
