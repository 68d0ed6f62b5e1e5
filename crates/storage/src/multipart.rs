//! Multipart copy of large objects.
//!
//! A copy runs `create -> upload_part_copy (1..=n, in order) -> complete`.
//! Parts are copied one at a time so the completion manifest is built in
//! part order by construction.
//!
//! # Failure handling
//!
//! If a part copy or the completion call fails, the open upload is aborted
//! before the error is returned. If the abort fails as well, the upload is
//! left orphaned in the destination bucket and keeps accruing storage until
//! it is removed externally (e.g. by a lifecycle rule). The same happens if
//! the process dies mid-copy: session state is never persisted.

use package_import_common::MAX_MULTIPART_PARTS;

use crate::error::StorageError;
use crate::plan::{expected_part_count, generate_parts, PartRange};
use crate::traits::StorageClient;
use crate::types::{CompletedPart, ObjectLocation};

/// Lifecycle of a multipart session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MultipartState {
    /// Upload id issued, no part copied yet.
    Initiated,
    /// `completed` parts acknowledged.
    CopyingParts { completed: usize },
    /// Completion accepted by the store.
    Completed,
    /// Upload discarded after a failure.
    Aborted,
}

impl MultipartState {
    /// Whether the session can still accept parts.
    pub fn is_open(&self) -> bool {
        matches!(
            self,
            MultipartState::Initiated | MultipartState::CopyingParts { .. }
        )
    }
}

/// An open or finished multipart upload.
#[derive(Debug, Clone)]
pub struct MultipartSession {
    destination: ObjectLocation,
    upload_id: String,
    parts: Vec<CompletedPart>,
    state: MultipartState,
}

impl MultipartSession {
    /// Track a freshly created upload.
    pub fn new(destination: ObjectLocation, upload_id: impl Into<String>) -> Self {
        Self {
            destination,
            upload_id: upload_id.into(),
            parts: Vec::new(),
            state: MultipartState::Initiated,
        }
    }

    pub fn destination(&self) -> &ObjectLocation {
        &self.destination
    }

    pub fn upload_id(&self) -> &str {
        &self.upload_id
    }

    /// Acknowledged parts, in part order.
    pub fn parts(&self) -> &[CompletedPart] {
        &self.parts
    }

    pub fn state(&self) -> MultipartState {
        self.state
    }

    /// Record an acknowledged part.
    ///
    /// # Errors
    /// Returns `StorageError::Other` if the session is closed or the part
    /// number is not the next one in sequence.
    pub fn record_part(&mut self, part: CompletedPart) -> Result<(), StorageError> {
        if !self.state.is_open() {
            return Err(StorageError::Other {
                message: format!(
                    "Multipart upload {} is {:?}, cannot record part {}",
                    self.upload_id, self.state, part.part_number
                ),
            });
        }

        let expected: usize = self.parts.len() + 1;
        if part.part_number < 1 || part.part_number as usize != expected {
            return Err(StorageError::Other {
                message: format!(
                    "Multipart upload {}: expected part {}, got {}",
                    self.upload_id, expected, part.part_number
                ),
            });
        }

        self.parts.push(part);
        self.state = MultipartState::CopyingParts {
            completed: self.parts.len(),
        };
        Ok(())
    }

    fn mark_completed(&mut self) {
        self.state = MultipartState::Completed;
    }

    fn mark_aborted(&mut self) {
        self.state = MultipartState::Aborted;
    }
}

/// Copies one object with the multipart protocol.
pub struct MultipartCopier<'a, C: StorageClient> {
    client: &'a C,
    part_size: u64,
}

impl<'a, C: StorageClient> MultipartCopier<'a, C> {
    /// Create a copier.
    ///
    /// # Arguments
    /// * `client` - Storage client for store operations
    /// * `part_size` - Bytes per part (last part may be shorter)
    pub fn new(client: &'a C, part_size: u64) -> Self {
        Self { client, part_size }
    }

    /// Copy `source` to `destination`.
    ///
    /// The source size is read with a HEAD request before the upload is opened.
    ///
    /// # Returns
    /// The completed session.
    ///
    /// # Errors
    /// Errors before the upload is opened (missing source, invalid part size,
    /// too many parts) are returned as-is. Later errors are wrapped in
    /// `StorageError::MultipartCopyFailed` after an abort attempt.
    pub async fn copy(
        &self,
        source: &ObjectLocation,
        destination: &ObjectLocation,
    ) -> Result<MultipartSession, StorageError> {
        if self.part_size == 0 {
            return Err(StorageError::InvalidConfig {
                message: "multipart part size must be positive".to_string(),
            });
        }

        let size: u64 = self
            .client
            .head_object(&source.bucket, &source.key)
            .await?
            .ok_or_else(|| StorageError::not_found(&source.bucket, &source.key))?;

        let part_count: usize = expected_part_count(size, self.part_size);
        if part_count == 0 {
            return Err(StorageError::Other {
                message: format!("Refusing multipart copy of empty object {}", source),
            });
        }
        if part_count > MAX_MULTIPART_PARTS {
            return Err(StorageError::InvalidConfig {
                message: format!(
                    "{} needs {} parts of {} bytes, the store allows at most {}",
                    source,
                    part_count,
                    self.part_size,
                    MAX_MULTIPART_PARTS
                ),
            });
        }

        let parts: Vec<PartRange> = generate_parts(size, self.part_size);

        let upload_id: String = self.client.create_multipart_upload(destination).await?;
        log::info!(
            "Multipart copy {} -> {}: {} bytes in {} parts (upload {})",
            source,
            destination,
            size,
            parts.len(),
            upload_id
        );

        let mut session = MultipartSession::new(destination.clone(), upload_id);
        match self.copy_parts(&mut session, source, &parts).await {
            Ok(()) => Ok(session),
            Err(err) => Err(self.abort(&mut session, err).await),
        }
    }

    /// Copy every part in order, then complete the upload.
    async fn copy_parts(
        &self,
        session: &mut MultipartSession,
        source: &ObjectLocation,
        parts: &[PartRange],
    ) -> Result<(), StorageError> {
        for part in parts {
            let etag: String = self
                .client
                .upload_part_copy(source, &session.destination, &session.upload_id, part)
                .await?;
            session.record_part(CompletedPart {
                part_number: part.part_number,
                etag,
            })?;
            log::debug!(
                "Copied part {} ({}) of {}",
                part.part_number,
                part.http_range(),
                session.destination
            );
        }

        self.client
            .complete_multipart_upload(&session.destination, &session.upload_id, &session.parts)
            .await?;
        session.mark_completed();
        log::info!("Multipart copy to {} complete", session.destination);
        Ok(())
    }

    /// Abort the session and wrap the failure that caused it.
    async fn abort(&self, session: &mut MultipartSession, cause: StorageError) -> StorageError {
        let aborted: bool = match self
            .client
            .abort_multipart_upload(&session.destination, &session.upload_id)
            .await
        {
            Ok(()) => {
                session.mark_aborted();
                log::warn!(
                    "Aborted multipart upload {} to {} after failure: {}",
                    session.upload_id,
                    session.destination,
                    cause
                );
                true
            }
            Err(abort_err) => {
                log::error!(
                    "Multipart upload {} to {} is orphaned: abort failed ({}) after: {}",
                    session.upload_id,
                    session.destination,
                    abort_err,
                    cause
                );
                false
            }
        };

        StorageError::MultipartCopyFailed {
            bucket: session.destination.bucket.clone(),
            key: session.destination.key.clone(),
            upload_id: session.upload_id.clone(),
            aborted,
            source: Box::new(cause),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{FailPoint, MemoryStorageClient};

    fn patterned(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 251) as u8).collect()
    }

    #[test]
    fn test_session_records_parts_in_order() {
        let mut session = MultipartSession::new(ObjectLocation::new("b", "k"), "u1");
        assert_eq!(session.state(), MultipartState::Initiated);

        session
            .record_part(CompletedPart { part_number: 1, etag: "e1".into() })
            .unwrap();
        session
            .record_part(CompletedPart { part_number: 2, etag: "e2".into() })
            .unwrap();
        assert_eq!(session.state(), MultipartState::CopyingParts { completed: 2 });
        assert_eq!(session.parts().len(), 2);
    }

    #[test]
    fn test_session_rejects_gaps_and_repeats() {
        let mut session = MultipartSession::new(ObjectLocation::new("b", "k"), "u1");
        assert!(session
            .record_part(CompletedPart { part_number: 2, etag: "e2".into() })
            .is_err());
        assert!(session
            .record_part(CompletedPart { part_number: 0, etag: "e0".into() })
            .is_err());

        session
            .record_part(CompletedPart { part_number: 1, etag: "e1".into() })
            .unwrap();
        assert!(session
            .record_part(CompletedPart { part_number: 1, etag: "e1".into() })
            .is_err());
    }

    #[test]
    fn test_session_closed_after_completion() {
        let mut session = MultipartSession::new(ObjectLocation::new("b", "k"), "u1");
        session
            .record_part(CompletedPart { part_number: 1, etag: "e1".into() })
            .unwrap();
        session.mark_completed();
        assert!(!session.state().is_open());
        assert!(session
            .record_part(CompletedPart { part_number: 2, etag: "e2".into() })
            .is_err());
    }

    #[tokio::test]
    async fn test_copy_reassembles_object() {
        let client = MemoryStorageClient::new();
        let data: Vec<u8> = patterned(1_000);
        client.put("src", "ds1/big.bin", data.clone());

        let copier = MultipartCopier::new(&client, 64);
        let session = copier
            .copy(
                &ObjectLocation::new("src", "ds1/big.bin"),
                &ObjectLocation::new("dst", "auth/id1/big.bin"),
            )
            .await
            .unwrap();

        assert_eq!(session.state(), MultipartState::Completed);
        assert_eq!(session.parts().len(), 16); // ceil(1000 / 64)
        let numbers: Vec<i32> = session.parts().iter().map(|p| p.part_number).collect();
        assert_eq!(numbers, (1..=16).collect::<Vec<i32>>());

        assert_eq!(client.get("dst", "auth/id1/big.bin"), Some(data));
        assert_eq!(client.pending_upload_count(), 0);
    }

    #[tokio::test]
    async fn test_part_failure_aborts_upload() {
        let client = MemoryStorageClient::new();
        client.put("src", "big.bin", patterned(500));
        client.fail_on(FailPoint::UploadPartCopy(3));

        let copier = MultipartCopier::new(&client, 100);
        let err = copier
            .copy(
                &ObjectLocation::new("src", "big.bin"),
                &ObjectLocation::new("dst", "big.bin"),
            )
            .await
            .unwrap_err();

        match err {
            StorageError::MultipartCopyFailed { aborted, ref source, .. } => {
                assert!(aborted);
                assert!(source.is_retryable());
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(client.pending_upload_count(), 0);
        assert!(client.get("dst", "big.bin").is_none());
    }

    #[tokio::test]
    async fn test_completion_failure_aborts_upload() {
        let client = MemoryStorageClient::new();
        client.put("src", "big.bin", patterned(300));
        client.fail_on(FailPoint::CompleteMultipartUpload);

        let copier = MultipartCopier::new(&client, 100);
        let err = copier
            .copy(
                &ObjectLocation::new("src", "big.bin"),
                &ObjectLocation::new("dst", "big.bin"),
            )
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            StorageError::MultipartCopyFailed { aborted: true, .. }
        ));
        assert_eq!(client.pending_upload_count(), 0);
    }

    #[tokio::test]
    async fn test_failed_abort_reports_orphaned_upload() {
        let client = MemoryStorageClient::new();
        client.put("src", "big.bin", patterned(300));
        client.fail_on(FailPoint::UploadPartCopy(2));
        client.fail_on(FailPoint::AbortMultipartUpload);

        let copier = MultipartCopier::new(&client, 100);
        let err = copier
            .copy(
                &ObjectLocation::new("src", "big.bin"),
                &ObjectLocation::new("dst", "big.bin"),
            )
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            StorageError::MultipartCopyFailed { aborted: false, .. }
        ));
        assert_eq!(client.pending_upload_count(), 1);
    }

    #[tokio::test]
    async fn test_missing_source_opens_no_upload() {
        let client = MemoryStorageClient::new();
        let copier = MultipartCopier::new(&client, 100);
        let err = copier
            .copy(
                &ObjectLocation::new("src", "missing.bin"),
                &ObjectLocation::new("dst", "missing.bin"),
            )
            .await
            .unwrap_err();

        assert!(err.is_not_found());
        assert_eq!(client.pending_upload_count(), 0);
    }

    #[tokio::test]
    async fn test_zero_part_size_rejected() {
        let client = MemoryStorageClient::new();
        client.put("src", "big.bin", patterned(10));
        let copier = MultipartCopier::new(&client, 0);
        let err = copier
            .copy(
                &ObjectLocation::new("src", "big.bin"),
                &ObjectLocation::new("dst", "big.bin"),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::InvalidConfig { .. }));
    }

    #[tokio::test]
    async fn test_max_part_size_copies_in_one_part() {
        let client = MemoryStorageClient::new();
        let data = patterned(10);
        client.put("src", "big.bin", data.clone());
        let copier = MultipartCopier::new(&client, u64::MAX);

        let session = copier
            .copy(
                &ObjectLocation::new("src", "big.bin"),
                &ObjectLocation::new("dst", "big.bin"),
            )
            .await
            .unwrap();

        assert_eq!(session.parts().len(), 1);
        assert_eq!(client.get("dst", "big.bin"), Some(data));
    }

    #[tokio::test]
    async fn test_too_many_parts_opens_no_upload() {
        let client = MemoryStorageClient::new();
        client.put("src", "big.bin", patterned(MAX_MULTIPART_PARTS + 1));
        let copier = MultipartCopier::new(&client, 1);

        let err = copier
            .copy(
                &ObjectLocation::new("src", "big.bin"),
                &ObjectLocation::new("dst", "big.bin"),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, StorageError::InvalidConfig { .. }));
        assert_eq!(client.pending_upload_count(), 0);
        // head only
        assert_eq!(client.operation_count(), 1);
    }
}
