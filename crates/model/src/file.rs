//! Package file record created by an import.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Content type of an imported folder package.
pub const PACKAGE_CONTENT_TYPE: &str = "application/vnd.dataverse.file-package";

/// Digest algorithm of a stored checksum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChecksumType {
    #[serde(rename = "MD5")]
    Md5,
    #[serde(rename = "SHA-1")]
    Sha1,
    #[serde(rename = "SHA-256")]
    Sha256,
    #[serde(rename = "SHA-512")]
    Sha512,
}

impl ChecksumType {
    /// Canonical algorithm name.
    pub fn as_str(&self) -> &'static str {
        match self {
            ChecksumType::Md5 => "MD5",
            ChecksumType::Sha1 => "SHA-1",
            ChecksumType::Sha256 => "SHA-256",
            ChecksumType::Sha512 => "SHA-512",
        }
    }
}

/// The permanent record of an imported package archive.
///
/// Created once per import and only mutated while its persistent identifier
/// is assigned. Never deleted by the import pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageFile {
    /// MIME type.
    pub content_type: String,
    /// Algorithm of `checksum_value`.
    pub checksum_type: ChecksumType,
    /// Hex digest; empty when the sidecar had no entry for the archive.
    pub checksum_value: String,
    /// Size in bytes, as supplied by the caller of the import.
    pub filesize: u64,
    pub create_date: DateTime<Utc>,
    pub modification_time: DateTime<Utc>,
    pub permission_modification_time: DateTime<Utc>,
    /// Global id of the owning dataset.
    pub owner: String,
    /// Where the bytes live in the permanent store.
    pub storage_identifier: Option<String>,
    /// Persistent identifier protocol.
    pub protocol: Option<String>,
    /// Persistent identifier authority.
    pub authority: Option<String>,
    /// Persistent identifier local part.
    pub identifier: Option<String>,
    /// Whether the identifier service confirmed registration.
    pub identifier_registered: bool,
    /// When the registration was confirmed.
    pub global_id_create_time: Option<DateTime<Utc>>,
    /// Packages are never ingested further.
    pub ingest_done: bool,
}

impl PackageFile {
    /// Create a package record with all timestamps set to `now`.
    ///
    /// # Arguments
    /// * `owner` - Global id of the owning dataset
    /// * `checksum_type` - Digest algorithm
    /// * `checksum_value` - Hex digest (may be empty)
    /// * `filesize` - Size in bytes
    /// * `now` - Creation timestamp
    pub fn new_package(
        owner: impl Into<String>,
        checksum_type: ChecksumType,
        checksum_value: impl Into<String>,
        filesize: u64,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            content_type: PACKAGE_CONTENT_TYPE.to_string(),
            checksum_type,
            checksum_value: checksum_value.into(),
            filesize,
            create_date: now,
            modification_time: now,
            permission_modification_time: now,
            owner: owner.into(),
            storage_identifier: None,
            protocol: None,
            authority: None,
            identifier: None,
            identifier_registered: false,
            global_id_create_time: None,
            ingest_done: false,
        }
    }

    /// Whether a non-empty identifier has been assigned.
    pub fn has_identifier(&self) -> bool {
        self.identifier.as_deref().is_some_and(|id| !id.is_empty())
    }

    /// `protocol:authority/identifier`, once all three parts are known.
    pub fn global_id(&self) -> Option<String> {
        match (&self.protocol, &self.authority, &self.identifier) {
            (Some(protocol), Some(authority), Some(identifier)) if !identifier.is_empty() => {
                Some(format!("{}:{}/{}", protocol, authority, identifier))
            }
            _ => None,
        }
    }
}
