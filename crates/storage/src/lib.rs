//! Storage abstraction for package import S3 operations.
//!
//! This crate provides a platform-agnostic interface for moving staged
//! package objects between buckets with server-side copies. Backends
//! implement [`StorageClient`]:
//!
//! - **CRT Backend** - Native Rust using the AWS SDK (`package-import-storage-crt`)
//! - **Memory Backend** - In-process store for tests and dry runs ([`memory`])
//!
//! # Copy planning
//!
//! Objects larger than the single-copy limit are copied as multipart
//! uploads. The `plan` functions decide the strategy and the part byte
//! ranges; [`multipart::MultipartCopier`] drives the upload itself.
//!
//! # Checksums
//!
//! The `checksum` functions read the `.sha` sidecar shipped with a package
//! and extract the archive's digest.

mod checksum;
mod error;
pub mod memory;
mod migrate;
pub mod multipart;
mod plan;
mod traits;
mod types;

pub use checksum::{parse_checksum_manifest, resolve_checksum};
pub use error::{ChecksumUnavailable, MigrationError, StorageError};
pub use migrate::MigrationOrchestrator;
pub use multipart::{MultipartCopier, MultipartSession, MultipartState};
pub use plan::{
    copy_strategy, expected_part_count, generate_parts, needs_multipart, CopyPlan, CopyStrategy,
    PartRange,
};
pub use traits::{ObjectInfo, ObjectPage, StorageClient};
pub use types::{
    AwsCredentials, CompletedPart, ImportSettings, MigrationStatistics, ObjectLocation,
    StorageSettings, DEFAULT_CUSTOM_ENDPOINT_REGION, ENV_DESTINATION_BUCKET, ENV_ENDPOINT_URL,
    ENV_LARGE_OBJECT_THRESHOLD, ENV_PART_SIZE, ENV_PATH_STYLE_ACCESS, ENV_REGION, ENV_SOURCE_BUCKET,
};
