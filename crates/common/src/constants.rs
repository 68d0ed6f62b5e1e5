//! Shared constants used across package-import crates.

/// Objects larger than this many bytes are copied with the multipart protocol.
/// Single-shot copies are capped by the store just above 5GB.
pub const LARGE_OBJECT_THRESHOLD: u64 = 5_300_000_000;

/// Part size for multipart copies (100MB). The last part may be shorter.
pub const MULTIPART_PART_SIZE: u64 = 100 * 1024 * 1024;

/// Most parts a single multipart upload may have.
pub const MAX_MULTIPART_PARTS: usize = 10_000;

/// Separator for object key segments.
pub const KEY_SEPARATOR: char = '/';

/// Prefix of the archive produced by the upstream packager.
pub const PACKAGE_NAME_PREFIX: &str = "package_";

/// Extension of the package archive.
pub const ARCHIVE_EXTENSION: &str = "zip";

/// Extension of the checksum sidecar shipped next to the archive.
pub const CHECKSUM_SIDECAR_EXTENSION: &str = "sha";

/// Field separator used inside checksum sidecar lines.
pub const CHECKSUM_FIELD_SEPARATOR: &str = "  ";

/// Scheme prefix of storage locators for objects in the permanent store.
pub const STORAGE_LOCATOR_SCHEME: &str = "s3";
