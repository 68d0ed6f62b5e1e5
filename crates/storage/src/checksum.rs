//! Checksum sidecar resolution.
//!
//! The upstream packager ships `{root_package_name}.sha` next to the archive.
//! Each line holds `<hex digest>  <file name>` (two spaces, as written by
//! `sha1sum`).
//!
//! ```text
//! 3a2c9e0f...  package_a.zip
//! ```

use package_import_common::{checksum_sidecar_key, ARCHIVE_EXTENSION, CHECKSUM_FIELD_SEPARATOR};

use crate::error::ChecksumUnavailable;
use crate::traits::StorageClient;

/// Find the digest for `{root_package_name}.zip` in sidecar content.
///
/// The first line whose file name field contains the archive name wins.
/// Lines without the separator or with an empty digest are skipped.
///
/// # Arguments
/// * `content` - Sidecar text
/// * `root_package_name` - Package name without extension (e.g. "package_a")
pub fn parse_checksum_manifest(content: &str, root_package_name: &str) -> Option<String> {
    let archive: String = format!("{}.{}", root_package_name, ARCHIVE_EXTENSION);

    content.lines().find_map(|line: &str| {
        let line: &str = line.trim_end_matches('\r');
        let (digest, file_name) = line.split_once(CHECKSUM_FIELD_SEPARATOR)?;
        if !digest.is_empty() && file_name.contains(&archive) {
            log::debug!("Checksum found for {}: {}", archive, digest);
            Some(digest.to_string())
        } else {
            None
        }
    })
}

/// Read the checksum of a package archive from its sidecar in the store.
///
/// # Arguments
/// * `client` - Storage client for store operations
/// * `bucket` - Bucket holding the sidecar
/// * `dataset_key` - Key namespace of the dataset
/// * `root_package_name` - Package name without extension (e.g. "package_a")
///
/// # Errors
/// Returns `ChecksumUnavailable` when the sidecar cannot be read or has no
/// entry for the archive. Callers treat this as "no checksum", not as a failure.
pub async fn resolve_checksum<C: StorageClient>(
    client: &C,
    bucket: &str,
    dataset_key: &str,
    root_package_name: &str,
) -> Result<String, ChecksumUnavailable> {
    let key: String = checksum_sidecar_key(dataset_key, root_package_name);
    log::info!("Reading checksum sidecar s3://{}/{}", bucket, key);

    let bytes: Vec<u8> =
        client
            .get_object(bucket, &key)
            .await
            .map_err(|source| ChecksumUnavailable::ReadFailed {
                bucket: bucket.to_string(),
                key: key.clone(),
                source,
            })?;

    let content: String =
        String::from_utf8(bytes).map_err(|_| ChecksumUnavailable::InvalidEncoding {
            bucket: bucket.to_string(),
            key: key.clone(),
        })?;

    parse_checksum_manifest(&content, root_package_name).ok_or_else(|| {
        ChecksumUnavailable::NoMatchingEntry {
            bucket: bucket.to_string(),
            key,
            archive: format!("{}.{}", root_package_name, ARCHIVE_EXTENSION),
        }
    })
}
