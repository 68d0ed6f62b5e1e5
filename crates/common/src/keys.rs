//! Object key derivation for imported packages.
//!
//! All destination keys of a dataset live under its dataset key
//! (`{authority}/{identifier}`). Keys are always `/`-delimited, independent of
//! the host OS.

use crate::constants::{
    ARCHIVE_EXTENSION, CHECKSUM_SIDECAR_EXTENSION, KEY_SEPARATOR, PACKAGE_NAME_PREFIX,
    STORAGE_LOCATOR_SCHEME,
};
use crate::error::KeyError;

/// Build the key namespace of a dataset.
///
/// Leading and trailing separators on either component are dropped so that
/// `"10.5072/"` and `"FK2/ABC"` join to `"10.5072/FK2/ABC"`.
///
/// # Arguments
/// * `authority` - Dataset authority (e.g. "10.5072")
/// * `identifier` - Dataset identifier (e.g. "FK2/ABCDEF")
///
/// # Errors
/// Returns `KeyError::EmptyComponent` if either component is empty after trimming.
pub fn dataset_key(authority: &str, identifier: &str) -> Result<String, KeyError> {
    let authority: &str = authority.trim_matches(KEY_SEPARATOR);
    let identifier: &str = identifier.trim_matches(KEY_SEPARATOR);

    if authority.is_empty() {
        return Err(KeyError::empty("authority"));
    }
    if identifier.is_empty() {
        return Err(KeyError::empty("identifier"));
    }

    Ok(format!("{}{}{}", authority, KEY_SEPARATOR, identifier))
}

/// Final segment of an object key (everything after the last separator).
///
/// Returns an empty string for keys that end in a separator.
pub fn basename(key: &str) -> &str {
    match key.rfind(KEY_SEPARATOR) {
        Some(idx) => &key[idx + 1..],
        None => key,
    }
}

/// Join a prefix and a name with exactly one separator between them.
///
/// An empty prefix yields the name unchanged.
pub fn join_key(prefix: &str, name: &str) -> String {
    let prefix: &str = prefix.trim_end_matches(KEY_SEPARATOR);
    let name: &str = name.trim_start_matches(KEY_SEPARATOR);
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{}{}{}", prefix, KEY_SEPARATOR, name)
    }
}

/// Destination key for a staged object: `{dataset_key}/{basename(source_key)}`.
///
/// # Errors
/// Returns `KeyError::NoBaseName` if the source key ends in a separator
/// (a directory marker).
pub fn destination_key(dataset_key: &str, source_key: &str) -> Result<String, KeyError> {
    let name: &str = basename(source_key);
    if name.is_empty() {
        return Err(KeyError::NoBaseName {
            key: source_key.to_string(),
        });
    }
    Ok(join_key(dataset_key, name))
}

/// Directory marker key of a dataset: `{dataset_key}/`.
///
/// Staged markers (keys ending in a separator) land here.
pub fn directory_marker_key(dataset_key: &str) -> String {
    format!("{}{}", dataset_key.trim_end_matches(KEY_SEPARATOR), KEY_SEPARATOR)
}

/// Strip every path separator from a package base name.
pub fn sanitize_base_name(base_name: &str) -> String {
    base_name.replace(KEY_SEPARATOR, "")
}

/// Root name of a package: `package_{sanitized base name}`.
///
/// # Errors
/// Returns `KeyError::EmptyComponent` if nothing is left after sanitizing.
pub fn root_package_name(base_name: &str) -> Result<String, KeyError> {
    let sanitized: String = sanitize_base_name(base_name);
    if sanitized.is_empty() {
        return Err(KeyError::empty("package base name"));
    }
    Ok(format!("{}{}", PACKAGE_NAME_PREFIX, sanitized))
}

/// Key of the package archive: `{dataset_key}/{root_package_name}.zip`.
pub fn archive_key(dataset_key: &str, root_package_name: &str) -> String {
    join_key(
        dataset_key,
        &format!("{}.{}", root_package_name, ARCHIVE_EXTENSION),
    )
}

/// Key of the checksum sidecar: `{dataset_key}/{root_package_name}.sha`.
pub fn checksum_sidecar_key(dataset_key: &str, root_package_name: &str) -> String {
    join_key(
        dataset_key,
        &format!("{}.{}", root_package_name, CHECKSUM_SIDECAR_EXTENSION),
    )
}

/// Storage locator of a file in the permanent store.
///
/// Derived only from identifying fields, so it is known before the file
/// record is persisted. Format: `s3://{bucket}:{dataset_key}/{label}`.
pub fn storage_locator(bucket: &str, dataset_key: &str, label: &str) -> String {
    format!(
        "{}://{}:{}",
        STORAGE_LOCATOR_SCHEME,
        bucket,
        join_key(dataset_key, label)
    )
}
