//! Dataset and version records.

use std::fmt;

use package_import_common::{dataset_key, KeyError};
use serde::{Deserialize, Serialize};

use crate::error::PreconditionError;
use crate::file::PackageFile;

/// Lifecycle state of a dataset version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VersionState {
    /// Mutable, unpublished.
    Draft,
    Released,
    Archived,
    Deaccessioned,
}

impl fmt::Display for VersionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name: &str = match self {
            VersionState::Draft => "DRAFT",
            VersionState::Released => "RELEASED",
            VersionState::Archived => "ARCHIVED",
            VersionState::Deaccessioned => "DEACCESSIONED",
        };
        f.write_str(name)
    }
}

/// Label and location of one file inside a dataset version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMetadata {
    /// Display label (e.g. "package_a.zip").
    pub label: String,
    /// Storage locator of the file this entry describes.
    pub storage_identifier: String,
    /// Version number of the owning dataset version.
    pub version_number: u32,
}

/// One version of a dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetVersion {
    /// Sequential version number, starting at 1.
    pub version_number: u32,
    /// Lifecycle state.
    pub state: VersionState,
    /// File entries of this version.
    #[serde(default)]
    pub file_metadatas: Vec<FileMetadata>,
}

impl DatasetVersion {
    /// Create an empty version.
    pub fn new(version_number: u32, state: VersionState) -> Self {
        Self {
            version_number,
            state,
            file_metadatas: Vec::new(),
        }
    }

    /// Create an empty draft version.
    pub fn draft(version_number: u32) -> Self {
        Self::new(version_number, VersionState::Draft)
    }

    /// Whether the version is still mutable.
    pub fn is_draft(&self) -> bool {
        self.state == VersionState::Draft
    }
}

/// A dataset as seen by the import pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dataset {
    /// Database id, if persisted. Never used to derive storage keys.
    pub id: Option<i64>,
    /// Persistent identifier protocol (e.g. "doi").
    pub protocol: String,
    /// Persistent identifier authority (e.g. "10.5072").
    pub authority: String,
    /// Persistent identifier local part (e.g. "FK2/ABCDEF").
    pub identifier: String,
    /// Files owned by the dataset.
    #[serde(default)]
    pub files: Vec<PackageFile>,
    /// Versions, oldest first.
    #[serde(default)]
    pub versions: Vec<DatasetVersion>,
}

impl Dataset {
    /// Create an unpersisted dataset with a single empty draft version.
    ///
    /// # Arguments
    /// * `protocol` - Identifier protocol
    /// * `authority` - Identifier authority
    /// * `identifier` - Identifier local part
    pub fn new(
        protocol: impl Into<String>,
        authority: impl Into<String>,
        identifier: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            protocol: protocol.into(),
            authority: authority.into(),
            identifier: identifier.into(),
            files: Vec::new(),
            versions: vec![DatasetVersion::draft(1)],
        }
    }

    /// Replace the version list.
    pub fn with_versions(mut self, versions: Vec<DatasetVersion>) -> Self {
        self.versions = versions;
        self
    }

    /// Human-readable global id, used in logs and error messages.
    pub fn global_id(&self) -> String {
        format!("{}:{}/{}", self.protocol, self.authority, self.identifier)
    }

    /// Key namespace of this dataset in the permanent store.
    ///
    /// # Errors
    /// Returns `KeyError` if authority or identifier is empty.
    pub fn storage_key(&self) -> Result<String, KeyError> {
        dataset_key(&self.authority, &self.identifier)
    }

    /// The most recent version.
    pub fn latest_version(&self) -> Option<&DatasetVersion> {
        self.versions.last()
    }

    /// The most recent version, mutably.
    pub fn latest_version_mut(&mut self) -> Option<&mut DatasetVersion> {
        self.versions.last_mut()
    }

    /// Check that the dataset can receive an imported package.
    ///
    /// The dataset must have exactly one version, and it must be a draft.
    /// The check is advisory: nothing prevents a concurrent writer from
    /// changing the versions afterwards.
    ///
    /// # Errors
    /// Returns the `PreconditionError` naming the failed condition.
    pub fn ensure_importable(&self) -> Result<(), PreconditionError> {
        match self.versions.as_slice() {
            [] => Err(PreconditionError::NoVersion {
                dataset: self.global_id(),
            }),
            [only] if !only.is_draft() => Err(PreconditionError::NotDraft {
                dataset: self.global_id(),
                state: only.state,
            }),
            [_] => Ok(()),
            many => Err(PreconditionError::MultipleVersions {
                dataset: self.global_id(),
                count: many.len(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_dataset_is_importable() {
        let dataset = Dataset::new("doi", "auth", "id1");
        assert_eq!(dataset.versions.len(), 1);
        assert!(dataset.ensure_importable().is_ok());
    }

    #[test]
    fn test_storage_key() {
        let dataset = Dataset::new("doi", "10.5072", "FK2/ABC");
        assert_eq!(dataset.storage_key().unwrap(), "10.5072/FK2/ABC");
        assert_eq!(dataset.global_id(), "doi:10.5072/FK2/ABC");
    }

    #[test]
    fn test_multiple_versions_rejected() {
        let dataset = Dataset::new("doi", "auth", "id1").with_versions(vec![
            DatasetVersion::new(1, VersionState::Released),
            DatasetVersion::draft(2),
        ]);
        assert_eq!(
            dataset.ensure_importable(),
            Err(PreconditionError::MultipleVersions {
                dataset: "doi:auth/id1".to_string(),
                count: 2,
            })
        );
    }

    #[test]
    fn test_released_version_rejected() {
        let dataset = Dataset::new("doi", "auth", "id1")
            .with_versions(vec![DatasetVersion::new(1, VersionState::Released)]);
        let err = dataset.ensure_importable().unwrap_err();
        assert!(matches!(
            err,
            PreconditionError::NotDraft {
                state: VersionState::Released,
                ..
            }
        ));
        assert!(err.to_string().contains("DRAFT"));
    }

    #[test]
    fn test_no_version_rejected() {
        let dataset = Dataset::new("doi", "auth", "id1").with_versions(Vec::new());
        assert!(matches!(
            dataset.ensure_importable(),
            Err(PreconditionError::NoVersion { .. })
        ));
    }

    #[test]
    fn test_version_state_serializes_uppercase() {
        let json: String = serde_json::to_string(&VersionState::Draft).unwrap();
        assert_eq!(json, "\"DRAFT\"");
    }
}
