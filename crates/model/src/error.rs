//! Precondition errors for datasets entering an import.

use thiserror::Error;

use crate::dataset::VersionState;

/// A dataset is not in a state that allows importing a package.
///
/// Fatal for the current invocation: the dataset must be fixed before retrying.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PreconditionError {
    /// The dataset has no version at all.
    #[error("Dataset {dataset} has no version")]
    NoVersion { dataset: String },

    /// The dataset has more than one version.
    #[error("Dataset {dataset} has more than one version ({count})")]
    MultipleVersions { dataset: String, count: usize },

    /// The only version is not a draft.
    #[error("Dataset {dataset} isn't in DRAFT mode (state: {state})")]
    NotDraft { dataset: String, state: VersionState },
}
