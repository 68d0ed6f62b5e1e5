//! Shared error types used across package-import crates.

use thiserror::Error;

/// Errors raised while deriving object keys.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum KeyError {
    /// A component required to build a key is empty.
    #[error("Cannot build object key: {component} is empty")]
    EmptyComponent {
        /// Which component was empty (e.g. "authority").
        component: &'static str,
    },

    /// The key has no usable final segment.
    #[error("Object key has no file name: {key}")]
    NoBaseName {
        /// The offending key.
        key: String,
    },
}

impl KeyError {
    /// Create an EmptyComponent error.
    ///
    /// # Arguments
    /// * `component` - Name of the empty component
    pub fn empty(component: &'static str) -> Self {
        Self::EmptyComponent { component }
    }
}
