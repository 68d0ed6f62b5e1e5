//! Collaborators owned by the surrounding repository system.

use std::collections::HashMap;

use async_trait::async_trait;
use package_import_model::PackageFile;

use crate::error::RegistrationError;

/// Persistent identifier provider (DOI, handle, ...).
#[async_trait]
pub trait IdentifierService: Send + Sync {
    /// Generate a new identifier for a file.
    async fn generate_identifier(&self, file: &PackageFile) -> Result<String, RegistrationError>;

    /// Register the file's identifier with the provider.
    ///
    /// # Returns
    /// The provider's confirmation string. Registration counts as confirmed
    /// only when it contains the file identifier.
    async fn create_identifier(&self, file: &PackageFile) -> Result<String, RegistrationError>;

    /// Whether the provider registers identifiers only when a dataset is published.
    fn registration_required_at_publish_time(&self) -> bool;
}

/// Keys read from the settings store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SettingKey {
    /// Identifier protocol (e.g. "doi").
    Protocol,
    /// Identifier authority (e.g. "10.5072").
    Authority,
}

impl SettingKey {
    /// Name of the key in the settings store.
    pub fn as_str(&self) -> &'static str {
        match self {
            SettingKey::Protocol => "Protocol",
            SettingKey::Authority => "Authority",
        }
    }
}

/// String lookups in the repository's settings.
pub trait SettingsStore: Send + Sync {
    /// Value of `key`, or `default` when unset.
    fn value_for_key(&self, key: SettingKey, default: &str) -> String;
}

/// Settings held in a map.
#[derive(Debug, Clone, Default)]
pub struct StaticSettings {
    values: HashMap<SettingKey, String>,
}

impl StaticSettings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a value.
    pub fn with(mut self, key: SettingKey, value: impl Into<String>) -> Self {
        self.values.insert(key, value.into());
        self
    }
}

impl SettingsStore for StaticSettings {
    fn value_for_key(&self, key: SettingKey, default: &str) -> String {
        self.values
            .get(&key)
            .cloned()
            .unwrap_or_else(|| default.to_string())
    }
}
