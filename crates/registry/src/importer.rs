//! End-to-end package import: migration followed by registration.

use package_import_model::{Dataset, PackageFile};
use package_import_storage::{ImportSettings, MigrationOrchestrator, MigrationStatistics, StorageClient};

use crate::error::ImportError;
use crate::register::PackageRegistrar;
use crate::traits::{IdentifierService, SettingsStore};

/// Result of a successful import.
#[derive(Debug, Clone)]
pub struct PackageImport {
    /// What the migration moved.
    pub statistics: MigrationStatistics,
    /// The registered package file.
    pub file: PackageFile,
}

/// Moves a staged package into a dataset and registers it.
pub struct PackageImporter<'a, C, I, S>
where
    C: StorageClient,
    I: IdentifierService,
    S: SettingsStore,
{
    orchestrator: MigrationOrchestrator<'a, C>,
    registrar: PackageRegistrar<'a, C, I, S>,
}

impl<'a, C, I, S> PackageImporter<'a, C, I, S>
where
    C: StorageClient,
    I: IdentifierService,
    S: SettingsStore,
{
    /// Create a new importer.
    ///
    /// # Arguments
    /// * `client` - Storage client for both buckets
    /// * `identifiers` - Persistent identifier provider
    /// * `settings` - Source of the identifier protocol and authority
    /// * `import_settings` - Buckets and size policy
    pub fn new(
        client: &'a C,
        identifiers: &'a I,
        settings: &'a S,
        import_settings: ImportSettings,
    ) -> Self {
        let registrar = PackageRegistrar::new(
            client,
            identifiers,
            settings,
            import_settings.destination_bucket.clone(),
        );
        Self {
            orchestrator: MigrationOrchestrator::new(client, import_settings),
            registrar,
        }
    }

    /// Import the package staged under `source_prefix` into `dataset`.
    ///
    /// # Arguments
    /// * `dataset` - Destination dataset; receives the package file
    /// * `source_prefix` - Staging prefix in the source bucket
    /// * `base_name` - Package base name
    /// * `total_size` - Package size in bytes
    ///
    /// # Errors
    /// Migration errors abort before registration. Registration then fails
    /// only if the archive is missing or a store call fails.
    pub async fn import_package(
        &self,
        dataset: &mut Dataset,
        source_prefix: &str,
        base_name: &str,
        total_size: u64,
    ) -> Result<PackageImport, ImportError> {
        let statistics: MigrationStatistics = self.orchestrator.migrate(dataset, source_prefix).await?;
        let file: PackageFile = self
            .registrar
            .register_package(dataset, base_name, total_size)
            .await?;
        Ok(PackageImport { statistics, file })
    }
}
