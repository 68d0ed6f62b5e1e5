//! Migration of staged package objects into the permanent bucket.
//!
//! This module moves every object under a staging prefix into the dataset's
//! key namespace of the permanent bucket:
//!
//! - Lists the staging prefix completely before copying anything
//! - Copies each object single-shot or multipart, depending on its size
//! - Deletes each source object right after its copy lands
//!
//! Objects are processed one at a time. The first failure aborts the
//! migration; objects already moved stay moved.
//!
//! # Example
//!
//! ```ignore
//! use package_import_storage::{ImportSettings, MigrationOrchestrator};
//!
//! let settings = ImportSettings::new("dcm-staging", "dataverse-files");
//! let orchestrator = MigrationOrchestrator::new(&client, settings);
//! let stats = orchestrator.migrate(&dataset, "ds1/").await?;
//! ```

use package_import_common::{basename, destination_key, directory_marker_key, KeyError};
use package_import_model::Dataset;

use crate::error::{MigrationError, StorageError};
use crate::multipart::{MultipartCopier, MultipartSession};
use crate::plan::{CopyPlan, CopyStrategy};
use crate::traits::{ObjectInfo, StorageClient};
use crate::types::{ImportSettings, MigrationStatistics, ObjectLocation};

/// Moves staged objects of one dataset into the permanent bucket.
pub struct MigrationOrchestrator<'a, C: StorageClient> {
    /// The storage client for store operations.
    client: &'a C,
    /// Buckets and size policy.
    settings: ImportSettings,
}

impl<'a, C: StorageClient> MigrationOrchestrator<'a, C> {
    /// Create a new migration orchestrator.
    ///
    /// # Arguments
    /// * `client` - Storage client for store operations
    /// * `settings` - Buckets and size policy
    pub fn new(client: &'a C, settings: ImportSettings) -> Self {
        Self { client, settings }
    }

    /// Buckets and size policy in use.
    pub fn settings(&self) -> &ImportSettings {
        &self.settings
    }

    /// Plan the copy of one listed object.
    ///
    /// Directory markers (keys ending in `/`) map to the dataset's own
    /// marker key.
    ///
    /// # Arguments
    /// * `dataset_key` - Key namespace of the destination dataset
    /// * `object` - The listed source object
    pub fn plan_copy(&self, dataset_key: &str, object: &ObjectInfo) -> Result<CopyPlan, KeyError> {
        let destination: String = match destination_key(dataset_key, &object.key) {
            Ok(key) => key,
            Err(KeyError::NoBaseName { .. }) => directory_marker_key(dataset_key),
            Err(err) => return Err(err),
        };
        Ok(CopyPlan::new(
            ObjectLocation::new(&self.settings.source_bucket, &object.key),
            ObjectLocation::new(&self.settings.destination_bucket, destination),
            object.size,
            self.settings.large_object_threshold,
        ))
    }

    /// Move every object under `source_prefix` into the dataset's namespace.
    ///
    /// The dataset must have exactly one version, in draft state. This is
    /// checked before any store call is made.
    ///
    /// # Arguments
    /// * `dataset` - Destination dataset
    /// * `source_prefix` - Staging prefix in the source bucket
    ///
    /// # Returns
    /// Statistics of the completed migration.
    ///
    /// # Errors
    /// The first failing listing, copy or delete aborts the migration.
    pub async fn migrate(
        &self,
        dataset: &Dataset,
        source_prefix: &str,
    ) -> Result<MigrationStatistics, MigrationError> {
        if let Err(err) = dataset.ensure_importable() {
            log::info!("Refusing package import: {}", err);
            return Err(err.into());
        }
        let dataset_key: String = dataset.storage_key()?;

        log::info!(
            "Package import for {}: source s3://{}/{} -> destination s3://{}/{}",
            dataset.global_id(),
            self.settings.source_bucket,
            source_prefix,
            self.settings.destination_bucket,
            dataset_key
        );

        let objects: Vec<ObjectInfo> = self
            .client
            .list_objects(&self.settings.source_bucket, source_prefix)
            .await
            .map_err(|source| MigrationError::Listing {
                bucket: self.settings.source_bucket.clone(),
                prefix: source_prefix.to_string(),
                source,
            })?;

        let mut stats = MigrationStatistics {
            objects_listed: objects.len() as u64,
            ..Default::default()
        };

        for object in &objects {
            let plan: CopyPlan = self.plan_copy(&dataset_key, object)?;
            self.migrate_object(&plan, &mut stats).await?;
            if basename(&object.key).is_empty() {
                stats.directory_markers += 1;
            }
        }

        log::info!(
            "Package import for {} moved {} objects ({} multipart, {} bytes)",
            dataset.global_id(),
            stats.objects_migrated(),
            stats.multipart_copies,
            stats.bytes_copied
        );
        Ok(stats)
    }

    /// Copy one object, then delete its source.
    async fn migrate_object(
        &self,
        plan: &CopyPlan,
        stats: &mut MigrationStatistics,
    ) -> Result<(), MigrationError> {
        log::info!(
            "Copying {} -> {} ({} bytes, {:?})",
            plan.source,
            plan.destination,
            plan.size,
            plan.strategy
        );

        let copy_error = |source: StorageError| MigrationError::Copy {
            bucket: plan.source.bucket.clone(),
            key: plan.source.key.clone(),
            source,
        };

        match plan.strategy {
            CopyStrategy::Single => {
                self.client
                    .copy_object(&plan.source, &plan.destination)
                    .await
                    .map_err(copy_error)?;
                stats.single_copies += 1;
            }
            CopyStrategy::Multipart => {
                let session: MultipartSession =
                    MultipartCopier::new(self.client, self.settings.part_size)
                        .copy(&plan.source, &plan.destination)
                        .await
                        .map_err(copy_error)?;
                stats.multipart_copies += 1;
                stats.parts_copied += session.parts().len() as u64;
            }
        }
        stats.bytes_copied += plan.size;

        self.client
            .delete_object(&plan.source.bucket, &plan.source.key)
            .await
            .map_err(|source| {
                log::warn!(
                    "Failed to delete {} after copying it to {}: {}",
                    plan.source,
                    plan.destination,
                    source
                );
                MigrationError::SourceNotDeleted {
                    bucket: plan.source.bucket.clone(),
                    key: plan.source.key.clone(),
                    source,
                }
            })
    }
}
