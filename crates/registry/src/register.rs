//! Registration of an imported package as a dataset file.
//!
//! After migration the package archive sits at
//! `{dataset_key}/package_{base_name}.zip` in the permanent bucket. This
//! module creates the package file record for it:
//!
//! 1. Verify the archive exists (fatal if not)
//! 2. Read its checksum from the sidecar (empty if unavailable)
//! 3. Attach the file and a file metadata entry to the dataset
//! 4. Assign and register a persistent identifier (best effort)

use chrono::Utc;
use package_import_common::{
    archive_key, root_package_name, storage_locator, ARCHIVE_EXTENSION,
};
use package_import_model::{ChecksumType, Dataset, FileMetadata, PackageFile, PreconditionError};
use package_import_storage::{resolve_checksum, StorageClient};

use crate::error::{ImportError, RegistrationError};
use crate::traits::{IdentifierService, SettingKey, SettingsStore};

/// Creates package file records and assigns their identifiers.
pub struct PackageRegistrar<'a, C, I, S>
where
    C: StorageClient,
    I: IdentifierService,
    S: SettingsStore,
{
    client: &'a C,
    identifiers: &'a I,
    settings: &'a S,
    /// Permanent bucket holding the migrated package.
    bucket: String,
}

impl<'a, C, I, S> PackageRegistrar<'a, C, I, S>
where
    C: StorageClient,
    I: IdentifierService,
    S: SettingsStore,
{
    /// Create a new registrar.
    ///
    /// # Arguments
    /// * `client` - Storage client for the permanent bucket
    /// * `identifiers` - Persistent identifier provider
    /// * `settings` - Source of the identifier protocol and authority
    /// * `bucket` - Permanent bucket
    pub fn new(client: &'a C, identifiers: &'a I, settings: &'a S, bucket: impl Into<String>) -> Self {
        Self {
            client,
            identifiers,
            settings,
            bucket: bucket.into(),
        }
    }

    /// Create the package file for a migrated package and attach it to the dataset.
    ///
    /// The file size is taken as given; it is not read back from the store.
    ///
    /// # Arguments
    /// * `dataset` - Dataset receiving the file
    /// * `base_name` - Package base name; `/` is stripped
    /// * `total_size` - Package size in bytes
    ///
    /// # Returns
    /// A copy of the file record appended to `dataset.files`. Later changes,
    /// such as retrying `assign_global_id`, must target the record in
    /// `dataset.files`, not this copy.
    ///
    /// # Errors
    /// - `ImportError::PackageNotFound` if the archive is not in the bucket
    /// - `ImportError::Precondition` if the dataset has no version
    /// - `ImportError::Store` if the existence check fails
    pub async fn register_package(
        &self,
        dataset: &mut Dataset,
        base_name: &str,
        total_size: u64,
    ) -> Result<PackageFile, ImportError> {
        let dataset_key: String = dataset.storage_key()?;
        let root_name: String = root_package_name(base_name)?;
        let archive: String = archive_key(&dataset_key, &root_name);

        if !self.client.object_exists(&self.bucket, &archive).await? {
            log::error!("Package archive s3://{}/{} is missing", self.bucket, archive);
            return Err(ImportError::PackageNotFound {
                bucket: self.bucket.clone(),
                key: archive,
            });
        }

        let version_number: u32 = dataset
            .latest_version()
            .map(|version| version.version_number)
            .ok_or_else(|| PreconditionError::NoVersion {
                dataset: dataset.global_id(),
            })?;

        let checksum: String =
            match resolve_checksum(self.client, &self.bucket, &dataset_key, &root_name).await {
                Ok(checksum) => checksum,
                Err(err) => {
                    log::error!("Checksum unavailable for {}: {}", archive, err);
                    String::new()
                }
            };

        let label: String = format!("{}.{}", root_name, ARCHIVE_EXTENSION);
        let locator: String = storage_locator(&self.bucket, &dataset_key, &label);

        let mut file = PackageFile::new_package(
            dataset.global_id(),
            ChecksumType::Sha1,
            checksum,
            total_size,
            Utc::now(),
        );
        file.ingest_done = true;
        file.storage_identifier = Some(locator.clone());

        self.assign_global_id(&mut file).await;

        if let Some(version) = dataset.latest_version_mut() {
            version.file_metadatas.push(FileMetadata {
                label,
                storage_identifier: locator,
                version_number,
            });
        }
        dataset.files.push(file.clone());

        log::info!(
            "Registered package {} for {} ({} bytes)",
            archive,
            dataset.global_id(),
            total_size
        );
        Ok(file)
    }

    /// Give a file a persistent identifier and try to register it.
    ///
    /// Each step runs only if still needed: protocol and authority when
    /// unset, generation when the identifier is empty, registration when not
    /// yet confirmed. Identifier service failures are logged and leave the
    /// file unregistered.
    pub async fn assign_global_id(&self, file: &mut PackageFile) {
        if file.protocol.is_none() {
            file.protocol = Some(self.settings.value_for_key(SettingKey::Protocol, ""));
        }
        if file.authority.is_none() {
            file.authority = Some(self.settings.value_for_key(SettingKey::Authority, ""));
        }

        if !file.has_identifier() {
            match self.identifiers.generate_identifier(file).await {
                Ok(identifier) if !identifier.is_empty() => file.identifier = Some(identifier),
                Ok(_) => {
                    log::warn!("Identifier service returned an empty identifier for package file");
                    return;
                }
                Err(err) => {
                    log::warn!("Failed to generate identifier for package file: {}", err);
                    return;
                }
            }
        }

        if !file.identifier_registered {
            if let Err(err) = self.register_identifier(file).await {
                log::warn!("Package file identifier not registered: {}", err);
            }
        }
    }

    async fn register_identifier(&self, file: &mut PackageFile) -> Result<(), RegistrationError> {
        let identifier: String = match file.identifier.as_deref() {
            Some(identifier) if !identifier.is_empty() => identifier.to_string(),
            _ => {
                return Err(RegistrationError::Service {
                    message: "package file has no identifier to register".to_string(),
                })
            }
        };
        let response: String = self.identifiers.create_identifier(file).await?;

        if self.identifiers.registration_required_at_publish_time()
            || !response.contains(&identifier)
        {
            return Err(RegistrationError::Unconfirmed {
                identifier,
                response,
            });
        }

        file.identifier_registered = true;
        file.global_id_create_time = Some(Utc::now());
        log::debug!("Registered identifier {}", identifier);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryIdentifierService;
    use crate::traits::StaticSettings;
    use package_import_model::PACKAGE_CONTENT_TYPE;
    use package_import_storage::memory::{FailPoint, MemoryStorageClient};

    const DST: &str = "dv";

    fn settings() -> StaticSettings {
        StaticSettings::new()
            .with(SettingKey::Protocol, "doi")
            .with(SettingKey::Authority, "10.5072")
    }

    fn store_with_package() -> MemoryStorageClient {
        let client = MemoryStorageClient::new();
        client.put(DST, "auth/id1/package_a.zip", b"abc".to_vec());
        client.put(DST, "auth/id1/package_a.sha", b"xyz  package_a.zip\n".to_vec());
        client
    }

    #[tokio::test]
    async fn test_register_package() {
        let client = store_with_package();
        let identifiers = MemoryIdentifierService::new("FK2/PKG");
        let settings = settings();
        let registrar = PackageRegistrar::new(&client, &identifiers, &settings, DST);
        let mut dataset = Dataset::new("doi", "auth", "id1");

        let file = registrar
            .register_package(&mut dataset, "a", 1234)
            .await
            .unwrap();

        assert_eq!(file.content_type, PACKAGE_CONTENT_TYPE);
        assert_eq!(file.checksum_type, ChecksumType::Sha1);
        assert_eq!(file.checksum_value, "xyz");
        assert_eq!(file.filesize, 1234);
        assert!(file.ingest_done);
        assert_eq!(file.owner, "doi:auth/id1");
        assert_eq!(
            file.storage_identifier.as_deref(),
            Some("s3://dv:auth/id1/package_a.zip")
        );
        assert_eq!(file.create_date, file.modification_time);

        assert_eq!(file.protocol.as_deref(), Some("doi"));
        assert_eq!(file.authority.as_deref(), Some("10.5072"));
        assert_eq!(file.identifier.as_deref(), Some("FK2/PKG1"));
        assert!(file.identifier_registered);
        assert!(file.global_id_create_time.is_some());

        assert_eq!(dataset.files, vec![file.clone()]);
        let metadata = &dataset.latest_version().unwrap().file_metadatas;
        assert_eq!(
            metadata,
            &vec![FileMetadata {
                label: "package_a.zip".into(),
                storage_identifier: "s3://dv:auth/id1/package_a.zip".into(),
                version_number: 1,
            }]
        );
    }

    #[tokio::test]
    async fn test_size_is_taken_from_caller() {
        let client = store_with_package();
        let identifiers = MemoryIdentifierService::new("FK2/PKG");
        let settings = settings();
        let registrar = PackageRegistrar::new(&client, &identifiers, &settings, DST);

        for total_size in [0u64, 3, 5_300_000_001] {
            let mut dataset = Dataset::new("doi", "auth", "id1");
            let file = registrar
                .register_package(&mut dataset, "a", total_size)
                .await
                .unwrap();
            assert_eq!(file.filesize, total_size);
        }
    }

    #[tokio::test]
    async fn test_base_name_separators_stripped() {
        let client = store_with_package();
        let identifiers = MemoryIdentifierService::new("FK2/PKG");
        let settings = settings();
        let registrar = PackageRegistrar::new(&client, &identifiers, &settings, DST);
        let mut dataset = Dataset::new("doi", "auth", "id1");

        let file = registrar
            .register_package(&mut dataset, "/a/", 3)
            .await
            .unwrap();
        assert_eq!(
            file.storage_identifier.as_deref(),
            Some("s3://dv:auth/id1/package_a.zip")
        );
    }

    #[tokio::test]
    async fn test_missing_archive_is_fatal() {
        let client = MemoryStorageClient::new();
        let identifiers = MemoryIdentifierService::new("FK2/PKG");
        let settings = settings();
        let registrar = PackageRegistrar::new(&client, &identifiers, &settings, DST);
        let mut dataset = Dataset::new("doi", "auth", "id1");

        let err = registrar
            .register_package(&mut dataset, "a", 3)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ImportError::PackageNotFound { ref key, .. } if key == "auth/id1/package_a.zip"
        ));
        assert!(dataset.files.is_empty());
        assert_eq!(identifiers.generated_count(), 0);
    }

    #[tokio::test]
    async fn test_existence_check_failure_propagates() {
        let client = store_with_package();
        client.fail_on(FailPoint::HeadObject);
        let identifiers = MemoryIdentifierService::new("FK2/PKG");
        let settings = settings();
        let registrar = PackageRegistrar::new(&client, &identifiers, &settings, DST);
        let mut dataset = Dataset::new("doi", "auth", "id1");

        let err = registrar
            .register_package(&mut dataset, "a", 3)
            .await
            .unwrap_err();
        assert!(matches!(err, ImportError::Store(_)));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_missing_checksum_degrades_to_empty() {
        let client = MemoryStorageClient::new();
        client.put(DST, "auth/id1/package_a.zip", b"abc".to_vec());
        let identifiers = MemoryIdentifierService::new("FK2/PKG");
        let settings = settings();
        let registrar = PackageRegistrar::new(&client, &identifiers, &settings, DST);
        let mut dataset = Dataset::new("doi", "auth", "id1");

        let file = registrar
            .register_package(&mut dataset, "a", 3)
            .await
            .unwrap();
        assert_eq!(file.checksum_value, "");
        assert_eq!(dataset.files.len(), 1);
    }

    #[tokio::test]
    async fn test_dataset_without_version() {
        let client = store_with_package();
        let identifiers = MemoryIdentifierService::new("FK2/PKG");
        let settings = settings();
        let registrar = PackageRegistrar::new(&client, &identifiers, &settings, DST);
        let mut dataset = Dataset::new("doi", "auth", "id1").with_versions(Vec::new());

        let err = registrar
            .register_package(&mut dataset, "a", 3)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ImportError::Precondition(PreconditionError::NoVersion { .. })
        ));
    }

    #[tokio::test]
    async fn test_assign_global_id_is_idempotent() {
        let client = MemoryStorageClient::new();
        let identifiers = MemoryIdentifierService::new("FK2/PKG");
        let settings = settings();
        let registrar = PackageRegistrar::new(&client, &identifiers, &settings, DST);
        let mut file =
            PackageFile::new_package("doi:auth/id1", ChecksumType::Sha1, "", 3, Utc::now());

        registrar.assign_global_id(&mut file).await;
        let first_registered = file.global_id_create_time;
        registrar.assign_global_id(&mut file).await;

        assert_eq!(identifiers.generated_count(), 1);
        assert_eq!(identifiers.registration_count(), 1);
        assert_eq!(file.identifier.as_deref(), Some("FK2/PKG1"));
        assert_eq!(file.global_id_create_time, first_registered);
    }

    #[tokio::test]
    async fn test_existing_identifier_and_protocol_kept() {
        let client = MemoryStorageClient::new();
        let identifiers = MemoryIdentifierService::new("FK2/PKG");
        let settings = settings();
        let registrar = PackageRegistrar::new(&client, &identifiers, &settings, DST);
        let mut file =
            PackageFile::new_package("doi:auth/id1", ChecksumType::Sha1, "", 3, Utc::now());
        file.protocol = Some("hdl".into());
        file.identifier = Some("EXISTING".into());

        registrar.assign_global_id(&mut file).await;

        assert_eq!(identifiers.generated_count(), 0);
        assert_eq!(file.protocol.as_deref(), Some("hdl"));
        assert_eq!(file.authority.as_deref(), Some("10.5072"));
        assert_eq!(file.identifier.as_deref(), Some("EXISTING"));
        assert!(file.identifier_registered);
    }

    #[tokio::test]
    async fn test_registration_failure_is_swallowed() {
        let client = store_with_package();
        let identifiers = MemoryIdentifierService::new("FK2/PKG");
        identifiers.set_failing(true);
        let settings = settings();
        let registrar = PackageRegistrar::new(&client, &identifiers, &settings, DST);
        let mut dataset = Dataset::new("doi", "auth", "id1");

        let file = registrar
            .register_package(&mut dataset, "a", 3)
            .await
            .unwrap();

        assert_eq!(file.identifier.as_deref(), Some("FK2/PKG1"));
        assert!(!file.identifier_registered);
        assert!(file.global_id_create_time.is_none());

        // A later attempt retries registration but keeps the identifier.
        identifiers.set_failing(false);
        let mut file = file;
        registrar.assign_global_id(&mut file).await;
        assert_eq!(identifiers.generated_count(), 1);
        assert!(file.identifier_registered);
    }

    #[tokio::test]
    async fn test_deferred_registration_not_confirmed() {
        let client = MemoryStorageClient::new();
        let identifiers = MemoryIdentifierService::new("FK2/PKG").deferred();
        let settings = settings();
        let registrar = PackageRegistrar::new(&client, &identifiers, &settings, DST);
        let mut file =
            PackageFile::new_package("doi:auth/id1", ChecksumType::Sha1, "", 3, Utc::now());

        registrar.assign_global_id(&mut file).await;

        assert_eq!(identifiers.registration_count(), 1);
        assert!(!file.identifier_registered);
        assert!(file.global_id_create_time.is_none());
    }

    #[tokio::test]
    async fn test_unset_settings_default_to_empty() {
        let client = MemoryStorageClient::new();
        let identifiers = MemoryIdentifierService::new("FK2/PKG");
        let settings = StaticSettings::new();
        let registrar = PackageRegistrar::new(&client, &identifiers, &settings, DST);
        let mut file =
            PackageFile::new_package("doi:auth/id1", ChecksumType::Sha1, "", 3, Utc::now());

        registrar.assign_global_id(&mut file).await;

        assert_eq!(file.protocol.as_deref(), Some(""));
        assert_eq!(file.authority.as_deref(), Some(""));
    }

    /// Identifier service that hands out empty identifiers.
    struct EmptyIdentifierService;

    #[async_trait::async_trait]
    impl IdentifierService for EmptyIdentifierService {
        async fn generate_identifier(&self, _file: &PackageFile) -> Result<String, RegistrationError> {
            Ok(String::new())
        }

        async fn create_identifier(&self, _file: &PackageFile) -> Result<String, RegistrationError> {
            Ok("success".to_string())
        }

        fn registration_required_at_publish_time(&self) -> bool {
            false
        }
    }

    #[tokio::test]
    async fn test_empty_identifier_never_registered() {
        let client = MemoryStorageClient::new();
        let identifiers = EmptyIdentifierService;
        let settings = settings();
        let registrar = PackageRegistrar::new(&client, &identifiers, &settings, DST);
        let mut file =
            PackageFile::new_package("doi:auth/id1", ChecksumType::Sha1, "", 3, Utc::now());

        registrar.assign_global_id(&mut file).await;
        assert!(file.identifier.is_none());
        assert!(!file.identifier_registered);

        // An identifier set to "" by the caller is not confirmable either
        file.identifier = Some(String::new());
        registrar.assign_global_id(&mut file).await;
        assert!(!file.identifier_registered);
        assert!(file.global_id_create_time.is_none());
    }

    #[tokio::test]
    async fn test_retry_on_dataset_record() {
        let client = store_with_package();
        let identifiers = MemoryIdentifierService::new("FK2/PKG");
        identifiers.set_failing(true);
        let settings = settings();
        let registrar = PackageRegistrar::new(&client, &identifiers, &settings, DST);
        let mut dataset = Dataset::new("doi", "auth", "id1");

        let returned = registrar
            .register_package(&mut dataset, "a", 3)
            .await
            .unwrap();
        assert!(!returned.identifier_registered);

        identifiers.set_failing(false);
        registrar.assign_global_id(&mut dataset.files[0]).await;

        assert!(dataset.files[0].identifier_registered);
        assert_eq!(dataset.files[0].identifier, returned.identifier);
        assert!(!returned.identifier_registered);
    }
}
