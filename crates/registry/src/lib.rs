//! Package registration for package imports.
//!
//! Turns a migrated package archive into a dataset file:
//!
//! - [`PackageRegistrar`] creates the file record, attaches it to the
//!   dataset and assigns a persistent identifier
//! - [`PackageImporter`] runs the storage migration and then registration
//!
//! The identifier provider and the settings store belong to the surrounding
//! repository system and are reached through [`IdentifierService`] and
//! [`SettingsStore`].

mod error;
mod importer;
pub mod memory;
mod register;
mod traits;

pub use error::{ImportError, RegistrationError};
pub use importer::{PackageImport, PackageImporter};
pub use memory::MemoryIdentifierService;
pub use register::PackageRegistrar;
pub use traits::{IdentifierService, SettingKey, SettingsStore, StaticSettings};
