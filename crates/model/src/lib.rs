//! Data model consumed and produced by the package import pipeline.
//!
//! The dataset/version model is owned by the surrounding repository system.
//! This crate only carries the fields the import pipeline reads (authority,
//! identifier, versions and their state) and the records it produces
//! (a package file plus its file metadata entry).

mod dataset;
mod error;
mod file;

pub use dataset::{Dataset, DatasetVersion, FileMetadata, VersionState};
pub use error::PreconditionError;
pub use file::{ChecksumType, PackageFile, PACKAGE_CONTENT_TYPE};
