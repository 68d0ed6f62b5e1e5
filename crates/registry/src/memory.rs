//! In-memory `IdentifierService`.
//!
//! Hands out sequential identifiers and confirms every registration unless
//! told otherwise. Call counts are exposed for tests.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use package_import_model::PackageFile;

use crate::error::RegistrationError;
use crate::traits::IdentifierService;

/// An `IdentifierService` backed by counters.
#[derive(Debug)]
pub struct MemoryIdentifierService {
    prefix: String,
    deferred: bool,
    failing: AtomicBool,
    generated: AtomicU64,
    registrations: AtomicU64,
}

impl MemoryIdentifierService {
    /// Identifiers are `{prefix}{n}`, counting from 1.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            deferred: false,
            failing: AtomicBool::new(false),
            generated: AtomicU64::new(0),
            registrations: AtomicU64::new(0),
        }
    }

    /// Defer registration to publish time.
    pub fn deferred(mut self) -> Self {
        self.deferred = true;
        self
    }

    /// Make every future registration call fail.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of identifiers generated so far.
    pub fn generated_count(&self) -> u64 {
        self.generated.load(Ordering::SeqCst)
    }

    /// Number of registration calls so far.
    pub fn registration_count(&self) -> u64 {
        self.registrations.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IdentifierService for MemoryIdentifierService {
    async fn generate_identifier(&self, _file: &PackageFile) -> Result<String, RegistrationError> {
        let n: u64 = self.generated.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(format!("{}{}", self.prefix, n))
    }

    async fn create_identifier(&self, file: &PackageFile) -> Result<String, RegistrationError> {
        self.registrations.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(RegistrationError::Service {
                message: "identifier service unavailable".to_string(),
            });
        }
        Ok(format!(
            "success: {}",
            file.global_id().unwrap_or_default()
        ))
    }

    fn registration_required_at_publish_time(&self) -> bool {
        self.deferred
    }
}
