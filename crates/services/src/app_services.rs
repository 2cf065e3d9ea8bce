use std::sync::Arc;

use storage::repository::Storage;

use crate::Clock;
use crate::certificate_service::CertificateService;
use crate::completion_service::CompletionService;
use crate::enrollment_service::EnrollmentService;
use crate::error::AppServicesError;
use crate::experience_service::ExperienceService;
use crate::progress_service::ProgressService;
use crate::render::{CertificateRenderer, PlainTextRenderer};

/// Assembles the engine's services over one storage backend.
#[derive(Clone)]
pub struct AppServices {
    storage: Storage,
    completions: Arc<CompletionService>,
    progress: Arc<ProgressService>,
    experience: Arc<ExperienceService>,
    enrollments: Arc<EnrollmentService>,
    certificates: Arc<CertificateService>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage, rendering certificates as text.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails.
    pub async fn new_sqlite(db_url: &str, clock: Clock) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        Ok(Self::with_storage(storage, clock, Arc::new(PlainTextRenderer)))
    }

    /// Build services over volatile in-memory storage.
    #[must_use]
    pub fn in_memory(clock: Clock) -> Self {
        Self::with_storage(Storage::in_memory(), clock, Arc::new(PlainTextRenderer))
    }

    #[must_use]
    pub fn with_storage(
        storage: Storage,
        clock: Clock,
        renderer: Arc<dyn CertificateRenderer>,
    ) -> Self {
        let progress = ProgressService::new(
            clock,
            Arc::clone(&storage.catalog),
            Arc::clone(&storage.completions),
            Arc::clone(&storage.enrollments),
        );
        let completions = Arc::new(CompletionService::new(
            clock,
            Arc::clone(&storage.catalog),
            Arc::clone(&storage.completions),
            Arc::clone(&storage.progress),
            progress.clone(),
        ));
        let experience = Arc::new(ExperienceService::new(Arc::clone(&storage.learners)));
        let enrollments = Arc::new(EnrollmentService::new(
            clock,
            Arc::clone(&storage.catalog),
            Arc::clone(&storage.enrollments),
        ));
        let certificates = Arc::new(CertificateService::new(
            clock,
            Arc::clone(&storage.catalog),
            Arc::clone(&storage.learners),
            Arc::clone(&storage.enrollments),
            Arc::clone(&storage.certificates),
            renderer,
        ));

        Self {
            storage,
            completions,
            progress: Arc::new(progress),
            experience,
            enrollments,
            certificates,
        }
    }

    /// Raw repositories, for seeding the catalog.
    #[must_use]
    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    #[must_use]
    pub fn completions(&self) -> Arc<CompletionService> {
        Arc::clone(&self.completions)
    }

    #[must_use]
    pub fn progress(&self) -> Arc<ProgressService> {
        Arc::clone(&self.progress)
    }

    #[must_use]
    pub fn experience(&self) -> Arc<ExperienceService> {
        Arc::clone(&self.experience)
    }

    #[must_use]
    pub fn enrollments(&self) -> Arc<EnrollmentService> {
        Arc::clone(&self.enrollments)
    }

    #[must_use]
    pub fn certificates(&self) -> Arc<CertificateService> {
        Arc::clone(&self.certificates)
    }
}
