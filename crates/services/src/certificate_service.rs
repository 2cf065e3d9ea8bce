use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use progress_core::Clock;
use progress_core::model::{
    Certificate, CertificateMetadata, CourseId, NewCertificate, UserId,
};
use storage::repository::{
    CatalogRepository, CertificateRepository, EnrollmentRepository, LearnerRepository,
    StorageError,
};

use crate::error::{CertificateServiceError, Missing};
use crate::render::CertificateRenderer;

/// Renderer output for one certificate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CertificateArtifact {
    pub content_type: &'static str,
    #[serde(skip)]
    pub bytes: Vec<u8>,
}

/// A certificate together with a freshly rendered artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedCertificate {
    pub certificate: Certificate,
    #[serde(flatten)]
    pub artifact: CertificateArtifact,
}

/// Outcome of an issue request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IssuedCertificate {
    pub certificate: Certificate,
    /// `true` only for the call that created the record.
    pub newly_issued: bool,
    /// Rendered on first issuance; `None` for repeat calls or when rendering failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifact: Option<CertificateArtifact>,
}

impl IssuedCertificate {
    fn existing(certificate: Certificate) -> Self {
        Self {
            certificate,
            newly_issued: false,
            artifact: None,
        }
    }
}

/// Issues at most one certificate per (learner, course).
#[derive(Clone)]
pub struct CertificateService {
    clock: Clock,
    catalog: Arc<dyn CatalogRepository>,
    learners: Arc<dyn LearnerRepository>,
    enrollments: Arc<dyn EnrollmentRepository>,
    certificates: Arc<dyn CertificateRepository>,
    renderer: Arc<dyn CertificateRenderer>,
}

impl CertificateService {
    #[must_use]
    pub fn new(
        clock: Clock,
        catalog: Arc<dyn CatalogRepository>,
        learners: Arc<dyn LearnerRepository>,
        enrollments: Arc<dyn EnrollmentRepository>,
        certificates: Arc<dyn CertificateRepository>,
        renderer: Arc<dyn CertificateRenderer>,
    ) -> Self {
        Self {
            clock,
            catalog,
            learners,
            enrollments,
            certificates,
            renderer,
        }
    }

    /// Return the certificate for a completed enrollment, issuing it on first request.
    ///
    /// Repeated and concurrent calls all return the same certificate. The
    /// renderer runs once, for the call that created the record, and that call
    /// carries the artifact; a render failure is logged and does not undo issuance.
    ///
    /// # Errors
    ///
    /// Returns `CertificateServiceError::NotEnrolled` if there is no enrollment.
    /// Returns `CertificateServiceError::CourseNotCompleted` if the enrollment is still active.
    /// Returns `CertificateServiceError::Storage` if persistence fails.
    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn issue_certificate(
        &self,
        user: UserId,
        course: CourseId,
    ) -> Result<IssuedCertificate, CertificateServiceError> {
        let enrollment = self
            .enrollments
            .get_enrollment(user, course)
            .await?
            .ok_or(CertificateServiceError::NotEnrolled { user, course })?;
        if !enrollment.is_completed() {
            return Err(CertificateServiceError::CourseNotCompleted { user, course });
        }

        if let Some(existing) = self.certificates.get_certificate(user, course).await? {
            return Ok(IssuedCertificate::existing(existing));
        }

        let draft = NewCertificate::new(user, course, self.clock.now());
        match self.certificates.insert_certificate(&draft).await {
            Ok(certificate) => {
                info!(%user, %course, certificate = %certificate.id, "certificate issued");
                let artifact = self.render_after_issue(&certificate).await;
                Ok(IssuedCertificate {
                    certificate,
                    newly_issued: true,
                    artifact,
                })
            }
            Err(StorageError::Conflict) => {
                debug!(%user, %course, "certificate issued concurrently");
                let winner = self
                    .certificates
                    .get_certificate(user, course)
                    .await?
                    .ok_or(StorageError::NotFound)?;
                Ok(IssuedCertificate::existing(winner))
            }
            Err(other) => Err(other.into()),
        }
    }

    /// Issue if needed, then render the certificate on demand.
    ///
    /// A first issuance hands back the artifact it already rendered.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`Self::issue_certificate`].
    /// Returns `CertificateServiceError::NotFound` if the learner or course is gone.
    /// Returns `CertificateServiceError::Render` if the renderer fails.
    pub async fn render_certificate(
        &self,
        user: UserId,
        course: CourseId,
    ) -> Result<RenderedCertificate, CertificateServiceError> {
        let issued = self.issue_certificate(user, course).await?;
        let artifact = match issued.artifact {
            Some(artifact) => artifact,
            None => self.render(&issued.certificate).await?,
        };
        Ok(RenderedCertificate {
            certificate: issued.certificate,
            artifact,
        })
    }

    /// Returns `Ok(None)` when no certificate was issued yet.
    ///
    /// # Errors
    ///
    /// Returns `CertificateServiceError::Storage` if repository access fails.
    pub async fn certificate(
        &self,
        user: UserId,
        course: CourseId,
    ) -> Result<Option<Certificate>, CertificateServiceError> {
        Ok(self.certificates.get_certificate(user, course).await?)
    }

    /// # Errors
    ///
    /// Returns `CertificateServiceError::Storage` if repository access fails.
    pub async fn certificates_for_learner(
        &self,
        user: UserId,
    ) -> Result<Vec<Certificate>, CertificateServiceError> {
        Ok(self.certificates.certificates_for_user(user).await?)
    }

    /// Names and date printed on the certificate.
    ///
    /// # Errors
    ///
    /// Returns `CertificateServiceError::NotFound` if the learner or course is gone.
    /// Returns `CertificateServiceError::Storage` if repository access fails.
    pub async fn metadata(
        &self,
        certificate: &Certificate,
    ) -> Result<CertificateMetadata, CertificateServiceError> {
        let learner = self
            .learners
            .get_learner(certificate.user_id)
            .await?
            .ok_or(CertificateServiceError::NotFound(Missing::Learner(
                certificate.user_id,
            )))?;
        let course = self
            .catalog
            .get_course(certificate.course_id)
            .await?
            .ok_or(CertificateServiceError::NotFound(Missing::Course(
                certificate.course_id,
            )))?;

        Ok(CertificateMetadata {
            learner_name: learner.display_name(),
            course_name: course.name().to_owned(),
            issued_at: certificate.issued_at,
        })
    }

    async fn render(
        &self,
        certificate: &Certificate,
    ) -> Result<CertificateArtifact, CertificateServiceError> {
        let metadata = self.metadata(certificate).await?;
        let bytes = self.renderer.render(&metadata)?;
        Ok(CertificateArtifact {
            content_type: self.renderer.content_type(),
            bytes,
        })
    }

    async fn render_after_issue(&self, certificate: &Certificate) -> Option<CertificateArtifact> {
        match self.render(certificate).await {
            Ok(artifact) => {
                debug!(
                    certificate = %certificate.id,
                    len = artifact.bytes.len(),
                    "certificate rendered"
                );
                Some(artifact)
            }
            Err(err) => {
                warn!(certificate = %certificate.id, error = %err, "certificate render failed");
                None
            }
        }
    }
}
