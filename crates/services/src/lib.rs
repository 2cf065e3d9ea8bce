#![forbid(unsafe_code)]

pub mod app_services;
pub mod certificate_service;
pub mod completion_service;
pub mod enrollment_service;
pub mod error;
pub mod experience_service;
pub mod progress_service;
pub mod render;

pub use progress_core::Clock;

pub use app_services::AppServices;
pub use certificate_service::{
    CertificateArtifact, CertificateService, IssuedCertificate, RenderedCertificate,
};
pub use completion_service::{CompletionService, LessonCompleted};
pub use enrollment_service::EnrollmentService;
pub use error::{
    AppServicesError, CertificateServiceError, CompletionServiceError, EnrollmentServiceError,
    ExperienceServiceError, Missing, ProgressServiceError,
};
pub use experience_service::ExperienceService;
pub use progress_service::{ProgressEvaluation, ProgressService};
pub use render::{CertificateRenderer, PlainTextRenderer, RenderError};
