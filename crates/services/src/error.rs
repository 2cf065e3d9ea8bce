//! Shared error types for the services crate.

use std::fmt;

use thiserror::Error;

use progress_core::model::{CourseId, LessonId, UserId};
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

use crate::render::RenderError;

/// The entity a lookup failed to find.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Missing {
    Learner(UserId),
    Course(CourseId),
    Lesson(LessonId),
}

impl fmt::Display for Missing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Learner(id) => write!(f, "learner {id}"),
            Self::Course(id) => write!(f, "course {id}"),
            Self::Lesson(id) => write!(f, "lesson {id}"),
        }
    }
}

/// Errors emitted by `CompletionService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CompletionServiceError {
    #[error("{0} not found")]
    NotFound(Missing),
    #[error("lesson {lesson} does not belong to course {course}")]
    LessonCourseMismatch { lesson: LessonId, course: CourseId },
    #[error("learner {user} already completed lesson {lesson}")]
    AlreadyCompleted { user: UserId, lesson: LessonId },
    #[error(transparent)]
    Progress(#[from] ProgressServiceError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `ProgressService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProgressServiceError {
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `ExperienceService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ExperienceServiceError {
    #[error("{0} not found")]
    NotFound(Missing),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `CertificateService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CertificateServiceError {
    #[error("learner {user} is not enrolled in course {course}")]
    NotEnrolled { user: UserId, course: CourseId },
    #[error("learner {user} has not completed course {course}")]
    CourseNotCompleted { user: UserId, course: CourseId },
    #[error("{0} not found")]
    NotFound(Missing),
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `EnrollmentService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum EnrollmentServiceError {
    #[error("{0} not found")]
    NotFound(Missing),
    #[error("learner {user} is already enrolled in course {course}")]
    AlreadyEnrolled { user: UserId, course: CourseId },
    #[error("learner {user} teaches course {course} and cannot enroll in it")]
    TeacherCannotEnroll { user: UserId, course: CourseId },
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}
