use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use progress_core::model::{
    Certificate, Course, CourseId, Enrollment, Experience, Learner, Lesson, LessonCompletion,
    LessonId, NewCertificate, UserId,
};
use thiserror::Error;

use crate::memory::InMemoryRepository;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    /// A uniqueness constraint rejected the write.
    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

//
// ─── RECORDS ───────────────────────────────────────────────────────────────────
//

/// A completion about to be written; the store assigns the row id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCompletion {
    pub user_id: UserId,
    pub lesson_id: LessonId,
    pub course_id: CourseId,
    pub completed_at: DateTime<Utc>,
}

impl NewCompletion {
    #[must_use]
    pub fn new(
        user_id: UserId,
        lesson_id: LessonId,
        course_id: CourseId,
        completed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id,
            lesson_id,
            course_id,
            completed_at,
        }
    }
}

/// Outcome of an insert-or-fetch on the (user, lesson) completion key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionInsert {
    /// This call created the record, or completed a pending one.
    Inserted(LessonCompletion),
    /// A completed record already existed and was left untouched.
    Existing(LessonCompletion),
}

impl CompletionInsert {
    #[must_use]
    pub fn is_inserted(&self) -> bool {
        matches!(self, Self::Inserted(_))
    }

    #[must_use]
    pub fn into_record(self) -> LessonCompletion {
        match self {
            Self::Inserted(record) | Self::Existing(record) => record,
        }
    }
}

/// Outcome of recording a completion together with its experience award.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppliedCompletion {
    /// The record was created and the learner's experience updated.
    Recorded {
        completion: LessonCompletion,
        experience: Experience,
    },
    /// Another request got there first; nothing was written.
    AlreadyRecorded(LessonCompletion),
}

//
// ─── REPOSITORY CONTRACTS ──────────────────────────────────────────────────────
//

/// Read side of the course catalog, plus the writes needed to seed it.
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError` if the course cannot be stored.
    async fn upsert_course(&self, course: &Course) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` if the lesson cannot be stored.
    async fn upsert_lesson(&self, lesson: &Lesson) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on repository failures. A missing course is `Ok(None)`.
    async fn get_course(&self, id: CourseId) -> Result<Option<Course>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on repository failures. A missing lesson is `Ok(None)`.
    async fn get_lesson(&self, id: LessonId) -> Result<Option<Lesson>, StorageError>;

    /// Current lessons of a course ordered by position.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on repository failures.
    async fn lessons_for_course(&self, course: CourseId) -> Result<Vec<Lesson>, StorageError>;
}

/// Learner profiles and their experience ledger.
#[async_trait]
pub trait LearnerRepository: Send + Sync {
    /// Insert a learner or refresh its profile fields. Experience of an
    /// existing learner is never overwritten.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the learner cannot be stored.
    async fn upsert_learner(&self, learner: &Learner) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on repository failures. A missing learner is `Ok(None)`.
    async fn get_learner(&self, id: UserId) -> Result<Option<Learner>, StorageError>;

    /// Atomically add `amount` xp and store the recomputed level.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the learner does not exist.
    async fn award_xp(&self, id: UserId, amount: u64) -> Result<Experience, StorageError>;
}

#[async_trait]
pub trait EnrollmentRepository: Send + Sync {
    /// Create an active enrollment.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if (user, course) is already enrolled.
    async fn insert_enrollment(
        &self,
        user: UserId,
        course: CourseId,
        at: DateTime<Utc>,
    ) -> Result<Enrollment, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on repository failures. No enrollment is `Ok(None)`.
    async fn get_enrollment(
        &self,
        user: UserId,
        course: CourseId,
    ) -> Result<Option<Enrollment>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on repository failures.
    async fn enrollments_for_user(&self, user: UserId) -> Result<Vec<Enrollment>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on repository failures.
    async fn enrollments_for_course(
        &self,
        course: CourseId,
    ) -> Result<Vec<Enrollment>, StorageError>;

    /// Flip an active enrollment to completed.
    ///
    /// Returns `true` only for the call that performed the flip; an already
    /// completed or missing enrollment yields `false`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on repository failures.
    async fn mark_completed(
        &self,
        user: UserId,
        course: CourseId,
        at: DateTime<Utc>,
    ) -> Result<bool, StorageError>;
}

/// Persistence primitive for lesson completion records.
///
/// Holds no policy: re-completion is not an error here.
#[async_trait]
pub trait CompletionRepository: Send + Sync {
    /// Insert the record unless a completed one exists for (user, lesson),
    /// in which case the existing record is returned.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on repository failures.
    async fn record_completion(
        &self,
        completion: NewCompletion,
    ) -> Result<CompletionInsert, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on repository failures. No record is `Ok(None)`.
    async fn get_completion(
        &self,
        user: UserId,
        lesson: LessonId,
    ) -> Result<Option<LessonCompletion>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on repository failures.
    async fn completions_for_course(
        &self,
        user: UserId,
        course: CourseId,
    ) -> Result<Vec<LessonCompletion>, StorageError>;
}

/// Writes a completion and its experience award as one unit.
#[async_trait]
pub trait CompletionPersistence: Send + Sync {
    /// Insert the completion; only when this call created it, add `xp` to the
    /// learner. Either both effects become visible or neither does.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the learner does not exist.
    async fn apply_completion(
        &self,
        completion: NewCompletion,
        xp: u64,
    ) -> Result<AppliedCompletion, StorageError>;
}

#[async_trait]
pub trait CertificateRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if (user, course) already has a certificate.
    async fn insert_certificate(
        &self,
        certificate: &NewCertificate,
    ) -> Result<Certificate, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on repository failures. No certificate is `Ok(None)`.
    async fn get_certificate(
        &self,
        user: UserId,
        course: CourseId,
    ) -> Result<Option<Certificate>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on repository failures.
    async fn certificates_for_user(&self, user: UserId) -> Result<Vec<Certificate>, StorageError>;
}

//
// ─── STORAGE AGGREGATE ─────────────────────────────────────────────────────────
//

/// Aggregates repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub catalog: Arc<dyn CatalogRepository>,
    pub learners: Arc<dyn LearnerRepository>,
    pub enrollments: Arc<dyn EnrollmentRepository>,
    pub completions: Arc<dyn CompletionRepository>,
    pub progress: Arc<dyn CompletionPersistence>,
    pub certificates: Arc<dyn CertificateRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        Self::from_repository(InMemoryRepository::new())
    }

    pub(crate) fn from_repository<R>(repo: R) -> Self
    where
        R: CatalogRepository
            + LearnerRepository
            + EnrollmentRepository
            + CompletionRepository
            + CompletionPersistence
            + CertificateRepository
            + Clone
            + 'static,
    {
        Self {
            catalog: Arc::new(repo.clone()),
            learners: Arc::new(repo.clone()),
            enrollments: Arc::new(repo.clone()),
            completions: Arc::new(repo.clone()),
            progress: Arc::new(repo.clone()),
            certificates: Arc::new(repo),
        }
    }
}
