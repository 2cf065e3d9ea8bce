use std::sync::Arc;

use tracing::info;

use progress_core::Clock;
use progress_core::model::{CourseId, Enrollment, UserId};
use storage::repository::{CatalogRepository, EnrollmentRepository, StorageError};

use crate::error::{EnrollmentServiceError, Missing};

/// Enrolls learners in courses and answers enrollment queries.
#[derive(Clone)]
pub struct EnrollmentService {
    clock: Clock,
    catalog: Arc<dyn CatalogRepository>,
    enrollments: Arc<dyn EnrollmentRepository>,
}

impl EnrollmentService {
    #[must_use]
    pub fn new(
        clock: Clock,
        catalog: Arc<dyn CatalogRepository>,
        enrollments: Arc<dyn EnrollmentRepository>,
    ) -> Self {
        Self {
            clock,
            catalog,
            enrollments,
        }
    }

    /// Enroll `user` in `course` with status active.
    ///
    /// # Errors
    ///
    /// Returns `EnrollmentServiceError::NotFound` if the course does not exist.
    /// Returns `EnrollmentServiceError::TeacherCannotEnroll` if `user` teaches the course.
    /// Returns `EnrollmentServiceError::AlreadyEnrolled` for a duplicate enrollment.
    /// Returns `EnrollmentServiceError::Storage` if persistence fails.
    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn enroll(
        &self,
        user: UserId,
        course: CourseId,
    ) -> Result<Enrollment, EnrollmentServiceError> {
        let found = self
            .catalog
            .get_course(course)
            .await?
            .ok_or(EnrollmentServiceError::NotFound(Missing::Course(course)))?;
        if found.is_taught_by(user) {
            return Err(EnrollmentServiceError::TeacherCannotEnroll { user, course });
        }

        let enrollment = self
            .enrollments
            .insert_enrollment(user, course, self.clock.now())
            .await
            .map_err(|err| match err {
                StorageError::Conflict => EnrollmentServiceError::AlreadyEnrolled { user, course },
                other => EnrollmentServiceError::Storage(other),
            })?;

        info!(%user, %course, enrollment = %enrollment.id(), "learner enrolled");
        Ok(enrollment)
    }

    /// Returns `Ok(None)` when the learner is not enrolled.
    ///
    /// # Errors
    ///
    /// Returns `EnrollmentServiceError::Storage` if repository access fails.
    pub async fn enrollment(
        &self,
        user: UserId,
        course: CourseId,
    ) -> Result<Option<Enrollment>, EnrollmentServiceError> {
        Ok(self.enrollments.get_enrollment(user, course).await?)
    }

    /// # Errors
    ///
    /// Returns `EnrollmentServiceError::Storage` if repository access fails.
    pub async fn enrollments_for_learner(
        &self,
        user: UserId,
    ) -> Result<Vec<Enrollment>, EnrollmentServiceError> {
        Ok(self.enrollments.enrollments_for_user(user).await?)
    }

    /// # Errors
    ///
    /// Returns `EnrollmentServiceError::Storage` if repository access fails.
    pub async fn enrollments_for_course(
        &self,
        course: CourseId,
    ) -> Result<Vec<Enrollment>, EnrollmentServiceError> {
        Ok(self.enrollments.enrollments_for_course(course).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use progress_core::model::{Course, EnrollmentStatus};
    use progress_core::time::{fixed_clock, fixed_now};
    use storage::InMemoryRepository;

    const TEACHER: UserId = UserId::new(99);

    async fn service() -> EnrollmentService {
        let repo = InMemoryRepository::new();
        let course = Course::new(CourseId::new(1), "Rust", Some(TEACHER), fixed_now()).unwrap();
        repo.upsert_course(&course).await.unwrap();
        EnrollmentService::new(fixed_clock(), Arc::new(repo.clone()), Arc::new(repo))
    }

    #[tokio::test]
    async fn enroll_creates_active_enrollment() {
        let service = service().await;
        let enrollment = service.enroll(UserId::new(1), CourseId::new(1)).await.unwrap();

        assert_eq!(enrollment.status(), EnrollmentStatus::Active);
        assert_eq!(enrollment.created_at(), fixed_now());
        assert_eq!(
            service.enrollments_for_learner(UserId::new(1)).await.unwrap(),
            vec![enrollment.clone()]
        );
        assert_eq!(
            service.enrollment(UserId::new(1), CourseId::new(1)).await.unwrap(),
            Some(enrollment)
        );
    }

    #[tokio::test]
    async fn duplicate_enrollment_is_rejected() {
        let service = service().await;
        service.enroll(UserId::new(1), CourseId::new(1)).await.unwrap();

        let err = service.enroll(UserId::new(1), CourseId::new(1)).await.unwrap_err();
        assert!(matches!(err, EnrollmentServiceError::AlreadyEnrolled { .. }));
        assert_eq!(service.enrollments_for_course(CourseId::new(1)).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn teacher_cannot_enroll_in_own_course() {
        let service = service().await;
        let err = service.enroll(TEACHER, CourseId::new(1)).await.unwrap_err();
        assert!(matches!(err, EnrollmentServiceError::TeacherCannotEnroll { .. }));
    }

    #[tokio::test]
    async fn unknown_course_is_not_found() {
        let service = service().await;
        let err = service.enroll(UserId::new(1), CourseId::new(5)).await.unwrap_err();
        assert!(matches!(
            err,
            EnrollmentServiceError::NotFound(Missing::Course(id)) if id == CourseId::new(5)
        ));
    }
}
