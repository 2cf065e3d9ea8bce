use std::sync::Arc;

use tracing::{debug, info};

use progress_core::model::{CourseId, UserId};
use progress_core::{Clock, CourseProgress};
use storage::repository::{CatalogRepository, CompletionRepository, EnrollmentRepository};

use crate::error::ProgressServiceError;

/// Progress of a learner in a course, plus whether this evaluation was the one
/// that moved the enrollment to completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressEvaluation {
    pub progress: CourseProgress,
    pub enrollment_completed_now: bool,
}

/// Computes course progress and finalizes enrollments that reach 100%.
#[derive(Clone)]
pub struct ProgressService {
    clock: Clock,
    catalog: Arc<dyn CatalogRepository>,
    completions: Arc<dyn CompletionRepository>,
    enrollments: Arc<dyn EnrollmentRepository>,
}

impl ProgressService {
    #[must_use]
    pub fn new(
        clock: Clock,
        catalog: Arc<dyn CatalogRepository>,
        completions: Arc<dyn CompletionRepository>,
        enrollments: Arc<dyn EnrollmentRepository>,
    ) -> Self {
        Self {
            clock,
            catalog,
            completions,
            enrollments,
        }
    }

    /// Progress of `user` in `course`.
    ///
    /// Reaching every lesson of a non-empty course flips an active enrollment
    /// to completed as a side effect. A course without lessons reports 0.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Storage` if repository access fails.
    pub async fn course_progress(
        &self,
        user: UserId,
        course: CourseId,
    ) -> Result<CourseProgress, ProgressServiceError> {
        Ok(self.evaluate(user, course).await?.progress)
    }

    /// Same as [`Self::course_progress`], also reporting whether this call
    /// completed the enrollment.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Storage` if repository access fails.
    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn evaluate(
        &self,
        user: UserId,
        course: CourseId,
    ) -> Result<ProgressEvaluation, ProgressServiceError> {
        let progress = self.tally(user, course).await?;

        let mut enrollment_completed_now = false;
        if progress.is_complete() {
            enrollment_completed_now = self
                .enrollments
                .mark_completed(user, course, self.clock.now())
                .await?;
            if enrollment_completed_now {
                info!(%user, %course, "enrollment completed");
            } else {
                debug!(%user, %course, "enrollment already completed or absent");
            }
        }

        Ok(ProgressEvaluation {
            progress,
            enrollment_completed_now,
        })
    }

    /// Read-only tally; never touches the enrollment.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Storage` if repository access fails.
    pub async fn tally(
        &self,
        user: UserId,
        course: CourseId,
    ) -> Result<CourseProgress, ProgressServiceError> {
        let lessons = self.catalog.lessons_for_course(course).await?;
        let completions = self.completions.completions_for_course(user, course).await?;
        Ok(CourseProgress::tally(&lessons, &completions))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use progress_core::model::{Course, EnrollmentStatus, Lesson, LessonId};
    use progress_core::time::{fixed_clock, fixed_now};
    use storage::InMemoryRepository;
    use storage::repository::NewCompletion;

    const USER: UserId = UserId::new(1);
    const COURSE: CourseId = CourseId::new(7);

    async fn seeded(lessons: u64) -> InMemoryRepository {
        let repo = InMemoryRepository::new();
        let course = Course::new(COURSE, "Rust", None, fixed_now()).unwrap();
        repo.upsert_course(&course).await.unwrap();
        for id in 1..=lessons {
            let position = u32::try_from(id).unwrap();
            let lesson = Lesson::new(LessonId::new(id), COURSE, format!("L{id}"), position).unwrap();
            repo.upsert_lesson(&lesson).await.unwrap();
        }
        repo
    }

    fn service(repo: &InMemoryRepository) -> ProgressService {
        ProgressService::new(
            fixed_clock(),
            Arc::new(repo.clone()),
            Arc::new(repo.clone()),
            Arc::new(repo.clone()),
        )
    }

    async fn complete(repo: &InMemoryRepository, lesson: u64) {
        repo.record_completion(NewCompletion::new(USER, LessonId::new(lesson), COURSE, fixed_now()))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn partial_progress_leaves_enrollment_active() {
        let repo = seeded(4).await;
        repo.insert_enrollment(USER, COURSE, fixed_now()).await.unwrap();
        for lesson in 1..=3 {
            complete(&repo, lesson).await;
        }

        let progress = service(&repo).course_progress(USER, COURSE).await.unwrap();
        assert!((progress.ratio() - 0.75).abs() < f64::EPSILON);

        let enrollment = repo.get_enrollment(USER, COURSE).await.unwrap().unwrap();
        assert_eq!(enrollment.status(), EnrollmentStatus::Active);
    }

    #[tokio::test]
    async fn full_progress_completes_enrollment_once() {
        let repo = seeded(2).await;
        repo.insert_enrollment(USER, COURSE, fixed_now()).await.unwrap();
        complete(&repo, 1).await;
        complete(&repo, 2).await;

        let svc = service(&repo);
        let first = svc.evaluate(USER, COURSE).await.unwrap();
        assert!(first.progress.is_complete());
        assert!(first.enrollment_completed_now);

        let second = svc.evaluate(USER, COURSE).await.unwrap();
        assert!(!second.enrollment_completed_now);

        let enrollment = repo.get_enrollment(USER, COURSE).await.unwrap().unwrap();
        assert_eq!(enrollment.status(), EnrollmentStatus::Completed);
    }

    #[tokio::test]
    async fn empty_course_reports_zero_and_never_completes() {
        let repo = seeded(0).await;
        repo.insert_enrollment(USER, COURSE, fixed_now()).await.unwrap();

        let evaluation = service(&repo).evaluate(USER, COURSE).await.unwrap();
        assert_eq!(evaluation.progress.ratio(), 0.0);
        assert!(!evaluation.enrollment_completed_now);
    }

    #[tokio::test]
    async fn full_progress_without_enrollment_is_not_an_error() {
        let repo = seeded(1).await;
        complete(&repo, 1).await;

        let evaluation = service(&repo).evaluate(USER, COURSE).await.unwrap();
        assert!(evaluation.progress.is_complete());
        assert!(!evaluation.enrollment_completed_now);
    }

    #[tokio::test]
    async fn tally_does_not_flip_enrollment() {
        let repo = seeded(1).await;
        repo.insert_enrollment(USER, COURSE, fixed_now()).await.unwrap();
        complete(&repo, 1).await;

        let progress = service(&repo).tally(USER, COURSE).await.unwrap();
        assert!(progress.is_complete());
        let enrollment = repo.get_enrollment(USER, COURSE).await.unwrap().unwrap();
        assert_eq!(enrollment.status(), EnrollmentStatus::Active);
    }
}
