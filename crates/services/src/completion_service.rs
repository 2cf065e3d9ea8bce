use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use progress_core::model::{
    CourseId, Experience, LessonCompletion, LessonId, UserId, XP_PER_LESSON,
};
use progress_core::{Clock, CourseProgress};
use storage::repository::{
    AppliedCompletion, CatalogRepository, CompletionPersistence, CompletionRepository,
    NewCompletion, StorageError,
};

use crate::error::{CompletionServiceError, Missing};
use crate::progress_service::ProgressService;

/// Everything that changed because a lesson was completed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LessonCompleted {
    pub completion: LessonCompletion,
    pub experience: Experience,
    /// `None` when progress could not be re-read after the completion was stored.
    pub progress: Option<CourseProgress>,
    /// `true` when this completion moved the enrollment to completed.
    pub course_completed: bool,
}

//
// ─── SERVICE ───────────────────────────────────────────────────────────────────
//

/// Records lesson completions and applies their consequences.
///
/// Per call: validate the lesson, persist the completion together with its xp
/// award, then re-evaluate course progress. Duplicate requests, including
/// concurrent ones, award xp exactly once.
///
/// Once the completion is committed the call succeeds; the re-evaluation is
/// best effort, and a missed enrollment flip is applied by the next evaluation.
#[derive(Clone)]
pub struct CompletionService {
    clock: Clock,
    catalog: Arc<dyn CatalogRepository>,
    completions: Arc<dyn CompletionRepository>,
    persistence: Arc<dyn CompletionPersistence>,
    progress: ProgressService,
}

impl CompletionService {
    #[must_use]
    pub fn new(
        clock: Clock,
        catalog: Arc<dyn CatalogRepository>,
        completions: Arc<dyn CompletionRepository>,
        persistence: Arc<dyn CompletionPersistence>,
        progress: ProgressService,
    ) -> Self {
        Self {
            clock,
            catalog,
            completions,
            persistence,
            progress,
        }
    }

    /// Mark `lesson` of `course` completed for `user`.
    ///
    /// # Errors
    ///
    /// Returns `CompletionServiceError::NotFound` if the lesson or learner does not exist.
    /// Returns `CompletionServiceError::LessonCourseMismatch` if the lesson is not part of `course`.
    /// Returns `CompletionServiceError::AlreadyCompleted` if the lesson was completed before,
    /// including by a concurrent request that won the race.
    /// Returns `CompletionServiceError::Storage` if persisting the completion fails.
    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn complete_lesson(
        &self,
        user: UserId,
        lesson: LessonId,
        course: CourseId,
    ) -> Result<LessonCompleted, CompletionServiceError> {
        let found = self
            .catalog
            .get_lesson(lesson)
            .await?
            .ok_or(CompletionServiceError::NotFound(Missing::Lesson(lesson)))?;
        if !found.belongs_to(course) {
            return Err(CompletionServiceError::LessonCourseMismatch { lesson, course });
        }

        // Fast path only; the store's unique key decides races.
        let existing = self.completions.get_completion(user, lesson).await?;
        if existing.is_some_and(|record| record.is_completed()) {
            return Err(CompletionServiceError::AlreadyCompleted { user, lesson });
        }

        let record = NewCompletion::new(user, lesson, course, self.clock.now());
        let applied = self
            .persistence
            .apply_completion(record, XP_PER_LESSON)
            .await
            .map_err(|err| match err {
                StorageError::NotFound => CompletionServiceError::NotFound(Missing::Learner(user)),
                other => CompletionServiceError::Storage(other),
            })?;

        let (completion, experience) = match applied {
            AppliedCompletion::Recorded {
                completion,
                experience,
            } => (completion, experience),
            AppliedCompletion::AlreadyRecorded(_) => {
                debug!(%user, %lesson, "lost completion race");
                return Err(CompletionServiceError::AlreadyCompleted { user, lesson });
            }
        };
        info!(
            %user,
            %lesson,
            %course,
            xp = experience.xp(),
            level = experience.level(),
            "lesson completed"
        );

        let (progress, course_completed) = match self.progress.evaluate(user, course).await {
            Ok(evaluation) => (
                Some(evaluation.progress),
                evaluation.enrollment_completed_now,
            ),
            Err(err) => {
                warn!(
                    %user,
                    %course,
                    error = %err,
                    "progress re-evaluation failed after completion"
                );
                (self.progress.tally(user, course).await.ok(), false)
            }
        };

        Ok(LessonCompleted {
            completion,
            experience,
            progress,
            course_completed,
        })
    }

    /// Completion records of `user` within `course`, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `CompletionServiceError::Storage` if repository access fails.
    pub async fn completions_for_course(
        &self,
        user: UserId,
        course: CourseId,
    ) -> Result<Vec<LessonCompletion>, CompletionServiceError> {
        Ok(self.completions.completions_for_course(user, course).await?)
    }
}
