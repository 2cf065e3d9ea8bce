use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{CompletionId, CourseId, LessonId, UserId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CompletionError {
    #[error("completed record is missing completed_at")]
    MissingCompletedAt,
}

/// A learner's record for one lesson. Once completed it stays completed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LessonCompletion {
    id: CompletionId,
    user_id: UserId,
    lesson_id: LessonId,
    course_id: CourseId,
    is_completed: bool,
    completed_at: Option<DateTime<Utc>>,
}

impl LessonCompletion {
    /// A record for a lesson finished at `at`.
    #[must_use]
    pub fn completed(
        id: CompletionId,
        user_id: UserId,
        lesson_id: LessonId,
        course_id: CourseId,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            user_id,
            lesson_id,
            course_id,
            is_completed: true,
            completed_at: Some(at),
        }
    }

    /// Rehydrate a record from persisted storage.
    ///
    /// # Errors
    ///
    /// Returns `CompletionError::MissingCompletedAt` for a completed record without a timestamp.
    pub fn from_persisted(
        id: CompletionId,
        user_id: UserId,
        lesson_id: LessonId,
        course_id: CourseId,
        is_completed: bool,
        completed_at: Option<DateTime<Utc>>,
    ) -> Result<Self, CompletionError> {
        if is_completed && completed_at.is_none() {
            return Err(CompletionError::MissingCompletedAt);
        }
        Ok(Self {
            id,
            user_id,
            lesson_id,
            course_id,
            is_completed,
            completed_at: if is_completed { completed_at } else { None },
        })
    }

    #[must_use]
    pub fn id(&self) -> CompletionId {
        self.id
    }

    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    #[must_use]
    pub fn lesson_id(&self) -> LessonId {
        self.lesson_id
    }

    #[must_use]
    pub fn course_id(&self) -> CourseId {
        self.course_id
    }

    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.is_completed
    }

    /// Only meaningful when `is_completed()` is true.
    #[must_use]
    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    #[test]
    fn completed_record_carries_timestamp() {
        let record = LessonCompletion::completed(
            CompletionId::new(1),
            UserId::new(1),
            LessonId::new(2),
            CourseId::new(3),
            fixed_now(),
        );
        assert!(record.is_completed());
        assert_eq!(record.completed_at(), Some(fixed_now()));
    }

    #[test]
    fn persisted_completed_record_needs_timestamp() {
        let err = LessonCompletion::from_persisted(
            CompletionId::new(1),
            UserId::new(1),
            LessonId::new(2),
            CourseId::new(3),
            true,
            None,
        )
        .unwrap_err();
        assert_eq!(err, CompletionError::MissingCompletedAt);

        let pending = LessonCompletion::from_persisted(
            CompletionId::new(1),
            UserId::new(1),
            LessonId::new(2),
            CourseId::new(3),
            false,
            Some(fixed_now()),
        )
        .unwrap();
        assert_eq!(pending.completed_at(), None);
    }
}
