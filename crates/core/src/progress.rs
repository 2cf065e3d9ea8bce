use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::model::{Lesson, LessonCompletion, LessonId};

/// Completion ratio of one learner in one course.
///
/// `completed` never exceeds `total`. A course without lessons has ratio 0
/// and can never count as complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseProgress {
    completed: u32,
    total: u32,
}

impl CourseProgress {
    #[must_use]
    pub fn from_counts(completed: u32, total: u32) -> Self {
        Self {
            completed: completed.min(total),
            total,
        }
    }

    /// Counts completed records whose lesson is still part of `lessons`.
    ///
    /// Records for lessons removed from the course are ignored, as are
    /// records that are not marked completed.
    #[must_use]
    pub fn tally(lessons: &[Lesson], completions: &[LessonCompletion]) -> Self {
        let current: HashSet<LessonId> = lessons.iter().map(Lesson::id).collect();
        let done: HashSet<LessonId> = completions
            .iter()
            .filter(|c| c.is_completed() && current.contains(&c.lesson_id()))
            .map(LessonCompletion::lesson_id)
            .collect();

        let total = u32::try_from(current.len()).unwrap_or(u32::MAX);
        let completed = u32::try_from(done.len()).unwrap_or(u32::MAX);
        Self::from_counts(completed, total)
    }

    #[must_use]
    pub fn completed(&self) -> u32 {
        self.completed
    }

    #[must_use]
    pub fn total(&self) -> u32 {
        self.total
    }

    /// Value in `[0, 1]`.
    #[must_use]
    pub fn ratio(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        f64::from(self.completed) / f64::from(self.total)
    }

    /// Ratio scaled to `[0, 100]`.
    #[must_use]
    pub fn percent(&self) -> f64 {
        self.ratio() * 100.0
    }

    /// Every current lesson is completed. Always false for an empty course.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.total > 0 && self.completed == self.total
    }
}
