use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{CourseId, LessonId, UserId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CatalogError {
    #[error("course name cannot be empty")]
    EmptyCourseName,

    #[error("lesson title cannot be empty")]
    EmptyLessonTitle,
}

/// A course as seen by the progress engine: a name and its author.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    id: CourseId,
    name: String,
    teacher_id: Option<UserId>,
    created_at: DateTime<Utc>,
}

impl Course {
    /// # Errors
    ///
    /// Returns `CatalogError::EmptyCourseName` if the trimmed name is empty.
    pub fn new(
        id: CourseId,
        name: impl Into<String>,
        teacher_id: Option<UserId>,
        created_at: DateTime<Utc>,
    ) -> Result<Self, CatalogError> {
        let name = name.into().trim().to_owned();
        if name.is_empty() {
            return Err(CatalogError::EmptyCourseName);
        }
        Ok(Self {
            id,
            name,
            teacher_id,
            created_at,
        })
    }

    #[must_use]
    pub fn id(&self) -> CourseId {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn teacher_id(&self) -> Option<UserId> {
        self.teacher_id
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// True when `user` authored this course.
    #[must_use]
    pub fn is_taught_by(&self, user: UserId) -> bool {
        self.teacher_id == Some(user)
    }
}

/// A lesson belonging to exactly one course.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lesson {
    id: LessonId,
    course_id: CourseId,
    title: String,
    position: u32,
}

impl Lesson {
    /// # Errors
    ///
    /// Returns `CatalogError::EmptyLessonTitle` if the trimmed title is empty.
    pub fn new(
        id: LessonId,
        course_id: CourseId,
        title: impl Into<String>,
        position: u32,
    ) -> Result<Self, CatalogError> {
        let title = title.into().trim().to_owned();
        if title.is_empty() {
            return Err(CatalogError::EmptyLessonTitle);
        }
        Ok(Self {
            id,
            course_id,
            title,
            position,
        })
    }

    #[must_use]
    pub fn id(&self) -> LessonId {
        self.id
    }

    #[must_use]
    pub fn course_id(&self) -> CourseId {
        self.course_id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn position(&self) -> u32 {
        self.position
    }

    #[must_use]
    pub fn belongs_to(&self, course: CourseId) -> bool {
        self.course_id == course
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    #[test]
    fn course_name_is_trimmed_and_required() {
        let course = Course::new(CourseId::new(1), "  Rust 101 ", None, fixed_now()).unwrap();
        assert_eq!(course.name(), "Rust 101");

        let err = Course::new(CourseId::new(2), "   ", None, fixed_now()).unwrap_err();
        assert_eq!(err, CatalogError::EmptyCourseName);
    }

    #[test]
    fn teacher_ownership() {
        let course =
            Course::new(CourseId::new(1), "Rust", Some(UserId::new(9)), fixed_now()).unwrap();
        assert!(course.is_taught_by(UserId::new(9)));
        assert!(!course.is_taught_by(UserId::new(1)));
    }

    #[test]
    fn lesson_membership() {
        let lesson = Lesson::new(LessonId::new(3), CourseId::new(1), "Ownership", 0).unwrap();
        assert!(lesson.belongs_to(CourseId::new(1)));
        assert!(!lesson.belongs_to(CourseId::new(2)));
        assert!(Lesson::new(LessonId::new(4), CourseId::new(1), "", 1).is_err());
    }
}
