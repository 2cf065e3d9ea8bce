use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{CourseId, EnrollmentId, UserId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum EnrollmentError {
    #[error("invalid enrollment status: {0}")]
    InvalidStatus(String),

    #[error("updated_at is before created_at")]
    InvalidTimeRange,
}

//
// ─── STATUS ────────────────────────────────────────────────────────────────────
//

/// Lifecycle of an enrollment. The only transition is `Active -> Completed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnrollmentStatus {
    Active,
    Completed,
}

impl EnrollmentStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            EnrollmentStatus::Active => "active",
            EnrollmentStatus::Completed => "completed",
        }
    }

    /// Parses the storage representation.
    ///
    /// # Errors
    ///
    /// Returns `EnrollmentError::InvalidStatus` for anything but `active` or `completed`.
    pub fn parse(s: &str) -> Result<Self, EnrollmentError> {
        match s {
            "active" => Ok(Self::Active),
            "completed" => Ok(Self::Completed),
            other => Err(EnrollmentError::InvalidStatus(other.to_owned())),
        }
    }
}

//
// ─── ENROLLMENT ────────────────────────────────────────────────────────────────
//

/// Relationship between a learner and a course.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enrollment {
    id: EnrollmentId,
    user_id: UserId,
    course_id: CourseId,
    status: EnrollmentStatus,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Enrollment {
    /// A fresh, active enrollment.
    #[must_use]
    pub fn new_active(
        id: EnrollmentId,
        user_id: UserId,
        course_id: CourseId,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            user_id,
            course_id,
            status: EnrollmentStatus::Active,
            created_at: now,
            updated_at: now,
        }
    }

    /// Rehydrate an enrollment from persisted storage.
    ///
    /// # Errors
    ///
    /// Returns `EnrollmentError::InvalidTimeRange` if `updated_at < created_at`.
    pub fn from_persisted(
        id: EnrollmentId,
        user_id: UserId,
        course_id: CourseId,
        status: EnrollmentStatus,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Result<Self, EnrollmentError> {
        if updated_at < created_at {
            return Err(EnrollmentError::InvalidTimeRange);
        }
        Ok(Self {
            id,
            user_id,
            course_id,
            status,
            created_at,
            updated_at,
        })
    }

    /// Flip to `Completed`. Returns `false` when the enrollment was already completed.
    pub fn complete(&mut self, at: DateTime<Utc>) -> bool {
        if self.is_completed() {
            return false;
        }
        self.status = EnrollmentStatus::Completed;
        self.updated_at = at.max(self.created_at);
        true
    }

    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.status == EnrollmentStatus::Completed
    }

    #[must_use]
    pub fn id(&self) -> EnrollmentId {
        self.id
    }

    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    #[must_use]
    pub fn course_id(&self) -> CourseId {
        self.course_id
    }

    #[must_use]
    pub fn status(&self) -> EnrollmentStatus {
        self.status
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[must_use]
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;
    use chrono::Duration;

    fn active() -> Enrollment {
        Enrollment::new_active(
            EnrollmentId::new(1),
            UserId::new(1),
            CourseId::new(1),
            fixed_now(),
        )
    }

    #[test]
    fn status_round_trips_through_storage_text() {
        for status in [EnrollmentStatus::Active, EnrollmentStatus::Completed] {
            assert_eq!(EnrollmentStatus::parse(status.as_str()).unwrap(), status);
        }
        assert!(matches!(
            EnrollmentStatus::parse("dropped"),
            Err(EnrollmentError::InvalidStatus(_))
        ));
    }

    #[test]
    fn complete_is_one_way_and_idempotent() {
        let mut enrollment = active();
        let later = fixed_now() + Duration::hours(1);

        assert!(enrollment.complete(later));
        assert_eq!(enrollment.status(), EnrollmentStatus::Completed);
        assert_eq!(enrollment.updated_at(), later);

        assert!(!enrollment.complete(later + Duration::hours(1)));
        assert_eq!(enrollment.updated_at(), later);
    }

    #[test]
    fn from_persisted_rejects_inverted_timestamps() {
        let err = Enrollment::from_persisted(
            EnrollmentId::new(1),
            UserId::new(1),
            CourseId::new(1),
            EnrollmentStatus::Active,
            fixed_now(),
            fixed_now() - Duration::seconds(1),
        )
        .unwrap_err();
        assert_eq!(err, EnrollmentError::InvalidTimeRange);
    }
}
