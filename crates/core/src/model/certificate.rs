use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::ids::{CertificateId, CourseId, UserId};

/// Proof that a learner completed a course. Immutable once issued.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Certificate {
    pub id: CertificateId,
    pub user_id: UserId,
    pub course_id: CourseId,
    pub issued_at: DateTime<Utc>,
}

/// A certificate that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCertificate {
    pub user_id: UserId,
    pub course_id: CourseId,
    pub issued_at: DateTime<Utc>,
}

impl NewCertificate {
    #[must_use]
    pub fn new(user_id: UserId, course_id: CourseId, issued_at: DateTime<Utc>) -> Self {
        Self {
            user_id,
            course_id,
            issued_at,
        }
    }

    #[must_use]
    pub fn assign_id(self, id: CertificateId) -> Certificate {
        Certificate {
            id,
            user_id: self.user_id,
            course_id: self.course_id,
            issued_at: self.issued_at,
        }
    }
}

/// What a renderer needs to draw a certificate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificateMetadata {
    pub learner_name: String,
    pub course_name: String,
    pub issued_at: DateTime<Utc>,
}
