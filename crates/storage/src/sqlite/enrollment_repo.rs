use chrono::{DateTime, Utc};
use progress_core::model::{CourseId, Enrollment, EnrollmentStatus, UserId};

use super::SqliteRepository;
use super::mapping::{db_err, id_to_i64, map_enrollment_row};
use crate::repository::{EnrollmentRepository, StorageError};

const SELECT_ENROLLMENT: &str = r"
    SELECT id, user_id, course_id, status, created_at, updated_at
    FROM enrollments
";

#[async_trait::async_trait]
impl EnrollmentRepository for SqliteRepository {
    async fn insert_enrollment(
        &self,
        user: UserId,
        course: CourseId,
        at: DateTime<Utc>,
    ) -> Result<Enrollment, StorageError> {
        let row = sqlx::query(
            r"
            INSERT INTO enrollments (user_id, course_id, status, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?4)
            RETURNING id, user_id, course_id, status, created_at, updated_at
            ",
        )
        .bind(id_to_i64("user_id", user.value())?)
        .bind(id_to_i64("course_id", course.value())?)
        .bind(EnrollmentStatus::Active.as_str())
        .bind(at)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)?;

        map_enrollment_row(&row)
    }

    async fn get_enrollment(
        &self,
        user: UserId,
        course: CourseId,
    ) -> Result<Option<Enrollment>, StorageError> {
        let row = sqlx::query(&format!(
            "{SELECT_ENROLLMENT} WHERE user_id = ?1 AND course_id = ?2"
        ))
        .bind(id_to_i64("user_id", user.value())?)
        .bind(id_to_i64("course_id", course.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        row.as_ref().map(map_enrollment_row).transpose()
    }

    async fn enrollments_for_user(&self, user: UserId) -> Result<Vec<Enrollment>, StorageError> {
        let rows = sqlx::query(&format!(
            "{SELECT_ENROLLMENT} WHERE user_id = ?1 ORDER BY id ASC"
        ))
        .bind(id_to_i64("user_id", user.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.iter().map(map_enrollment_row).collect()
    }

    async fn enrollments_for_course(
        &self,
        course: CourseId,
    ) -> Result<Vec<Enrollment>, StorageError> {
        let rows = sqlx::query(&format!(
            "{SELECT_ENROLLMENT} WHERE course_id = ?1 ORDER BY id ASC"
        ))
        .bind(id_to_i64("course_id", course.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.iter().map(map_enrollment_row).collect()
    }

    async fn mark_completed(
        &self,
        user: UserId,
        course: CourseId,
        at: DateTime<Utc>,
    ) -> Result<bool, StorageError> {
        // The status guard makes concurrent flips race to a single winner.
        let res = sqlx::query(
            r"
            UPDATE enrollments
            SET status = ?1, updated_at = MAX(updated_at, ?2)
            WHERE user_id = ?3 AND course_id = ?4 AND status = ?5
            ",
        )
        .bind(EnrollmentStatus::Completed.as_str())
        .bind(at)
        .bind(id_to_i64("user_id", user.value())?)
        .bind(id_to_i64("course_id", course.value())?)
        .bind(EnrollmentStatus::Active.as_str())
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(res.rows_affected() == 1)
    }
}
