use progress_core::model::{Certificate, CourseId, NewCertificate, UserId};

use super::SqliteRepository;
use super::mapping::{db_err, id_to_i64, map_certificate_row};
use crate::repository::{CertificateRepository, StorageError};

#[async_trait::async_trait]
impl CertificateRepository for SqliteRepository {
    async fn insert_certificate(
        &self,
        certificate: &NewCertificate,
    ) -> Result<Certificate, StorageError> {
        // A second insert for the same pair fails the UNIQUE (user_id, course_id)
        // constraint and surfaces as `StorageError::Conflict`.
        let row = sqlx::query(
            r"
            INSERT INTO certificates (user_id, course_id, issued_at)
            VALUES (?1, ?2, ?3)
            RETURNING id, user_id, course_id, issued_at
            ",
        )
        .bind(id_to_i64("user_id", certificate.user_id.value())?)
        .bind(id_to_i64("course_id", certificate.course_id.value())?)
        .bind(certificate.issued_at)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)?;

        map_certificate_row(&row)
    }

    async fn get_certificate(
        &self,
        user: UserId,
        course: CourseId,
    ) -> Result<Option<Certificate>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT id, user_id, course_id, issued_at
            FROM certificates
            WHERE user_id = ?1 AND course_id = ?2
            ",
        )
        .bind(id_to_i64("user_id", user.value())?)
        .bind(id_to_i64("course_id", course.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        row.as_ref().map(map_certificate_row).transpose()
    }

    async fn certificates_for_user(&self, user: UserId) -> Result<Vec<Certificate>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, user_id, course_id, issued_at
            FROM certificates
            WHERE user_id = ?1
            ORDER BY issued_at ASC, id ASC
            ",
        )
        .bind(id_to_i64("user_id", user.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.iter().map(map_certificate_row).collect()
    }
}
