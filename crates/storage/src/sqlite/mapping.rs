use chrono::{DateTime, Utc};
use progress_core::model::{
    Certificate, CertificateId, CompletionId, Course, CourseId, Enrollment, EnrollmentId,
    EnrollmentStatus, Experience, Learner, Lesson, LessonCompletion, LessonId, UserId,
};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

/// Maps a driver error, keeping uniqueness violations distinguishable.
pub(crate) fn db_err(e: sqlx::Error) -> StorageError {
    if let sqlx::Error::Database(db) = &e {
        if db.is_unique_violation() {
            return StorageError::Conflict;
        }
    }
    StorageError::Connection(e.to_string())
}

pub(crate) fn id_to_i64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

fn u64_from_i64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

fn u32_from_i64(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

fn get_u64(row: &SqliteRow, field: &'static str) -> Result<u64, StorageError> {
    u64_from_i64(field, row.try_get::<i64, _>(field).map_err(ser)?)
}

pub(crate) fn map_course_row(row: &SqliteRow) -> Result<Course, StorageError> {
    let teacher_id = row
        .try_get::<Option<i64>, _>("teacher_id")
        .map_err(ser)?
        .map(|v| u64_from_i64("teacher_id", v).map(UserId::new))
        .transpose()?;

    Course::new(
        CourseId::new(get_u64(row, "id")?),
        row.try_get::<String, _>("name").map_err(ser)?,
        teacher_id,
        row.try_get("created_at").map_err(ser)?,
    )
    .map_err(ser)
}

pub(crate) fn map_lesson_row(row: &SqliteRow) -> Result<Lesson, StorageError> {
    Lesson::new(
        LessonId::new(get_u64(row, "id")?),
        CourseId::new(get_u64(row, "course_id")?),
        row.try_get::<String, _>("title").map_err(ser)?,
        u32_from_i64("position", row.try_get::<i64, _>("position").map_err(ser)?)?,
    )
    .map_err(ser)
}

/// Rebuilds a learner, rejecting rows whose stored level disagrees with xp.
pub(crate) fn map_learner_row(row: &SqliteRow) -> Result<Learner, StorageError> {
    let experience = Experience::from_persisted(
        get_u64(row, "xp")?,
        u32_from_i64("level", row.try_get::<i64, _>("level").map_err(ser)?)?,
    )
    .map_err(ser)?;

    Ok(Learner::new(
        UserId::new(get_u64(row, "id")?),
        row.try_get::<String, _>("username").map_err(ser)?,
        row.try_get::<String, _>("name").map_err(ser)?,
        row.try_get::<String, _>("surname").map_err(ser)?,
        row.try_get("created_at").map_err(ser)?,
    )
    .map_err(ser)?
    .with_experience(experience))
}

pub(crate) fn map_enrollment_row(row: &SqliteRow) -> Result<Enrollment, StorageError> {
    let status: String = row.try_get("status").map_err(ser)?;
    Enrollment::from_persisted(
        EnrollmentId::new(get_u64(row, "id")?),
        UserId::new(get_u64(row, "user_id")?),
        CourseId::new(get_u64(row, "course_id")?),
        EnrollmentStatus::parse(&status).map_err(ser)?,
        row.try_get("created_at").map_err(ser)?,
        row.try_get("updated_at").map_err(ser)?,
    )
    .map_err(ser)
}

pub(crate) fn map_completion_row(row: &SqliteRow) -> Result<LessonCompletion, StorageError> {
    let completed_at: Option<DateTime<Utc>> = row.try_get("completed_at").map_err(ser)?;
    LessonCompletion::from_persisted(
        CompletionId::new(get_u64(row, "id")?),
        UserId::new(get_u64(row, "user_id")?),
        LessonId::new(get_u64(row, "lesson_id")?),
        CourseId::new(get_u64(row, "course_id")?),
        row.try_get::<i64, _>("is_completed").map_err(ser)? != 0,
        completed_at,
    )
    .map_err(ser)
}

pub(crate) fn map_certificate_row(row: &SqliteRow) -> Result<Certificate, StorageError> {
    Ok(Certificate {
        id: CertificateId::new(get_u64(row, "id")?),
        user_id: UserId::new(get_u64(row, "user_id")?),
        course_id: CourseId::new(get_u64(row, "course_id")?),
        issued_at: row.try_get("issued_at").map_err(ser)?,
    })
}
