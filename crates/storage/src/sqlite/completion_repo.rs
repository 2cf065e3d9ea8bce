use progress_core::model::{CourseId, LessonCompletion, LessonId, UserId};
use sqlx::SqliteConnection;

use super::SqliteRepository;
use super::learner_repo::award_on;
use super::mapping::{db_err, id_to_i64, map_completion_row};
use crate::repository::{
    AppliedCompletion, CompletionInsert, CompletionPersistence, CompletionRepository,
    NewCompletion, StorageError,
};

/// Insert-or-fetch on the (user_id, lesson_id) unique key.
///
/// An existing row that is not yet completed is completed in place; a
/// completed row is never touched.
async fn insert_or_fetch(
    conn: &mut SqliteConnection,
    completion: &NewCompletion,
) -> Result<CompletionInsert, StorageError> {
    let user_id = id_to_i64("user_id", completion.user_id.value())?;
    let lesson_id = id_to_i64("lesson_id", completion.lesson_id.value())?;

    let inserted = sqlx::query(
        r"
            INSERT INTO lesson_completions (user_id, lesson_id, course_id, is_completed, completed_at)
            VALUES (?1, ?2, ?3, 1, ?4)
            ON CONFLICT(user_id, lesson_id) DO UPDATE SET
                is_completed = 1,
                completed_at = excluded.completed_at
            WHERE lesson_completions.is_completed = 0
            RETURNING id, user_id, lesson_id, course_id, is_completed, completed_at
        ",
    )
    .bind(user_id)
    .bind(lesson_id)
    .bind(id_to_i64("course_id", completion.course_id.value())?)
    .bind(completion.completed_at)
    .fetch_optional(&mut *conn)
    .await
    .map_err(db_err)?;

    if let Some(row) = inserted {
        return Ok(CompletionInsert::Inserted(map_completion_row(&row)?));
    }

    let row = sqlx::query(
        r"
            SELECT id, user_id, lesson_id, course_id, is_completed, completed_at
            FROM lesson_completions
            WHERE user_id = ?1 AND lesson_id = ?2
        ",
    )
    .bind(user_id)
    .bind(lesson_id)
    .fetch_one(&mut *conn)
    .await
    .map_err(db_err)?;

    Ok(CompletionInsert::Existing(map_completion_row(&row)?))
}

#[async_trait::async_trait]
impl CompletionRepository for SqliteRepository {
    async fn record_completion(
        &self,
        completion: NewCompletion,
    ) -> Result<CompletionInsert, StorageError> {
        let mut conn = self.pool.acquire().await.map_err(db_err)?;
        insert_or_fetch(&mut *conn, &completion).await
    }

    async fn get_completion(
        &self,
        user: UserId,
        lesson: LessonId,
    ) -> Result<Option<LessonCompletion>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT id, user_id, lesson_id, course_id, is_completed, completed_at
            FROM lesson_completions
            WHERE user_id = ?1 AND lesson_id = ?2
            ",
        )
        .bind(id_to_i64("user_id", user.value())?)
        .bind(id_to_i64("lesson_id", lesson.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        row.as_ref().map(map_completion_row).transpose()
    }

    async fn completions_for_course(
        &self,
        user: UserId,
        course: CourseId,
    ) -> Result<Vec<LessonCompletion>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, user_id, lesson_id, course_id, is_completed, completed_at
            FROM lesson_completions
            WHERE user_id = ?1 AND course_id = ?2
            ORDER BY id ASC
            ",
        )
        .bind(id_to_i64("user_id", user.value())?)
        .bind(id_to_i64("course_id", course.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.iter().map(map_completion_row).collect()
    }
}

#[async_trait::async_trait]
impl CompletionPersistence for SqliteRepository {
    async fn apply_completion(
        &self,
        completion: NewCompletion,
        xp: u64,
    ) -> Result<AppliedCompletion, StorageError> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        let applied = match insert_or_fetch(&mut *tx, &completion).await? {
            CompletionInsert::Existing(record) => AppliedCompletion::AlreadyRecorded(record),
            CompletionInsert::Inserted(record) => {
                // Dropping `tx` on error rolls the insert back.
                let experience = award_on(&mut *tx, completion.user_id, xp).await?;
                AppliedCompletion::Recorded {
                    completion: record,
                    experience,
                }
            }
        };

        tx.commit().await.map_err(db_err)?;
        Ok(applied)
    }
}
