use progress_core::model::{Course, CourseId, Lesson, LessonId};

use super::SqliteRepository;
use super::mapping::{db_err, id_to_i64, map_course_row, map_lesson_row};
use crate::repository::{CatalogRepository, StorageError};

#[async_trait::async_trait]
impl CatalogRepository for SqliteRepository {
    async fn upsert_course(&self, course: &Course) -> Result<(), StorageError> {
        let teacher_id = course
            .teacher_id()
            .map(|t| id_to_i64("teacher_id", t.value()))
            .transpose()?;

        sqlx::query(
            r"
            INSERT INTO courses (id, name, teacher_id, created_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                teacher_id = excluded.teacher_id
            ",
        )
        .bind(id_to_i64("course_id", course.id().value())?)
        .bind(course.name().to_owned())
        .bind(teacher_id)
        .bind(course.created_at())
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(())
    }

    async fn upsert_lesson(&self, lesson: &Lesson) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO lessons (id, course_id, title, position)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(id) DO UPDATE SET
                course_id = excluded.course_id,
                title = excluded.title,
                position = excluded.position
            ",
        )
        .bind(id_to_i64("lesson_id", lesson.id().value())?)
        .bind(id_to_i64("course_id", lesson.course_id().value())?)
        .bind(lesson.title().to_owned())
        .bind(i64::from(lesson.position()))
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(())
    }

    async fn get_course(&self, id: CourseId) -> Result<Option<Course>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT id, name, teacher_id, created_at
            FROM courses WHERE id = ?1
            ",
        )
        .bind(id_to_i64("course_id", id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        row.as_ref().map(map_course_row).transpose()
    }

    async fn get_lesson(&self, id: LessonId) -> Result<Option<Lesson>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT id, course_id, title, position
            FROM lessons WHERE id = ?1
            ",
        )
        .bind(id_to_i64("lesson_id", id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        row.as_ref().map(map_lesson_row).transpose()
    }

    async fn lessons_for_course(&self, course: CourseId) -> Result<Vec<Lesson>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, course_id, title, position
            FROM lessons
            WHERE course_id = ?1
            ORDER BY position ASC, id ASC
            ",
        )
        .bind(id_to_i64("course_id", course.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.iter().map(map_lesson_row).collect()
    }
}
