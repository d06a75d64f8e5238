use course_core::model::{CourseId, Lesson, LessonId};
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{
    course_id_to_i64, db, lesson_id_from_i64, lesson_id_to_i64, map_lesson_row, ser,
};
use crate::repository::{LessonRepository, NewLessonRecord, StorageError};

const LESSON_COLUMNS: &str =
    "id, course_id, title, description, video_path, thumbnail_path, order_index";

#[async_trait::async_trait]
impl LessonRepository for SqliteRepository {
    async fn append_lesson(&self, lesson: NewLessonRecord) -> Result<Lesson, StorageError> {
        // Single statement so the max lookup and the insert cannot interleave.
        let row = sqlx::query(
            r"
            INSERT INTO lessons (course_id, title, description, video_path, thumbnail_path, order_index)
            SELECT ?1, ?2, ?3, ?4, ?5, COALESCE(MAX(order_index), 0) + 1
            FROM lessons WHERE course_id = ?1
            RETURNING id, order_index
            ",
        )
        .bind(course_id_to_i64(lesson.course_id)?)
        .bind(&lesson.title)
        .bind(lesson.description.as_deref())
        .bind(&lesson.video_path)
        .bind(lesson.thumbnail_path.as_deref())
        .fetch_one(&self.pool)
        .await
        .map_err(db)?;

        let id = lesson_id_from_i64(row.try_get("id").map_err(ser)?)?;
        let order_index: i64 = row.try_get("order_index").map_err(ser)?;
        lesson.into_lesson(id, order_index)
    }

    async fn insert_lesson_at(
        &self,
        lesson: NewLessonRecord,
        order_index: i64,
    ) -> Result<Lesson, StorageError> {
        let res = sqlx::query(
            r"
            INSERT INTO lessons (course_id, title, description, video_path, thumbnail_path, order_index)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ",
        )
        .bind(course_id_to_i64(lesson.course_id)?)
        .bind(&lesson.title)
        .bind(lesson.description.as_deref())
        .bind(&lesson.video_path)
        .bind(lesson.thumbnail_path.as_deref())
        .bind(order_index)
        .execute(&self.pool)
        .await
        .map_err(db)?;

        let id = lesson_id_from_i64(res.last_insert_rowid())?;
        lesson.into_lesson(id, order_index)
    }

    async fn update_lesson(&self, lesson: &Lesson) -> Result<(), StorageError> {
        let res = sqlx::query(
            r"
            UPDATE lessons
            SET title = ?2, description = ?3, thumbnail_path = ?4
            WHERE id = ?1
            ",
        )
        .bind(lesson_id_to_i64(lesson.id())?)
        .bind(lesson.title())
        .bind(lesson.description())
        .bind(lesson.thumbnail_path())
        .execute(&self.pool)
        .await
        .map_err(db)?;

        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }

    async fn delete_lesson(&self, id: LessonId) -> Result<(), StorageError> {
        let res = sqlx::query("DELETE FROM lessons WHERE id = ?1")
            .bind(lesson_id_to_i64(id)?)
            .execute(&self.pool)
            .await
            .map_err(db)?;

        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }

    async fn get_lesson(&self, id: LessonId) -> Result<Option<Lesson>, StorageError> {
        let sql = format!("SELECT {LESSON_COLUMNS} FROM lessons WHERE id = ?1");
        let row = sqlx::query(&sql)
            .bind(lesson_id_to_i64(id)?)
            .fetch_optional(&self.pool)
            .await
            .map_err(db)?;

        row.as_ref().map(map_lesson_row).transpose()
    }

    async fn list_lessons(&self, course_id: CourseId) -> Result<Vec<Lesson>, StorageError> {
        let sql = format!(
            "SELECT {LESSON_COLUMNS} FROM lessons WHERE course_id = ?1 ORDER BY order_index ASC, id ASC"
        );
        let rows = sqlx::query(&sql)
            .bind(course_id_to_i64(course_id)?)
            .fetch_all(&self.pool)
            .await
            .map_err(db)?;

        rows.iter().map(map_lesson_row).collect()
    }

    async fn list_all_lessons(&self) -> Result<Vec<Lesson>, StorageError> {
        let sql = format!(
            "SELECT {LESSON_COLUMNS} FROM lessons ORDER BY course_id ASC, order_index ASC, id ASC"
        );
        let rows = sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(db)?;

        rows.iter().map(map_lesson_row).collect()
    }

    async fn set_lesson_thumbnail(
        &self,
        id: LessonId,
        thumbnail_path: Option<&str>,
    ) -> Result<(), StorageError> {
        let res = sqlx::query("UPDATE lessons SET thumbnail_path = ?2 WHERE id = ?1")
            .bind(lesson_id_to_i64(id)?)
            .bind(thumbnail_path)
            .execute(&self.pool)
            .await
            .map_err(db)?;

        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }
}
