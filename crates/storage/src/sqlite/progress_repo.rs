use chrono::{DateTime, Utc};
use course_core::model::{CourseId, CourseProgress, UserId};

use super::SqliteRepository;
use super::mapping::{course_id_to_i64, db, lesson_id_to_i64, map_progress_row};
use crate::repository::{ProgressRepository, StorageError};

#[async_trait::async_trait]
impl ProgressRepository for SqliteRepository {
    async fn get_progress(
        &self,
        user_id: &UserId,
        course_id: CourseId,
    ) -> Result<Option<CourseProgress>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT user_id, course_id, current_lesson_id, completion_percent
            FROM course_progress
            WHERE user_id = ?1 AND course_id = ?2
            ",
        )
        .bind(user_id.as_str())
        .bind(course_id_to_i64(course_id)?)
        .fetch_optional(&self.pool)
        .await
        .map_err(db)?;

        row.as_ref().map(map_progress_row).transpose()
    }

    async fn list_progress(&self, user_id: &UserId) -> Result<Vec<CourseProgress>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT user_id, course_id, current_lesson_id, completion_percent
            FROM course_progress
            WHERE user_id = ?1
            ORDER BY course_id ASC
            ",
        )
        .bind(user_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(db)?;

        rows.iter().map(map_progress_row).collect()
    }

    async fn save_progress(
        &self,
        progress: &CourseProgress,
        enrolled_at: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        let course_id = course_id_to_i64(progress.course_id())?;
        let current = progress
            .current_lesson_id()
            .map(lesson_id_to_i64)
            .transpose()?;

        let mut tx = self.pool.begin().await.map_err(db)?;

        sqlx::query(
            r"
            INSERT INTO enrollments (user_id, course_id, enrolled_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(user_id, course_id) DO NOTHING
            ",
        )
        .bind(progress.user_id().as_str())
        .bind(course_id)
        .bind(enrolled_at)
        .execute(&mut *tx)
        .await
        .map_err(db)?;

        sqlx::query(
            r"
            INSERT INTO course_progress (user_id, course_id, current_lesson_id, completion_percent)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(user_id, course_id) DO UPDATE SET
                current_lesson_id = excluded.current_lesson_id,
                completion_percent = excluded.completion_percent
            ",
        )
        .bind(progress.user_id().as_str())
        .bind(course_id)
        .bind(current)
        .bind(i64::from(progress.completion_percent()))
        .execute(&mut *tx)
        .await
        .map_err(db)?;

        tx.commit().await.map_err(db)?;
        Ok(())
    }

    async fn clear_progress(&self, user_id: &UserId) -> Result<u64, StorageError> {
        let res = sqlx::query("DELETE FROM course_progress WHERE user_id = ?1")
            .bind(user_id.as_str())
            .execute(&self.pool)
            .await
            .map_err(db)?;
        Ok(res.rows_affected())
    }
}
