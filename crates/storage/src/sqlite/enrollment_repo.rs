use course_core::model::{CourseId, Enrollment, ProgressState, UserId};

use super::SqliteRepository;
use super::mapping::{course_id_to_i64, db, lesson_id_to_i64, map_enrollment_row};
use crate::repository::{EnrollmentRepository, StorageError};

#[async_trait::async_trait]
impl EnrollmentRepository for SqliteRepository {
    async fn enroll(
        &self,
        enrollment: &Enrollment,
        initial: Option<ProgressState>,
    ) -> Result<bool, StorageError> {
        let course_id = course_id_to_i64(enrollment.course_id)?;

        let mut tx = self.pool.begin().await.map_err(db)?;

        let inserted = sqlx::query(
            r"
            INSERT INTO enrollments (user_id, course_id, enrolled_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(user_id, course_id) DO NOTHING
            ",
        )
        .bind(enrollment.user_id.as_str())
        .bind(course_id)
        .bind(enrollment.enrolled_at)
        .execute(&mut *tx)
        .await
        .map_err(db)?;

        if let Some(initial) = initial {
            let current = initial.current_lesson_id.map(lesson_id_to_i64).transpose()?;
            sqlx::query(
                r"
                INSERT INTO course_progress (user_id, course_id, current_lesson_id, completion_percent)
                VALUES (?1, ?2, ?3, ?4)
                ON CONFLICT(user_id, course_id) DO NOTHING
                ",
            )
            .bind(enrollment.user_id.as_str())
            .bind(course_id)
            .bind(current)
            .bind(i64::from(initial.completion_percent))
            .execute(&mut *tx)
            .await
            .map_err(db)?;
        }

        tx.commit().await.map_err(db)?;
        Ok(inserted.rows_affected() == 1)
    }

    async fn is_enrolled(
        &self,
        user_id: &UserId,
        course_id: CourseId,
    ) -> Result<bool, StorageError> {
        let row = sqlx::query("SELECT 1 FROM enrollments WHERE user_id = ?1 AND course_id = ?2")
            .bind(user_id.as_str())
            .bind(course_id_to_i64(course_id)?)
            .fetch_optional(&self.pool)
            .await
            .map_err(db)?;
        Ok(row.is_some())
    }

    async fn list_enrollments(&self, user_id: &UserId) -> Result<Vec<Enrollment>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT user_id, course_id, enrolled_at
            FROM enrollments
            WHERE user_id = ?1
            ORDER BY enrolled_at ASC, course_id ASC
            ",
        )
        .bind(user_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(db)?;

        rows.iter().map(map_enrollment_row).collect()
    }
}
