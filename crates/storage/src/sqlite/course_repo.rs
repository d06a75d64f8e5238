use course_core::model::{Course, CourseId, Difficulty};

use super::SqliteRepository;
use super::mapping::{course_id_from_i64, course_id_to_i64, db, map_course_row};
use crate::repository::{CourseRepository, NewCourseRecord, StorageError};

const COURSE_COLUMNS: &str = "id, title, description, difficulty, thumbnail_path, created_at";

#[async_trait::async_trait]
impl CourseRepository for SqliteRepository {
    async fn insert_new_course(&self, course: NewCourseRecord) -> Result<CourseId, StorageError> {
        let res = sqlx::query(
            r"
            INSERT INTO courses (title, description, difficulty, thumbnail_path, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ",
        )
        .bind(course.title)
        .bind(course.description)
        .bind(course.difficulty.as_i64())
        .bind(course.thumbnail_path)
        .bind(course.created_at)
        .execute(&self.pool)
        .await
        .map_err(db)?;

        course_id_from_i64(res.last_insert_rowid())
    }

    async fn update_course(&self, course: &Course) -> Result<(), StorageError> {
        let res = sqlx::query(
            r"
            UPDATE courses
            SET title = ?2, description = ?3, difficulty = ?4, thumbnail_path = ?5
            WHERE id = ?1
            ",
        )
        .bind(course_id_to_i64(course.id())?)
        .bind(course.title())
        .bind(course.description())
        .bind(course.difficulty().as_i64())
        .bind(course.thumbnail_path())
        .execute(&self.pool)
        .await
        .map_err(db)?;

        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }

    async fn get_course(&self, id: CourseId) -> Result<Option<Course>, StorageError> {
        let sql = format!("SELECT {COURSE_COLUMNS} FROM courses WHERE id = ?1");
        let row = sqlx::query(&sql)
            .bind(course_id_to_i64(id)?)
            .fetch_optional(&self.pool)
            .await
            .map_err(db)?;

        row.as_ref().map(map_course_row).transpose()
    }

    async fn find_course_by_title(&self, title: &str) -> Result<Option<Course>, StorageError> {
        let sql = format!("SELECT {COURSE_COLUMNS} FROM courses WHERE title = ?1 ORDER BY id LIMIT 1");
        let row = sqlx::query(&sql)
            .bind(title)
            .fetch_optional(&self.pool)
            .await
            .map_err(db)?;

        row.as_ref().map(map_course_row).transpose()
    }

    async fn list_courses(
        &self,
        difficulty: Option<Difficulty>,
    ) -> Result<Vec<Course>, StorageError> {
        let sql = format!(
            r"
            SELECT {COURSE_COLUMNS}
            FROM courses
            WHERE ?1 IS NULL OR difficulty = ?1
            ORDER BY difficulty ASC, title ASC, id ASC
            "
        );
        let rows = sqlx::query(&sql)
            .bind(difficulty.map(Difficulty::as_i64))
            .fetch_all(&self.pool)
            .await
            .map_err(db)?;

        rows.iter().map(map_course_row).collect()
    }
}
