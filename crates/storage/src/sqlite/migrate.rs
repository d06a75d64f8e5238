use chrono::Utc;
use sqlx::SqlitePool;

use super::SqliteInitError;

/// Runs versioned migrations, each inside its own transaction.
///
/// Version 1 creates courses, lessons, enrollments, progress and profiles.
#[allow(clippy::too_many_lines)]
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), SqliteInitError> {
    async fn is_applied(pool: &SqlitePool, version: i64) -> Result<bool, sqlx::Error> {
        let row = sqlx::query("SELECT 1 FROM schema_migrations WHERE version = ?1")
            .bind(version)
            .fetch_optional(pool)
            .await?;
        Ok(row.is_some())
    }

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            );
            ",
    )
    .execute(pool)
    .await?;

    // Version 1: full schema.
    if !is_applied(pool, 1).await? {
        let mut tx = pool.begin().await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS courses (
                    id INTEGER PRIMARY KEY,
                    title TEXT NOT NULL CHECK (length(title) <= 200),
                    description TEXT CHECK (description IS NULL OR length(description) <= 2000),
                    difficulty INTEGER NOT NULL CHECK (difficulty BETWEEN 0 AND 2),
                    thumbnail_path TEXT,
                    created_at TEXT NOT NULL
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS lessons (
                    id INTEGER PRIMARY KEY,
                    course_id INTEGER NOT NULL,
                    title TEXT NOT NULL CHECK (length(title) <= 200),
                    description TEXT CHECK (description IS NULL OR length(description) <= 2000),
                    video_path TEXT NOT NULL,
                    thumbnail_path TEXT CHECK (thumbnail_path IS NULL OR length(thumbnail_path) <= 500),
                    order_index INTEGER NOT NULL,
                    UNIQUE (course_id, order_index),
                    FOREIGN KEY (course_id) REFERENCES courses(id) ON DELETE CASCADE
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS enrollments (
                    user_id TEXT NOT NULL,
                    course_id INTEGER NOT NULL,
                    enrolled_at TEXT NOT NULL,
                    PRIMARY KEY (user_id, course_id),
                    FOREIGN KEY (course_id) REFERENCES courses(id) ON DELETE CASCADE
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        // No foreign key on current_lesson_id: NULL is reserved for a finished course.
        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS course_progress (
                    user_id TEXT NOT NULL,
                    course_id INTEGER NOT NULL,
                    current_lesson_id INTEGER,
                    completion_percent INTEGER NOT NULL CHECK (completion_percent BETWEEN 0 AND 100),
                    PRIMARY KEY (user_id, course_id),
                    FOREIGN KEY (course_id) REFERENCES courses(id) ON DELETE CASCADE
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS user_profiles (
                    user_id TEXT PRIMARY KEY,
                    target_daily_minutes INTEGER NOT NULL CHECK (target_daily_minutes BETWEEN 5 AND 180),
                    preferred_difficulty INTEGER NOT NULL CHECK (preferred_difficulty BETWEEN 0 AND 2),
                    pref_target_daily_study_minutes INTEGER NOT NULL,
                    pref_auto_complete_lesson_after_watch INTEGER NOT NULL,
                    pref_play_next_automatically INTEGER NOT NULL,
                    pref_email_progress_summaries INTEGER NOT NULL
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_courses_difficulty_title
                    ON courses (difficulty, title);
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_enrollments_user
                    ON enrollments (user_id, enrolled_at);
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                INSERT INTO schema_migrations (version, applied_at)
                VALUES (?1, ?2)
                ON CONFLICT(version) DO NOTHING
            ",
        )
        .bind(1_i64)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
    }

    Ok(())
}
