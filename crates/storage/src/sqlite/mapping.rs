use course_core::model::{
    Course, CourseId, CourseProgress, Difficulty, Enrollment, Lesson, LessonDraft, LessonId,
    ProfileDraft, UserId, UserPreferences, UserProfile,
};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

/// Maps driver errors, turning constraint violations into domain-level storage errors.
pub(crate) fn db(e: sqlx::Error) -> StorageError {
    if let Some(db) = e.as_database_error() {
        if db.is_unique_violation() {
            return StorageError::Conflict;
        }
        if db.is_foreign_key_violation() {
            return StorageError::NotFound;
        }
    }
    StorageError::Connection(e.to_string())
}

fn i64_to_u64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

fn u64_to_i64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

pub(crate) fn course_id_from_i64(v: i64) -> Result<CourseId, StorageError> {
    Ok(CourseId::new(i64_to_u64("course_id", v)?))
}

pub(crate) fn course_id_to_i64(id: CourseId) -> Result<i64, StorageError> {
    u64_to_i64("course_id", id.value())
}

pub(crate) fn lesson_id_from_i64(v: i64) -> Result<LessonId, StorageError> {
    Ok(LessonId::new(i64_to_u64("lesson_id", v)?))
}

pub(crate) fn lesson_id_to_i64(id: LessonId) -> Result<i64, StorageError> {
    u64_to_i64("lesson_id", id.value())
}

pub(crate) fn user_id_from_str(v: String) -> Result<UserId, StorageError> {
    UserId::new(v).map_err(ser)
}

pub(crate) fn difficulty_from_i64(v: i64) -> Result<Difficulty, StorageError> {
    Difficulty::from_i64(v)
        .ok_or_else(|| StorageError::Serialization(format!("invalid difficulty: {v}")))
}

pub(crate) fn map_course_row(row: &SqliteRow) -> Result<Course, StorageError> {
    Course::new(
        course_id_from_i64(row.try_get("id").map_err(ser)?)?,
        row.try_get::<String, _>("title").map_err(ser)?,
        row.try_get("description").map_err(ser)?,
        difficulty_from_i64(row.try_get("difficulty").map_err(ser)?)?,
        row.try_get("thumbnail_path").map_err(ser)?,
        row.try_get("created_at").map_err(ser)?,
    )
    .map_err(ser)
}

pub(crate) fn map_lesson_row(row: &SqliteRow) -> Result<Lesson, StorageError> {
    Lesson::new(
        lesson_id_from_i64(row.try_get("id").map_err(ser)?)?,
        course_id_from_i64(row.try_get("course_id").map_err(ser)?)?,
        LessonDraft {
            title: row.try_get("title").map_err(ser)?,
            description: row.try_get("description").map_err(ser)?,
        },
        row.try_get::<String, _>("video_path").map_err(ser)?,
        row.try_get("thumbnail_path").map_err(ser)?,
        row.try_get("order_index").map_err(ser)?,
    )
    .map_err(ser)
}

pub(crate) fn map_enrollment_row(row: &SqliteRow) -> Result<Enrollment, StorageError> {
    Ok(Enrollment::new(
        user_id_from_str(row.try_get("user_id").map_err(ser)?)?,
        course_id_from_i64(row.try_get("course_id").map_err(ser)?)?,
        row.try_get("enrolled_at").map_err(ser)?,
    ))
}

pub(crate) fn map_progress_row(row: &SqliteRow) -> Result<CourseProgress, StorageError> {
    let current = row
        .try_get::<Option<i64>, _>("current_lesson_id")
        .map_err(ser)?
        .map(lesson_id_from_i64)
        .transpose()?;
    CourseProgress::from_persisted(
        user_id_from_str(row.try_get("user_id").map_err(ser)?)?,
        course_id_from_i64(row.try_get("course_id").map_err(ser)?)?,
        current,
        row.try_get("completion_percent").map_err(ser)?,
    )
    .map_err(ser)
}

fn minutes_from_i64(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) fn map_profile_row(row: &SqliteRow) -> Result<UserProfile, StorageError> {
    let user_id = user_id_from_str(row.try_get("user_id").map_err(ser)?)?;
    let preferences = UserPreferences {
        target_daily_study_minutes: minutes_from_i64(
            "pref_target_daily_study_minutes",
            row.try_get("pref_target_daily_study_minutes").map_err(ser)?,
        )?,
        auto_complete_lesson_after_watch: row
            .try_get("pref_auto_complete_lesson_after_watch")
            .map_err(ser)?,
        play_next_automatically: row.try_get("pref_play_next_automatically").map_err(ser)?,
        email_progress_summaries: row.try_get("pref_email_progress_summaries").map_err(ser)?,
    };
    ProfileDraft {
        target_daily_minutes: minutes_from_i64(
            "target_daily_minutes",
            row.try_get("target_daily_minutes").map_err(ser)?,
        )?,
        preferred_difficulty: difficulty_from_i64(row.try_get("preferred_difficulty").map_err(ser)?)?,
        preferences,
    }
    .validate(user_id)
    .map_err(ser)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_reject_negative_values() {
        assert!(course_id_from_i64(-1).is_err());
        assert_eq!(lesson_id_from_i64(7).unwrap(), LessonId::new(7));
        assert!(course_id_to_i64(CourseId::new(u64::MAX)).is_err());
    }

    #[test]
    fn difficulty_out_of_range_is_serialization_error() {
        assert!(matches!(
            difficulty_from_i64(9),
            Err(StorageError::Serialization(_))
        ));
    }
}
