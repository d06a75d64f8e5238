use course_core::model::{UserId, UserProfile};

use super::SqliteRepository;
use super::mapping::{db, map_profile_row};
use crate::repository::{ProfileRepository, StorageError};

#[async_trait::async_trait]
impl ProfileRepository for SqliteRepository {
    async fn get_profile(&self, user_id: &UserId) -> Result<Option<UserProfile>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT user_id, target_daily_minutes, preferred_difficulty,
                   pref_target_daily_study_minutes, pref_auto_complete_lesson_after_watch,
                   pref_play_next_automatically, pref_email_progress_summaries
            FROM user_profiles
            WHERE user_id = ?1
            ",
        )
        .bind(user_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(db)?;

        row.as_ref().map(map_profile_row).transpose()
    }

    async fn save_profile(&self, profile: &UserProfile) -> Result<(), StorageError> {
        let prefs = profile.preferences();
        sqlx::query(
            r"
            INSERT INTO user_profiles (
                user_id, target_daily_minutes, preferred_difficulty,
                pref_target_daily_study_minutes, pref_auto_complete_lesson_after_watch,
                pref_play_next_automatically, pref_email_progress_summaries
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT(user_id) DO UPDATE SET
                target_daily_minutes = excluded.target_daily_minutes,
                preferred_difficulty = excluded.preferred_difficulty,
                pref_target_daily_study_minutes = excluded.pref_target_daily_study_minutes,
                pref_auto_complete_lesson_after_watch = excluded.pref_auto_complete_lesson_after_watch,
                pref_play_next_automatically = excluded.pref_play_next_automatically,
                pref_email_progress_summaries = excluded.pref_email_progress_summaries
            ",
        )
        .bind(profile.user_id().as_str())
        .bind(i64::from(profile.target_daily_minutes()))
        .bind(profile.preferred_difficulty().as_i64())
        .bind(i64::from(prefs.target_daily_study_minutes))
        .bind(prefs.auto_complete_lesson_after_watch)
        .bind(prefs.play_next_automatically)
        .bind(prefs.email_progress_summaries)
        .execute(&self.pool)
        .await
        .map_err(db)?;
        Ok(())
    }
}
