use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::course::Difficulty;
use crate::model::ids::UserId;

pub const MIN_DAILY_MINUTES: u32 = 5;
pub const MAX_DAILY_MINUTES: u32 = 180;
pub const DEFAULT_DAILY_MINUTES: u32 = 20;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ProfileError {
    #[error("target daily minutes must be between {MIN_DAILY_MINUTES} and {MAX_DAILY_MINUTES}, got {0}")]
    InvalidDailyMinutes(u32),
}

impl ProfileError {
    #[must_use]
    pub fn field(&self) -> &'static str {
        match self {
            ProfileError::InvalidDailyMinutes(_) => "target_daily_minutes",
        }
    }
}

/// Playback and notification flags stored inline with the profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserPreferences {
    pub target_daily_study_minutes: u32,
    pub auto_complete_lesson_after_watch: bool,
    pub play_next_automatically: bool,
    pub email_progress_summaries: bool,
}

impl Default for UserPreferences {
    fn default() -> Self {
        Self {
            target_daily_study_minutes: DEFAULT_DAILY_MINUTES,
            auto_complete_lesson_after_watch: true,
            play_next_automatically: false,
            email_progress_summaries: false,
        }
    }
}

/// Unvalidated profile input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct ProfileDraft {
    pub target_daily_minutes: u32,
    #[serde(default)]
    pub preferred_difficulty: Difficulty,
    #[serde(default)]
    pub preferences: UserPreferences,
}

impl ProfileDraft {
    /// Validate the draft into a profile for `user_id`.
    ///
    /// # Errors
    ///
    /// Returns `ProfileError::InvalidDailyMinutes` if the target is outside 5..=180.
    pub fn validate(self, user_id: UserId) -> Result<UserProfile, ProfileError> {
        if !(MIN_DAILY_MINUTES..=MAX_DAILY_MINUTES).contains(&self.target_daily_minutes) {
            return Err(ProfileError::InvalidDailyMinutes(self.target_daily_minutes));
        }
        Ok(UserProfile {
            user_id,
            target_daily_minutes: self.target_daily_minutes,
            preferred_difficulty: self.preferred_difficulty,
            preferences: self.preferences,
        })
    }
}

/// Per-user learning preferences. Created lazily on first view or save.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserProfile {
    user_id: UserId,
    target_daily_minutes: u32,
    preferred_difficulty: Difficulty,
    preferences: UserPreferences,
}

impl UserProfile {
    /// The profile a user sees before saving anything.
    #[must_use]
    pub fn default_for(user_id: UserId) -> Self {
        Self {
            user_id,
            target_daily_minutes: DEFAULT_DAILY_MINUTES,
            preferred_difficulty: Difficulty::default(),
            preferences: UserPreferences::default(),
        }
    }

    #[must_use]
    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    #[must_use]
    pub fn target_daily_minutes(&self) -> u32 {
        self.target_daily_minutes
    }

    #[must_use]
    pub fn preferred_difficulty(&self) -> Difficulty {
        self.preferred_difficulty
    }

    #[must_use]
    pub fn preferences(&self) -> &UserPreferences {
        &self.preferences
    }
}
