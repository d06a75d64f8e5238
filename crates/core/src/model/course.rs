use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::model::ids::CourseId;

/// Maximum length of a course or lesson title.
pub const MAX_TITLE_LEN: usize = 200;
/// Maximum length of a course or lesson description.
pub const MAX_DESCRIPTION_LEN: usize = 2000;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CourseError {
    #[error("course title cannot be empty")]
    EmptyTitle,

    #[error("course title must be at most {MAX_TITLE_LEN} characters")]
    TitleTooLong,

    #[error("course description must be at most {MAX_DESCRIPTION_LEN} characters")]
    DescriptionTooLong,

    #[error("unknown difficulty: {0}")]
    UnknownDifficulty(String),
}

impl CourseError {
    /// Form field the error belongs to.
    #[must_use]
    pub fn field(&self) -> &'static str {
        match self {
            CourseError::EmptyTitle | CourseError::TitleTooLong => "title",
            CourseError::DescriptionTooLong => "description",
            CourseError::UnknownDifficulty(_) => "difficulty",
        }
    }
}

//
// ─── DIFFICULTY ────────────────────────────────────────────────────────────────
//

/// Course level. Declaration order is the catalogue sort order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    #[default]
    Beginner,
    Intermediate,
    Advanced,
}

impl Difficulty {
    /// Storage encoding (0..=2).
    #[must_use]
    pub fn as_i64(self) -> i64 {
        match self {
            Difficulty::Beginner => 0,
            Difficulty::Intermediate => 1,
            Difficulty::Advanced => 2,
        }
    }

    #[must_use]
    pub fn from_i64(value: i64) -> Option<Self> {
        match value {
            0 => Some(Difficulty::Beginner),
            1 => Some(Difficulty::Intermediate),
            2 => Some(Difficulty::Advanced),
            _ => None,
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Difficulty::Beginner => "beginner",
            Difficulty::Intermediate => "intermediate",
            Difficulty::Advanced => "advanced",
        };
        f.write_str(label)
    }
}

impl FromStr for Difficulty {
    type Err = CourseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "beginner" | "0" => Ok(Difficulty::Beginner),
            "intermediate" | "1" => Ok(Difficulty::Intermediate),
            "advanced" | "2" => Ok(Difficulty::Advanced),
            other => Err(CourseError::UnknownDifficulty(other.to_owned())),
        }
    }
}

//
// ─── COURSE ────────────────────────────────────────────────────────────────────
//

/// A published video course. Lessons are loaded separately, ordered by index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Course {
    id: CourseId,
    title: String,
    description: Option<String>,
    difficulty: Difficulty,
    thumbnail_path: Option<String>,
    created_at: DateTime<Utc>,
}

impl Course {
    /// Creates a new Course.
    ///
    /// # Errors
    ///
    /// Returns `CourseError` if the title is blank or either text exceeds its limit.
    pub fn new(
        id: CourseId,
        title: impl Into<String>,
        description: Option<String>,
        difficulty: Difficulty,
        thumbnail_path: Option<String>,
        created_at: DateTime<Utc>,
    ) -> Result<Self, CourseError> {
        let title = title.into();
        let title = title.trim();
        if title.is_empty() {
            return Err(CourseError::EmptyTitle);
        }
        if title.chars().count() > MAX_TITLE_LEN {
            return Err(CourseError::TitleTooLong);
        }

        let description = normalize_optional(description);
        if description
            .as_ref()
            .is_some_and(|d| d.chars().count() > MAX_DESCRIPTION_LEN)
        {
            return Err(CourseError::DescriptionTooLong);
        }

        Ok(Self {
            id,
            title: title.to_owned(),
            description,
            difficulty,
            thumbnail_path: normalize_optional(thumbnail_path),
            created_at,
        })
    }

    /// Returns a copy with edited metadata, keeping id, thumbnail and creation time.
    ///
    /// # Errors
    ///
    /// Same validation as [`Course::new`].
    pub fn edited(
        &self,
        title: impl Into<String>,
        description: Option<String>,
        difficulty: Difficulty,
    ) -> Result<Self, CourseError> {
        Self::new(
            self.id,
            title,
            description,
            difficulty,
            self.thumbnail_path.clone(),
            self.created_at,
        )
    }

    // Accessors
    #[must_use]
    pub fn id(&self) -> CourseId {
        self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    #[must_use]
    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    #[must_use]
    pub fn thumbnail_path(&self) -> Option<&str> {
        self.thumbnail_path.as_deref()
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

pub(crate) fn normalize_optional(value: Option<String>) -> Option<String> {
    value
        .map(|val| val.trim().to_string())
        .filter(|val| !val.is_empty())
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
