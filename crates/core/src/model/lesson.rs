use serde::Serialize;
use thiserror::Error;

use crate::model::course::{MAX_DESCRIPTION_LEN, MAX_TITLE_LEN, normalize_optional};
use crate::model::ids::{CourseId, LessonId};
use crate::model::media::is_placeholder_thumbnail;

/// Maximum stored length of a lesson thumbnail path.
pub const MAX_THUMBNAIL_PATH_LEN: usize = 500;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum LessonError {
    #[error("lesson title cannot be empty")]
    EmptyTitle,

    #[error("lesson title must be at most {MAX_TITLE_LEN} characters")]
    TitleTooLong,

    #[error("lesson description must be at most {MAX_DESCRIPTION_LEN} characters")]
    DescriptionTooLong,

    #[error("a video file is required")]
    MissingVideo,

    #[error("thumbnail path must be at most {MAX_THUMBNAIL_PATH_LEN} characters")]
    ThumbnailPathTooLong,
}

impl LessonError {
    /// Form field the error belongs to.
    #[must_use]
    pub fn field(&self) -> &'static str {
        match self {
            LessonError::EmptyTitle | LessonError::TitleTooLong => "title",
            LessonError::DescriptionTooLong => "description",
            LessonError::MissingVideo => "video",
            LessonError::ThumbnailPathTooLong => "thumbnail",
        }
    }
}

//
// ─── DRAFT ─────────────────────────────────────────────────────────────────────
//

/// Instructor-supplied lesson metadata, before a video and position are attached.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LessonDraft {
    pub title: String,
    pub description: Option<String>,
}

impl LessonDraft {
    /// Validate title and description, returning the normalized pair.
    ///
    /// # Errors
    ///
    /// Returns `LessonError` for a blank or oversized title, or an oversized description.
    pub fn validate(self) -> Result<(String, Option<String>), LessonError> {
        let title = self.title.trim().to_owned();
        if title.is_empty() {
            return Err(LessonError::EmptyTitle);
        }
        if title.chars().count() > MAX_TITLE_LEN {
            return Err(LessonError::TitleTooLong);
        }
        let description = normalize_optional(self.description);
        if description
            .as_ref()
            .is_some_and(|d| d.chars().count() > MAX_DESCRIPTION_LEN)
        {
            return Err(LessonError::DescriptionTooLong);
        }
        Ok((title, description))
    }
}

//
// ─── LESSON ────────────────────────────────────────────────────────────────────
//

/// One video in a course's ordered sequence.
///
/// The video path never changes after creation; the thumbnail path may be
/// replaced when a frame is extracted from the video.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Lesson {
    id: LessonId,
    course_id: CourseId,
    title: String,
    description: Option<String>,
    video_path: String,
    thumbnail_path: Option<String>,
    order_index: i64,
}

impl Lesson {
    /// Creates a Lesson.
    ///
    /// # Errors
    ///
    /// Returns `LessonError` if the draft fails validation, the video path is
    /// empty, or the thumbnail path is too long.
    pub fn new(
        id: LessonId,
        course_id: CourseId,
        draft: LessonDraft,
        video_path: impl Into<String>,
        thumbnail_path: Option<String>,
        order_index: i64,
    ) -> Result<Self, LessonError> {
        let (title, description) = draft.validate()?;
        let video_path = video_path.into().trim().to_owned();
        if video_path.is_empty() {
            return Err(LessonError::MissingVideo);
        }
        let thumbnail_path = normalize_optional(thumbnail_path);
        check_thumbnail_len(thumbnail_path.as_deref())?;

        Ok(Self {
            id,
            course_id,
            title,
            description,
            video_path,
            thumbnail_path,
            order_index,
        })
    }

    /// Replace the thumbnail path.
    ///
    /// # Errors
    ///
    /// Returns `LessonError::ThumbnailPathTooLong` if the path exceeds the stored limit.
    pub fn set_thumbnail_path(&mut self, path: Option<String>) -> Result<(), LessonError> {
        let path = normalize_optional(path);
        check_thumbnail_len(path.as_deref())?;
        self.thumbnail_path = path;
        Ok(())
    }

    /// True when the lesson has no usable raster thumbnail yet.
    #[must_use]
    pub fn needs_thumbnail(&self) -> bool {
        is_placeholder_thumbnail(self.thumbnail_path.as_deref())
    }

    // Accessors
    #[must_use]
    pub fn id(&self) -> LessonId {
        self.id
    }

    #[must_use]
    pub fn course_id(&self) -> CourseId {
        self.course_id
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
    pub fn video_path(&self) -> &str {
        &self.video_path
    }

    #[must_use]
    pub fn thumbnail_path(&self) -> Option<&str> {
        self.thumbnail_path.as_deref()
    }

    #[must_use]
    pub fn order_index(&self) -> i64 {
        self.order_index
    }
}

fn check_thumbnail_len(path: Option<&str>) -> Result<(), LessonError> {
    if path.is_some_and(|p| p.chars().count() > MAX_THUMBNAIL_PATH_LEN) {
        return Err(LessonError::ThumbnailPathTooLong);
    }
    Ok(())
}

/// Sort lessons into course order (order index, then id for ties).
pub fn sort_by_order(lessons: &mut [Lesson]) {
    lessons.sort_by_key(|l| (l.order_index(), l.id()));
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
