use thiserror::Error;

use crate::model::{CourseError, LessonError, MediaValidationError, ProfileError, ProgressError};
use crate::progress::TrackError;

/// Any domain validation failure.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Course(#[from] CourseError),
    #[error(transparent)]
    Lesson(#[from] LessonError),
    #[error(transparent)]
    MediaValidation(#[from] MediaValidationError),
    #[error(transparent)]
    Profile(#[from] ProfileError),
    #[error(transparent)]
    Progress(#[from] ProgressError),
    #[error(transparent)]
    Track(#[from] TrackError),
}

impl Error {
    /// Form field the failure belongs to.
    #[must_use]
    pub fn field(&self) -> &'static str {
        match self {
            Error::Course(e) => e.field(),
            Error::Lesson(e) => e.field(),
            Error::MediaValidation(e) => e.field(),
            Error::Profile(e) => e.field(),
            Error::Progress(_) => "completion_percent",
            Error::Track(_) => "lesson_id",
        }
    }
}
