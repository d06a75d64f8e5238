//! Shared error types for the services crate.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use course_core::model::{
    CourseError, CourseId, LessonError, LessonId, MediaValidationError, ProfileError, UploadKind,
};
use course_core::progress::TrackError;
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Errors from a single frame-extraction attempt.
///
/// These never leave `ThumbnailService::extract_thumbnail`; they are logged and
/// turned into "no thumbnail".
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ExtractError {
    #[error("failed to start frame extractor: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("frame extractor timed out after {0:?}")]
    TimedOut(Duration),
    #[error("frame extractor exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },
    #[error("frame extractor produced no file at {0}")]
    MissingOutput(PathBuf),
    #[error("video path is outside the media root: {0}")]
    UnresolvablePath(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Errors emitted by `MediaStore`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum UploadError {
    #[error(transparent)]
    Media(#[from] MediaValidationError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl UploadError {
    #[must_use]
    pub fn empty(kind: UploadKind) -> Self {
        UploadError::Media(MediaValidationError::Missing(kind))
    }
}

/// Errors emitted by `ProgressService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProgressServiceError {
    #[error("lesson {0} not found")]
    LessonNotFound(LessonId),
    #[error("course {0} not found")]
    CourseNotFound(CourseId),
    #[error(transparent)]
    Track(#[from] TrackError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `LessonFeedService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum FeedError {
    #[error("lesson {0} not found")]
    LessonNotFound(LessonId),
    #[error("course {0} not found")]
    CourseNotFound(CourseId),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `CatalogService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CatalogError {
    #[error("course {0} not found")]
    CourseNotFound(CourseId),
    #[error(transparent)]
    Course(#[from] CourseError),
    #[error(transparent)]
    Lesson(#[from] LessonError),
    #[error(transparent)]
    Upload(#[from] UploadError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `ProfileService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProfileServiceError {
    #[error(transparent)]
    Profile(#[from] ProfileError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted when replacing a lesson thumbnail with client-supplied image data.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ThumbnailOverrideError {
    #[error("lesson {0} not found")]
    LessonNotFound(LessonId),
    #[error("thumbnail payload is not valid base64")]
    InvalidEncoding,
    #[error(transparent)]
    Media(#[from] MediaValidationError),
    #[error(transparent)]
    Lesson(#[from] LessonError),
    #[error(transparent)]
    Upload(#[from] UploadError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("failed to prepare media root: {0}")]
    MediaRoot(#[from] std::io::Error),
}
