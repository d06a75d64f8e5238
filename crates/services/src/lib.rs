#![forbid(unsafe_code)]

pub mod app_services;
pub mod catalog_service;
pub mod error;
pub mod feed_service;
pub mod media_store;
pub mod profile_service;
pub mod progress_service;
pub mod thumbnails;

pub use course_core::Clock;

pub use app_services::{AppServices, MediaSettings};
pub use catalog_service::{CatalogService, CourseDraft, CourseSummary, CourseWithLessons};
pub use error::{
    AppServicesError, CatalogError, ExtractError, FeedError, ProfileServiceError,
    ProgressServiceError, ThumbnailOverrideError, UploadError,
};
pub use feed_service::{CourseLessonItem, CourseView, LessonFeedService, LessonWatchView};
pub use media_store::{MediaStore, PendingUpload, StoredUpload};
pub use profile_service::{EnrollmentItem, ProfileOverview, ProfileService};
pub use progress_service::{EnrollmentOutcome, ProgressService};
pub use thumbnails::{FfmpegFrameExtractor, FrameExtractor, ThumbnailService};
