mod course;
mod enrollment;
mod ids;
mod lesson;
pub mod media;
mod profile;
mod progress;

pub use ids::{CourseId, LessonId, ParseIdError, UserId};

pub use course::{Course, CourseError, Difficulty, MAX_DESCRIPTION_LEN, MAX_TITLE_LEN};
pub use enrollment::Enrollment;
pub use lesson::{Lesson, LessonDraft, LessonError, MAX_THUMBNAIL_PATH_LEN, sort_by_order};
pub use media::{MediaValidationError, UploadKind, UploadLimits};
pub use profile::{ProfileDraft, ProfileError, UserPreferences, UserProfile};
pub use progress::{CourseProgress, ProgressError, ProgressState};
