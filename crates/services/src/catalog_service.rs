use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use course_core::model::{Course, CourseId, Difficulty, Lesson, LessonDraft, LessonError};
use storage::repository::{
    CourseRepository, LessonRepository, NewCourseRecord, NewLessonRecord, StorageError,
};

use crate::Clock;
use crate::error::CatalogError;
use crate::media_store::{MediaStore, StoredUpload};
use crate::thumbnails::ThumbnailService;

/// How many courses the home page shows.
pub const FEATURED_LIMIT: usize = 6;

/// Course metadata as submitted by an instructor.
#[derive(Debug, Clone, Default)]
pub struct CourseDraft {
    pub title: String,
    pub description: Option<String>,
    pub difficulty: Difficulty,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CourseSummary {
    pub course: Course,
    pub lesson_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CourseWithLessons {
    pub course: Course,
    pub lessons: Vec<Lesson>,
}

/// Instructor-facing course and lesson management plus the public catalogue.
#[derive(Clone)]
pub struct CatalogService {
    clock: Clock,
    courses: Arc<dyn CourseRepository>,
    lessons: Arc<dyn LessonRepository>,
    media: Arc<MediaStore>,
    thumbnails: Arc<ThumbnailService>,
}

impl CatalogService {
    #[must_use]
    pub fn new(
        clock: Clock,
        courses: Arc<dyn CourseRepository>,
        lessons: Arc<dyn LessonRepository>,
        media: Arc<MediaStore>,
        thumbnails: Arc<ThumbnailService>,
    ) -> Self {
        Self {
            clock,
            courses,
            lessons,
            media,
            thumbnails,
        }
    }

    /// Create a course with an optional, already validated thumbnail upload.
    ///
    /// The upload is deleted again if the course is rejected.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Course` for invalid metadata and
    /// `CatalogError::Storage` if the insert fails.
    pub async fn create_course(
        &self,
        draft: CourseDraft,
        thumbnail: Option<StoredUpload>,
    ) -> Result<Course, CatalogError> {
        let result = self.insert_course(draft, thumbnail.as_ref()).await;
        if let (Err(_), Some(upload)) = (&result, &thumbnail) {
            self.media.remove(upload).await;
        }
        result
    }

    async fn insert_course(
        &self,
        draft: CourseDraft,
        thumbnail: Option<&StoredUpload>,
    ) -> Result<Course, CatalogError> {
        let validated = Course::new(
            CourseId::new(0),
            draft.title,
            draft.description,
            draft.difficulty,
            thumbnail.map(|t| t.public_path.clone()),
            self.clock.now(),
        )?;
        let id = self
            .courses
            .insert_new_course(NewCourseRecord::from_course(&validated))
            .await?;
        let course = self
            .courses
            .get_course(id)
            .await?
            .ok_or(StorageError::NotFound)?;
        info!(course = %id, title = course.title(), "course created");
        Ok(course)
    }

    /// Edit title, description and difficulty. The thumbnail is kept.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::CourseNotFound` for an unknown course and
    /// `CatalogError::Course` for invalid metadata.
    pub async fn update_course(
        &self,
        course_id: CourseId,
        draft: CourseDraft,
    ) -> Result<Course, CatalogError> {
        let current = self.get_course(course_id).await?;
        let edited = current.edited(draft.title, draft.description, draft.difficulty)?;
        self.courses.update_course(&edited).await?;
        info!(course = %course_id, "course updated");
        Ok(edited)
    }

    /// Append a lesson to a course. The lesson is placed after the current last one.
    ///
    /// A thumbnail is extracted from the stored video before the insert; if
    /// that fails the lesson is created without one. The video file is deleted
    /// again if the lesson is rejected.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Lesson` when the video is missing or the metadata
    /// is invalid, `CatalogError::CourseNotFound` for an unknown course.
    pub async fn create_lesson(
        &self,
        course_id: CourseId,
        draft: LessonDraft,
        video: Option<StoredUpload>,
    ) -> Result<Lesson, CatalogError> {
        let Some(video) = video else {
            return Err(LessonError::MissingVideo.into());
        };
        let result = self.insert_lesson(course_id, draft, &video).await;
        if result.is_err() {
            self.media.remove(&video).await;
        }
        result
    }

    async fn insert_lesson(
        &self,
        course_id: CourseId,
        draft: LessonDraft,
        video: &StoredUpload,
    ) -> Result<Lesson, CatalogError> {
        let (title, description) = draft.validate()?;
        if self.courses.get_course(course_id).await?.is_none() {
            return Err(CatalogError::CourseNotFound(course_id));
        }

        let thumbnail_path = self.thumbnails.extract_thumbnail(&video.public_path).await;
        let appended = self
            .lessons
            .append_lesson(NewLessonRecord {
                course_id,
                title,
                description,
                video_path: video.public_path.clone(),
                thumbnail_path: thumbnail_path.clone(),
            })
            .await;
        let lesson = match appended {
            Ok(lesson) => lesson,
            Err(err) => {
                if let Some(thumbnail) = &thumbnail_path {
                    self.thumbnails.discard_thumbnail(thumbnail).await;
                }
                return Err(match err {
                    StorageError::NotFound => CatalogError::CourseNotFound(course_id),
                    other => other.into(),
                });
            }
        };

        info!(
            course = %course_id,
            lesson = %lesson.id(),
            order_index = lesson.order_index(),
            "lesson created"
        );
        Ok(lesson)
    }

    /// # Errors
    ///
    /// Returns `CatalogError::CourseNotFound` for an unknown course.
    pub async fn get_course(&self, course_id: CourseId) -> Result<Course, CatalogError> {
        self.courses
            .get_course(course_id)
            .await?
            .ok_or(CatalogError::CourseNotFound(course_id))
    }

    /// Courses ordered by difficulty then title, optionally for one level.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Storage` if repository access fails.
    pub async fn list_courses(
        &self,
        difficulty: Option<Difficulty>,
    ) -> Result<Vec<Course>, CatalogError> {
        Ok(self.courses.list_courses(difficulty).await?)
    }

    /// The first courses of the catalogue with their lesson counts.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Storage` if repository access fails.
    pub async fn featured(&self) -> Result<Vec<CourseSummary>, CatalogError> {
        let courses = self.courses.list_courses(None).await?;
        let mut featured = Vec::with_capacity(FEATURED_LIMIT);
        for course in courses.into_iter().take(FEATURED_LIMIT) {
            let lesson_count = self.lessons.list_lessons(course.id()).await?.len();
            featured.push(CourseSummary {
                course,
                lesson_count,
            });
        }
        Ok(featured)
    }

    /// Every course with its ordered lessons.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Storage` if repository access fails.
    pub async fn dashboard(&self) -> Result<Vec<CourseWithLessons>, CatalogError> {
        let courses = self.courses.list_courses(None).await?;
        let mut dashboard = Vec::with_capacity(courses.len());
        for course in courses {
            let lessons = self.lessons.list_lessons(course.id()).await?;
            dashboard.push(CourseWithLessons { course, lessons });
        }
        Ok(dashboard)
    }
}
