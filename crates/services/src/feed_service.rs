use std::sync::Arc;

use serde::Serialize;

use course_core::model::{Course, CourseId, Lesson, LessonId, ProgressState, UserId};
use course_core::progress::{is_lesson_completed, lesson_position};
use course_core::tips::generate_tips;
use storage::repository::{
    CourseRepository, EnrollmentRepository, LessonRepository, ProgressRepository,
};

use crate::error::FeedError;
use crate::thumbnails::ThumbnailService;

//
// ─── VIEWS ─────────────────────────────────────────────────────────────────────
//

/// Everything the watch page needs for one lesson.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LessonWatchView {
    pub lesson: Lesson,
    pub course_title: String,
    pub tips: Vec<String>,
    /// 1-based.
    pub position: usize,
    pub total_lessons: usize,
    pub completion_percent: u8,
    pub is_completed: bool,
    pub next_lesson_id: Option<LessonId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CourseLessonItem {
    pub lesson: Lesson,
    pub is_completed: bool,
}

/// A course with its ordered lessons, optionally seen through one learner's progress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CourseView {
    pub course: Course,
    pub lessons: Vec<CourseLessonItem>,
    pub enrolled: bool,
    pub progress: Option<ProgressState>,
}

//
// ─── SERVICE ───────────────────────────────────────────────────────────────────
//

/// Assembles lesson and course views, filling in missing thumbnails on the way.
#[derive(Clone)]
pub struct LessonFeedService {
    courses: Arc<dyn CourseRepository>,
    lessons: Arc<dyn LessonRepository>,
    enrollments: Arc<dyn EnrollmentRepository>,
    progress: Arc<dyn ProgressRepository>,
    thumbnails: Arc<ThumbnailService>,
}

impl LessonFeedService {
    #[must_use]
    pub fn new(
        courses: Arc<dyn CourseRepository>,
        lessons: Arc<dyn LessonRepository>,
        enrollments: Arc<dyn EnrollmentRepository>,
        progress: Arc<dyn ProgressRepository>,
        thumbnails: Arc<ThumbnailService>,
    ) -> Self {
        Self {
            courses,
            lessons,
            enrollments,
            progress,
            thumbnails,
        }
    }

    /// Build the watch view of `lesson_id` for `user_id`.
    ///
    /// `just_completed` forces `is_completed` right after a completion redirect.
    ///
    /// # Errors
    ///
    /// Returns `FeedError::LessonNotFound` for an unknown lesson and
    /// `FeedError::Storage` if repository access fails.
    pub async fn get_lesson_view(
        &self,
        user_id: &UserId,
        lesson_id: LessonId,
        just_completed: bool,
    ) -> Result<LessonWatchView, FeedError> {
        let mut lesson = self
            .lessons
            .get_lesson(lesson_id)
            .await?
            .ok_or(FeedError::LessonNotFound(lesson_id))?;
        self.thumbnails.ensure_lesson_thumbnail(&mut lesson).await;

        let course_id = lesson.course_id();
        let course = self
            .courses
            .get_course(course_id)
            .await?
            .ok_or(FeedError::CourseNotFound(course_id))?;
        let ordered = self.lessons.list_lessons(course_id).await?;
        let progress = self.progress.get_progress(user_id, course_id).await?;

        let position = lesson_position(&ordered, lesson_id).unwrap_or(1);
        let next_lesson_id = ordered.get(position).map(Lesson::id);
        let (completion_percent, stored_completed) = match &progress {
            Some(p) => (
                p.completion_percent(),
                is_lesson_completed(&ordered, lesson_id, p.current_lesson_id()),
            ),
            None => (0, false),
        };

        Ok(LessonWatchView {
            tips: generate_tips(lesson.title()),
            course_title: course.title().to_owned(),
            position,
            total_lessons: ordered.len(),
            completion_percent,
            is_completed: just_completed || stored_completed,
            next_lesson_id,
            lesson,
        })
    }

    /// Build the course page, generating thumbnails for lessons that lack one.
    ///
    /// Without a `viewer` the view carries no enrollment or progress.
    ///
    /// # Errors
    ///
    /// Returns `FeedError::CourseNotFound` for an unknown course and
    /// `FeedError::Storage` if repository access fails.
    pub async fn get_course_view(
        &self,
        course_id: CourseId,
        viewer: Option<&UserId>,
    ) -> Result<CourseView, FeedError> {
        let course = self
            .courses
            .get_course(course_id)
            .await?
            .ok_or(FeedError::CourseNotFound(course_id))?;

        let mut ordered = self.lessons.list_lessons(course_id).await?;
        for lesson in ordered.iter_mut().filter(|l| l.needs_thumbnail()) {
            self.thumbnails.ensure_lesson_thumbnail(lesson).await;
        }

        let (enrolled, progress) = match viewer {
            Some(user) => (
                self.enrollments.is_enrolled(user, course_id).await?,
                self.progress
                    .get_progress(user, course_id)
                    .await?
                    .map(|p| p.state()),
            ),
            None => (false, None),
        };

        let lessons = ordered
            .iter()
            .map(|lesson| CourseLessonItem {
                is_completed: progress.is_some_and(|p| {
                    is_lesson_completed(&ordered, lesson.id(), p.current_lesson_id)
                }),
                lesson: lesson.clone(),
            })
            .collect();

        Ok(CourseView {
            course,
            lessons,
            enrolled,
            progress,
        })
    }
}
