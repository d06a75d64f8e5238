use std::sync::Arc;

use serde::Serialize;

use course_core::model::{CourseId, CourseProgress, Enrollment, LessonId, UserId};
use course_core::progress::{advance_past, initial_state};
use storage::repository::{
    CourseRepository, EnrollmentRepository, LessonRepository, ProgressRepository,
};
use tracing::info;

use crate::Clock;
use crate::error::ProgressServiceError;

/// Result of an enrollment request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnrollmentOutcome {
    /// `false` when the learner was already enrolled.
    pub created: bool,
    pub progress: Option<CourseProgress>,
}

/// Records lesson completions and enrollments.
#[derive(Clone)]
pub struct ProgressService {
    clock: Clock,
    courses: Arc<dyn CourseRepository>,
    lessons: Arc<dyn LessonRepository>,
    enrollments: Arc<dyn EnrollmentRepository>,
    progress: Arc<dyn ProgressRepository>,
}

impl ProgressService {
    #[must_use]
    pub fn new(
        clock: Clock,
        courses: Arc<dyn CourseRepository>,
        lessons: Arc<dyn LessonRepository>,
        enrollments: Arc<dyn EnrollmentRepository>,
        progress: Arc<dyn ProgressRepository>,
    ) -> Self {
        Self {
            clock,
            courses,
            lessons,
            enrollments,
            progress,
        }
    }

    /// Mark `lesson_id` as watched to the end and move the learner's pointer past it.
    ///
    /// The learner is enrolled implicitly if needed. The new state is durable
    /// before this returns.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::LessonNotFound` for an unknown lesson and
    /// `ProgressServiceError::Storage` if persistence fails.
    pub async fn record_lesson_completion(
        &self,
        user_id: &UserId,
        lesson_id: LessonId,
    ) -> Result<CourseProgress, ProgressServiceError> {
        let lesson = self
            .lessons
            .get_lesson(lesson_id)
            .await?
            .ok_or(ProgressServiceError::LessonNotFound(lesson_id))?;

        let ordered = self.lessons.list_lessons(lesson.course_id()).await?;
        let state = advance_past(&ordered, lesson_id)?;
        let progress = CourseProgress::new(user_id.clone(), lesson.course_id(), state);

        // Concurrent completions for the same pair are last-write-wins.
        self.progress
            .save_progress(&progress, self.clock.now())
            .await?;

        info!(
            user = %user_id,
            course = %lesson.course_id(),
            lesson = %lesson_id,
            percent = state.completion_percent,
            "lesson completed"
        );
        Ok(progress)
    }

    /// Enroll a learner, creating initial progress at the first lesson when none exists.
    ///
    /// A course without lessons gets the enrollment only; progress appears on the
    /// first completion or on a later enroll once the course has lessons.
    /// Calling this again for the same pair is otherwise a no-op.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::CourseNotFound` for an unknown course.
    pub async fn enroll(
        &self,
        user_id: &UserId,
        course_id: CourseId,
    ) -> Result<EnrollmentOutcome, ProgressServiceError> {
        if self.courses.get_course(course_id).await?.is_none() {
            return Err(ProgressServiceError::CourseNotFound(course_id));
        }
        let ordered = self.lessons.list_lessons(course_id).await?;
        let enrollment = Enrollment::new(user_id.clone(), course_id, self.clock.now());
        let created = self
            .enrollments
            .enroll(&enrollment, initial_state(&ordered))
            .await?;

        if created {
            info!(user = %user_id, course = %course_id, "enrolled");
        }
        let progress = self.progress.get_progress(user_id, course_id).await?;
        Ok(EnrollmentOutcome { created, progress })
    }

    /// # Errors
    ///
    /// Returns `ProgressServiceError::Storage` if repository access fails.
    pub async fn get_progress(
        &self,
        user_id: &UserId,
        course_id: CourseId,
    ) -> Result<Option<CourseProgress>, ProgressServiceError> {
        Ok(self.progress.get_progress(user_id, course_id).await?)
    }

    /// Remove every progress row of a user. Enrollments are kept.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Storage` if repository access fails.
    pub async fn clear_progress(&self, user_id: &UserId) -> Result<u64, ProgressServiceError> {
        let removed = self.progress.clear_progress(user_id).await?;
        info!(user = %user_id, removed, "progress cleared");
        Ok(removed)
    }
}
