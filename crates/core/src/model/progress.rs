use serde::Serialize;
use thiserror::Error;

use crate::model::ids::{CourseId, LessonId, UserId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ProgressError {
    #[error("completion percent must be between 0 and 100, got {0}")]
    InvalidPercent(i64),
}

/// Pointer and percentage derived from a learner's position in a course.
///
/// `current_lesson_id == None` means every lesson has been completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProgressState {
    pub current_lesson_id: Option<LessonId>,
    pub completion_percent: u8,
}

impl ProgressState {
    #[must_use]
    pub fn is_course_complete(&self) -> bool {
        self.current_lesson_id.is_none()
    }
}

/// One row per (user, course): where the learner is and how far along.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CourseProgress {
    user_id: UserId,
    course_id: CourseId,
    state: ProgressState,
}

impl CourseProgress {
    #[must_use]
    pub fn new(user_id: UserId, course_id: CourseId, state: ProgressState) -> Self {
        Self {
            user_id,
            course_id,
            state,
        }
    }

    /// Rebuild from stored columns.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::InvalidPercent` if the stored percent is outside 0..=100.
    pub fn from_persisted(
        user_id: UserId,
        course_id: CourseId,
        current_lesson_id: Option<LessonId>,
        completion_percent: i64,
    ) -> Result<Self, ProgressError> {
        let completion_percent = u8::try_from(completion_percent)
            .ok()
            .filter(|p| *p <= 100)
            .ok_or(ProgressError::InvalidPercent(completion_percent))?;
        Ok(Self::new(
            user_id,
            course_id,
            ProgressState {
                current_lesson_id,
                completion_percent,
            },
        ))
    }

    #[must_use]
    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    #[must_use]
    pub fn course_id(&self) -> CourseId {
        self.course_id
    }

    #[must_use]
    pub fn state(&self) -> ProgressState {
        self.state
    }

    #[must_use]
    pub fn current_lesson_id(&self) -> Option<LessonId> {
        self.state.current_lesson_id
    }

    #[must_use]
    pub fn completion_percent(&self) -> u8 {
        self.state.completion_percent
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_persisted_rejects_out_of_range_percent() {
        let user = UserId::new("u1").unwrap();
        let err = CourseProgress::from_persisted(user.clone(), CourseId::new(1), None, 101)
            .unwrap_err();
        assert_eq!(err, ProgressError::InvalidPercent(101));
        assert!(CourseProgress::from_persisted(user, CourseId::new(1), None, -1).is_err());
    }

    #[test]
    fn null_pointer_means_complete() {
        let progress = CourseProgress::from_persisted(
            UserId::new("u1").unwrap(),
            CourseId::new(1),
            None,
            100,
        )
        .unwrap();
        assert!(progress.state().is_course_complete());
        assert_eq!(progress.completion_percent(), 100);
    }
}
