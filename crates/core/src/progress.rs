//! Pointer-based course progress.
//!
//! A learner's position in a course is a single pointer to the next lesson to
//! watch. Everything strictly before the pointer (in order-index order) counts
//! as completed; a missing pointer means the whole course is done. There is no
//! per-lesson completed flag.

use thiserror::Error;

use crate::model::{Lesson, LessonId, ProgressState};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum TrackError {
    #[error("lesson {0} is not part of the ordered lesson list")]
    LessonNotInCourse(LessonId),
}

/// `round(100 * completed / max(total, 1))`, rounding halves to even.
#[must_use]
pub fn completion_percent(completed: usize, total: usize) -> u8 {
    let total = total.max(1);
    let completed = completed.min(total);
    let scaled = completed * 100;
    let quotient = scaled / total;
    let remainder = scaled % total;

    let rounded = match (remainder * 2).cmp(&total) {
        std::cmp::Ordering::Less => quotient,
        std::cmp::Ordering::Greater => quotient + 1,
        std::cmp::Ordering::Equal => quotient + (quotient % 2),
    };
    // completed <= total keeps this within 0..=100
    u8::try_from(rounded).unwrap_or(100)
}

/// Progress for a learner who has just enrolled: pointer at the first lesson, 0%.
///
/// A course without lessons has no starting point, so there is no state to
/// store: a `None` pointer would read as "course finished".
///
/// `ordered` must already be in course order.
#[must_use]
pub fn initial_state(ordered: &[Lesson]) -> Option<ProgressState> {
    ordered.first().map(|first| ProgressState {
        current_lesson_id: Some(first.id()),
        completion_percent: 0,
    })
}

/// Recompute progress after `completed` has been watched to the end.
///
/// The pointer moves to the first lesson whose order index is strictly greater
/// than the completed one's, and everything before that pointer counts as done.
/// Completing an earlier lesson therefore moves the pointer backwards.
///
/// `ordered` must already be in course order.
///
/// # Errors
///
/// Returns `TrackError::LessonNotInCourse` if `completed` is not in `ordered`.
pub fn advance_past(ordered: &[Lesson], completed: LessonId) -> Result<ProgressState, TrackError> {
    let done = ordered
        .iter()
        .find(|l| l.id() == completed)
        .ok_or(TrackError::LessonNotInCourse(completed))?;

    let next_position = ordered
        .iter()
        .position(|l| l.order_index() > done.order_index());

    let (current_lesson_id, completed_count) = match next_position {
        Some(idx) => (Some(ordered[idx].id()), idx),
        None => (None, ordered.len()),
    };

    Ok(ProgressState {
        current_lesson_id,
        completion_percent: completion_percent(completed_count, ordered.len()),
    })
}

/// 1-based position of `lesson_id` within `ordered`.
#[must_use]
pub fn lesson_position(ordered: &[Lesson], lesson_id: LessonId) -> Option<usize> {
    ordered
        .iter()
        .position(|l| l.id() == lesson_id)
        .map(|idx| idx + 1)
}

/// Whether `lesson_id` lies before the learner's pointer.
///
/// A `None` pointer means the course is finished, so every lesson is completed.
/// A pointer that no longer matches any lesson completes nothing.
#[must_use]
pub fn is_lesson_completed(
    ordered: &[Lesson],
    lesson_id: LessonId,
    pointer: Option<LessonId>,
) -> bool {
    let Some(pointer) = pointer else {
        return true;
    };
    match (
        lesson_position(ordered, lesson_id),
        lesson_position(ordered, pointer),
    ) {
        (Some(lesson), Some(pointer)) => pointer > lesson,
        _ => false,
    }
}
