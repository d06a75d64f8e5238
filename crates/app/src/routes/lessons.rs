use axum::Json;
use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::response::Redirect;
use serde::Deserialize;

use course_core::model::{CourseId, Lesson, LessonDraft, LessonId, UploadKind};
use services::LessonWatchView;

use super::AppState;
use crate::auth::CurrentUser;
use crate::error::ApiError;
use crate::upload::read_form;

/// Multipart: `title`, `description`, required `video`.
pub async fn create(
    State(state): State<AppState>,
    Path(course_id): Path<CourseId>,
    user: CurrentUser,
    multipart: Multipart,
) -> Result<(StatusCode, Json<Lesson>), ApiError> {
    user.require_instructor()?;
    let form = read_form(&state.services.media(), UploadKind::Video, multipart).await?;
    let draft = LessonDraft {
        title: form.text("title").unwrap_or_default().to_owned(),
        description: form.optional_text("description"),
    };
    let lesson = state
        .services
        .catalog()
        .create_lesson(course_id, draft, form.file)
        .await?;
    Ok((StatusCode::CREATED, Json(lesson)))
}

#[derive(Debug, Default, Deserialize)]
pub struct WatchQuery {
    #[serde(default)]
    just_completed: bool,
}

pub async fn watch(
    State(state): State<AppState>,
    Path(lesson_id): Path<LessonId>,
    Query(query): Query<WatchQuery>,
    user: CurrentUser,
) -> Result<Json<LessonWatchView>, ApiError> {
    let view = state
        .services
        .feed()
        .get_lesson_view(&user.id, lesson_id, query.just_completed)
        .await?;
    Ok(Json(view))
}

/// Records the completion, then sends the client back to the lesson view.
pub async fn complete(
    State(state): State<AppState>,
    Path(lesson_id): Path<LessonId>,
    user: CurrentUser,
) -> Result<Redirect, ApiError> {
    state
        .services
        .progress()
        .record_lesson_completion(&user.id, lesson_id)
        .await?;
    Ok(Redirect::to(&format!(
        "/api/lessons/{lesson_id}?just_completed=true"
    )))
}
