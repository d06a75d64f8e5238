//! Maintenance endpoints, mounted under `/dev` behind [`super::dev_only`].

use axum::Json;
use axum::extract::{Path, State};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::info;

use course_core::model::{CourseProgress, Lesson, LessonId, UserId};

use super::AppState;
use crate::error::ApiError;

fn user_id(raw: String) -> Result<UserId, ApiError> {
    UserId::new(raw).map_err(|e| ApiError::validation("user_id", e.to_string()))
}

pub async fn mark_complete(
    State(state): State<AppState>,
    Path((user, lesson_id)): Path<(String, LessonId)>,
) -> Result<Json<CourseProgress>, ApiError> {
    let user = user_id(user)?;
    info!(user = %user, lesson = %lesson_id, "dev: marking lesson complete");
    let progress = state
        .services
        .progress()
        .record_lesson_completion(&user, lesson_id)
        .await?;
    Ok(Json(progress))
}

pub async fn rebuild_thumbnails(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let rebuilt = state.services.thumbnails().rebuild_missing().await?;
    Ok(Json(json!({ "rebuilt": rebuilt })))
}

pub async fn clear_progress(
    State(state): State<AppState>,
    Path(user): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let user = user_id(user)?;
    let removed = state.services.progress().clear_progress(&user).await?;
    Ok(Json(json!({ "removed": removed })))
}

/// `image` is base64, optionally wrapped in a `data:` URL.
#[derive(Debug, Deserialize)]
pub struct ThumbnailOverride {
    image: String,
}

pub async fn override_thumbnail(
    State(state): State<AppState>,
    Path(lesson_id): Path<LessonId>,
    Json(body): Json<ThumbnailOverride>,
) -> Result<Json<Lesson>, ApiError> {
    let lesson = state
        .services
        .thumbnails()
        .store_override(lesson_id, &body.image)
        .await?;
    Ok(Json(lesson))
}
