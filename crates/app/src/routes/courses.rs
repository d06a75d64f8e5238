use axum::Json;
use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use serde::Deserialize;

use course_core::model::{Course, CourseId, Difficulty, UploadKind};
use services::{CourseDraft, CourseSummary, CourseView, CourseWithLessons, EnrollmentOutcome};

use super::AppState;
use crate::auth::CurrentUser;
use crate::error::ApiError;
use crate::upload::{UploadForm, read_form};

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    level: Option<String>,
}

pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Course>>, ApiError> {
    let level = match query.level.as_deref().map(str::trim) {
        Some(raw) if !raw.is_empty() => {
            Some(raw.parse::<Difficulty>().map_err(course_core::Error::from)?)
        }
        _ => None,
    };
    Ok(Json(state.services.catalog().list_courses(level).await?))
}

pub async fn featured(State(state): State<AppState>) -> Result<Json<Vec<CourseSummary>>, ApiError> {
    Ok(Json(state.services.catalog().featured().await?))
}

pub async fn show(
    State(state): State<AppState>,
    Path(course_id): Path<CourseId>,
    user: Option<CurrentUser>,
) -> Result<Json<CourseView>, ApiError> {
    let viewer = user.as_ref().map(|u| &u.id);
    Ok(Json(
        state.services.feed().get_course_view(course_id, viewer).await?,
    ))
}

fn course_draft(form: &UploadForm) -> Result<CourseDraft, ApiError> {
    let difficulty = match form.optional_text("difficulty") {
        Some(raw) => raw.parse::<Difficulty>().map_err(course_core::Error::from)?,
        None => Difficulty::default(),
    };
    Ok(CourseDraft {
        title: form.text("title").unwrap_or_default().to_owned(),
        description: form.optional_text("description"),
        difficulty,
    })
}

/// Multipart: `title`, `description`, `difficulty`, optional `thumbnail` image.
pub async fn create(
    State(state): State<AppState>,
    user: CurrentUser,
    multipart: Multipart,
) -> Result<(StatusCode, Json<Course>), ApiError> {
    user.require_instructor()?;
    let media = state.services.media();
    let form = read_form(&media, UploadKind::Image, multipart).await?;
    let draft = match course_draft(&form) {
        Ok(draft) => draft,
        Err(err) => {
            if let Some(thumbnail) = &form.file {
                media.remove(thumbnail).await;
            }
            return Err(err);
        }
    };
    let course = state.services.catalog().create_course(draft, form.file).await?;
    Ok((StatusCode::CREATED, Json(course)))
}

#[derive(Debug, Deserialize)]
pub struct CourseUpdate {
    title: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    difficulty: Difficulty,
}

pub async fn update(
    State(state): State<AppState>,
    Path(course_id): Path<CourseId>,
    user: CurrentUser,
    Json(update): Json<CourseUpdate>,
) -> Result<Json<Course>, ApiError> {
    user.require_instructor()?;
    let draft = CourseDraft {
        title: update.title,
        description: update.description,
        difficulty: update.difficulty,
    };
    Ok(Json(
        state.services.catalog().update_course(course_id, draft).await?,
    ))
}

pub async fn enroll(
    State(state): State<AppState>,
    Path(course_id): Path<CourseId>,
    user: CurrentUser,
) -> Result<(StatusCode, Json<EnrollmentOutcome>), ApiError> {
    let outcome = state.services.progress().enroll(&user.id, course_id).await?;
    let status = if outcome.created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(outcome)))
}

pub async fn dashboard(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<Vec<CourseWithLessons>>, ApiError> {
    user.require_instructor()?;
    Ok(Json(state.services.catalog().dashboard().await?))
}
