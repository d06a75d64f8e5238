use axum::Json;
use axum::extract::State;

use course_core::model::{ProfileDraft, UserProfile};
use services::ProfileOverview;

use super::AppState;
use crate::auth::CurrentUser;
use crate::error::ApiError;

pub async fn show(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<ProfileOverview>, ApiError> {
    Ok(Json(state.services.profiles().overview(&user.id).await?))
}

pub async fn update(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(draft): Json<ProfileDraft>,
) -> Result<Json<UserProfile>, ApiError> {
    Ok(Json(state.services.profiles().save(&user.id, draft).await?))
}
