//! HTTP mapping of service errors.

use axum::Json;
use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use tracing::error;

use services::{
    CatalogError, FeedError, ProfileServiceError, ProgressServiceError, ThumbnailOverrideError,
    UploadError,
};
use storage::repository::StorageError;

#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    Validation { field: &'static str, message: String },
    Conflict(String),
    Unauthorized,
    Forbidden(&'static str),
    Internal(String),
}

impl ApiError {
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Validation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        ApiError::Validation {
            field,
            message: message.into(),
        }
    }

    pub fn multipart(field: &'static str, err: &MultipartError) -> Self {
        ApiError::validation(field, err.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            ApiError::NotFound(message) | ApiError::Conflict(message) => json!({ "error": message }),
            ApiError::Validation { field, message } => json!({ "error": message, "field": field }),
            ApiError::Unauthorized => json!({ "error": "authentication required" }),
            ApiError::Forbidden(reason) => json!({ "error": reason }),
            ApiError::Internal(message) => {
                error!(error = %message, "request failed");
                json!({ "error": "internal server error" })
            }
        };
        (status, Json(body)).into_response()
    }
}

impl From<course_core::Error> for ApiError {
    fn from(err: course_core::Error) -> Self {
        ApiError::validation(err.field(), err.to_string())
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound => ApiError::NotFound("not found".into()),
            StorageError::Conflict => ApiError::Conflict(err.to_string()),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<UploadError> for ApiError {
    fn from(err: UploadError) -> Self {
        match err {
            UploadError::Media(e) => course_core::Error::from(e).into(),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<ProgressServiceError> for ApiError {
    fn from(err: ProgressServiceError) -> Self {
        match err {
            ProgressServiceError::LessonNotFound(_) | ProgressServiceError::CourseNotFound(_) => {
                ApiError::NotFound(err.to_string())
            }
            ProgressServiceError::Track(e) => course_core::Error::from(e).into(),
            ProgressServiceError::Storage(e) => e.into(),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<FeedError> for ApiError {
    fn from(err: FeedError) -> Self {
        match err {
            FeedError::LessonNotFound(_) | FeedError::CourseNotFound(_) => {
                ApiError::NotFound(err.to_string())
            }
            FeedError::Storage(e) => e.into(),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<CatalogError> for ApiError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::CourseNotFound(_) => ApiError::NotFound(err.to_string()),
            CatalogError::Course(e) => course_core::Error::from(e).into(),
            CatalogError::Lesson(e) => course_core::Error::from(e).into(),
            CatalogError::Upload(e) => e.into(),
            CatalogError::Storage(e) => e.into(),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<ProfileServiceError> for ApiError {
    fn from(err: ProfileServiceError) -> Self {
        match err {
            ProfileServiceError::Profile(e) => course_core::Error::from(e).into(),
            ProfileServiceError::Storage(e) => e.into(),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<ThumbnailOverrideError> for ApiError {
    fn from(err: ThumbnailOverrideError) -> Self {
        match err {
            ThumbnailOverrideError::LessonNotFound(_) => ApiError::NotFound(err.to_string()),
            ThumbnailOverrideError::InvalidEncoding => ApiError::validation("image", err.to_string()),
            ThumbnailOverrideError::Media(e) => course_core::Error::from(e).into(),
            ThumbnailOverrideError::Lesson(e) => course_core::Error::from(e).into(),
            ThumbnailOverrideError::Upload(e) => e.into(),
            ThumbnailOverrideError::Storage(e) => e.into(),
            other => ApiError::Internal(other.to_string()),
        }
    }
}
