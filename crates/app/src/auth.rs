//! Identity forwarded by the upstream auth provider.

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use course_core::model::UserId;

use crate::error::ApiError;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLES_HEADER: &str = "x-user-roles";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Instructor,
    User,
}

impl Role {
    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "instructor" => Some(Role::Instructor),
            "user" => Some(Role::User),
            _ => None,
        }
    }
}

/// The authenticated caller. Requests without `X-User-Id` are rejected with 401.
///
/// Use `Option<CurrentUser>` where identity is optional.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser {
    pub id: UserId,
    pub roles: Vec<Role>,
}

impl CurrentUser {
    #[must_use]
    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    /// # Errors
    ///
    /// Returns `ApiError::Forbidden` unless the caller is an instructor.
    pub fn require_instructor(&self) -> Result<(), ApiError> {
        if self.has_role(Role::Instructor) {
            Ok(())
        } else {
            Err(ApiError::Forbidden("instructor role required"))
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let id = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| UserId::new(v).ok())
            .ok_or(ApiError::Unauthorized)?;

        // unknown roles are ignored
        let roles = parts
            .headers
            .get(USER_ROLES_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.split(',').filter_map(Role::parse).collect())
            .unwrap_or_default();

        Ok(Self { id, roles })
    }
}
