//! Current user from headers set by the authentication layer in front of this service.

use crate::error::AppError;
use async_trait::async_trait;
use axum::{extract::FromRequestParts, http::request::Parts};
use uuid::Uuid;

pub const USER_ID_HEADER: &str = "X-User-Id";
pub const USER_EMAIL_HEADER: &str = "X-User-Email";

/// Authenticated user: id and email. Rejects with 401 when either header is missing or the id is not a UUID.
#[derive(Clone, Debug)]
pub struct CurrentUser {
    pub id: Uuid,
    pub email: String,
}

fn header(parts: &Parts, name: &str) -> Option<String> {
    parts
        .headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match (header(parts, USER_ID_HEADER), header(parts, USER_EMAIL_HEADER)) {
            (Some(id), Some(email)) => match Uuid::parse_str(&id) {
                Ok(id) => Ok(CurrentUser { id, email }),
                Err(_) => Err(AppError::Unauthorized(format!("Invalid user id: {}", id))),
            },
            _ => Err(AppError::Unauthorized(
                "You are not logged in! Please log in to get access.".into(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    async fn extract(id: &str) -> Result<CurrentUser, AppError> {
        let req = Request::builder()
            .header(USER_ID_HEADER, id)
            .header(USER_EMAIL_HEADER, "leo@example.com")
            .body(())
            .unwrap();
        let (mut parts, _) = req.into_parts();
        CurrentUser::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn uuid_user_id_is_accepted() {
        let user = extract("5c8a1d5b-0190-4f0b-8e6a-6c1b2d3e4f50").await.unwrap();
        assert_eq!(user.id.to_string(), "5c8a1d5b-0190-4f0b-8e6a-6c1b2d3e4f50");
        assert_eq!(user.email, "leo@example.com");
    }

    #[tokio::test]
    async fn non_uuid_user_id_is_unauthorized() {
        let err = extract("5c8a1d5b0190f0b8e6a6c1b2").await.unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }
}
