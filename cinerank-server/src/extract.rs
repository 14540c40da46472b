//! Request extractors shared by the handlers.

use axum::{extract::FromRequestParts, http::request::Parts};
use uuid::Uuid;

use crate::errors::AppError;

/// Header carrying the authenticated user's id, set by the upstream gateway.
pub const USER_ID_HEADER: &str = "x-user-id";

/// The user a request acts for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthenticatedOwner(pub Uuid);

impl<S> FromRequestParts<S> for AuthenticatedOwner
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError::unauthorized("Unauthorized - Please sign in"))?;

        Uuid::parse_str(raw.trim())
            .map(Self)
            .map_err(|_| AppError::unauthorized("Unauthorized - invalid user id"))
    }
}
