//! Request extractors.

use audit_common::{AppError, Caller};
use axum::{extract::FromRequestParts, http::request::Parts};

/// Authenticated caller extractor.
#[derive(Debug, Clone)]
pub struct AuthCaller(pub Caller);

impl<S> FromRequestParts<S> for AuthCaller
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // Set by caller_middleware
        parts
            .extensions
            .get::<Caller>()
            .cloned()
            .map(AuthCaller)
            .ok_or(AppError::Unauthorized)
    }
}
