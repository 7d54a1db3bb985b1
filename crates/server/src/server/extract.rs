//! Bearer-token authentication extractor.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use common::ServiceError;

use super::error::ApiError;
use super::state::AppState;
use crate::store::User;

/// The account behind a verified `Authorization: Bearer <token>` header.
///
/// - no usable bearer token → 401
/// - invalid or expired token → 403
/// - token for a deleted account → 401
#[derive(Debug, Clone)]
pub struct AuthUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok());
        let token = bearer_token(header)
            .ok_or_else(|| ServiceError::Unauthorized("Access token required".into()))?;

        let claims = state.tokens.verify(token)?;

        let user = state
            .users
            .find_by_id(claims.user_id)
            .await
            .ok_or_else(|| ServiceError::Unauthorized("User not found".into()))?;
        Ok(AuthUser(user))
    }
}

/// Extract the token from a `Bearer <token>` header value.
fn bearer_token(header: Option<&str>) -> Option<&str> {
    let (scheme, token) = header?.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}
