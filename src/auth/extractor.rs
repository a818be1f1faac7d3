//! Axum extractors resolving the caller from a cookie or bearer token.
//!
//! The token is looked for in the `token` cookie first, then in an
//! `Authorization: Bearer` header. The decoded user id is resolved
//! against the identity store on every request.

use axum::extract::FromRequestParts;
use axum::http::HeaderMap;
use axum::http::header::{AUTHORIZATION, COOKIE};
use axum::http::request::Parts;
use cookie::Cookie;

use super::token::TOKEN_COOKIE;
use crate::app_state::AppState;
use crate::domain::User;
use crate::error::ApiError;

/// Any authenticated user.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

/// An authenticated user holding the DJ role. Rejects guests with 403.
#[derive(Debug, Clone)]
pub struct DjUser(pub User);

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = token_from_headers(&parts.headers)
            .ok_or_else(|| ApiError::Unauthorized("missing token".to_string()))?;
        let user_id = state.tokens.verify(&token)?;
        let user = state.user_service.find(user_id).await.ok_or_else(|| {
            tracing::debug!(%user_id, "token references unknown user");
            ApiError::Unauthorized("unknown user".to_string())
        })?;
        Ok(Self(user))
    }
}

impl FromRequestParts<AppState> for DjUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let CurrentUser(user) = CurrentUser::from_request_parts(parts, state).await?;
        if !user.is_dj() {
            return Err(ApiError::dj_only());
        }
        Ok(Self(user))
    }
}

/// Extracts the raw token, preferring the cookie over the header.
#[must_use]
pub fn token_from_headers(headers: &HeaderMap) -> Option<String> {
    let from_cookie = headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(Cookie::split_parse)
        .filter_map(Result::ok)
        .find(|c| c.name() == TOKEN_COOKIE && !c.value().is_empty())
        .map(|c| c.value().to_string());

    from_cookie.or_else(|| {
        headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .map(ToString::to_string)
    })
}
