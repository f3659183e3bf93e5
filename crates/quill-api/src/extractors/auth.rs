//! `AuthUser` extractor: pulls the access token from the request, verifies it
//! and exposes the caller's identity.

use axum::extract::FromRequestParts;
use axum::http::HeaderMap;
use axum::http::request::Parts;
use axum_extra::extract::cookie::CookieJar;
use axum_extra::headers::authorization::Bearer;
use axum_extra::headers::{Authorization, HeaderMapExt};

use quill_auth::authz::Identity;
use quill_core::error::AppError;
use quill_core::result::AppResult;

use crate::cookies::ACCESS_TOKEN_COOKIE;
use crate::error::ApiError;
use crate::state::AppState;

/// Extracted authenticated caller available in handlers.
#[derive(Debug, Clone)]
pub struct AuthUser(pub Identity);

impl std::ops::Deref for AuthUser {
    type Target = Identity;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Finds the access token: `Authorization: Bearer` first, then the cookie.
pub fn access_token_from_headers(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .typed_get::<Authorization<Bearer>>()
        .map(|auth| auth.token().to_string())
        .filter(|t| !t.is_empty());
    if bearer.is_some() {
        return bearer;
    }

    CookieJar::from_headers(headers)
        .get(ACCESS_TOKEN_COOKIE)
        .map(|c| c.value().to_string())
        .filter(|t| !t.is_empty())
}

/// Verifies the request's access token if one is present.
///
/// `Ok(None)` means no token was sent. A token that is present but bad is an
/// error, never treated as anonymous.
pub fn identify(state: &AppState, headers: &HeaderMap) -> AppResult<Option<Identity>> {
    let Some(token) = access_token_from_headers(headers) else {
        return Ok(None);
    };
    let claims = state.tokens.verify_access_token(&token)?;
    Ok(Some(Identity::from(claims)))
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let identity = identify(state, &parts.headers)?
            .ok_or_else(|| AppError::unauthorized("Authentication required"))?;
        Ok(AuthUser(identity))
    }
}
