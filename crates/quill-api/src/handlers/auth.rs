//! Auth handlers: login, refresh, logout, me, change password.

use axum::Json;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::http::header::USER_AGENT;
use axum_extra::extract::cookie::CookieJar;
use validator::Validate;

use quill_core::error::AppError;
use quill_core::result::AppResult;
use quill_database::repositories::UserRepository;
use quill_entity::session::ClientInfo;

use crate::cookies::{REFRESH_TOKEN_COOKIE, clear_token_cookies, set_token_cookies};
use crate::dto::request::{ChangePasswordRequest, LoginRequest};
use crate::dto::response::{ApiResponse, MeResponse, MessageResponse, SessionResponse, UserResponse};
use crate::error::ApiError;
use crate::extractors::{AuthUser, identify};
use crate::state::AppState;

/// POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    jar: CookieJar,
    Json(req): Json<LoginRequest>,
) -> Result<(CookieJar, Json<ApiResponse<SessionResponse>>), ApiError> {
    req.validate()
        .map_err(|e| AppError::validation(e.to_string()))?;

    let result = state
        .sessions
        .login(&req.email, &req.password, client_info(&headers))
        .await?;

    let jar = set_token_cookies(jar, &result.tokens, &state.tokens, state.secure_cookies());
    let body = SessionResponse::new(&result.tokens, Some(UserResponse::from(result.user)));
    Ok((jar, Json(ApiResponse::ok(body))))
}

/// POST /api/auth/refresh
pub async fn refresh(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<ApiResponse<SessionResponse>>), ApiError> {
    let refresh_token =
        refresh_token_cookie(&jar).ok_or_else(|| AppError::unauthorized("Refresh token missing"))?;

    let pair = state.sessions.refresh(&refresh_token).await?;

    let jar = set_token_cookies(jar, &pair, &state.tokens, state.secure_cookies());
    Ok((jar, Json(ApiResponse::ok(SessionResponse::new(&pair, None)))))
}

/// POST /api/auth/logout
///
/// Accepts the access token, or the refresh cookie once the access token has
/// expired. Cookies are cleared on every outcome.
pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
    jar: CookieJar,
) -> Result<(CookieJar, Json<ApiResponse<MessageResponse>>), (CookieJar, ApiError)> {
    let outcome = end_session(&state, &headers, &jar).await;
    let jar = clear_token_cookies(jar, state.secure_cookies());

    match outcome {
        Ok(()) => Ok((
            jar,
            Json(ApiResponse::ok(MessageResponse {
                message: "Logged out successfully".to_string(),
            })),
        )),
        Err(e) => Err((jar, ApiError(e))),
    }
}

async fn end_session(state: &AppState, headers: &HeaderMap, jar: &CookieJar) -> AppResult<()> {
    let access_error = match identify(state, headers) {
        Ok(Some(identity)) => return state.sessions.logout(identity.user_id).await,
        Ok(None) => None,
        Err(e) => Some(e),
    };

    match refresh_token_cookie(jar) {
        Some(token) => state.sessions.logout_with_refresh_token(&token).await,
        None => Err(access_error
            .unwrap_or_else(|| AppError::unauthorized("Authentication required"))),
    }
}

/// GET /api/auth/me
pub async fn me(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<ApiResponse<MeResponse>>, ApiError> {
    let user = state
        .users
        .find_by_id(auth.user_id)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;

    Ok(Json(ApiResponse::ok(MeResponse {
        user: UserResponse::from(user),
        permissions: auth.0.permissions,
    })))
}

/// PUT /api/users/me/password
pub async fn change_password(
    State(state): State<AppState>,
    auth: AuthUser,
    jar: CookieJar,
    Json(req): Json<ChangePasswordRequest>,
) -> Result<(CookieJar, Json<ApiResponse<MessageResponse>>), ApiError> {
    req.validate()
        .map_err(|e| AppError::validation(e.to_string()))?;

    state
        .sessions
        .change_password(auth.user_id, &req.current_password, &req.new_password)
        .await?;

    let jar = clear_token_cookies(jar, state.secure_cookies());
    Ok((
        jar,
        Json(ApiResponse::ok(MessageResponse {
            message: "Password changed. Please sign in again.".to_string(),
        })),
    ))
}

fn refresh_token_cookie(jar: &CookieJar) -> Option<String> {
    jar.get(REFRESH_TOKEN_COOKIE)
        .map(|c| c.value().to_string())
        .filter(|t| !t.is_empty())
}

fn client_info(headers: &HeaderMap) -> ClientInfo {
    let user_agent = headers
        .get(USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(String::from);

    let ip_address = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .or_else(|| {
            headers
                .get("x-real-ip")
                .and_then(|v| v.to_str().ok())
                .map(String::from)
        });

    ClientInfo {
        user_agent,
        ip_address,
    }
}
