//! Route definitions for the Quill HTTP API.
//!
//! All routes are mounted under `/api`. Content routes carry an
//! authorization guard per method.

use axum::{
    Router, middleware as axum_middleware,
    routing::{delete, get, patch, post, put},
};

use quill_entity::permission::{Action, Resource};

use crate::handlers;
use crate::middleware::{self, guard};
use crate::state::AppState;

/// Build the complete Axum router with all routes and the request logger.
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .merge(auth_routes())
        .merge(content_routes(&state))
        .merge(health_routes());

    Router::new()
        .nest("/api", api_routes)
        .layer(axum_middleware::from_fn(
            middleware::logging::request_logging,
        ))
        .with_state(state)
}

/// Auth endpoints: login, refresh, logout, me, password change
fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/login", post(handlers::auth::login))
        .route("/auth/refresh", post(handlers::auth::refresh))
        .route("/auth/logout", post(handlers::auth::logout))
        .route("/auth/me", get(handlers::auth::me))
        .route("/users/me/password", put(handlers::auth::change_password))
}

/// Guarded post and comment endpoints
fn content_routes(state: &AppState) -> Router<AppState> {
    use handlers::content;

    Router::new()
        .route(
            "/posts/{postId}",
            guard(get(content::get_post), state, Resource::Post, Action::Read),
        )
        .route(
            "/posts/{postId}",
            guard(patch(content::modify_post), state, Resource::Post, Action::Update),
        )
        .route(
            "/posts/{postId}",
            guard(delete(content::modify_post), state, Resource::Post, Action::Delete),
        )
        .route(
            "/comments/{commentId}",
            guard(
                patch(content::modify_comment),
                state,
                Resource::Comment,
                Action::Update,
            ),
        )
        .route(
            "/comments/{commentId}",
            guard(
                delete(content::modify_comment),
                state,
                Resource::Comment,
                Action::Delete,
            ),
        )
}

/// Health check
fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(handlers::health::health))
}
