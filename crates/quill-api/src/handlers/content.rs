//! Guarded content endpoints.
//!
//! Each route is wrapped in an authorization guard; the handler only sees
//! requests that passed it and reads the checked resource from the context.

use axum::Extension;
use axum::Json;
use axum::extract::{Path, State};

use quill_auth::authz::AuthContext;
use quill_core::error::AppError;
use quill_core::types::PostId;
use quill_database::repositories::ContentRepository;
use quill_entity::content::LoadedResource;
use quill_entity::permission::Resource;

use crate::dto::response::{ApiResponse, GuardedResponse};
use crate::error::ApiError;
use crate::state::AppState;

/// GET /api/posts/{postId}
pub async fn get_post(
    State(state): State<AppState>,
    Extension(context): Extension<AuthContext>,
    Path(post_id): Path<PostId>,
) -> Result<Json<ApiResponse<GuardedResponse>>, ApiError> {
    let post = state
        .content
        .find_post(post_id)
        .await?
        .ok_or_else(|| AppError::not_found("Post not found"))?;

    Ok(Json(ApiResponse::ok(GuardedResponse {
        user_id: context.user_id(),
        resource: LoadedResource::Post(post),
    })))
}

/// PATCH|DELETE /api/posts/{postId}
pub async fn modify_post(
    Extension(context): Extension<AuthContext>,
) -> Result<Json<ApiResponse<GuardedResponse>>, ApiError> {
    attached(&context, Resource::Post)
}

/// PATCH|DELETE /api/comments/{commentId}
pub async fn modify_comment(
    Extension(context): Extension<AuthContext>,
) -> Result<Json<ApiResponse<GuardedResponse>>, ApiError> {
    attached(&context, Resource::Comment)
}

fn attached(
    context: &AuthContext,
    kind: Resource,
) -> Result<Json<ApiResponse<GuardedResponse>>, ApiError> {
    let resource = context
        .resource(kind)
        .cloned()
        .ok_or_else(|| AppError::internal(format!("Guard did not attach a {kind}")))?;

    Ok(Json(ApiResponse::ok(GuardedResponse {
        user_id: context.user_id(),
        resource,
    })))
}
