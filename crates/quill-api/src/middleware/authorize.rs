//! Route guard running the authorization pipeline for one `(resource, action)`.

use std::collections::HashMap;

use axum::extract::{FromRequestParts, Path, Request, State};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::MethodRouter;

use quill_entity::permission::{Action, Resource};

use crate::error::ApiError;
use crate::extractors::auth::identify;
use crate::state::AppState;

/// State handed to [`authorize`]: the app plus the guarded pair.
#[derive(Clone)]
pub struct AuthorizeGuard {
    state: AppState,
    resource: Resource,
    action: Action,
}

impl AuthorizeGuard {
    /// Creates a guard for `action` on `resource`.
    pub fn new(state: AppState, resource: Resource, action: Action) -> Self {
        Self {
            state,
            resource,
            action,
        }
    }
}

/// Wraps a method router so it only runs once the caller is authorized.
///
/// On success the handler finds the [`AuthContext`](quill_auth::AuthContext)
/// in the request extensions.
pub fn guard(
    route: MethodRouter<AppState>,
    state: &AppState,
    resource: Resource,
    action: Action,
) -> MethodRouter<AppState> {
    route.route_layer(middleware::from_fn_with_state(
        AuthorizeGuard::new(state.clone(), resource, action),
        authorize,
    ))
}

/// Runs the pipeline and forwards the request with its `AuthContext`.
pub async fn authorize(
    State(guard): State<AuthorizeGuard>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let (mut parts, body) = request.into_parts();

    let identity = identify(&guard.state, &parts.headers)?;
    let params = Path::<HashMap<String, String>>::from_request_parts(&mut parts, &())
        .await
        .map(|Path(params)| params)
        .unwrap_or_default();

    let context = guard
        .state
        .authorizer
        .authorize(identity, &params, guard.resource, guard.action)
        .await?;

    let mut request = Request::from_parts(parts, body);
    request.extensions_mut().insert(context);
    Ok(next.run(request).await)
}
