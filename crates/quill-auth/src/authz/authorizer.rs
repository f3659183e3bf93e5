//! The per-route authorization pipeline.
//!
//! Steps run in a fixed order and the first failure wins:
//!
//! 1. caller must be authenticated (`Unauthorized`)
//! 2. token must grant `action` on `resource` (`Forbidden`)
//! 3. route must carry a valid id for the resource (`NotFound`)
//! 4. `read` and `create` stop here
//! 5. the resource is loaded (`NotFound` if absent or not loadable)
//! 6. it is attached to the context
//! 7. posts and comments must belong to the caller (`Forbidden`)

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, warn};
use uuid::Uuid;

use quill_core::error::AppError;
use quill_core::result::AppResult;
use quill_entity::permission::{Action, Resource};

use super::context::{AuthContext, Identity};
use super::loader::ResourceLoader;

/// Resource types the pipeline can load for ownership checks.
const LOADABLE: [Resource; 3] = [Resource::Post, Resource::Comment, Resource::User];

/// Runs the authorization pipeline for one `(resource, action)` guard.
#[derive(Clone)]
pub struct Authorizer {
    /// Row lookup for update/delete checks.
    loader: Arc<dyn ResourceLoader>,
}

impl std::fmt::Debug for Authorizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Authorizer").finish_non_exhaustive()
    }
}

impl Authorizer {
    /// Creates an authorizer over the given loader.
    pub fn new(loader: Arc<dyn ResourceLoader>) -> Self {
        Self { loader }
    }

    /// Decides whether `identity` may perform `action` on the `resource`
    /// named by the route `params`.
    ///
    /// Ownership is checked against freshly loaded data on every call.
    pub async fn authorize(
        &self,
        identity: Option<Identity>,
        params: &HashMap<String, String>,
        resource: Resource,
        action: Action,
    ) -> AppResult<AuthContext> {
        let Some(identity) = identity else {
            debug!(%resource, %action, "Rejected unauthenticated request");
            return Err(AppError::unauthorized("Authentication required"));
        };
        let user_id = identity.user_id;

        if !identity.can(resource, action) {
            warn!(user_id = %user_id, %resource, %action, "Permission not granted");
            return Err(AppError::forbidden(format!(
                "Missing permission: {action} on {resource}"
            )));
        }

        let param = resource.route_param();
        let Some(raw_id) = params.get(param) else {
            warn!(user_id = %user_id, %resource, %action, param, "Route parameter missing");
            return Err(AppError::not_found(format!("Missing route parameter '{param}'")));
        };
        let Ok(id) = Uuid::parse_str(raw_id) else {
            warn!(user_id = %user_id, %resource, %action, param, "Route parameter is not an id");
            return Err(AppError::not_found(format!("{resource} not found")));
        };

        let mut context = AuthContext::new(identity);
        if !action.mutates_existing() {
            return Ok(context);
        }

        if !LOADABLE.contains(&resource) {
            warn!(user_id = %user_id, %resource, %action, "Resource type cannot be loaded");
            return Err(AppError::not_found(format!(
                "Unsupported resource type: {resource}"
            )));
        }

        let Some(loaded) = self.loader.load(resource, id).await? else {
            warn!(user_id = %user_id, %resource, %action, %id, "Resource not found");
            return Err(AppError::not_found(format!("{resource} not found")));
        };

        let owner = loaded.owner_id();
        context.attach(loaded);

        if resource.requires_ownership() && owner != Some(user_id) {
            warn!(user_id = %user_id, %resource, %action, %id, "Caller does not own resource");
            return Err(AppError::forbidden(format!(
                "You do not own this {}",
                resource.context_key()
            )));
        }

        debug!(user_id = %user_id, %resource, %action, %id, "Authorized");
        Ok(context)
    }
}
