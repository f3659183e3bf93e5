//! Caller identity and the per-request authorization context.

use std::collections::BTreeMap;

use serde::Serialize;

use quill_core::types::{RoleId, UserId};
use quill_entity::content::LoadedResource;
use quill_entity::permission::{Action, FlattenedPermissions, Resource};

use crate::jwt::AccessTokenClaims;

/// Who is calling, as established by a verified access token.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    /// The authenticated user's ID.
    pub user_id: UserId,
    /// Email at token issuance.
    pub email: String,
    /// Username at token issuance.
    pub username: String,
    /// Role at token issuance.
    pub role_id: RoleId,
    /// Flattened grants from the token.
    pub permissions: FlattenedPermissions,
}

impl Identity {
    /// Whether the token grants `action` on `resource`.
    pub fn can(&self, resource: Resource, action: Action) -> bool {
        self.permissions.allows(resource, action)
    }
}

impl From<AccessTokenClaims> for Identity {
    fn from(claims: AccessTokenClaims) -> Self {
        Self {
            user_id: claims.sub,
            email: claims.email,
            username: claims.username,
            role_id: claims.role_id,
            permissions: claims.permissions,
        }
    }
}

/// Context handed to a handler once authorization succeeded.
///
/// Carries the caller plus every resource the pipeline loaded, keyed by
/// resource type.
#[derive(Debug, Clone, Serialize)]
pub struct AuthContext {
    /// The authenticated caller.
    identity: Identity,
    /// Resources loaded and checked for this request.
    resources: BTreeMap<Resource, LoadedResource>,
}

impl AuthContext {
    /// Creates a context with no loaded resources.
    pub fn new(identity: Identity) -> Self {
        Self {
            identity,
            resources: BTreeMap::new(),
        }
    }

    /// The authenticated caller.
    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// The authenticated user's ID.
    pub fn user_id(&self) -> UserId {
        self.identity.user_id
    }

    /// The caller's flattened grants.
    pub fn permissions(&self) -> &FlattenedPermissions {
        &self.identity.permissions
    }

    /// The loaded resource of the given type, if the pipeline loaded one.
    pub fn resource(&self, kind: Resource) -> Option<&LoadedResource> {
        self.resources.get(&kind)
    }

    /// Attaches a loaded resource under its own type.
    pub fn attach(&mut self, resource: LoadedResource) {
        self.resources.insert(resource.kind(), resource);
    }
}
