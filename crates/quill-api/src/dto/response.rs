//! Response DTOs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use quill_auth::jwt::TokenPair;
use quill_core::types::{RoleId, UserId};
use quill_entity::content::LoadedResource;
use quill_entity::permission::FlattenedPermissions;
use quill_entity::user::User;

/// Standard success response wrapper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T: Serialize> {
    /// Whether the request was successful.
    pub success: bool,
    /// Response data.
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    /// Creates a successful response.
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

/// Login / refresh response. Tokens themselves travel only in cookies.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    /// Access token expiration.
    pub access_expires_at: DateTime<Utc>,
    /// Refresh token expiration.
    pub refresh_expires_at: DateTime<Utc>,
    /// User info, present on login.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<UserResponse>,
}

impl SessionResponse {
    /// Builds the response from a freshly issued pair.
    pub fn new(pair: &TokenPair, user: Option<UserResponse>) -> Self {
        Self {
            access_expires_at: pair.access_expires_at,
            refresh_expires_at: pair.refresh_expires_at,
            user,
        }
    }
}

/// User summary for responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    /// User ID.
    pub id: UserId,
    /// Email.
    pub email: String,
    /// Username.
    pub username: String,
    /// Role ID.
    pub role_id: RoleId,
    /// Whether the email is verified.
    pub verified_email: bool,
    /// Created timestamp.
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            username: user.username,
            role_id: user.role_id,
            verified_email: user.verified_email,
            created_at: user.created_at,
        }
    }
}

/// The current caller with the grants carried by their token.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeResponse {
    /// Stored profile.
    #[serde(flatten)]
    pub user: UserResponse,
    /// Grants from the access token.
    pub permissions: FlattenedPermissions,
}

/// A resource that passed its route guard.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GuardedResponse {
    /// The caller.
    pub user_id: UserId,
    /// The resource the guard loaded, or the one fetched for a read.
    pub resource: LoadedResource,
}

/// Simple message response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    /// Message text.
    pub message: String,
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Status string.
    pub status: String,
    /// Crate version.
    pub version: String,
}
