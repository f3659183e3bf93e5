//! JWT claims carried by access and refresh tokens.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use quill_core::types::{RoleId, UserId};
use quill_entity::permission::FlattenedPermissions;

/// Distinguishes access tokens from refresh tokens.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TokenType {
    /// Short-lived token presented on every request.
    Access,
    /// Long-lived token exchanged for a new pair.
    Refresh,
}

/// Claims embedded in every access token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessTokenClaims {
    /// Subject: the user id.
    pub sub: UserId,
    /// User email at issuance.
    pub email: String,
    /// Username at issuance.
    pub username: String,
    /// Role whose grants produced `permissions`.
    pub role_id: RoleId,
    /// Flattened role grants, e.g. `{"POST":["read","update"]}`.
    pub permissions: FlattenedPermissions,
    /// Issuer.
    pub iss: String,
    /// Audience.
    pub aud: String,
    /// Issued-at (seconds since epoch).
    pub iat: i64,
    /// Expiry (seconds since epoch).
    pub exp: i64,
    /// Unique token id; two tokens issued in the same second still differ.
    pub jti: Uuid,
    /// Always [`TokenType::Access`].
    pub typ: TokenType,
}

/// Claims embedded in every refresh token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefreshTokenClaims {
    /// Subject: the user id.
    pub sub: UserId,
    /// User email at issuance.
    pub email: String,
    /// Issuer.
    pub iss: String,
    /// Audience.
    pub aud: String,
    /// Issued-at (seconds since epoch).
    pub iat: i64,
    /// Expiry (seconds since epoch).
    pub exp: i64,
    /// Unique token id.
    pub jti: Uuid,
    /// Always [`TokenType::Refresh`].
    pub typ: TokenType,
}

impl AccessTokenClaims {
    /// Returns the expiration as a `DateTime<Utc>`.
    pub fn expires_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.exp, 0).unwrap_or_else(Utc::now)
    }
}

impl RefreshTokenClaims {
    /// Returns the expiration as a `DateTime<Utc>`.
    pub fn expires_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.exp, 0).unwrap_or_else(Utc::now)
    }
}

/// Claim types that carry a [`TokenType`] discriminator.
pub(crate) trait TypedClaims {
    fn token_type(&self) -> TokenType;
}

impl TypedClaims for AccessTokenClaims {
    fn token_type(&self) -> TokenType {
        self.typ
    }
}

impl TypedClaims for RefreshTokenClaims {
    fn token_type(&self) -> TokenType {
        self.typ
    }
}
