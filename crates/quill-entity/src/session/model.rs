//! Session entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use quill_core::types::{SessionId, UserId};

/// The single persisted record binding a user to their current token pair.
///
/// Created on login or OAuth callback, updated in place on refresh, and
/// deleted on logout or when a newer login supersedes it.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Session {
    /// Unique session identifier.
    pub id: SessionId,
    /// The user this session belongs to.
    pub user_id: UserId,
    /// User-Agent header of the client that logged in.
    pub user_agent: Option<String>,
    /// Client IP address.
    pub ip_address: Option<String>,
    /// Current access token.
    #[serde(skip_serializing)]
    pub access_token: String,
    /// Current refresh token.
    #[serde(skip_serializing)]
    pub refresh_token: String,
    /// When the session was created (login time).
    pub created_at: DateTime<Utc>,
    /// When the token pair was last replaced.
    pub updated_at: DateTime<Utc>,
}

impl Session {
    /// Builds a fresh session row from login input.
    pub fn from_new(new: NewSession) -> Self {
        let now = Utc::now();
        Self {
            id: SessionId::new(),
            user_id: new.user_id,
            user_agent: new.client.user_agent,
            ip_address: new.client.ip_address,
            access_token: new.access_token,
            refresh_token: new.refresh_token,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether this session currently holds the given refresh token.
    pub fn holds_refresh_token(&self, refresh_token: &str) -> bool {
        self.refresh_token == refresh_token
    }
}

/// Client metadata captured at login.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientInfo {
    /// User-Agent header value.
    pub user_agent: Option<String>,
    /// Client IP address.
    pub ip_address: Option<String>,
}

/// Input for creating the session of a freshly logged-in user.
#[derive(Debug, Clone)]
pub struct NewSession {
    /// The user logging in.
    pub user_id: UserId,
    /// Client metadata.
    pub client: ClientInfo,
    /// Newly issued access token.
    pub access_token: String,
    /// Newly issued refresh token.
    pub refresh_token: String,
}
