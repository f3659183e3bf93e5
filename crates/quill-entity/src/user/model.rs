//! User entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use quill_core::types::{RoleId, UserId};

/// A registered user.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    /// Unique user identifier.
    pub id: UserId,
    /// Login email address.
    pub email: String,
    /// Public display handle.
    pub username: String,
    /// The role whose permissions this user holds.
    pub role_id: RoleId,
    /// Argon2id PHC string. `None` for accounts that only sign in through OAuth.
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,
    /// Whether the email address has been verified.
    pub verified_email: bool,
    /// When the user was created.
    pub created_at: DateTime<Utc>,
    /// When the user was last updated.
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Whether the account can sign in with a password at all.
    pub fn has_password(&self) -> bool {
        self.password_hash.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(password_hash: Option<&str>) -> User {
        let now = Utc::now();
        User {
            id: UserId::new(),
            email: "ada@example.com".to_string(),
            username: "ada".to_string(),
            role_id: RoleId::new(),
            password_hash: password_hash.map(String::from),
            verified_email: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_password_hash_is_never_serialized() {
        let json = serde_json::to_value(user(Some("$argon2id$secret"))).expect("serialize");
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["username"], "ada");
    }

    #[test]
    fn test_oauth_only_account_has_no_password() {
        assert!(!user(None).has_password());
        assert!(user(Some("$argon2id$x")).has_password());
    }
}
