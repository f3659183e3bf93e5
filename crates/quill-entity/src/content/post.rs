//! Post entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use quill_core::types::{PostId, UserId};

/// A post. Only the fields the auth core needs are modelled here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Post {
    /// Unique post identifier.
    pub id: PostId,
    /// Author and owner.
    pub user_id: UserId,
    /// Post title.
    pub title: String,
    /// Whether the post is publicly visible.
    pub published: bool,
    /// When the post was created.
    pub created_at: DateTime<Utc>,
}
