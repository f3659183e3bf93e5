//! Comment entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use quill_core::types::{CommentId, PostId, UserId};

/// A comment on a post.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Comment {
    /// Unique comment identifier.
    pub id: CommentId,
    /// Author and owner.
    pub user_id: UserId,
    /// The post this comment belongs to.
    pub post_id: PostId,
    /// Comment body.
    pub content: String,
    /// When the comment was created.
    pub created_at: DateTime<Utc>,
}
