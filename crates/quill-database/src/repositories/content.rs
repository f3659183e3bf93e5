//! Post and comment lookups.

use async_trait::async_trait;
use sqlx::PgPool;

use quill_core::error::{AppError, ErrorKind};
use quill_core::result::AppResult;
use quill_core::types::{CommentId, PostId};
use quill_entity::content::{Comment, Post};

use super::ContentRepository;

/// PostgreSQL-backed [`ContentRepository`].
#[derive(Debug, Clone)]
pub struct PgContentRepository {
    pool: PgPool,
}

impl PgContentRepository {
    /// Create a new content repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ContentRepository for PgContentRepository {
    async fn find_post(&self, id: PostId) -> AppResult<Option<Post>> {
        sqlx::query_as::<_, Post>(
            "SELECT id, user_id, title, published, created_at FROM posts WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find post", e))
    }

    async fn find_comment(&self, id: CommentId) -> AppResult<Option<Comment>> {
        sqlx::query_as::<_, Comment>(
            "SELECT id, user_id, post_id, content, created_at FROM comments WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find comment", e))
    }
}
