//! Session repository implementation.

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::debug;

use quill_core::error::{AppError, ErrorKind};
use quill_core::result::AppResult;
use quill_core::types::{SessionId, UserId};
use quill_entity::session::Session;

use super::SessionRepository;

/// PostgreSQL-backed [`SessionRepository`].
///
/// Writes for one user are serialized with a transaction-scoped advisory
/// lock keyed on the user id; the unique index on `sessions.user_id` turns
/// any writer that skips the lock into a `Conflict` instead of a second row.
#[derive(Debug, Clone)]
pub struct PgSessionRepository {
    pool: PgPool,
}

impl PgSessionRepository {
    /// Create a new session repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionRepository for PgSessionRepository {
    async fn replace_for_user(&self, session: &Session) -> AppResult<Session> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to begin transaction", e)
        })?;

        sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1, 0))")
            .bind(session.user_id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to lock user sessions", e)
            })?;

        let removed = sqlx::query("DELETE FROM sessions WHERE user_id = $1")
            .bind(session.user_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to invalidate sessions", e)
            })?
            .rows_affected();

        // A unique-index violation surfaces as Conflict through `From<sqlx::Error>`.
        let created = sqlx::query_as::<_, Session>(
            "INSERT INTO sessions \
             (id, user_id, user_agent, ip_address, access_token, refresh_token, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING *",
        )
        .bind(session.id)
        .bind(session.user_id)
        .bind(&session.user_agent)
        .bind(&session.ip_address)
        .bind(&session.access_token)
        .bind(&session.refresh_token)
        .bind(session.created_at)
        .bind(session.updated_at)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to commit session", e)
        })?;

        debug!(user_id = %session.user_id, removed, "Replaced user sessions");
        Ok(created)
    }

    async fn find_by_user_id(&self, user_id: UserId) -> AppResult<Option<Session>> {
        sqlx::query_as::<_, Session>("SELECT * FROM sessions WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find session", e))
    }

    async fn update_tokens(
        &self,
        id: SessionId,
        access_token: &str,
        refresh_token: &str,
    ) -> AppResult<Option<Session>> {
        sqlx::query_as::<_, Session>(
            "UPDATE sessions SET access_token = $2, refresh_token = $3, updated_at = NOW() \
             WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(access_token)
        .bind(refresh_token)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to update session", e))
    }

    async fn rotate_tokens(
        &self,
        id: SessionId,
        current_refresh_token: &str,
        access_token: &str,
        refresh_token: &str,
    ) -> AppResult<Option<Session>> {
        sqlx::query_as::<_, Session>(
            "UPDATE sessions SET access_token = $3, refresh_token = $4, updated_at = NOW() \
             WHERE id = $1 AND refresh_token = $2 RETURNING *",
        )
        .bind(id)
        .bind(current_refresh_token)
        .bind(access_token)
        .bind(refresh_token)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to rotate session", e))
    }

    async fn delete_by_user_id(&self, user_id: UserId) -> AppResult<u64> {
        sqlx::query("DELETE FROM sessions WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map(|r| r.rows_affected())
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to delete sessions", e))
    }

    async fn count_by_user_id(&self, user_id: UserId) -> AppResult<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sessions WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to count sessions", e)
            })?;
        Ok(count as u64)
    }
}
