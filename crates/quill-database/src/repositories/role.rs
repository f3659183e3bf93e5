//! Role permission repository implementation.

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::warn;

use quill_core::error::{AppError, ErrorKind};
use quill_core::result::AppResult;
use quill_core::types::RoleId;
use quill_entity::permission::{Action, Permission, Resource};

use super::RoleRepository;

/// PostgreSQL-backed [`RoleRepository`].
#[derive(Debug, Clone)]
pub struct PgRoleRepository {
    pool: PgPool,
}

impl PgRoleRepository {
    /// Create a new role repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RoleRepository for PgRoleRepository {
    async fn permissions_for_role(&self, role_id: RoleId) -> AppResult<Vec<Permission>> {
        let rows: Vec<(String, String)> =
            sqlx::query_as("SELECT resource, action FROM role_permissions WHERE role_id = $1")
                .bind(role_id)
                .fetch_all(&self.pool)
                .await
                .map_err(|e| {
                    AppError::with_source(ErrorKind::Database, "Failed to load role permissions", e)
                })?;

        let mut permissions = Vec::with_capacity(rows.len());
        for (resource, action) in rows {
            // Grants for kinds this build does not know are skipped, not fatal.
            match (resource.parse::<Resource>(), action.parse::<Action>()) {
                (Ok(resource), Ok(action)) => permissions.push(Permission::new(resource, action)),
                _ => warn!(
                    role_id = %role_id,
                    resource = %resource,
                    action = %action,
                    "Skipping unrecognised permission grant"
                ),
            }
        }
        Ok(permissions)
    }
}
