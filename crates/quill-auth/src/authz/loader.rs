//! Resource lookup used by the authorization pipeline.

use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use quill_core::error::AppError;
use quill_core::result::AppResult;
use quill_core::types::{CommentId, PostId, UserId};
use quill_database::repositories::{ContentRepository, UserRepository};
use quill_entity::content::LoadedResource;
use quill_entity::permission::Resource;

/// Loads the row a route points at so its ownership can be checked.
#[async_trait]
pub trait ResourceLoader: Send + Sync + 'static {
    /// Loads `resource` with the given id. `Ok(None)` means no such row.
    async fn load(&self, resource: Resource, id: Uuid) -> AppResult<Option<LoadedResource>>;
}

/// [`ResourceLoader`] backed by the content and user repositories.
#[derive(Clone)]
pub struct RepositoryResourceLoader {
    /// Post and comment lookup.
    content: Arc<dyn ContentRepository>,
    /// User lookup.
    users: Arc<dyn UserRepository>,
}

impl RepositoryResourceLoader {
    /// Creates a loader over the given repositories.
    pub fn new(content: Arc<dyn ContentRepository>, users: Arc<dyn UserRepository>) -> Self {
        Self { content, users }
    }
}

#[async_trait]
impl ResourceLoader for RepositoryResourceLoader {
    async fn load(&self, resource: Resource, id: Uuid) -> AppResult<Option<LoadedResource>> {
        match resource {
            Resource::Post => Ok(self
                .content
                .find_post(PostId::from_uuid(id))
                .await?
                .map(LoadedResource::Post)),
            Resource::Comment => Ok(self
                .content
                .find_comment(CommentId::from_uuid(id))
                .await?
                .map(LoadedResource::Comment)),
            Resource::User => Ok(self
                .users
                .find_by_id(UserId::from_uuid(id))
                .await?
                .map(LoadedResource::User)),
            other => Err(AppError::not_found(format!(
                "Unsupported resource type: {other}"
            ))),
        }
    }
}
