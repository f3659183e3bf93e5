//! In-memory repository implementations.
//!
//! Backed by `DashMap`. Sessions are keyed by user id, so the shard lock
//! for that key is what serializes concurrent logins of the same user while
//! different users proceed independently. Data lives for the process
//! lifetime only.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;

use quill_core::error::AppError;
use quill_core::result::AppResult;
use quill_core::types::{CommentId, PostId, RoleId, SessionId, UserId};
use quill_entity::content::{Comment, Post};
use quill_entity::permission::Permission;
use quill_entity::session::Session;
use quill_entity::user::User;

use crate::repositories::{ContentRepository, RoleRepository, SessionRepository, UserRepository};

/// Users keyed by id.
#[derive(Debug, Default)]
pub struct MemoryUserRepository {
    users: DashMap<UserId, User>,
}

impl MemoryUserRepository {
    /// Creates an empty repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a user.
    pub fn insert(&self, user: User) {
        self.users.insert(user.id, user);
    }
}

#[async_trait]
impl UserRepository for MemoryUserRepository {
    async fn find_by_id(&self, id: UserId) -> AppResult<Option<User>> {
        Ok(self.users.get(&id).map(|u| u.value().clone()))
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        Ok(self
            .users
            .iter()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .map(|u| u.value().clone()))
    }

    async fn update_password_hash(&self, id: UserId, password_hash: &str) -> AppResult<()> {
        let mut user = self
            .users
            .get_mut(&id)
            .ok_or_else(|| AppError::not_found("User not found"))?;
        user.password_hash = Some(password_hash.to_string());
        user.updated_at = Utc::now();
        Ok(())
    }
}

/// Role grants keyed by role id.
#[derive(Debug, Default)]
pub struct MemoryRoleRepository {
    grants: DashMap<RoleId, Vec<Permission>>,
}

impl MemoryRoleRepository {
    /// Creates an empty repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the grants of a role.
    pub fn set_permissions(&self, role_id: RoleId, permissions: Vec<Permission>) {
        self.grants.insert(role_id, permissions);
    }
}

#[async_trait]
impl RoleRepository for MemoryRoleRepository {
    async fn permissions_for_role(&self, role_id: RoleId) -> AppResult<Vec<Permission>> {
        Ok(self
            .grants
            .get(&role_id)
            .map(|p| p.value().clone())
            .unwrap_or_default())
    }
}

/// At most one session per user, keyed by user id.
#[derive(Debug, Default)]
pub struct MemorySessionRepository {
    sessions: DashMap<UserId, Session>,
}

impl MemorySessionRepository {
    /// Creates an empty repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of stored sessions across all users.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Whether no session is stored.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[async_trait]
impl SessionRepository for MemorySessionRepository {
    async fn replace_for_user(&self, session: &Session) -> AppResult<Session> {
        self.sessions.insert(session.user_id, session.clone());
        Ok(session.clone())
    }

    async fn find_by_user_id(&self, user_id: UserId) -> AppResult<Option<Session>> {
        Ok(self.sessions.get(&user_id).map(|s| s.value().clone()))
    }

    async fn update_tokens(
        &self,
        id: SessionId,
        access_token: &str,
        refresh_token: &str,
    ) -> AppResult<Option<Session>> {
        let updated = self
            .sessions
            .iter_mut()
            .find(|s| s.id == id)
            .map(|mut session| {
                session.access_token = access_token.to_string();
                session.refresh_token = refresh_token.to_string();
                session.updated_at = Utc::now();
                session.value().clone()
            });
        Ok(updated)
    }

    async fn rotate_tokens(
        &self,
        id: SessionId,
        current_refresh_token: &str,
        access_token: &str,
        refresh_token: &str,
    ) -> AppResult<Option<Session>> {
        // The entry's shard stays write-locked from the check to the swap.
        let rotated = self
            .sessions
            .iter_mut()
            .find(|s| s.id == id)
            .filter(|s| s.holds_refresh_token(current_refresh_token))
            .map(|mut session| {
                session.access_token = access_token.to_string();
                session.refresh_token = refresh_token.to_string();
                session.updated_at = Utc::now();
                session.value().clone()
            });
        Ok(rotated)
    }

    async fn delete_by_user_id(&self, user_id: UserId) -> AppResult<u64> {
        Ok(self.sessions.remove(&user_id).map_or(0, |_| 1))
    }

    async fn count_by_user_id(&self, user_id: UserId) -> AppResult<u64> {
        Ok(u64::from(self.sessions.contains_key(&user_id)))
    }
}

/// Posts and comments keyed by id.
#[derive(Debug, Default)]
pub struct MemoryContentRepository {
    posts: DashMap<PostId, Post>,
    comments: DashMap<CommentId, Comment>,
}

impl MemoryContentRepository {
    /// Creates an empty repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a post.
    pub fn insert_post(&self, post: Post) {
        self.posts.insert(post.id, post);
    }

    /// Inserts or replaces a comment.
    pub fn insert_comment(&self, comment: Comment) {
        self.comments.insert(comment.id, comment);
    }
}

#[async_trait]
impl ContentRepository for MemoryContentRepository {
    async fn find_post(&self, id: PostId) -> AppResult<Option<Post>> {
        Ok(self.posts.get(&id).map(|p| p.value().clone()))
    }

    async fn find_comment(&self, id: CommentId) -> AppResult<Option<Comment>> {
        Ok(self.comments.get(&id).map(|c| c.value().clone()))
    }
}

/// All in-memory repositories bundled together.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    /// Users.
    pub users: Arc<MemoryUserRepository>,
    /// Role grants.
    pub roles: Arc<MemoryRoleRepository>,
    /// Sessions.
    pub sessions: Arc<MemorySessionRepository>,
    /// Posts and comments.
    pub content: Arc<MemoryContentRepository>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}
