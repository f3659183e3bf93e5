//! Repository contracts the auth core depends on, and their PostgreSQL
//! implementations.
//!
//! The core only needs narrow read/write operations: user lookup and
//! password updates, role permission lookup, session storage, and owned
//! content lookup. Everything else about these tables belongs to the
//! surrounding application.

pub mod content;
pub mod role;
pub mod session;
pub mod user;

use async_trait::async_trait;

use quill_core::result::AppResult;
use quill_core::types::{CommentId, PostId, RoleId, SessionId, UserId};
use quill_entity::content::{Comment, Post};
use quill_entity::permission::Permission;
use quill_entity::session::Session;
use quill_entity::user::User;

pub use content::PgContentRepository;
pub use role::PgRoleRepository;
pub use session::PgSessionRepository;
pub use user::PgUserRepository;

/// User lookup and password updates.
#[async_trait]
pub trait UserRepository: Send + Sync + 'static {
    /// Find a user by primary key.
    async fn find_by_id(&self, id: UserId) -> AppResult<Option<User>>;

    /// Find a user by login email (case-insensitive).
    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>>;

    /// Replace a user's password hash.
    async fn update_password_hash(&self, id: UserId, password_hash: &str) -> AppResult<()>;
}

/// Role permission lookup.
#[async_trait]
pub trait RoleRepository: Send + Sync + 'static {
    /// All grants owned by the role. Unknown roles yield an empty list.
    async fn permissions_for_role(&self, role_id: RoleId) -> AppResult<Vec<Permission>>;
}

/// Session storage.
///
/// Implementations must serialize writes per user: `replace_for_user` is the
/// only way to create a session and it removes every other session of the
/// same user as part of the same atomic step.
#[async_trait]
pub trait SessionRepository: Send + Sync + 'static {
    /// Deletes all sessions of `session.user_id`, then inserts `session`.
    async fn replace_for_user(&self, session: &Session) -> AppResult<Session>;

    /// Returns the user's session, if any.
    async fn find_by_user_id(&self, user_id: UserId) -> AppResult<Option<Session>>;

    /// Replaces the token pair of an existing session row.
    ///
    /// Returns `None` if the row no longer exists.
    async fn update_tokens(
        &self,
        id: SessionId,
        access_token: &str,
        refresh_token: &str,
    ) -> AppResult<Option<Session>>;

    /// Swaps the token pair only while the row still holds
    /// `current_refresh_token`, as one atomic compare-and-swap.
    ///
    /// Returns `None` if the row is gone or already rotated, so of two
    /// concurrent refreshes presenting the same token at most one wins.
    async fn rotate_tokens(
        &self,
        id: SessionId,
        current_refresh_token: &str,
        access_token: &str,
        refresh_token: &str,
    ) -> AppResult<Option<Session>>;

    /// Deletes every session of the user. Returns the number removed.
    async fn delete_by_user_id(&self, user_id: UserId) -> AppResult<u64>;

    /// Counts the user's sessions.
    async fn count_by_user_id(&self, user_id: UserId) -> AppResult<u64>;
}

/// Owned content lookup for the authorization pipeline.
#[async_trait]
pub trait ContentRepository: Send + Sync + 'static {
    /// Find a post by primary key.
    async fn find_post(&self, id: PostId) -> AppResult<Option<Post>>;

    /// Find a comment by primary key.
    async fn find_comment(&self, id: CommentId) -> AppResult<Option<Comment>>;
}
