//! A resource fetched by the authorization pipeline.

use serde::Serialize;
use uuid::Uuid;

use quill_core::types::UserId;

use super::comment::Comment;
use super::post::Post;
use crate::permission::Resource;
use crate::user::User;

/// A resource loaded for a mutation request and attached to the request
/// context so handlers do not fetch it again.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum LoadedResource {
    /// A post.
    Post(Post),
    /// A comment.
    Comment(Comment),
    /// A user account.
    User(User),
}

impl LoadedResource {
    /// The resource kind.
    pub fn kind(&self) -> Resource {
        match self {
            Self::Post(_) => Resource::Post,
            Self::Comment(_) => Resource::Comment,
            Self::User(_) => Resource::User,
        }
    }

    /// The identifier of the loaded row.
    pub fn id(&self) -> Uuid {
        match self {
            Self::Post(post) => post.id.into_uuid(),
            Self::Comment(comment) => comment.id.into_uuid(),
            Self::User(user) => user.id.into_uuid(),
        }
    }

    /// The owning user, for kinds that have one.
    ///
    /// A user account is not "owned" for authorization purposes, so `User`
    /// returns `None`.
    pub fn owner_id(&self) -> Option<UserId> {
        match self {
            Self::Post(post) => Some(post.user_id),
            Self::Comment(comment) => Some(comment.user_id),
            Self::User(_) => None,
        }
    }

    /// Returns the post, if this is one.
    pub fn as_post(&self) -> Option<&Post> {
        match self {
            Self::Post(post) => Some(post),
            _ => None,
        }
    }

    /// Returns the comment, if this is one.
    pub fn as_comment(&self) -> Option<&Comment> {
        match self {
            Self::Comment(comment) => Some(comment),
            _ => None,
        }
    }
}
