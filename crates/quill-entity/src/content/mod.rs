//! Owned content entities the authorization pipeline loads and checks.

pub mod comment;
pub mod loaded;
pub mod post;

pub use comment::Comment;
pub use loaded::LoadedResource;
pub use post::Post;
