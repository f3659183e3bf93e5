//! Request authorization: identity, resource loading and the decision pipeline.

pub mod authorizer;
pub mod context;
pub mod loader;

pub use authorizer::Authorizer;
pub use context::{AuthContext, Identity};
pub use loader::{RepositoryResourceLoader, ResourceLoader};
