//! Permission domain values: resources, actions, grants, and the flattened
//! per-resource action sets embedded in access tokens.

pub mod action;
pub mod flattened;
pub mod model;
pub mod resource;

pub use action::Action;
pub use flattened::FlattenedPermissions;
pub use model::Permission;
pub use resource::Resource;
