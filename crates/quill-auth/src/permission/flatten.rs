//! Builds the `permissions` token claim from a role's grants.

use quill_entity::permission::{FlattenedPermissions, Permission};

/// Collapses a list of grants into a per-resource action set.
///
/// Duplicate grants collapse and input order does not matter, so flattening
/// the same grants twice yields identical claims.
pub fn flatten(permissions: &[Permission]) -> FlattenedPermissions {
    permissions.iter().copied().collect()
}
