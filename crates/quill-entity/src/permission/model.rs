//! Granular permission grant.

use serde::{Deserialize, Serialize};

use super::action::Action;
use super::resource::Resource;

/// One `(resource, action)` grant owned by a role. Immutable reference data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Permission {
    /// The resource kind the grant applies to.
    pub resource: Resource,
    /// The granted action.
    pub action: Action,
}

impl Permission {
    /// Creates a new grant.
    pub fn new(resource: Resource, action: Action) -> Self {
        Self { resource, action }
    }
}
