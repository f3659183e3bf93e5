//! Flattened `resource → {actions}` permission map.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::action::Action;
use super::model::Permission;
use super::resource::Resource;

/// Per-resource action sets derived from a role's grants.
///
/// Never persisted; rebuilt on every token issuance. Ordered collections keep
/// the serialized claim stable, e.g. `{"POST":["read","update"]}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FlattenedPermissions(BTreeMap<Resource, BTreeSet<Action>>);

impl FlattenedPermissions {
    /// Creates an empty permission map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one grant. Returns `false` if it was already present.
    pub fn grant(&mut self, resource: Resource, action: Action) -> bool {
        self.0.entry(resource).or_default().insert(action)
    }

    /// Whether `action` is granted on `resource`.
    pub fn allows(&self, resource: Resource, action: Action) -> bool {
        self.0
            .get(&resource)
            .is_some_and(|actions| actions.contains(&action))
    }

    /// Actions granted on `resource`, if any.
    pub fn actions(&self, resource: Resource) -> Option<&BTreeSet<Action>> {
        self.0.get(&resource)
    }

    /// Iterates resources and their granted actions.
    pub fn iter(&self) -> impl Iterator<Item = (&Resource, &BTreeSet<Action>)> {
        self.0.iter()
    }

    /// Whether no action is granted at all.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<Permission> for FlattenedPermissions {
    fn from_iter<I: IntoIterator<Item = Permission>>(iter: I) -> Self {
        let mut flattened = Self::new();
        for permission in iter {
            flattened.grant(permission.resource, permission.action);
        }
        flattened
    }
}
