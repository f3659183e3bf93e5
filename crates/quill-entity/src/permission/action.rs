//! Actions a permission can grant on a resource.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use quill_core::AppError;

/// CRUD actions checked by the authorization pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    /// Create a new resource.
    Create,
    /// Read a resource.
    Read,
    /// Modify an existing resource.
    Update,
    /// Remove an existing resource.
    Delete,
}

impl Action {
    /// Return the action as a lower-case string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Read => "read",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }

    /// Whether this action changes an existing resource and therefore needs
    /// the resource loaded and (for owned kinds) its ownership verified.
    pub fn mutates_existing(&self) -> bool {
        !matches!(self, Self::Create | Self::Read)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Action {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "create" => Ok(Self::Create),
            "read" => Ok(Self::Read),
            "update" => Ok(Self::Update),
            "delete" => Ok(Self::Delete),
            _ => Err(AppError::validation(format!(
                "Invalid action: '{s}'. Expected one of: create, read, update, delete"
            ))),
        }
    }
}
