//! Resource kinds that permissions are granted on.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use quill_core::AppError;

/// Every resource kind the authorization pipeline knows about.
///
/// Serialized upper-case (`"POST"`), which is also the key format of the
/// `permissions` claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Resource {
    /// A published or unpublished post.
    Post,
    /// A comment on a post.
    Comment,
    /// A reply to a comment.
    Reply,
    /// An abuse report.
    Report,
    /// A user account.
    User,
    /// An unpublished draft.
    Draft,
}

impl Resource {
    /// All resource kinds, in declaration order.
    pub const ALL: [Resource; 6] = [
        Self::Post,
        Self::Comment,
        Self::Reply,
        Self::Report,
        Self::User,
        Self::Draft,
    ];

    /// Upper-case wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Post => "POST",
            Self::Comment => "COMMENT",
            Self::Reply => "REPLY",
            Self::Report => "REPORT",
            Self::User => "USER",
            Self::Draft => "DRAFT",
        }
    }

    /// Lower-case name used as the request-context key for loaded resources.
    pub fn context_key(&self) -> &'static str {
        match self {
            Self::Post => "post",
            Self::Comment => "comment",
            Self::Reply => "reply",
            Self::Report => "report",
            Self::User => "user",
            Self::Draft => "draft",
        }
    }

    /// Name of the route parameter carrying this resource's identifier.
    pub fn route_param(&self) -> &'static str {
        match self {
            Self::Post => "postId",
            Self::Comment => "commentId",
            Self::Reply => "replyId",
            Self::Report => "reportId",
            Self::User => "id",
            Self::Draft => "draftId",
        }
    }

    /// Whether mutations on this kind require the caller to be the owner.
    pub fn requires_ownership(&self) -> bool {
        matches!(self, Self::Post | Self::Comment)
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Resource {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|r| r.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| AppError::validation(format!("Unknown resource: '{s}'")))
    }
}
