//! # quill-entity
//!
//! Domain entity models for Quill. Row-shaped structs derive `sqlx::FromRow`;
//! value objects (permissions, flattened permission maps) are plain serde
//! types used in token payloads and request contexts.

pub mod content;
pub mod permission;
pub mod session;
pub mod user;
