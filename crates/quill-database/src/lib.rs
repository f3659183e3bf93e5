//! # quill-database
//!
//! Persistence contracts consumed by the auth core, with a PostgreSQL
//! implementation (sqlx) and an in-memory implementation used for
//! development and tests.

pub mod connection;
pub mod memory;
pub mod migration;
pub mod repositories;

pub use connection::DatabasePool;
pub use repositories::{ContentRepository, RoleRepository, SessionRepository, UserRepository};
