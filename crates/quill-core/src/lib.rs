//! # quill-core
//!
//! Core crate for the Quill publishing backend. Contains configuration
//! schemas, typed identifiers, and the unified error system shared by the
//! auth core and its collaborators.
//!
//! This crate has **no** internal dependencies on other Quill crates.

pub mod config;
pub mod error;
pub mod result;
pub mod types;

pub use error::{AppError, ErrorKind};
pub use result::AppResult;
