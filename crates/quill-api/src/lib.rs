//! # quill-api
//!
//! HTTP API layer for Quill built on Axum.
//!
//! Provides the auth endpoints, cookie transport for the token pair, the
//! per-route authorization guard, extractors, DTOs, and error mapping.

pub mod app;
pub mod cookies;
pub mod dto;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;

pub use app::build_app;
pub use error::ApiError;
pub use state::{AppState, Repositories};
