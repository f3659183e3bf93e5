//! Axum middleware stack.

pub mod authorize;
pub mod cors;
pub mod logging;

pub use authorize::guard;
