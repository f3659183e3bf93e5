//! HTTP request handlers.

pub mod auth;
pub mod content;
pub mod health;
