//! Single-session storage rules and the login, refresh and logout flows.

pub mod manager;
pub mod service;

pub use manager::{LoginResult, SessionManager};
pub use service::SessionService;
