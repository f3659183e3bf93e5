//! Session entities.

pub mod model;

pub use model::{ClientInfo, NewSession, Session};
