//! JWT token issuance, verification, and claims.

pub mod claims;
pub mod keys;
pub mod manager;

pub use claims::{AccessTokenClaims, RefreshTokenClaims, TokenType};
pub use manager::{TokenManager, TokenPair};
