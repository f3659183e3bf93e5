//! # quill-auth
//!
//! Authentication and authorization core for Quill.
//!
//! ## Modules
//!
//! - `jwt`: RS256 access/refresh token issuance and verification
//! - `password`: Argon2id password hashing and policy enforcement
//! - `permission`: Role grant flattening into the token permission claim
//! - `session`: Single-session storage and the login/refresh/logout flows
//! - `authz`: Per-route authorization pipeline with ownership checks

pub mod authz;
pub mod jwt;
pub mod password;
pub mod permission;
pub mod session;

pub use authz::{AuthContext, Authorizer, Identity, RepositoryResourceLoader, ResourceLoader};
pub use jwt::{AccessTokenClaims, RefreshTokenClaims, TokenManager, TokenPair, TokenType};
pub use password::{PasswordHasher, PasswordValidator};
pub use permission::flatten;
pub use session::{LoginResult, SessionManager, SessionService};
