//! Application state shared across all handlers and middleware.

use std::sync::Arc;

use quill_auth::authz::{Authorizer, RepositoryResourceLoader};
use quill_auth::jwt::TokenManager;
use quill_auth::password::{PasswordHasher, PasswordValidator};
use quill_auth::session::{SessionManager, SessionService};
use quill_core::config::AppConfig;
use quill_core::result::AppResult;
use quill_database::memory::MemoryStore;
use quill_database::repositories::{
    ContentRepository, RoleRepository, SessionRepository, UserRepository,
};

/// The persistence contracts the API needs, behind trait objects.
#[derive(Clone)]
pub struct Repositories {
    /// User repository
    pub users: Arc<dyn UserRepository>,
    /// Role grant repository
    pub roles: Arc<dyn RoleRepository>,
    /// Session repository
    pub sessions: Arc<dyn SessionRepository>,
    /// Post/comment repository
    pub content: Arc<dyn ContentRepository>,
}

impl Repositories {
    /// Uses the in-memory store for every contract.
    pub fn from_memory(store: &MemoryStore) -> Self {
        Self {
            users: store.users.clone(),
            roles: store.roles.clone(),
            sessions: store.sessions.clone(),
            content: store.content.clone(),
        }
    }
}

/// Application state containing all shared dependencies.
///
/// Passed to every Axum handler via `State<AppState>`.
/// All fields are `Arc`-wrapped for cheap cloning across tasks.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<AppConfig>,
    /// Token issuance and verification
    pub tokens: Arc<TokenManager>,
    /// Login, refresh, logout and password change flows
    pub sessions: Arc<SessionManager>,
    /// Per-route authorization pipeline
    pub authorizer: Arc<Authorizer>,
    /// User repository
    pub users: Arc<dyn UserRepository>,
    /// Post/comment repository
    pub content: Arc<dyn ContentRepository>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .field("tokens", &self.tokens)
            .finish_non_exhaustive()
    }
}

impl AppState {
    /// Wires the auth core on top of the given repositories.
    pub fn new(config: AppConfig, tokens: TokenManager, repos: Repositories) -> AppResult<Self> {
        let tokens = Arc::new(tokens);
        let hasher = Arc::new(PasswordHasher::new(&config.auth.password)?);
        let validator = PasswordValidator::new(&config.auth.password);

        let sessions = Arc::new(SessionManager::new(
            Arc::clone(&tokens),
            SessionService::new(Arc::clone(&repos.sessions)),
            Arc::clone(&repos.users),
            Arc::clone(&repos.roles),
            hasher,
            validator,
        ));

        let loader = RepositoryResourceLoader::new(
            Arc::clone(&repos.content),
            Arc::clone(&repos.users),
        );
        let authorizer = Arc::new(Authorizer::new(Arc::new(loader)));

        Ok(Self {
            config: Arc::new(config),
            tokens,
            sessions,
            authorizer,
            users: repos.users,
            content: repos.content,
        })
    }

    /// Whether cookies should carry the `Secure` attribute.
    pub fn secure_cookies(&self) -> bool {
        !self.config.server.is_development()
    }
}
