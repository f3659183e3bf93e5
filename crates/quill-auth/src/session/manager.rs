//! Session lifecycle manager: login, refresh, logout and password change flows.

use std::sync::Arc;

use tracing::{info, warn};

use quill_core::error::AppError;
use quill_core::result::AppResult;
use quill_core::types::UserId;
use quill_database::repositories::{RoleRepository, UserRepository};
use quill_entity::session::{ClientInfo, NewSession, Session};
use quill_entity::user::User;

use crate::jwt::{TokenManager, TokenPair};
use crate::password::{PasswordHasher, PasswordValidator};

use super::service::SessionService;

/// Returned for every credential failure so callers cannot tell an unknown
/// email from a wrong password.
const INVALID_CREDENTIALS: &str = "Invalid email or password";

/// Result of a successful login.
#[derive(Debug, Clone)]
pub struct LoginResult {
    /// Generated token pair.
    pub tokens: TokenPair,
    /// The session that now backs the pair.
    pub session: Session,
    /// The authenticated user.
    pub user: User,
}

/// Manages the complete session lifecycle.
#[derive(Clone)]
pub struct SessionManager {
    /// Token issuance and verification.
    tokens: Arc<TokenManager>,
    /// Single-session persistence.
    sessions: SessionService,
    /// User repository.
    users: Arc<dyn UserRepository>,
    /// Role grant lookup.
    roles: Arc<dyn RoleRepository>,
    /// Password hasher.
    hasher: Arc<PasswordHasher>,
    /// Password policy for new passwords.
    validator: PasswordValidator,
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("tokens", &self.tokens)
            .field("validator", &self.validator)
            .finish_non_exhaustive()
    }
}

impl SessionManager {
    /// Creates a new session manager with all required dependencies.
    pub fn new(
        tokens: Arc<TokenManager>,
        sessions: SessionService,
        users: Arc<dyn UserRepository>,
        roles: Arc<dyn RoleRepository>,
        hasher: Arc<PasswordHasher>,
        validator: PasswordValidator,
    ) -> Self {
        Self {
            tokens,
            sessions,
            users,
            roles,
            hasher,
            validator,
        }
    }

    /// The token manager used for issuance.
    pub fn tokens(&self) -> &Arc<TokenManager> {
        &self.tokens
    }

    /// The underlying session service.
    pub fn sessions(&self) -> &SessionService {
        &self.sessions
    }

    /// Authenticates with email and password and starts a new session.
    ///
    /// Any earlier session of the user is replaced. Unknown emails and
    /// OAuth-only accounts still pay for one full hash verification.
    pub async fn login(
        &self,
        email: &str,
        password: &str,
        client: ClientInfo,
    ) -> AppResult<LoginResult> {
        let user = self.users.find_by_email(email).await?;
        let stored_hash = user.as_ref().and_then(|u| u.password_hash.clone());
        let matched = self.verify_password(password, stored_hash).await?;

        let user = match user {
            Some(user) if matched => user,
            Some(user) => {
                warn!(user_id = %user.id, "Login failed: bad password");
                return Err(AppError::unauthorized(INVALID_CREDENTIALS));
            }
            None => {
                warn!("Login failed: unknown email");
                return Err(AppError::unauthorized(INVALID_CREDENTIALS));
            }
        };

        self.start_session(user, client).await
    }

    /// Starts a session for a user already authenticated by an OAuth provider.
    pub async fn login_oauth(&self, user_id: UserId, client: ClientInfo) -> AppResult<LoginResult> {
        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::not_found("User not found"))?;

        self.start_session(user, client).await
    }

    /// Exchanges a refresh token for a new pair.
    ///
    /// The token is verified before the session store is consulted, so an
    /// expired or forged token never reaches persistence. Permissions are
    /// reloaded from the user's role, so grant changes take effect here.
    pub async fn refresh(&self, refresh_token: &str) -> AppResult<TokenPair> {
        let claims = self.tokens.verify_refresh_token(refresh_token)?;
        let session = self
            .sessions
            .require_active_session(claims.sub, refresh_token)
            .await?;

        let user = self
            .users
            .find_by_id(claims.sub)
            .await?
            .ok_or_else(|| AppError::unauthorized("User no longer exists"))?;
        let permissions = self.roles.permissions_for_role(user.role_id).await?;

        let pair = self.tokens.issue_pair(&user, &permissions)?;
        self.sessions
            .rotate_session(
                session.id,
                refresh_token,
                &pair.access_token,
                &pair.refresh_token,
            )
            .await?;

        info!(user_id = %user.id, session_id = %session.id, "Tokens refreshed");
        Ok(pair)
    }

    /// Ends every session of the user.
    pub async fn logout(&self, user_id: UserId) -> AppResult<()> {
        self.sessions
            .invalidate_all_sessions_by_user_id(user_id)
            .await?;
        info!(user_id = %user_id, "User logged out");
        Ok(())
    }

    /// Ends the sessions of the user holding `refresh_token`.
    ///
    /// Lets a client whose access token already expired still sign out. A
    /// token from a superseded session is rejected with `Forbidden` and never
    /// ends the newer session.
    pub async fn logout_with_refresh_token(&self, refresh_token: &str) -> AppResult<()> {
        let claims = self.tokens.verify_refresh_token(refresh_token)?;
        self.sessions
            .require_active_session(claims.sub, refresh_token)
            .await?;
        self.logout(claims.sub).await
    }

    /// Changes the user's password and ends all their sessions.
    pub async fn change_password(
        &self,
        user_id: UserId,
        current_password: &str,
        new_password: &str,
    ) -> AppResult<()> {
        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::not_found("User not found"))?;

        let Some(stored_hash) = user.password_hash else {
            return Err(AppError::validation(
                "Account has no password; sign in with your identity provider",
            ));
        };
        if !self
            .verify_password(current_password, Some(stored_hash))
            .await?
        {
            warn!(user_id = %user_id, "Password change failed: bad current password");
            return Err(AppError::unauthorized("Current password is incorrect"));
        }

        self.validator
            .validate_not_same(current_password, new_password)?;
        self.validator.validate(new_password)?;

        let new_hash = self.hash_password(new_password).await?;
        self.users.update_password_hash(user_id, &new_hash).await?;
        self.sessions
            .invalidate_all_sessions_by_user_id(user_id)
            .await?;

        info!(user_id = %user_id, "Password changed, sessions invalidated");
        Ok(())
    }

    async fn start_session(&self, user: User, client: ClientInfo) -> AppResult<LoginResult> {
        let permissions = self.roles.permissions_for_role(user.role_id).await?;
        let tokens = self.tokens.issue_pair(&user, &permissions)?;

        let session = self
            .sessions
            .create_session_for_login_user(NewSession {
                user_id: user.id,
                client,
                access_token: tokens.access_token.clone(),
                refresh_token: tokens.refresh_token.clone(),
            })
            .await?;

        info!(user_id = %user.id, session_id = %session.id, "Login successful");
        Ok(LoginResult {
            tokens,
            session,
            user,
        })
    }

    /// Runs Argon2 off the async workers. `None` verifies against the dummy hash.
    async fn verify_password(&self, password: &str, hash: Option<String>) -> AppResult<bool> {
        let hasher = Arc::clone(&self.hasher);
        let password = password.to_owned();
        tokio::task::spawn_blocking(move || match hash {
            Some(hash) => hasher.verify(&password, &hash),
            None => hasher.verify_dummy(&password),
        })
        .await
        .map_err(|e| AppError::internal(format!("Password verification task failed: {e}")))
    }

    async fn hash_password(&self, password: &str) -> AppResult<String> {
        let hasher = Arc::clone(&self.hasher);
        let password = password.to_owned();
        tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| AppError::internal(format!("Password hashing task failed: {e}")))?
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use quill_core::config::{AuthConfig, PasswordConfig};
    use quill_core::error::ErrorKind;
    use quill_core::types::RoleId;
    use std::time::Duration;

    use async_trait::async_trait;
    use quill_core::types::SessionId;
    use quill_database::memory::{MemorySessionRepository, MemoryStore};
    use quill_database::repositories::SessionRepository;
    use quill_entity::permission::{Action, Permission, Resource};
    use uuid::Uuid;

    use super::*;
    use crate::jwt::{RefreshTokenClaims, TokenType};

    const PASSWORD: &str = "Lantern-Quokka-93";

    struct Fixture {
        store: MemoryStore,
        manager: SessionManager,
        user: User,
    }

    fn fixture_key(name: &str) -> Vec<u8> {
        std::fs::read(format!(
            "{}/tests/fixtures/{name}",
            env!("CARGO_MANIFEST_DIR")
        ))
        .unwrap()
    }

    fn setup() -> Fixture {
        setup_with(|sessions| sessions)
    }

    fn setup_with(
        wrap: impl FnOnce(Arc<MemorySessionRepository>) -> Arc<dyn SessionRepository>,
    ) -> Fixture {
        let password_config = PasswordConfig {
            memory_kib: 1024,
            iterations: 1,
            parallelism: 1,
            ..PasswordConfig::default()
        };
        let hasher = Arc::new(PasswordHasher::new(&password_config).unwrap());
        let tokens = Arc::new(
            TokenManager::from_pem(
                &AuthConfig::default(),
                &fixture_key("private.pem"),
                &fixture_key("public.pem"),
            )
            .unwrap(),
        );

        let store = MemoryStore::new();
        let now = Utc::now();
        let user = User {
            id: UserId::new(),
            email: "ada@example.com".into(),
            username: "ada".into(),
            role_id: RoleId::new(),
            password_hash: Some(hasher.hash(PASSWORD).unwrap()),
            verified_email: true,
            created_at: now,
            updated_at: now,
        };
        store.users.insert(user.clone());
        store.roles.set_permissions(
            user.role_id,
            vec![Permission::new(Resource::Post, Action::Read)],
        );

        let manager = SessionManager::new(
            tokens,
            SessionService::new(wrap(store.sessions.clone())),
            store.users.clone(),
            store.roles.clone(),
            hasher,
            PasswordValidator::new(&password_config),
        );

        Fixture {
            store,
            manager,
            user,
        }
    }

    fn client(agent: &str) -> ClientInfo {
        ClientInfo {
            user_agent: Some(agent.into()),
            ip_address: Some("10.0.0.1".into()),
        }
    }

    #[tokio::test]
    async fn test_login_issues_tokens_and_session() {
        let f = setup();
        let result = f
            .manager
            .login("ADA@example.com", PASSWORD, client("firefox"))
            .await
            .unwrap();

        assert_eq!(result.user.id, f.user.id);
        assert_eq!(result.session.user_agent.as_deref(), Some("firefox"));
        assert!(result.session.holds_refresh_token(&result.tokens.refresh_token));

        let claims = f
            .manager
            .tokens()
            .verify_access_token(&result.tokens.access_token)
            .unwrap();
        assert_eq!(claims.sub, f.user.id);
        assert!(claims.permissions.allows(Resource::Post, Action::Read));
    }

    #[tokio::test]
    async fn test_bad_credentials_share_one_message() {
        let f = setup();
        let wrong = f
            .manager
            .login("ada@example.com", "Wrong-Password-1", client("a"))
            .await
            .unwrap_err();
        let unknown = f
            .manager
            .login("nobody@example.com", PASSWORD, client("a"))
            .await
            .unwrap_err();

        assert_eq!(wrong.kind, ErrorKind::Unauthorized);
        assert_eq!(unknown.kind, ErrorKind::Unauthorized);
        assert_eq!(wrong.message, unknown.message);
        assert!(f.store.sessions.is_empty());
    }

    #[tokio::test]
    async fn test_oauth_only_account_cannot_password_login() {
        let f = setup();
        let mut oauth_user = f.user.clone();
        oauth_user.id = UserId::new();
        oauth_user.email = "grace@example.com".into();
        oauth_user.password_hash = None;
        f.store.users.insert(oauth_user.clone());

        let err = f
            .manager
            .login("grace@example.com", PASSWORD, client("a"))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Unauthorized);

        let result = f
            .manager
            .login_oauth(oauth_user.id, client("oauth"))
            .await
            .unwrap();
        assert_eq!(result.user.id, oauth_user.id);
    }

    #[tokio::test]
    async fn test_new_login_supersedes_old_refresh_token() {
        let f = setup();
        let first = f.manager.login("ada@example.com", PASSWORD, client("laptop")).await.unwrap();
        let second = f.manager.login("ada@example.com", PASSWORD, client("phone")).await.unwrap();

        assert_eq!(f.store.sessions.count_by_user_id(f.user.id).await.unwrap(), 1);

        let err = f.manager.refresh(&first.tokens.refresh_token).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Forbidden);
        assert!(f.manager.refresh(&second.tokens.refresh_token).await.is_ok());
    }

    #[tokio::test]
    async fn test_refresh_rotates_pair_in_place() {
        let f = setup();
        let login = f.manager.login("ada@example.com", PASSWORD, client("a")).await.unwrap();

        let rotated = f.manager.refresh(&login.tokens.refresh_token).await.unwrap();
        assert_ne!(rotated.refresh_token, login.tokens.refresh_token);

        let session = f
            .manager
            .sessions()
            .get_session_by_user_id(f.user.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(session.id, login.session.id);
        assert!(session.holds_refresh_token(&rotated.refresh_token));

        let err = f.manager.refresh(&login.tokens.refresh_token).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Forbidden);
    }

    /// Memory sessions whose reads stall, so concurrent refreshes interleave
    /// between the session check and the rotation.
    struct SlowReadSessions {
        inner: Arc<MemorySessionRepository>,
    }

    #[async_trait]
    impl SessionRepository for SlowReadSessions {
        async fn replace_for_user(&self, session: &Session) -> AppResult<Session> {
            self.inner.replace_for_user(session).await
        }

        async fn find_by_user_id(&self, user_id: UserId) -> AppResult<Option<Session>> {
            let found = self.inner.find_by_user_id(user_id).await;
            tokio::time::sleep(Duration::from_millis(50)).await;
            found
        }

        async fn update_tokens(
            &self,
            id: SessionId,
            access_token: &str,
            refresh_token: &str,
        ) -> AppResult<Option<Session>> {
            self.inner.update_tokens(id, access_token, refresh_token).await
        }

        async fn rotate_tokens(
            &self,
            id: SessionId,
            current_refresh_token: &str,
            access_token: &str,
            refresh_token: &str,
        ) -> AppResult<Option<Session>> {
            self.inner
                .rotate_tokens(id, current_refresh_token, access_token, refresh_token)
                .await
        }

        async fn delete_by_user_id(&self, user_id: UserId) -> AppResult<u64> {
            self.inner.delete_by_user_id(user_id).await
        }

        async fn count_by_user_id(&self, user_id: UserId) -> AppResult<u64> {
            self.inner.count_by_user_id(user_id).await
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_refreshes_redeem_token_once() {
        let f = setup_with(|inner| Arc::new(SlowReadSessions { inner }));
        let login = f.manager.login("ada@example.com", PASSWORD, client("a")).await.unwrap();
        let token = login.tokens.refresh_token;

        let (a, b) = tokio::join!(f.manager.refresh(&token), f.manager.refresh(&token));

        let winners: Vec<&TokenPair> = [a.as_ref().ok(), b.as_ref().ok()]
            .into_iter()
            .flatten()
            .collect();
        assert_eq!(winners.len(), 1);
        let loser = [a.as_ref().err(), b.as_ref().err()]
            .into_iter()
            .flatten()
            .next()
            .unwrap();
        assert_eq!(loser.kind, ErrorKind::Forbidden);

        let session = f.store.sessions.find_by_user_id(f.user.id).await.unwrap().unwrap();
        assert!(session.holds_refresh_token(&winners[0].refresh_token));
    }

    #[tokio::test]
    async fn test_refresh_picks_up_new_grants() {
        let f = setup();
        let login = f.manager.login("ada@example.com", PASSWORD, client("a")).await.unwrap();

        f.store.roles.set_permissions(
            f.user.role_id,
            vec![
                Permission::new(Resource::Post, Action::Read),
                Permission::new(Resource::Comment, Action::Create),
            ],
        );
        let rotated = f.manager.refresh(&login.tokens.refresh_token).await.unwrap();

        let claims = f
            .manager
            .tokens()
            .verify_access_token(&rotated.access_token)
            .unwrap();
        assert!(claims.permissions.allows(Resource::Comment, Action::Create));
    }

    #[tokio::test]
    async fn test_expired_refresh_token_leaves_session_untouched() {
        let f = setup();
        let login = f.manager.login("ada@example.com", PASSWORD, client("a")).await.unwrap();

        let now = Utc::now().timestamp();
        let expired = f
            .manager
            .tokens()
            .sign(&RefreshTokenClaims {
                sub: f.user.id,
                email: f.user.email.clone(),
                iss: "quill".into(),
                aud: "quill-web".into(),
                iat: now - 7200,
                exp: now - 3600,
                jti: Uuid::new_v4(),
                typ: TokenType::Refresh,
            })
            .unwrap();

        let err = f.manager.refresh(&expired).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::TokenExpired);

        let session = f.store.sessions.find_by_user_id(f.user.id).await.unwrap().unwrap();
        assert_eq!(session.id, login.session.id);
        assert!(session.holds_refresh_token(&login.tokens.refresh_token));
    }

    #[tokio::test]
    async fn test_access_token_cannot_refresh() {
        let f = setup();
        let login = f.manager.login("ada@example.com", PASSWORD, client("a")).await.unwrap();

        let err = f.manager.refresh(&login.tokens.access_token).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::TokenInvalid);
    }

    #[tokio::test]
    async fn test_logout_blocks_refresh() {
        let f = setup();
        let login = f.manager.login("ada@example.com", PASSWORD, client("a")).await.unwrap();

        f.manager.logout(f.user.id).await.unwrap();
        assert!(f.store.sessions.is_empty());

        let err = f.manager.refresh(&login.tokens.refresh_token).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Forbidden);
    }

    #[tokio::test]
    async fn test_logout_with_refresh_token() {
        let f = setup();
        let login = f.manager.login("ada@example.com", PASSWORD, client("a")).await.unwrap();

        f.manager
            .logout_with_refresh_token(&login.tokens.refresh_token)
            .await
            .unwrap();
        assert!(f.store.sessions.is_empty());

        let err = f
            .manager
            .logout_with_refresh_token(&login.tokens.refresh_token)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Forbidden);
    }

    #[tokio::test]
    async fn test_superseded_refresh_token_cannot_end_newer_session() {
        let f = setup();
        let first = f.manager.login("ada@example.com", PASSWORD, client("laptop")).await.unwrap();
        let second = f.manager.login("ada@example.com", PASSWORD, client("phone")).await.unwrap();

        let err = f
            .manager
            .logout_with_refresh_token(&first.tokens.refresh_token)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Forbidden);

        let session = f.store.sessions.find_by_user_id(f.user.id).await.unwrap().unwrap();
        assert_eq!(session.id, second.session.id);
    }

    #[tokio::test]
    async fn test_change_password_invalidates_sessions() {
        let f = setup();
        f.manager.login("ada@example.com", PASSWORD, client("a")).await.unwrap();

        f.manager
            .change_password(f.user.id, PASSWORD, "Vivid-Lantern-93-Quokka")
            .await
            .unwrap();
        assert!(f.store.sessions.is_empty());

        assert!(f.manager.login("ada@example.com", PASSWORD, client("a")).await.is_err());
        assert!(
            f.manager
                .login("ada@example.com", "Vivid-Lantern-93-Quokka", client("a"))
                .await
                .is_ok()
        );
    }

    #[tokio::test]
    async fn test_change_password_rejections() {
        let f = setup();

        let err = f
            .manager
            .change_password(f.user.id, "Not-The-Password-1", "Vivid-Lantern-93-Quokka")
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Unauthorized);

        let err = f
            .manager
            .change_password(f.user.id, PASSWORD, "weak")
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);

        let err = f
            .manager
            .change_password(f.user.id, PASSWORD, PASSWORD)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
    }
}
