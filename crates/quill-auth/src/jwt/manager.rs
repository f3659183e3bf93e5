//! RS256 token issuance and verification.

use std::fmt;
use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use jsonwebtoken::errors::ErrorKind as JwtErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use quill_core::config::AuthConfig;
use quill_core::error::AppError;
use quill_core::result::AppResult;
use quill_core::types::UserId;
use quill_entity::permission::Permission;
use quill_entity::user::User;

use super::claims::{AccessTokenClaims, RefreshTokenClaims, TokenType, TypedClaims};
use super::keys;
use crate::permission::flatten;

/// A freshly issued access/refresh token pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    /// Signed access token.
    pub access_token: String,
    /// Signed refresh token.
    pub refresh_token: String,
    /// When the access token expires.
    pub access_expires_at: DateTime<Utc>,
    /// When the refresh token expires.
    pub refresh_expires_at: DateTime<Utc>,
}

/// Signs and verifies RS256 access and refresh tokens.
///
/// Keys are loaded from the configured PEM paths on first use and cached for
/// the life of the manager. A failed load is not cached, so a later call
/// retries. Two callers racing on the first load may both read the files;
/// only one result is kept.
pub struct TokenManager {
    /// Issuer, audience, TTLs and key paths.
    config: AuthConfig,
    /// Private key, loaded lazily.
    encoding_key: OnceLock<EncodingKey>,
    /// Public key, loaded lazily.
    decoding_key: OnceLock<DecodingKey>,
    /// RS256-only validation with issuer, audience and leeway.
    validation: Validation,
}

impl fmt::Debug for TokenManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenManager")
            .field("issuer", &self.config.issuer)
            .field("audience", &self.config.audience)
            .field("encoding_key_loaded", &self.encoding_key.get().is_some())
            .field("decoding_key_loaded", &self.decoding_key.get().is_some())
            .finish()
    }
}

impl TokenManager {
    /// Creates a manager that loads its keys on first use.
    pub fn new(config: &AuthConfig) -> Self {
        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_issuer(&[&config.issuer]);
        validation.set_audience(&[&config.audience]);
        validation.set_required_spec_claims(&["exp", "iss", "aud", "sub"]);
        validation.leeway = config.leeway_seconds;

        Self {
            config: config.clone(),
            encoding_key: OnceLock::new(),
            decoding_key: OnceLock::new(),
            validation,
        }
    }

    /// Creates a manager and loads both keys immediately.
    pub fn load(config: &AuthConfig) -> AppResult<Self> {
        let manager = Self::new(config);
        manager.encoding_key()?;
        manager.decoding_key()?;
        info!(
            private_key = %config.private_key_path,
            public_key = %config.public_key_path,
            "Token signing keys loaded"
        );
        Ok(manager)
    }

    /// Creates a manager from in-memory PEM keys.
    pub fn from_pem(config: &AuthConfig, private_pem: &[u8], public_pem: &[u8]) -> AppResult<Self> {
        let manager = Self::new(config);
        let _ = manager
            .encoding_key
            .set(keys::encoding_key_from_pem(private_pem)?);
        let _ = manager
            .decoding_key
            .set(keys::decoding_key_from_pem(public_pem)?);
        Ok(manager)
    }

    /// Access token lifetime.
    pub fn access_ttl(&self) -> chrono::Duration {
        ttl_seconds(self.config.access_token_ttl_minutes, 60)
    }

    /// Refresh token lifetime.
    pub fn refresh_ttl(&self) -> chrono::Duration {
        ttl_seconds(self.config.refresh_token_ttl_hours, 3600)
    }

    /// Signs an access token carrying the user's identity and flattened grants.
    pub fn create_access_token(&self, user: &User, permissions: &[Permission]) -> AppResult<String> {
        let claims = self.access_claims(user, permissions, Utc::now());
        self.sign(&claims)
    }

    /// Signs a refresh token for the user.
    pub fn create_refresh_token(&self, user_id: UserId, email: &str) -> AppResult<String> {
        let claims = self.refresh_claims(user_id, email, Utc::now());
        self.sign(&claims)
    }

    /// Issues a new access/refresh pair with their expiry instants.
    pub fn issue_pair(&self, user: &User, permissions: &[Permission]) -> AppResult<TokenPair> {
        let now = Utc::now();
        let access = self.access_claims(user, permissions, now);
        let refresh = self.refresh_claims(user.id, &user.email, now);

        let pair = TokenPair {
            access_token: self.sign(&access)?,
            refresh_token: self.sign(&refresh)?,
            access_expires_at: access.expires_at(),
            refresh_expires_at: refresh.expires_at(),
        };
        debug!(user_id = %user.id, "Issued token pair");
        Ok(pair)
    }

    /// Verifies an access token's signature, algorithm, issuer, audience,
    /// expiry and type.
    pub fn verify_access_token(&self, token: &str) -> AppResult<AccessTokenClaims> {
        self.verify(token, TokenType::Access)
    }

    /// Verifies a refresh token's signature, algorithm, issuer, audience,
    /// expiry and type.
    pub fn verify_refresh_token(&self, token: &str) -> AppResult<RefreshTokenClaims> {
        self.verify(token, TokenType::Refresh)
    }

    fn access_claims(
        &self,
        user: &User,
        permissions: &[Permission],
        now: DateTime<Utc>,
    ) -> AccessTokenClaims {
        let iat = now.timestamp();
        AccessTokenClaims {
            sub: user.id,
            email: user.email.clone(),
            username: user.username.clone(),
            role_id: user.role_id,
            permissions: flatten(permissions),
            iss: self.config.issuer.clone(),
            aud: self.config.audience.clone(),
            iat,
            exp: iat.saturating_add(self.access_ttl().num_seconds()),
            jti: Uuid::new_v4(),
            typ: TokenType::Access,
        }
    }

    fn refresh_claims(&self, user_id: UserId, email: &str, now: DateTime<Utc>) -> RefreshTokenClaims {
        let iat = now.timestamp();
        RefreshTokenClaims {
            sub: user_id,
            email: email.to_string(),
            iss: self.config.issuer.clone(),
            aud: self.config.audience.clone(),
            iat,
            exp: iat.saturating_add(self.refresh_ttl().num_seconds()),
            jti: Uuid::new_v4(),
            typ: TokenType::Refresh,
        }
    }

    /// Signs arbitrary claims with the RS256 private key.
    pub(crate) fn sign<T: Serialize>(&self, claims: &T) -> AppResult<String> {
        let key = self.encoding_key()?;
        jsonwebtoken::encode(&Header::new(Algorithm::RS256), claims, key)
            .map_err(|e| AppError::internal(format!("Failed to sign token: {e}")))
    }

    fn verify<T>(&self, token: &str, expected: TokenType) -> AppResult<T>
    where
        T: DeserializeOwned + Clone + TypedClaims,
    {
        let key = self.decoding_key()?;
        let data = jsonwebtoken::decode::<T>(token, key, &self.validation)
            .map_err(map_decode_error)?;

        if data.claims.token_type() != expected {
            return Err(AppError::token_invalid("Wrong token type"));
        }
        Ok(data.claims)
    }

    fn encoding_key(&self) -> AppResult<&EncodingKey> {
        cached(&self.encoding_key, || {
            keys::load_encoding_key(&self.config.private_key_path)
        })
    }

    fn decoding_key(&self) -> AppResult<&DecodingKey> {
        cached(&self.decoding_key, || {
            keys::load_decoding_key(&self.config.public_key_path)
        })
    }
}

fn cached<K>(cell: &OnceLock<K>, load: impl FnOnce() -> AppResult<K>) -> AppResult<&K> {
    if let Some(key) = cell.get() {
        return Ok(key);
    }
    let key = load()?;
    Ok(cell.get_or_init(|| key))
}

fn ttl_seconds(amount: u64, unit: u64) -> chrono::Duration {
    let seconds = i64::try_from(amount.saturating_mul(unit)).unwrap_or(i64::MAX);
    chrono::Duration::try_seconds(seconds).unwrap_or(chrono::Duration::MAX)
}

fn map_decode_error(err: jsonwebtoken::errors::Error) -> AppError {
    match err.kind() {
        JwtErrorKind::ExpiredSignature => AppError::token_expired("Token has expired"),
        JwtErrorKind::InvalidSignature => AppError::token_invalid("Invalid token signature"),
        JwtErrorKind::InvalidAlgorithm => AppError::token_invalid("Token algorithm not allowed"),
        JwtErrorKind::InvalidIssuer => AppError::token_invalid("Invalid token issuer"),
        JwtErrorKind::InvalidAudience => AppError::token_invalid("Invalid token audience"),
        JwtErrorKind::MissingRequiredClaim(claim) => {
            AppError::token_invalid(format!("Token is missing the '{claim}' claim"))
        }
        _ => AppError::token_invalid(format!("Invalid token: {err}")),
    }
}

#[cfg(test)]
mod tests {
    use base64::Engine;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use quill_core::error::ErrorKind;
    use quill_core::types::RoleId;
    use quill_entity::permission::{Action, Resource};

    use super::*;

    fn fixture(name: &str) -> Vec<u8> {
        std::fs::read(format!(
            "{}/tests/fixtures/{name}",
            env!("CARGO_MANIFEST_DIR")
        ))
        .unwrap()
    }

    fn manager_with(config: &AuthConfig) -> TokenManager {
        TokenManager::from_pem(config, &fixture("private.pem"), &fixture("public.pem")).unwrap()
    }

    fn manager() -> TokenManager {
        manager_with(&AuthConfig::default())
    }

    fn user() -> User {
        let now = Utc::now();
        User {
            id: UserId::new(),
            email: "ada@example.com".into(),
            username: "ada".into(),
            role_id: RoleId::new(),
            password_hash: None,
            verified_email: true,
            created_at: now,
            updated_at: now,
        }
    }

    fn grants() -> Vec<Permission> {
        vec![
            Permission::new(Resource::Post, Action::Read),
            Permission::new(Resource::Post, Action::Update),
        ]
    }

    #[test]
    fn test_access_token_round_trip() {
        let manager = manager();
        let user = user();
        let token = manager.create_access_token(&user, &grants()).unwrap();

        let claims = manager.verify_access_token(&token).unwrap();
        assert_eq!(claims.sub, user.id);
        assert_eq!(claims.role_id, user.role_id);
        assert_eq!(claims.typ, TokenType::Access);
        assert!(claims.permissions.allows(Resource::Post, Action::Update));
        assert!(!claims.permissions.allows(Resource::Comment, Action::Read));
        assert_eq!(claims.exp - claims.iat, 15 * 60);
    }

    #[test]
    fn test_refresh_token_round_trip() {
        let manager = manager();
        let user_id = UserId::new();
        let token = manager
            .create_refresh_token(user_id, "ada@example.com")
            .unwrap();

        let claims = manager.verify_refresh_token(&token).unwrap();
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.exp - claims.iat, 168 * 3600);
    }

    #[test]
    fn test_tokens_issued_together_differ() {
        let manager = manager();
        let user = user();
        let a = manager.create_refresh_token(user.id, &user.email).unwrap();
        let b = manager.create_refresh_token(user.id, &user.email).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_issue_pair_reports_expiry() {
        let pair = manager().issue_pair(&user(), &grants()).unwrap();
        assert!(pair.access_expires_at < pair.refresh_expires_at);
        assert!(pair.access_expires_at > Utc::now());
    }

    #[test]
    fn test_token_types_are_not_interchangeable() {
        let manager = manager();
        let pair = manager.issue_pair(&user(), &grants()).unwrap();

        let err = manager.verify_access_token(&pair.refresh_token).unwrap_err();
        assert_eq!(err.kind, ErrorKind::TokenInvalid);
        let err = manager.verify_refresh_token(&pair.access_token).unwrap_err();
        assert_eq!(err.kind, ErrorKind::TokenInvalid);
    }

    #[test]
    fn test_expired_token() {
        let manager = manager();
        let now = Utc::now().timestamp();
        let mut claims = manager.refresh_claims(UserId::new(), "ada@example.com", Utc::now());
        claims.iat = now - 7200;
        claims.exp = now - 3600;
        let token = manager.sign(&claims).unwrap();

        let err = manager.verify_refresh_token(&token).unwrap_err();
        assert_eq!(err.kind, ErrorKind::TokenExpired);
    }

    #[test]
    fn test_just_expired_token_is_rejected() {
        let manager = manager();
        let mut claims = manager.access_claims(&user(), &grants(), Utc::now());
        claims.exp = Utc::now().timestamp() - 1;
        let token = manager.sign(&claims).unwrap();

        let err = manager.verify_access_token(&token).unwrap_err();
        assert_eq!(err.kind, ErrorKind::TokenExpired);
    }

    #[test]
    fn test_configured_leeway_tolerates_skew() {
        let config = AuthConfig {
            leeway_seconds: 30,
            ..AuthConfig::default()
        };
        let manager = manager_with(&config);
        let mut claims = manager.access_claims(&user(), &grants(), Utc::now());
        claims.exp = Utc::now().timestamp() - 2;
        let token = manager.sign(&claims).unwrap();
        assert!(manager.verify_access_token(&token).is_ok());

        claims.exp = Utc::now().timestamp() - 60;
        let token = manager.sign(&claims).unwrap();
        let err = manager.verify_access_token(&token).unwrap_err();
        assert_eq!(err.kind, ErrorKind::TokenExpired);
    }

    #[test]
    fn test_wrong_key_is_rejected() {
        let token = manager().create_access_token(&user(), &grants()).unwrap();
        let other = TokenManager::from_pem(
            &AuthConfig::default(),
            &fixture("other_private.pem"),
            &fixture("other_public.pem"),
        )
        .unwrap();

        let err = other.verify_access_token(&token).unwrap_err();
        assert_eq!(err.kind, ErrorKind::TokenInvalid);
    }

    #[test]
    fn test_tampered_signature_is_rejected() {
        let manager = manager();
        let token = manager.create_access_token(&user(), &grants()).unwrap();
        let (message, signature) = token.rsplit_once('.').unwrap();
        let mut sig: Vec<char> = signature.chars().collect();
        let mid = sig.len() / 2;
        sig[mid] = if sig[mid] == 'A' { 'B' } else { 'A' };
        let tampered = format!("{message}.{}", sig.into_iter().collect::<String>());

        let err = manager.verify_access_token(&tampered).unwrap_err();
        assert_eq!(err.kind, ErrorKind::TokenInvalid);
    }

    #[test]
    fn test_unsigned_token_is_rejected() {
        let manager = manager();
        let claims = manager.access_claims(&user(), &grants(), Utc::now());
        let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"none","typ":"JWT"}"#);
        let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims).unwrap());
        let token = format!("{header}.{payload}.");

        let err = manager.verify_access_token(&token).unwrap_err();
        assert_eq!(err.kind, ErrorKind::TokenInvalid);
    }

    #[test]
    fn test_hmac_token_keyed_with_public_key_is_rejected() {
        let manager = manager();
        let claims = manager.access_claims(&user(), &grants(), Utc::now());
        let forged = jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(&fixture("public.pem")),
        )
        .unwrap();

        let err = manager.verify_access_token(&forged).unwrap_err();
        assert_eq!(err.kind, ErrorKind::TokenInvalid);
    }

    #[test]
    fn test_issuer_and_audience_must_match() {
        let token = manager().create_access_token(&user(), &grants()).unwrap();

        let other_issuer = manager_with(&AuthConfig {
            issuer: "someone-else".into(),
            ..AuthConfig::default()
        });
        let err = other_issuer.verify_access_token(&token).unwrap_err();
        assert_eq!(err.kind, ErrorKind::TokenInvalid);

        let other_audience = manager_with(&AuthConfig {
            audience: "mobile".into(),
            ..AuthConfig::default()
        });
        let err = other_audience.verify_access_token(&token).unwrap_err();
        assert_eq!(err.kind, ErrorKind::TokenInvalid);
    }

    #[test]
    fn test_garbage_is_rejected() {
        let err = manager().verify_access_token("not.a.jwt").unwrap_err();
        assert_eq!(err.kind, ErrorKind::TokenInvalid);
    }

    #[test]
    fn test_missing_keys_are_configuration_errors() {
        let manager = TokenManager::new(&AuthConfig {
            private_key_path: "/nonexistent/private.pem".into(),
            public_key_path: "/nonexistent/public.pem".into(),
            ..AuthConfig::default()
        });

        let err = manager.create_access_token(&user(), &grants()).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Configuration);
        let err = manager.verify_access_token("a.b.c").unwrap_err();
        assert_eq!(err.kind, ErrorKind::Configuration);
        assert!(TokenManager::load(&AuthConfig {
            private_key_path: "/nonexistent/private.pem".into(),
            ..AuthConfig::default()
        })
        .is_err());
    }

    #[test]
    fn test_lazy_keys_load_from_disk() {
        let dir = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures");
        let manager = TokenManager::new(&AuthConfig {
            private_key_path: format!("{dir}/private.pem"),
            public_key_path: format!("{dir}/public.pem"),
            ..AuthConfig::default()
        });

        let token = manager.create_access_token(&user(), &grants()).unwrap();
        assert!(manager.verify_access_token(&token).is_ok());
    }
}
