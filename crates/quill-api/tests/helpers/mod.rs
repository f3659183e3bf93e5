//! Shared test helpers for API integration tests.

#![allow(dead_code)]

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE, COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, Request, StatusCode};
use chrono::Utc;
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use serde_json::Value;
use tower::ServiceExt;

use quill_api::{AppState, Repositories, build_app};
use quill_auth::jwt::TokenManager;
use quill_auth::password::PasswordHasher;
use quill_core::config::{AppConfig, PasswordConfig};
use quill_core::types::{CommentId, PostId, RoleId, UserId};
use quill_database::memory::MemoryStore;
use quill_entity::content::{Comment, Post};
use quill_entity::permission::{Action, Permission, Resource};
use quill_entity::user::User;

const FIXTURES: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/../quill-auth/tests/fixtures");

/// Test application context
pub struct TestApp {
    /// The Axum router for making test requests
    pub router: Router,
    /// Backing in-memory store
    pub store: MemoryStore,
    /// Shared state, for direct access to the auth core
    pub state: AppState,
    hasher: PasswordHasher,
}

/// A response with its JSON body decoded.
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestResponse {
    /// `Set-Cookie` header for the named cookie.
    pub fn set_cookie(&self, name: &str) -> Option<String> {
        self.headers
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .find(|v| v.starts_with(&format!("{name}=")))
            .map(String::from)
    }

    /// Value of the named cookie as set by this response.
    pub fn cookie_value(&self, name: &str) -> Option<String> {
        let header = self.set_cookie(name)?;
        let pair = header.split(';').next()?;
        pair.split_once('=').map(|(_, v)| v.to_string())
    }
}

/// Tokens as delivered by the login cookies.
pub struct Tokens {
    pub access: String,
    pub refresh: String,
}

fn fast_password_config() -> PasswordConfig {
    PasswordConfig {
        memory_kib: 1024,
        iterations: 1,
        parallelism: 1,
        ..PasswordConfig::default()
    }
}

impl TestApp {
    /// Create a new test application over an empty in-memory store
    pub fn new() -> Self {
        let mut config = AppConfig::default();
        config.auth.private_key_path = format!("{FIXTURES}/private.pem");
        config.auth.public_key_path = format!("{FIXTURES}/public.pem");
        config.auth.password = fast_password_config();

        let tokens = TokenManager::load(&config.auth).expect("Failed to load test keys");
        let store = MemoryStore::new();
        let state = AppState::new(config, tokens, Repositories::from_memory(&store))
            .expect("Failed to build state");

        Self {
            router: build_app(state.clone()),
            store,
            state,
            hasher: PasswordHasher::new(&fast_password_config()).expect("hasher"),
        }
    }

    /// Create a user whose role holds exactly `grants`
    pub fn create_user(&self, email: &str, password: &str, grants: &[(Resource, Action)]) -> User {
        let now = Utc::now();
        let user = User {
            id: UserId::new(),
            email: email.to_string(),
            username: email.split('@').next().unwrap_or(email).to_string(),
            role_id: RoleId::new(),
            password_hash: Some(self.hasher.hash(password).expect("hash")),
            verified_email: true,
            created_at: now,
            updated_at: now,
        };
        self.store.users.insert(user.clone());
        self.store.roles.set_permissions(
            user.role_id,
            grants
                .iter()
                .map(|(resource, action)| Permission::new(*resource, *action))
                .collect(),
        );
        user
    }

    /// Create a post owned by `owner`
    pub fn create_post(&self, owner: UserId) -> Post {
        let post = Post {
            id: PostId::new(),
            user_id: owner,
            title: "A post".to_string(),
            published: true,
            created_at: Utc::now(),
        };
        self.store.content.insert_post(post.clone());
        post
    }

    /// Create a comment owned by `owner`
    pub fn create_comment(&self, owner: UserId, post_id: PostId) -> Comment {
        let comment = Comment {
            id: CommentId::new(),
            user_id: owner,
            post_id,
            content: "Nice".to_string(),
            created_at: Utc::now(),
        };
        self.store.content.insert_comment(comment.clone());
        comment
    }

    /// Send a request through the router
    pub async fn request(
        &self,
        method: &str,
        uri: &str,
        body: Option<Value>,
        bearer: Option<&str>,
        cookie: Option<&str>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = bearer {
            builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
        }
        if let Some(cookie) = cookie {
            builder = builder.header(COOKIE, cookie);
        }

        let request = match body {
            Some(json) => builder
                .header(CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("request");

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

        TestResponse {
            status,
            headers,
            body,
        }
    }

    /// Re-signs `access_token` with the real key but an `exp` in the past
    pub fn expired_access_token(&self, access_token: &str) -> String {
        let mut claims = self
            .state
            .tokens
            .verify_access_token(access_token)
            .expect("valid access token");
        claims.iat -= 3600;
        claims.exp = Utc::now().timestamp() - 60;

        let pem = std::fs::read(format!("{FIXTURES}/private.pem")).expect("private key");
        let key = EncodingKey::from_rsa_pem(&pem).expect("encoding key");
        encode(&Header::new(Algorithm::RS256), &claims, &key).expect("sign")
    }

    /// Log in and return the cookie-delivered tokens
    pub async fn login(&self, email: &str, password: &str) -> Tokens {
        let response = self
            .request(
                "POST",
                "/api/auth/login",
                Some(serde_json::json!({ "email": email, "password": password })),
                None,
                None,
            )
            .await;
        assert_eq!(response.status, StatusCode::OK, "login failed: {}", response.body);

        Tokens {
            access: response.cookie_value("accessToken").expect("access cookie"),
            refresh: response.cookie_value("refreshToken").expect("refresh cookie"),
        }
    }
}
