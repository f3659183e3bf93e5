//! Cookie transport for the token pair.

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};

use quill_auth::jwt::{TokenManager, TokenPair};

/// Cookie carrying the access token.
pub const ACCESS_TOKEN_COOKIE: &str = "accessToken";
/// Cookie carrying the refresh token.
pub const REFRESH_TOKEN_COOKIE: &str = "refreshToken";

/// Adds both token cookies, each living as long as its token.
pub fn set_token_cookies(
    jar: CookieJar,
    pair: &TokenPair,
    tokens: &TokenManager,
    secure: bool,
) -> CookieJar {
    jar.add(token_cookie(
        ACCESS_TOKEN_COOKIE,
        pair.access_token.clone(),
        to_time(tokens.access_ttl()),
        secure,
    ))
    .add(token_cookie(
        REFRESH_TOKEN_COOKIE,
        pair.refresh_token.clone(),
        to_time(tokens.refresh_ttl()),
        secure,
    ))
}

/// Overwrites both token cookies with empty, already-expired ones.
pub fn clear_token_cookies(jar: CookieJar, secure: bool) -> CookieJar {
    jar.add(token_cookie(
        ACCESS_TOKEN_COOKIE,
        String::new(),
        time::Duration::ZERO,
        secure,
    ))
    .add(token_cookie(
        REFRESH_TOKEN_COOKIE,
        String::new(),
        time::Duration::ZERO,
        secure,
    ))
}

fn token_cookie(
    name: &'static str,
    value: String,
    max_age: time::Duration,
    secure: bool,
) -> Cookie<'static> {
    Cookie::build((name, value))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Strict)
        .path("/")
        .max_age(max_age)
        .build()
}

fn to_time(ttl: chrono::Duration) -> time::Duration {
    time::Duration::seconds(ttl.num_seconds())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_cookie_attributes() {
        let cookie = token_cookie(
            ACCESS_TOKEN_COOKIE,
            "abc".into(),
            time::Duration::minutes(15),
            true,
        );
        let header = cookie.to_string();

        assert!(header.starts_with("accessToken=abc"));
        assert!(header.contains("HttpOnly"));
        assert!(header.contains("Secure"));
        assert!(header.contains("SameSite=Strict"));
        assert!(header.contains("Path=/"));
        assert!(header.contains("Max-Age=900"));
    }

    #[test]
    fn test_development_cookies_are_not_secure() {
        let cookie = token_cookie(REFRESH_TOKEN_COOKIE, "r".into(), time::Duration::hours(1), false);
        assert!(!cookie.to_string().contains("Secure"));
    }

    #[test]
    fn test_cleared_cookies_expire_immediately() {
        let jar = clear_token_cookies(CookieJar::new(), true);
        let access = jar.get(ACCESS_TOKEN_COOKIE).unwrap();
        assert_eq!(access.value(), "");
        assert_eq!(access.max_age(), Some(time::Duration::ZERO));
        assert!(jar.get(REFRESH_TOKEN_COOKIE).is_some());
    }
}
