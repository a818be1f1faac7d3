//! Signed bearer tokens (HS256 JWT) and the cookie that carries them.

use chrono::{DateTime, TimeDelta, Utc};
use cookie::{Cookie, SameSite};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::domain::UserId;
use crate::error::ApiError;

/// Name of the HTTP-only cookie holding the token.
pub const TOKEN_COOKIE: &str = "token";

/// JWT claims carried by every token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the user id.
    pub sub: UserId,
    /// Issued-at, seconds since the epoch.
    pub iat: i64,
    /// Expiry, seconds since the epoch.
    pub exp: i64,
}

/// Issues and verifies tokens with a shared HMAC secret.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: TimeDelta,
    cookie_secure: bool,
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("ttl", &self.ttl)
            .field("cookie_secure", &self.cookie_secure)
            .finish_non_exhaustive()
    }
}

impl TokenIssuer {
    /// Creates an issuer signing with `secret`; tokens live `ttl_hours`.
    #[must_use]
    pub fn new(secret: &str, ttl_hours: u64, cookie_secure: bool) -> Self {
        let hours = i64::try_from(ttl_hours).unwrap_or(i64::MAX);
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::new(Algorithm::HS256),
            ttl: TimeDelta::try_hours(hours).unwrap_or(TimeDelta::MAX),
            cookie_secure,
        }
    }

    /// Signs a token for `user_id`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Internal`] if signing fails.
    pub fn issue(&self, user_id: UserId) -> Result<String, ApiError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id,
            iat: now.timestamp(),
            exp: now
                .checked_add_signed(self.ttl)
                .unwrap_or(DateTime::<Utc>::MAX_UTC)
                .timestamp(),
        };
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| ApiError::Internal(format!("token signing failed: {e}")))
    }

    /// Verifies a token and returns the user id it was issued for.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Unauthorized`] if the token is malformed, has a
    /// bad signature or has expired.
    pub fn verify(&self, token: &str) -> Result<UserId, ApiError> {
        jsonwebtoken::decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims.sub)
            .map_err(|e| ApiError::Unauthorized(format!("invalid token: {e}")))
    }

    /// Builds the `Set-Cookie` value carrying `token`.
    #[must_use]
    pub fn session_cookie(&self, token: &str) -> String {
        Cookie::build((TOKEN_COOKIE, token.to_string()))
            .path("/")
            .http_only(true)
            .secure(self.cookie_secure)
            .same_site(SameSite::Lax)
            .max_age(cookie::time::Duration::seconds(self.ttl.num_seconds()))
            .build()
            .to_string()
    }

    /// Builds the `Set-Cookie` value that clears the session cookie.
    #[must_use]
    pub fn removal_cookie(&self) -> String {
        let mut cookie = Cookie::build((TOKEN_COOKIE, ""))
            .path("/")
            .http_only(true)
            .secure(self.cookie_secure)
            .same_site(SameSite::Lax)
            .build();
        cookie.make_removal();
        cookie.to_string()
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn issued_token_verifies_to_same_user() {
        let issuer = TokenIssuer::new("secret", 1, false);
        let user = UserId::new();
        let Ok(token) = issuer.issue(user) else {
            panic!("signing failed");
        };
        let Ok(verified) = issuer.verify(&token) else {
            panic!("verification failed");
        };
        assert_eq!(verified, user);
    }

    #[test]
    fn token_from_other_secret_is_rejected() {
        let issuer = TokenIssuer::new("secret", 1, false);
        let other = TokenIssuer::new("another-secret", 1, false);
        let Ok(token) = other.issue(UserId::new()) else {
            panic!("signing failed");
        };
        assert!(matches!(
            issuer.verify(&token),
            Err(ApiError::Unauthorized(_))
        ));
    }

    #[test]
    fn garbage_is_rejected() {
        let issuer = TokenIssuer::new("secret", 1, false);
        assert!(issuer.verify("not.a.token").is_err());
    }

    #[test]
    fn session_cookie_is_http_only() {
        let issuer = TokenIssuer::new("secret", 1, true);
        let cookie = issuer.session_cookie("abc");
        assert!(cookie.starts_with("token=abc"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("Secure"));
        assert!(cookie.contains("Max-Age=3600"));
    }

    #[test]
    fn removal_cookie_expires_immediately() {
        let issuer = TokenIssuer::new("secret", 1, false);
        let cookie = issuer.removal_cookie();
        assert!(cookie.starts_with("token=;"));
        assert!(cookie.contains("Max-Age=0"));
    }
}
