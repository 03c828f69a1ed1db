use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use axum::http::{header, HeaderMap};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::SecurityConfig;
use crate::types::Role;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    pub user_id: i64,
    pub email: String,
    pub role: Role,
    pub tenant_id: Option<i64>,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    pub fn new(user_id: i64, email: String, role: Role, tenant_id: Option<i64>, expiry_hours: u64) -> Self {
        let now = Utc::now();
        let exp = (now + Duration::hours(expiry_hours as i64)).timestamp();

        Self {
            user_id,
            email,
            role,
            tenant_id,
            iat: now.timestamp(),
            exp,
        }
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("no credential supplied")]
    MissingToken,

    #[error("invalid token: {0}")]
    InvalidToken(String),

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("password hashing failed: {0}")]
    Hashing(String),

    #[error("JWT generation error: {0}")]
    TokenGeneration(String),
}

pub fn generate_jwt(claims: &Claims, security: &SecurityConfig) -> Result<String, AuthError> {
    if security.jwt_secret.is_empty() {
        return Err(AuthError::TokenGeneration("JWT secret not configured".to_string()));
    }

    let encoding_key = EncodingKey::from_secret(security.jwt_secret.as_bytes());
    encode(&Header::new(Algorithm::HS256), claims, &encoding_key)
        .map_err(|e| AuthError::TokenGeneration(e.to_string()))
}

/// Verify signature and expiry, returning the claims.
pub fn validate_jwt(token: &str, security: &SecurityConfig) -> Result<Claims, AuthError> {
    if security.jwt_secret.is_empty() {
        return Err(AuthError::InvalidToken("JWT secret not configured".to_string()));
    }

    let decoding_key = DecodingKey::from_secret(security.jwt_secret.as_bytes());
    let validation = Validation::new(Algorithm::HS256);

    decode::<Claims>(token, &decoding_key, &validation)
        .map(|data| data.claims)
        .map_err(|e| AuthError::InvalidToken(e.to_string()))
}

/// Hash a password into an Argon2id PHC string.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AuthError::Hashing(e.to_string()))
}

/// `Ok(false)` on mismatch, `Err` only when the stored hash is malformed.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|e| AuthError::Hashing(format!("invalid hash format: {e}")))?;

    match Argon2::default().verify_password(password.as_bytes(), &parsed_hash) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(AuthError::Hashing(format!("verify error: {e}"))),
    }
}

/// Token from the session cookie, falling back to `Authorization: Bearer`.
pub fn extract_token(headers: &HeaderMap, cookie_name: &str) -> Result<String, AuthError> {
    if let Some(token) = token_from_cookies(headers, cookie_name) {
        return Ok(token);
    }

    let Some(auth_header) = headers.get(header::AUTHORIZATION) else {
        return Err(AuthError::MissingToken);
    };
    let auth_str = auth_header
        .to_str()
        .map_err(|_| AuthError::InvalidToken("Invalid Authorization header format".to_string()))?;

    match auth_str.strip_prefix("Bearer ") {
        Some(token) if !token.trim().is_empty() => Ok(token.trim().to_string()),
        _ => Err(AuthError::MissingToken),
    }
}

fn token_from_cookies(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == cookie_name && !value.is_empty())
        .map(|(_, value)| value.to_string())
}

/// `Set-Cookie` value carrying a freshly issued token.
pub fn session_cookie(token: &str, security: &SecurityConfig, max_age_secs: u64) -> String {
    let mut cookie = format!(
        "{}={}; HttpOnly; SameSite=Lax; Path=/; Max-Age={}",
        security.cookie_name, token, max_age_secs
    );
    if security.require_https {
        cookie.push_str("; Secure");
    }
    cookie
}

/// `Set-Cookie` value that makes the browser drop the session.
pub fn clear_cookie(security: &SecurityConfig) -> String {
    let mut cookie = format!("{}=; HttpOnly; SameSite=Lax; Path=/; Max-Age=0", security.cookie_name);
    if security.require_https {
        cookie.push_str("; Secure");
    }
    cookie
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use axum::http::HeaderValue;

    fn security() -> SecurityConfig {
        AppConfig::development().security
    }

    #[test]
    fn jwt_round_trip_keeps_identity() {
        let security = security();
        let claims = Claims::new(7, "a@b.test".into(), Role::Accountant, Some(3), 1);
        let token = generate_jwt(&claims, &security).unwrap();
        let decoded = validate_jwt(&token, &security).unwrap();
        assert_eq!(decoded.user_id, 7);
        assert_eq!(decoded.role, Role::Accountant);
        assert_eq!(decoded.tenant_id, Some(3));
    }

    #[test]
    fn jwt_with_other_secret_is_rejected() {
        let security = security();
        let claims = Claims::new(1, "a@b.test".into(), Role::SystemAdmin, None, 1);
        let token = generate_jwt(&claims, &security).unwrap();

        let mut other = security.clone();
        other.jwt_secret = "another-secret".into();
        assert!(matches!(validate_jwt(&token, &other), Err(AuthError::InvalidToken(_))));
    }

    #[test]
    fn expired_jwt_is_rejected() {
        let security = security();
        let mut claims = Claims::new(1, "a@b.test".into(), Role::SystemAdmin, None, 1);
        claims.exp = Utc::now().timestamp() - 3600;
        let token = generate_jwt(&claims, &security).unwrap();
        assert!(validate_jwt(&token, &security).is_err());
    }

    #[test]
    fn password_hash_verifies() {
        let hash = hash_password("hunter22").unwrap();
        assert!(verify_password("hunter22", &hash).unwrap());
        assert!(!verify_password("wrong", &hash).unwrap());
        assert!(verify_password("pw", "not-a-hash").is_err());
    }

    #[test]
    fn cookie_wins_over_bearer() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("theme=dark; token=from-cookie"));
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer from-header"));
        assert_eq!(extract_token(&headers, "token").unwrap(), "from-cookie");

        headers.remove(header::COOKIE);
        assert_eq!(extract_token(&headers, "token").unwrap(), "from-header");

        headers.remove(header::AUTHORIZATION);
        assert!(matches!(extract_token(&headers, "token"), Err(AuthError::MissingToken)));
    }

    #[test]
    fn cookies_carry_expected_attributes() {
        let mut security = security();
        let cookie = session_cookie("abc", &security, 604_800);
        assert_eq!(cookie, "token=abc; HttpOnly; SameSite=Lax; Path=/; Max-Age=604800");

        security.require_https = true;
        assert!(clear_cookie(&security).contains("Max-Age=0"));
        assert!(clear_cookie(&security).ends_with("; Secure"));
    }
}
