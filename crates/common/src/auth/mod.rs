//! Authentication utilities
//!
//! Provides:
//! - JWT token generation and validation
//! - Optional caller identity extraction (`MaybeAuth`)
//! - Argon2 password hashing for stored users

use crate::config::AuthConfig;
use crate::errors::{AppError, Result};
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use rand::rngs::OsRng;
use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// Identity of an authenticated caller
#[derive(Debug, Clone)]
pub struct AuthContext {
    /// Tenant the caller belongs to
    pub tenant_id: Uuid,

    /// User ID from the token subject
    pub user_id: Uuid,

    /// Role claim, e.g. `super_admin`
    pub role: String,

    /// Request ID for tracing
    pub request_id: String,
}

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct JwtClaims {
    /// Subject (user ID)
    pub sub: String,

    /// Tenant ID
    pub tenant_id: String,

    #[serde(default)]
    pub role: String,

    /// Expiration time (Unix timestamp)
    pub exp: i64,

    /// Issued at (Unix timestamp)
    pub iat: i64,
}

/// JWT token manager
pub struct JwtManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    expiration_secs: i64,
}

impl JwtManager {
    /// Create a new JWT manager with the given secret
    pub fn new(secret: &str, expiration_secs: u64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            expiration_secs: expiration_secs as i64,
        }
    }

    /// Generate a new JWT token
    pub fn generate_token(&self, user_id: Uuid, tenant_id: Uuid, role: &str) -> Result<String> {
        let now = Utc::now();
        let exp = now + Duration::seconds(self.expiration_secs);

        let claims = JwtClaims {
            sub: user_id.to_string(),
            tenant_id: tenant_id.to_string(),
            role: role.to_string(),
            exp: exp.timestamp(),
            iat: now.timestamp(),
        };

        encode(&Header::default(), &claims, &self.encoding_key).map_err(|e| AppError::Internal {
            message: format!("Failed to generate token: {}", e),
        })
    }

    /// Validate and decode a JWT token
    pub fn validate_token(&self, token: &str) -> Result<JwtClaims> {
        decode::<JwtClaims>(token, &self.decoding_key, &Validation::default())
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AppError::ExpiredToken,
                _ => AppError::InvalidToken,
            })
    }
}

/// Resolves bearer tokens into [`AuthContext`]s.
///
/// Without a configured secret every presented token is rejected;
/// anonymous requests are unaffected.
#[derive(Clone, Default)]
pub struct Authenticator {
    jwt: Option<Arc<JwtManager>>,
}

impl Authenticator {
    pub fn new(jwt: Option<JwtManager>) -> Self {
        Self {
            jwt: jwt.map(Arc::new),
        }
    }

    pub fn from_config(config: &AuthConfig) -> Self {
        let jwt = config
            .jwt_secret
            .as_deref()
            .map(|secret| JwtManager::new(secret, config.jwt_expiration_secs));
        Self::new(jwt)
    }

    /// Authenticate the value of an `Authorization` header
    pub fn authenticate(&self, auth_header: &str, request_id: String) -> Result<AuthContext> {
        let token = extract_bearer(auth_header).ok_or_else(|| AppError::Unauthorized {
            message: "Expected a Bearer token".to_string(),
        })?;

        let jwt = self.jwt.as_ref().ok_or_else(|| AppError::Unauthorized {
            message: "Bearer authentication is not configured".to_string(),
        })?;

        let claims = jwt.validate_token(token)?;

        let tenant_id = Uuid::parse_str(&claims.tenant_id).map_err(|_| AppError::InvalidToken)?;
        let user_id = Uuid::parse_str(&claims.sub).map_err(|_| AppError::InvalidToken)?;

        Ok(AuthContext {
            tenant_id,
            user_id,
            role: claims.role,
            request_id,
        })
    }
}

/// Extract the token from a `Bearer` Authorization header
pub fn extract_bearer(auth_header: &str) -> Option<&str> {
    auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Hash a password into an Argon2id PHC string
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal {
            message: format!("Failed to hash password: {}", e),
        })
}

/// Check a password against a stored PHC string
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    PasswordHash::new(stored_hash)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

/// Optional caller identity.
///
/// Missing `Authorization` header yields `MaybeAuth(None)`; a header that is
/// present but does not authenticate is rejected with 401.
#[derive(Debug, Clone)]
pub struct MaybeAuth(pub Option<AuthContext>);

impl MaybeAuth {
    pub fn tenant_id(&self) -> Option<Uuid> {
        self.0.as_ref().map(|ctx| ctx.tenant_id)
    }
}

impl<S> FromRequestParts<S> for MaybeAuth
where
    S: Send + Sync,
    Authenticator: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self> {
        let Some(auth_header) = parts.headers.get(AUTHORIZATION) else {
            return Ok(MaybeAuth(None));
        };

        let auth_header = auth_header.to_str().map_err(|_| AppError::Unauthorized {
            message: "Malformed Authorization header".to_string(),
        })?;

        let request_id = parts
            .headers
            .get("x-request-id")
            .and_then(|v| v.to_str().ok())
            .map(String::from)
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let ctx = Authenticator::from_ref(state).authenticate(auth_header, request_id)?;

        tracing::debug!(
            request_id = %ctx.request_id,
            user_id = %ctx.user_id,
            tenant_id = %ctx.tenant_id,
            role = %ctx.role,
            "Caller authenticated"
        );

        Ok(MaybeAuth(Some(ctx)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts_with(auth: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/api/contacts");
        if let Some(value) = auth {
            builder = builder.header(AUTHORIZATION, value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_password_roundtrip() {
        let hash = hash_password("admin123").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("admin123", &hash));
        assert!(!verify_password("wrong", &hash));
        assert!(!verify_password("admin123", "not-a-phc-string"));
    }

    #[test]
    fn test_password_hashes_are_salted() {
        let a = hash_password("same").unwrap();
        let b = hash_password("same").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_extract_bearer() {
        assert_eq!(extract_bearer("Bearer abc.def"), Some("abc.def"));
        assert_eq!(extract_bearer("Bearer "), None);
        assert_eq!(extract_bearer("abc.def"), None);
        assert_eq!(extract_bearer("Basic abc"), None);
    }

    #[test]
    fn test_jwt_roundtrip() {
        let manager = JwtManager::new("test_secret", 3600);

        let user_id = Uuid::new_v4();
        let tenant_id = Uuid::new_v4();

        let token = manager.generate_token(user_id, tenant_id, "super_admin").unwrap();
        let claims = manager.validate_token(&token).unwrap();

        assert_eq!(claims.sub, user_id.to_string());
        assert_eq!(claims.tenant_id, tenant_id.to_string());
        assert_eq!(claims.role, "super_admin");
    }

    #[test]
    fn test_expired_token() {
        let manager = JwtManager::new("test_secret", 3600);
        let past = Utc::now() - Duration::hours(2);
        let claims = JwtClaims {
            sub: Uuid::new_v4().to_string(),
            tenant_id: Uuid::new_v4().to_string(),
            role: String::new(),
            exp: past.timestamp(),
            iat: past.timestamp(),
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(b"test_secret"),
        )
        .unwrap();

        assert!(matches!(manager.validate_token(&token), Err(AppError::ExpiredToken)));
    }

    #[test]
    fn test_authenticate_wrong_secret() {
        let issuer = JwtManager::new("issuer", 3600);
        let token = issuer
            .generate_token(Uuid::new_v4(), Uuid::new_v4(), "agent")
            .unwrap();

        let authenticator = Authenticator::new(Some(JwtManager::new("other", 3600)));
        let result = authenticator.authenticate(&format!("Bearer {}", token), "req".into());
        assert!(matches!(result, Err(AppError::InvalidToken)));
    }

    #[tokio::test]
    async fn test_maybe_auth_anonymous() {
        let authenticator = Authenticator::default();
        let mut parts = parts_with(None);

        let auth = MaybeAuth::from_request_parts(&mut parts, &authenticator)
            .await
            .unwrap();
        assert!(auth.0.is_none());
    }

    #[tokio::test]
    async fn test_maybe_auth_resolves_tenant() {
        let authenticator = Authenticator::new(Some(JwtManager::new("secret", 3600)));
        let tenant_id = Uuid::new_v4();
        let user_id = Uuid::new_v4();
        let token = JwtManager::new("secret", 3600)
            .generate_token(user_id, tenant_id, "agent")
            .unwrap();
        let mut parts = parts_with(Some(&format!("Bearer {}", token)));
        parts
            .headers
            .insert("x-request-id", "req-42".parse().unwrap());

        let auth = MaybeAuth::from_request_parts(&mut parts, &authenticator)
            .await
            .unwrap();
        assert_eq!(auth.tenant_id(), Some(tenant_id));

        let ctx = auth.0.unwrap();
        assert_eq!(ctx.user_id, user_id);
        assert_eq!(ctx.role, "agent");
        assert_eq!(ctx.request_id, "req-42");
    }

    #[tokio::test]
    async fn test_maybe_auth_rejects_without_secret() {
        let authenticator = Authenticator::default();
        let mut parts = parts_with(Some("Bearer something"));

        let result = MaybeAuth::from_request_parts(&mut parts, &authenticator).await;
        assert!(matches!(result, Err(AppError::Unauthorized { .. })));
    }
}
