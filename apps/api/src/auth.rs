//! JWT authentication module.
//!
//! Issues and validates access tokens, and provides the [`AuthUser`]
//! extractor that turns a `Authorization: Bearer <token>` header into the
//! calling account.

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, TokenData, Validation};
use mizhiwu_core::{Actor, User};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiError;
use crate::AppState;

const ACCESS: &str = "access";

/// JWT claims structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user id)
    pub sub: String,

    /// Username at issue time
    pub username: String,

    /// Staff flag at issue time
    pub is_staff: bool,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration (Unix timestamp)
    pub exp: i64,

    /// JWT ID (unique identifier for this token)
    pub jti: String,

    /// Token type
    pub token_type: String,
}

impl Claims {
    /// User id carried in `sub`.
    pub fn user_id(&self) -> Result<i64, ApiError> {
        self.sub
            .parse()
            .map_err(|_| ApiError::unauthenticated("token subject is not a user id"))
    }
}

/// JWT token manager.
pub struct JwtManager {
    secret: String,
    access_lifetime_secs: i64,
}

impl JwtManager {
    /// Create a new JWT manager.
    pub fn new(secret: String, access_lifetime_secs: i64) -> Self {
        JwtManager {
            secret,
            access_lifetime_secs,
        }
    }

    /// Generate an access token for `user`.
    pub fn generate_access_token(&self, user: &User) -> Result<String, ApiError> {
        let now = Utc::now();
        let exp = now + Duration::seconds(self.access_lifetime_secs);

        let claims = Claims {
            sub: user.id.to_string(),
            username: user.username.clone(),
            is_staff: user.is_staff,
            iat: now.timestamp(),
            exp: exp.timestamp(),
            jti: Uuid::new_v4().to_string(),
            token_type: ACCESS.to_string(),
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| ApiError::Internal(format!("Failed to generate token: {}", e)))
    }

    /// Validate and decode a token.
    pub fn validate_token(&self, token: &str) -> Result<Claims, ApiError> {
        let validation = Validation::default();

        let token_data: TokenData<Claims> = decode(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &validation,
        )
        .map_err(|e| ApiError::unauthenticated(format!("invalid token: {}", e)))?;

        Ok(token_data.claims)
    }

    /// Validate that a token is an access token.
    pub fn validate_access_token(&self, token: &str) -> Result<Claims, ApiError> {
        let claims = self.validate_token(token)?;

        if claims.token_type != ACCESS {
            return Err(ApiError::unauthenticated("expected an access token"));
        }

        Ok(claims)
    }
}

/// Extract bearer token from authorization header.
pub fn extract_bearer_token(auth_header: &str) -> Option<&str> {
    auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

// =============================================================================
// Extractor
// =============================================================================

/// The authenticated account behind a request.
///
/// The account is reloaded on every request, so a deleted user's token
/// stops working and staff changes apply immediately.
#[derive(Debug, Clone)]
pub struct AuthUser(pub User);

impl AuthUser {
    pub fn actor(&self) -> Actor {
        Actor {
            id: self.0.id,
            is_staff: self.0.is_staff,
        }
    }

    /// Rejects callers that are not staff.
    pub fn require_staff(&self) -> Result<(), ApiError> {
        if self.0.is_staff {
            Ok(())
        } else {
            Err(ApiError::PermissionDenied)
        }
    }
}

impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &Arc<AppState>) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| ApiError::unauthenticated("authentication credentials were not provided"))?;

        let token = extract_bearer_token(header)
            .ok_or_else(|| ApiError::unauthenticated("expected a Bearer token"))?;

        let claims = state.jwt.validate_access_token(token)?;
        let user = state
            .db
            .users()
            .get_by_id(claims.user_id()?)
            .await?
            .ok_or_else(|| ApiError::unauthenticated("user not found"))?;

        Ok(AuthUser(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mizhiwu_core::Money;

    fn user(id: i64, is_staff: bool) -> User {
        User {
            id,
            username: format!("user{}", id),
            email: format!("user{}@example.com", id),
            password_hash: String::new(),
            is_staff,
            balance: Money::zero(),
            level: 0,
            level_expire_time: None,
            transfer_enable: 0,
            invite_user_id: None,
            invite_user: None,
            invitecode_num: 5,
            port: 10_001,
            method: "aes-256-cfb".to_string(),
            sspasswd: "secret".to_string(),
            protocol: "origin".to_string(),
            protocol_param: String::new(),
            obfs: "plain".to_string(),
            obfs_param: String::new(),
            enable: true,
            last_use_time: 0,
            upload_traffic: 0,
            download_traffic: 0,
            theme: "default".to_string(),
            date_joined: Utc::now(),
        }
    }

    #[test]
    fn test_jwt_roundtrip() {
        let manager = JwtManager::new("test-secret".to_string(), 3600);

        let token = manager.generate_access_token(&user(7, true)).unwrap();
        let claims = manager.validate_access_token(&token).unwrap();

        assert_eq!(claims.sub, "7");
        assert_eq!(claims.user_id().unwrap(), 7);
        assert_eq!(claims.username, "user7");
        assert!(claims.is_staff);
        assert_eq!(claims.token_type, "access");
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let issuer = JwtManager::new("one".to_string(), 3600);
        let verifier = JwtManager::new("two".to_string(), 3600);

        let token = issuer.generate_access_token(&user(1, false)).unwrap();
        assert!(matches!(
            verifier.validate_access_token(&token),
            Err(ApiError::Unauthenticated(_))
        ));
    }

    #[test]
    fn test_expired_token_rejected() {
        // Past the default 60s leeway
        let manager = JwtManager::new("test-secret".to_string(), -120);

        let token = manager.generate_access_token(&user(1, false)).unwrap();
        assert!(manager.validate_access_token(&token).is_err());
    }

    #[test]
    fn test_extract_bearer_token() {
        assert_eq!(extract_bearer_token("Bearer abc.def"), Some("abc.def"));
        assert_eq!(extract_bearer_token("Bearer "), None);
        assert_eq!(extract_bearer_token("Token abc"), None);
    }
}
