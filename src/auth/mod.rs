/*!
 * # Authentication and Authorization Module
 *
 * JWT bearer authentication for the storefront API. Access and refresh
 * tokens are issued on registration and login; passwords are hashed with
 * Argon2. Handlers opt into authentication through the `AuthenticatedUser`
 * extractor, and into the staff-only surface through `StaffUser`.
 */

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use async_trait::async_trait;
use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use chrono::{Duration as ChronoDuration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::entities::user;
use crate::errors::ServiceError;
use crate::AppState;

const TOKEN_USE_ACCESS: &str = "access";
const TOKEN_USE_REFRESH: &str = "refresh";

/// Claim structure for JWT tokens
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,       // Subject (user ID)
    pub username: String,  // Login name, echoed for convenience
    pub is_staff: bool,    // Staff flag for the admin surface
    pub token_use: String, // "access" or "refresh"
    pub jti: String,       // JWT ID (unique identifier for this token)
    pub iat: i64,          // Issued at time
    pub exp: i64,          // Expiration time
    pub nbf: i64,          // Not valid before time
    pub iss: String,       // Issuer
    pub aud: String,       // Audience
}

/// Authentication configuration
#[derive(Clone, Debug)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub jwt_audience: String,
    pub jwt_issuer: String,
    pub access_token_expiration: Duration,
    pub refresh_token_expiration: Duration,
}

impl AuthConfig {
    pub fn new(
        jwt_secret: String,
        jwt_audience: String,
        jwt_issuer: String,
        access_token_expiration: Duration,
        refresh_token_expiration: Duration,
    ) -> Self {
        Self {
            jwt_secret,
            jwt_audience,
            jwt_issuer,
            access_token_expiration,
            refresh_token_expiration,
        }
    }

    pub fn from_app_config(cfg: &AppConfig) -> Self {
        Self {
            jwt_secret: cfg.jwt_secret.clone(),
            jwt_audience: cfg.auth_audience.clone(),
            jwt_issuer: cfg.auth_issuer.clone(),
            access_token_expiration: Duration::from_secs(cfg.jwt_expiration as u64),
            refresh_token_expiration: Duration::from_secs(cfg.refresh_token_expiration as u64),
        }
    }
}

/// Access/refresh token pair returned by login, register, and refresh
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub refresh_expires_in: i64,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Missing credentials")]
    MissingCredentials,
    #[error("Wrong credentials")]
    WrongCredentials,
    #[error("Account is inactive")]
    UserInactive,
    #[error("Invalid token")]
    InvalidToken,
    #[error("Token expired")]
    TokenExpired,
    #[error("Token creation failed: {0}")]
    TokenCreation(String),
    #[error("Password hashing failed: {0}")]
    PasswordHash(String),
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl From<AuthError> for ServiceError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingCredentials => {
                ServiceError::Unauthorized("Missing credentials".into())
            }
            AuthError::WrongCredentials => ServiceError::Unauthorized("Wrong credentials".into()),
            AuthError::UserInactive => ServiceError::Unauthorized("Account is inactive".into()),
            AuthError::InvalidToken => ServiceError::JwtError("Invalid token".into()),
            AuthError::TokenExpired => ServiceError::JwtError("Token expired".into()),
            AuthError::TokenCreation(msg) => ServiceError::JwtError(msg),
            AuthError::PasswordHash(msg) => ServiceError::HashError(msg),
            AuthError::InternalError(msg) => ServiceError::InternalError(msg),
        }
    }
}

/// Authentication service that handles token issuance and validation
#[derive(Debug, Clone)]
pub struct AuthService {
    pub config: AuthConfig,
}

impl AuthService {
    /// Create a new authentication service
    pub fn new(config: AuthConfig) -> Self {
        Self { config }
    }

    /// Generate an access/refresh token pair for a user
    pub fn generate_token_pair(&self, account: &user::Model) -> Result<TokenPair, AuthError> {
        let now = Utc::now();
        let access_exp = now
            + ChronoDuration::from_std(self.config.access_token_expiration)
                .map_err(|_| AuthError::InternalError("Invalid token duration".to_string()))?;
        let refresh_exp = now
            + ChronoDuration::from_std(self.config.refresh_token_expiration)
                .map_err(|_| AuthError::InternalError("Invalid token duration".to_string()))?;

        let access_claims = self.claims_for(account, TOKEN_USE_ACCESS, now.timestamp(), access_exp.timestamp());
        let refresh_claims =
            self.claims_for(account, TOKEN_USE_REFRESH, now.timestamp(), refresh_exp.timestamp());

        let key = EncodingKey::from_secret(self.config.jwt_secret.as_bytes());
        let header = Header::new(Algorithm::HS256);

        let access_token = encode(&header, &access_claims, &key)
            .map_err(|e| AuthError::TokenCreation(e.to_string()))?;
        let refresh_token = encode(&header, &refresh_claims, &key)
            .map_err(|e| AuthError::TokenCreation(e.to_string()))?;

        Ok(TokenPair {
            access_token,
            refresh_token,
            token_type: "Bearer".to_string(),
            expires_in: self.config.access_token_expiration.as_secs() as i64,
            refresh_expires_in: self.config.refresh_token_expiration.as_secs() as i64,
        })
    }

    fn claims_for(&self, account: &user::Model, token_use: &str, iat: i64, exp: i64) -> Claims {
        Claims {
            sub: account.id.to_string(),
            username: account.username.clone(),
            is_staff: account.is_staff,
            token_use: token_use.to_string(),
            jti: Uuid::new_v4().to_string(),
            iat,
            exp,
            nbf: iat,
            iss: self.config.jwt_issuer.clone(),
            aud: self.config.jwt_audience.clone(),
        }
    }

    /// Validate a JWT token and extract the claims
    pub fn validate_token(&self, token: &str) -> Result<Claims, AuthError> {
        let claims = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.config.jwt_secret.as_bytes()),
            &Validation::new(Algorithm::HS256),
        )
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            _ => AuthError::InvalidToken,
        })?
        .claims;

        Ok(claims)
    }

    /// Validate an access token specifically (rejects refresh tokens)
    pub fn validate_access_token(&self, token: &str) -> Result<Claims, AuthError> {
        let claims = self.validate_token(token)?;
        if claims.token_use != TOKEN_USE_ACCESS {
            return Err(AuthError::InvalidToken);
        }
        Ok(claims)
    }

    /// Validate a refresh token specifically (rejects access tokens)
    pub fn validate_refresh_token(&self, token: &str) -> Result<Claims, AuthError> {
        let claims = self.validate_token(token)?;
        if claims.token_use != TOKEN_USE_REFRESH {
            return Err(AuthError::InvalidToken);
        }
        Ok(claims)
    }
}

/// Hash a password with Argon2 using a fresh random salt
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AuthError::PasswordHash(e.to_string()))
}

/// Verify a password against a stored Argon2 hash
pub fn verify_password(password: &str, stored_hash: &str) -> Result<bool, AuthError> {
    let parsed = PasswordHash::new(stored_hash).map_err(|e| AuthError::PasswordHash(e.to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

/// Authenticated caller extracted from the bearer token
#[derive(Debug, Clone, Serialize)]
pub struct AuthenticatedUser {
    pub user_id: i64,
    pub username: String,
    pub is_staff: bool,
}

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = ServiceError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header_value = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or(AuthError::MissingCredentials)?;

        let token = header_value
            .strip_prefix("Bearer ")
            .ok_or(AuthError::MissingCredentials)?;

        let claims = state.auth.validate_access_token(token)?;
        let user_id = claims
            .sub
            .parse::<i64>()
            .map_err(|_| AuthError::InvalidToken)?;

        Ok(AuthenticatedUser {
            user_id,
            username: claims.username,
            is_staff: claims.is_staff,
        })
    }
}

/// Authenticated caller with the staff flag, required for the admin surface
#[derive(Debug, Clone, Serialize)]
pub struct StaffUser(pub AuthenticatedUser);

#[async_trait]
impl FromRequestParts<AppState> for StaffUser {
    type Rejection = ServiceError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthenticatedUser::from_request_parts(parts, state).await?;
        if !user.is_staff {
            return Err(ServiceError::Forbidden("Staff access required".into()));
        }
        Ok(StaffUser(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn test_service() -> AuthService {
        AuthService::new(AuthConfig::new(
            "unit_test_secret_key_that_is_long_enough_for_hs256_token_signing".into(),
            "techstore-auth".into(),
            "techstore-api".into(),
            Duration::from_secs(3600),
            Duration::from_secs(86_400),
        ))
    }

    fn test_account(is_staff: bool) -> user::Model {
        user::Model {
            id: 42,
            username: "erika".into(),
            email: "erika@example.com".into(),
            password_hash: String::new(),
            first_name: None,
            last_name: None,
            address: None,
            phone: None,
            is_active: true,
            is_staff,
            is_superuser: false,
            date_joined: Utc::now(),
            last_login: None,
        }
    }

    #[test]
    fn token_pair_round_trips() {
        let service = test_service();
        let pair = service.generate_token_pair(&test_account(false)).unwrap();

        let claims = service.validate_access_token(&pair.access_token).unwrap();
        assert_eq!(claims.sub, "42");
        assert_eq!(claims.username, "erika");
        assert!(!claims.is_staff);
        assert_eq!(claims.token_use, "access");
    }

    #[test]
    fn refresh_token_is_not_an_access_token() {
        let service = test_service();
        let pair = service.generate_token_pair(&test_account(false)).unwrap();

        assert!(service.validate_access_token(&pair.refresh_token).is_err());
        assert!(service.validate_refresh_token(&pair.refresh_token).is_ok());
        assert!(service.validate_refresh_token(&pair.access_token).is_err());
    }

    #[test]
    fn staff_flag_survives_the_round_trip() {
        let service = test_service();
        let pair = service.generate_token_pair(&test_account(true)).unwrap();
        let claims = service.validate_access_token(&pair.access_token).unwrap();
        assert!(claims.is_staff);
    }

    #[test]
    fn tampered_token_is_rejected() {
        let service = test_service();
        let pair = service.generate_token_pair(&test_account(false)).unwrap();
        let mut tampered = pair.access_token.clone();
        tampered.push('x');
        assert!(service.validate_token(&tampered).is_err());
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let service = test_service();
        let other = AuthService::new(AuthConfig::new(
            "a_completely_different_secret_key_also_long_enough_for_signing_1".into(),
            "techstore-auth".into(),
            "techstore-api".into(),
            Duration::from_secs(3600),
            Duration::from_secs(86_400),
        ));
        let pair = other.generate_token_pair(&test_account(false)).unwrap();
        assert!(service.validate_token(&pair.access_token).is_err());
    }

    #[test]
    fn password_hash_round_trip() {
        let hash = hash_password("s3cret-pass").unwrap();
        assert!(verify_password("s3cret-pass", &hash).unwrap());
        assert!(!verify_password("wrong-pass", &hash).unwrap());
    }

    #[test]
    fn password_hashes_are_salted() {
        let first = hash_password("same-input").unwrap();
        let second = hash_password("same-input").unwrap();
        assert_ne!(first, second);
    }
}
