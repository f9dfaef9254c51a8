use crate::{
    auth::{self, AuthService, TokenPair},
    db::DbPool,
    entities::user::{self, Entity as User, Model as UserModel},
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, Condition, EntityTrait, QueryFilter, Set};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterInput {
    #[validate(length(min = 3, max = 150, message = "Username must be 3-150 characters"))]
    pub username: String,
    #[validate(email(message = "A valid email address is required"))]
    pub email: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginInput {
    #[validate(length(min = 1, message = "Username is required"))]
    pub username: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Result of a successful registration or login: the account plus a fresh
/// token pair.
#[derive(Debug, Serialize)]
pub struct AuthenticatedAccount {
    pub user: UserModel,
    pub tokens: TokenPair,
}

/// Account management: registration, credential login, profile lookup.
#[derive(Clone)]
pub struct UserService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
    auth: AuthService,
}

impl UserService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>, auth: AuthService) -> Self {
        Self {
            db_pool,
            event_sender,
            auth,
        }
    }

    /// Registers a new account and issues its first token pair.
    #[instrument(skip(self, input), fields(username = %input.username))]
    pub async fn register(
        &self,
        input: RegisterInput,
    ) -> Result<AuthenticatedAccount, ServiceError> {
        input.validate()?;

        let db = &*self.db_pool;

        let existing = User::find()
            .filter(
                Condition::any()
                    .add(user::Column::Username.eq(&input.username))
                    .add(user::Column::Email.eq(&input.email)),
            )
            .one(db)
            .await?;
        if let Some(existing) = existing {
            let field = if existing.username == input.username {
                "username"
            } else {
                "email"
            };
            return Err(ServiceError::Conflict(format!(
                "An account with this {} already exists",
                field
            )));
        }

        let password_hash = auth::hash_password(&input.password)?;

        let account = user::ActiveModel {
            username: Set(input.username),
            email: Set(input.email),
            password_hash: Set(password_hash),
            first_name: Set(input.first_name),
            last_name: Set(input.last_name),
            address: Set(input.address),
            phone: Set(input.phone),
            is_active: Set(true),
            is_staff: Set(false),
            is_superuser: Set(false),
            date_joined: Set(Utc::now()),
            last_login: Set(None),
            ..Default::default()
        };
        let account = account.insert(db).await?;

        let tokens = self.auth.generate_token_pair(&account)?;

        self.event_sender
            .send_or_log(Event::UserRegistered(account.id))
            .await;

        info!(user_id = account.id, "Registered user");
        Ok(AuthenticatedAccount {
            user: account,
            tokens,
        })
    }

    /// Verifies credentials and issues a token pair. The last-login timestamp
    /// is refreshed on success.
    #[instrument(skip(self, input), fields(username = %input.username))]
    pub async fn login(&self, input: LoginInput) -> Result<AuthenticatedAccount, ServiceError> {
        input.validate()?;

        let db = &*self.db_pool;
        let account = User::find()
            .filter(user::Column::Username.eq(&input.username))
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::AuthError("Invalid credentials".to_string()))?;

        if !auth::verify_password(&input.password, &account.password_hash)? {
            warn!(user_id = account.id, "Login rejected: bad password");
            return Err(ServiceError::AuthError("Invalid credentials".to_string()));
        }

        if !account.is_active {
            return Err(ServiceError::AuthError(
                "Account is not active".to_string(),
            ));
        }

        let mut active: user::ActiveModel = account.into();
        active.last_login = Set(Some(Utc::now()));
        let account = active.update(db).await?;

        let tokens = self.auth.generate_token_pair(&account)?;

        self.event_sender
            .send_or_log(Event::UserLoggedIn(account.id))
            .await;

        info!(user_id = account.id, "User logged in");
        Ok(AuthenticatedAccount {
            user: account,
            tokens,
        })
    }

    /// Exchanges a valid refresh token for a fresh token pair.
    #[instrument(skip(self, refresh_token))]
    pub async fn refresh(&self, refresh_token: &str) -> Result<AuthenticatedAccount, ServiceError> {
        let claims = self.auth.validate_refresh_token(refresh_token)?;
        let user_id = claims
            .sub
            .parse::<i64>()
            .map_err(|_| ServiceError::JwtError("Invalid token subject".to_string()))?;

        let account = User::find_by_id(user_id)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::AuthError("Invalid refresh token".to_string()))?;

        if !account.is_active {
            return Err(ServiceError::AuthError(
                "Account is not active".to_string(),
            ));
        }

        let tokens = self.auth.generate_token_pair(&account)?;

        info!(user_id = account.id, "Refreshed token pair");
        Ok(AuthenticatedAccount {
            user: account,
            tokens,
        })
    }

    /// Fetches a single account.
    pub async fn get_user(&self, user_id: i64) -> Result<UserModel, ServiceError> {
        User::find_by_id(user_id)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("User {} not found", user_id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_input_rejects_short_password() {
        let input = RegisterInput {
            username: "alice".into(),
            email: "alice@example.com".into(),
            password: "short".into(),
            first_name: None,
            last_name: None,
            address: None,
            phone: None,
        };
        assert!(input.validate().is_err());
    }

    #[test]
    fn register_input_rejects_bad_email() {
        let input = RegisterInput {
            username: "alice".into(),
            email: "not-an-email".into(),
            password: "long-enough-password".into(),
            first_name: None,
            last_name: None,
            address: None,
            phone: None,
        };
        assert!(input.validate().is_err());
    }

    #[test]
    fn login_input_requires_both_fields() {
        let input = LoginInput {
            username: "".into(),
            password: "secret".into(),
        };
        assert!(input.validate().is_err());
    }
}
