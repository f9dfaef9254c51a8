use super::common::{created_response, success_response, validate_input};
use crate::{
    auth::{AuthenticatedUser, TokenPair},
    entities::UserModel,
    errors::ServiceError,
    services::users::{AuthenticatedAccount, LoginInput, RegisterInput},
    AppState,
};
use axum::{
    extract::{Json, State},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;
use validator::Validate;

/// Creates the router for account endpoints
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/refresh", post(refresh))
        .route("/me", get(me))
}

/// Register a new account
#[utoipa::path(
    post,
    path = "/api/v1/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created", body = crate::ApiResponse<AuthResponse>),
        (status = 400, description = "Invalid payload", body = crate::errors::ErrorResponse),
        (status = 409, description = "Username or email already taken", body = crate::errors::ErrorResponse)
    ),
    tag = "Auth"
)]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    validate_input(&payload)?;

    let account = state
        .services
        .users
        .register(RegisterInput {
            username: payload.username,
            email: payload.email,
            password: payload.password,
            first_name: payload.first_name,
            last_name: payload.last_name,
            address: payload.address,
            phone: payload.phone,
        })
        .await?;

    Ok(created_response(AuthResponse::from(account)))
}

/// Log in with username and password
#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = crate::ApiResponse<AuthResponse>),
        (status = 401, description = "Invalid credentials", body = crate::errors::ErrorResponse)
    ),
    tag = "Auth"
)]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    validate_input(&payload)?;

    let account = state
        .services
        .users
        .login(LoginInput {
            username: payload.username,
            password: payload.password,
        })
        .await?;

    Ok(success_response(AuthResponse::from(account)))
}

/// Exchange a refresh token for a fresh token pair
#[utoipa::path(
    post,
    path = "/api/v1/auth/refresh",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "New token pair", body = crate::ApiResponse<AuthResponse>),
        (status = 401, description = "Invalid or expired refresh token", body = crate::errors::ErrorResponse)
    ),
    tag = "Auth"
)]
pub async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    validate_input(&payload)?;

    let account = state.services.users.refresh(&payload.refresh_token).await?;

    Ok(success_response(AuthResponse::from(account)))
}

/// Profile of the authenticated caller
#[utoipa::path(
    get,
    path = "/api/v1/auth/me",
    responses(
        (status = 200, description = "Current account", body = crate::ApiResponse<UserResponse>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse)
    ),
    security(("bearer" = [])),
    tag = "Auth"
)]
pub async fn me(
    user: AuthenticatedUser,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ServiceError> {
    let account = state.services.users.get_user(user.user_id).await?;
    Ok(success_response(UserResponse::from(account)))
}

// Request/Response DTOs

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[schema(example = json!({
    "username": "ivan",
    "email": "ivan@example.com",
    "password": "correct-horse-battery",
    "first_name": "Ivan",
    "last_name": "Petrov"
}))]
pub struct RegisterRequest {
    /// Unique login name
    #[validate(length(min = 3, max = 150))]
    pub username: String,
    /// Contact email address
    #[validate(email)]
    pub email: String,
    /// Password, at least 8 characters
    #[validate(length(min = 8))]
    pub password: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[validate(length(min = 1))]
    pub username: String,
    #[validate(length(min = 1))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RefreshRequest {
    #[validate(length(min = 1))]
    pub refresh_token: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UserResponse {
    pub id: i64,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    pub is_active: bool,
    pub is_staff: bool,
    pub date_joined: chrono::DateTime<chrono::Utc>,
}

impl From<UserModel> for UserResponse {
    fn from(model: UserModel) -> Self {
        Self {
            id: model.id,
            username: model.username,
            email: model.email,
            first_name: model.first_name,
            last_name: model.last_name,
            address: model.address,
            phone: model.phone,
            is_active: model.is_active,
            is_staff: model.is_staff,
            date_joined: model.date_joined,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

impl From<TokenPair> for TokenResponse {
    fn from(pair: TokenPair) -> Self {
        Self {
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
            token_type: pair.token_type,
            expires_in: pair.expires_in,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AuthResponse {
    pub user: UserResponse,
    pub tokens: TokenResponse,
}

impl From<AuthenticatedAccount> for AuthResponse {
    fn from(account: AuthenticatedAccount) -> Self {
        Self {
            user: UserResponse::from(account.user),
            tokens: TokenResponse::from(account.tokens),
        }
    }
}
