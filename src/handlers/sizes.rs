use super::common::{created_response, no_content_response, success_response, validate_input};
use crate::{
    auth::AuthenticatedUser, entities::SizeModel, errors::ServiceError,
    services::catalog::SizeInput, AppState,
};
use axum::{
    extract::{Json, Path, State},
    response::IntoResponse,
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

/// Creates the router for size endpoints
pub fn sizes_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_sizes).post(create_size))
        .route("/:id", get(get_size).put(update_size).delete(delete_size))
}

#[utoipa::path(
    get,
    path = "/api/v1/sizes",
    responses((status = 200, description = "Sizes retrieved", body = crate::ApiResponse<Vec<SizeResponse>>)),
    tag = "Catalog"
)]
pub async fn list_sizes(State(state): State<AppState>) -> Result<impl IntoResponse, ServiceError> {
    let sizes = state.services.catalog.list_sizes().await?;
    let sizes: Vec<SizeResponse> = sizes.into_iter().map(SizeResponse::from).collect();
    Ok(success_response(sizes))
}

#[utoipa::path(
    get,
    path = "/api/v1/sizes/{id}",
    params(("id" = i64, Path, description = "Size id")),
    responses(
        (status = 200, description = "Size retrieved", body = crate::ApiResponse<SizeResponse>),
        (status = 404, description = "Size not found", body = crate::errors::ErrorResponse)
    ),
    tag = "Catalog"
)]
pub async fn get_size(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ServiceError> {
    let size = state.services.catalog.get_size(id).await?;
    Ok(success_response(SizeResponse::from(size)))
}

#[utoipa::path(
    post,
    path = "/api/v1/sizes",
    request_body = SizeRequest,
    responses(
        (status = 201, description = "Size created", body = crate::ApiResponse<SizeResponse>),
        (status = 409, description = "Name already taken", body = crate::errors::ErrorResponse)
    ),
    security(("bearer" = [])),
    tag = "Catalog"
)]
pub async fn create_size(
    _user: AuthenticatedUser,
    State(state): State<AppState>,
    Json(payload): Json<SizeRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    validate_input(&payload)?;

    let size = state
        .services
        .catalog
        .create_size(SizeInput { name: payload.name })
        .await?;
    Ok(created_response(SizeResponse::from(size)))
}

#[utoipa::path(
    put,
    path = "/api/v1/sizes/{id}",
    params(("id" = i64, Path, description = "Size id")),
    request_body = SizeRequest,
    responses(
        (status = 200, description = "Size updated", body = crate::ApiResponse<SizeResponse>),
        (status = 404, description = "Size not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer" = [])),
    tag = "Catalog"
)]
pub async fn update_size(
    _user: AuthenticatedUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<SizeRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    validate_input(&payload)?;

    let size = state
        .services
        .catalog
        .update_size(id, SizeInput { name: payload.name })
        .await?;
    Ok(success_response(SizeResponse::from(size)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/sizes/{id}",
    params(("id" = i64, Path, description = "Size id")),
    responses(
        (status = 204, description = "Size deleted"),
        (status = 404, description = "Size not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer" = [])),
    tag = "Catalog"
)]
pub async fn delete_size(
    _user: AuthenticatedUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ServiceError> {
    state.services.catalog.delete_size(id).await?;
    Ok(no_content_response())
}

// Request/Response DTOs

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct SizeRequest {
    /// Label like "15.6\"" or "256GB"
    #[validate(length(min = 1, max = 20))]
    pub name: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SizeResponse {
    pub id: i64,
    pub name: String,
}

impl From<SizeModel> for SizeResponse {
    fn from(model: SizeModel) -> Self {
        Self {
            id: model.id,
            name: model.name,
        }
    }
}
