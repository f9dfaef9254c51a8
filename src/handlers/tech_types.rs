use super::common::{created_response, no_content_response, success_response, validate_input};
use crate::{
    auth::AuthenticatedUser, entities::TechTypeModel, errors::ServiceError,
    services::catalog::TechTypeInput, AppState,
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

/// Creates the router for tech type endpoints
pub fn tech_types_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_tech_types).post(create_tech_type))
        .route(
            "/:id",
            get(get_tech_type)
                .put(update_tech_type)
                .delete(delete_tech_type),
        )
}

/// List all tech types
#[utoipa::path(
    get,
    path = "/api/v1/tech-types",
    responses(
        (status = 200, description = "Tech types retrieved", body = crate::ApiResponse<Vec<TechTypeResponse>>)
    ),
    tag = "Catalog"
)]
pub async fn list_tech_types(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ServiceError> {
    let tech_types = state.services.catalog.list_tech_types().await?;
    let tech_types: Vec<TechTypeResponse> =
        tech_types.into_iter().map(TechTypeResponse::from).collect();
    Ok(success_response(tech_types))
}

/// Get a tech type by id
#[utoipa::path(
    get,
    path = "/api/v1/tech-types/{id}",
    params(("id" = i64, Path, description = "Tech type id")),
    responses(
        (status = 200, description = "Tech type retrieved", body = crate::ApiResponse<TechTypeResponse>),
        (status = 404, description = "Tech type not found", body = crate::errors::ErrorResponse)
    ),
    tag = "Catalog"
)]
pub async fn get_tech_type(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ServiceError> {
    let tech_type = state.services.catalog.get_tech_type(id).await?;
    Ok(success_response(TechTypeResponse::from(tech_type)))
}

/// Create a tech type
#[utoipa::path(
    post,
    path = "/api/v1/tech-types",
    request_body = TechTypeRequest,
    responses(
        (status = 201, description = "Tech type created", body = crate::ApiResponse<TechTypeResponse>),
        (status = 409, description = "Name already taken", body = crate::errors::ErrorResponse)
    ),
    security(("bearer" = [])),
    tag = "Catalog"
)]
pub async fn create_tech_type(
    _user: AuthenticatedUser,
    State(state): State<AppState>,
    Json(payload): Json<TechTypeRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    validate_input(&payload)?;

    let tech_type = state
        .services
        .catalog
        .create_tech_type(TechTypeInput { name: payload.name })
        .await?;
    Ok(created_response(TechTypeResponse::from(tech_type)))
}

/// Rename a tech type
#[utoipa::path(
    put,
    path = "/api/v1/tech-types/{id}",
    params(("id" = i64, Path, description = "Tech type id")),
    request_body = TechTypeRequest,
    responses(
        (status = 200, description = "Tech type updated", body = crate::ApiResponse<TechTypeResponse>),
        (status = 404, description = "Tech type not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer" = [])),
    tag = "Catalog"
)]
pub async fn update_tech_type(
    _user: AuthenticatedUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<TechTypeRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    validate_input(&payload)?;

    let tech_type = state
        .services
        .catalog
        .update_tech_type(id, TechTypeInput { name: payload.name })
        .await?;
    Ok(success_response(TechTypeResponse::from(tech_type)))
}

/// Delete a tech type. Refused while products reference it.
#[utoipa::path(
    delete,
    path = "/api/v1/tech-types/{id}",
    params(("id" = i64, Path, description = "Tech type id")),
    responses(
        (status = 204, description = "Tech type deleted"),
        (status = 404, description = "Tech type not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Products still reference this tech type", body = crate::errors::ErrorResponse)
    ),
    security(("bearer" = [])),
    tag = "Catalog"
)]
pub async fn delete_tech_type(
    _user: AuthenticatedUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ServiceError> {
    state.services.catalog.delete_tech_type(id).await?;
    Ok(no_content_response())
}

// Request/Response DTOs

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct TechTypeRequest {
    /// Display name, e.g. "Laptops"
    #[validate(length(min = 1, max = 100))]
    pub name: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TechTypeResponse {
    pub id: i64,
    pub name: String,
}

impl From<TechTypeModel> for TechTypeResponse {
    fn from(model: TechTypeModel) -> Self {
        Self {
            id: model.id,
            name: model.name,
        }
    }
}
