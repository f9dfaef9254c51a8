use super::common::{created_response, no_content_response, success_response, validate_input};
use crate::{
    auth::AuthenticatedUser,
    errors::ServiceError,
    services::catalog::{CategoryInput, CategoryWithPath},
    AppState,
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

/// Creates the router for category endpoints
pub fn categories_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_categories).post(create_category))
        .route(
            "/:id",
            get(get_category)
                .put(update_category)
                .delete(delete_category),
        )
}

/// List all categories
#[utoipa::path(
    get,
    path = "/api/v1/categories",
    responses(
        (status = 200, description = "Categories retrieved", body = crate::ApiResponse<Vec<CategoryResponse>>)
    ),
    tag = "Catalog"
)]
pub async fn list_categories(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ServiceError> {
    let categories = state.services.catalog.list_categories_with_paths().await?;
    let categories: Vec<CategoryResponse> =
        categories.into_iter().map(CategoryResponse::from).collect();
    Ok(success_response(categories))
}

/// Get a category by id
#[utoipa::path(
    get,
    path = "/api/v1/categories/{id}",
    params(("id" = i64, Path, description = "Category id")),
    responses(
        (status = 200, description = "Category retrieved", body = crate::ApiResponse<CategoryResponse>),
        (status = 404, description = "Category not found", body = crate::errors::ErrorResponse)
    ),
    tag = "Catalog"
)]
pub async fn get_category(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ServiceError> {
    let category = state.services.catalog.get_category_with_path(id).await?;
    Ok(success_response(CategoryResponse::from(category)))
}

/// Create a category, optionally under a parent
#[utoipa::path(
    post,
    path = "/api/v1/categories",
    request_body = CategoryRequest,
    responses(
        (status = 201, description = "Category created", body = crate::ApiResponse<CategoryResponse>),
        (status = 400, description = "Invalid payload", body = crate::errors::ErrorResponse),
        (status = 404, description = "Parent category not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer" = [])),
    tag = "Catalog"
)]
pub async fn create_category(
    _user: AuthenticatedUser,
    State(state): State<AppState>,
    Json(payload): Json<CategoryRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    validate_input(&payload)?;

    let created = state
        .services
        .catalog
        .create_category(payload.into_input())
        .await?;
    let category = state.services.catalog.get_category_with_path(created.id).await?;
    Ok(created_response(CategoryResponse::from(category)))
}

/// Update a category
#[utoipa::path(
    put,
    path = "/api/v1/categories/{id}",
    params(("id" = i64, Path, description = "Category id")),
    request_body = CategoryRequest,
    responses(
        (status = 200, description = "Category updated", body = crate::ApiResponse<CategoryResponse>),
        (status = 400, description = "A category cannot be its own parent", body = crate::errors::ErrorResponse),
        (status = 404, description = "Category not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer" = [])),
    tag = "Catalog"
)]
pub async fn update_category(
    _user: AuthenticatedUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<CategoryRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    validate_input(&payload)?;

    let updated = state
        .services
        .catalog
        .update_category(id, payload.into_input())
        .await?;
    let category = state.services.catalog.get_category_with_path(updated.id).await?;
    Ok(success_response(CategoryResponse::from(category)))
}

/// Delete a category. Children are detached, not deleted.
#[utoipa::path(
    delete,
    path = "/api/v1/categories/{id}",
    params(("id" = i64, Path, description = "Category id")),
    responses(
        (status = 204, description = "Category deleted"),
        (status = 404, description = "Category not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer" = [])),
    tag = "Catalog"
)]
pub async fn delete_category(
    _user: AuthenticatedUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ServiceError> {
    state.services.catalog.delete_category(id).await?;
    Ok(no_content_response())
}

// Request/Response DTOs

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CategoryRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Parent category id for nesting
    #[serde(default)]
    pub parent_id: Option<i64>,
}

impl CategoryRequest {
    fn into_input(self) -> CategoryInput {
        CategoryInput {
            name: self.name,
            description: self.description,
            parent_id: self.parent_id,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CategoryResponse {
    pub id: i64,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<i64>,
    /// Full ancestry, e.g. "Audio -> Headphones"
    pub display_path: String,
}

impl From<CategoryWithPath> for CategoryResponse {
    fn from(with_path: CategoryWithPath) -> Self {
        let CategoryWithPath {
            category,
            display_path,
        } = with_path;
        Self {
            id: category.id,
            name: category.name,
            description: category.description,
            parent_id: category.parent_id,
            display_path,
        }
    }
}
