use super::common::{created_response, no_content_response, success_response};
use super::products::ProductResponse;
use crate::{
    auth::AuthenticatedUser, entities::FavoriteModel, errors::ServiceError,
    services::favorites::FavoriteWithProduct, AppState,
};
use axum::{
    extract::{Json, Path, State},
    response::IntoResponse,
    routing::{delete, get},
    Router,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Creates the router for favorite endpoints. Everything here acts on the
/// calling user's own bookmarks.
pub fn favorites_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_favorites).post(add_favorite))
        .route("/:id", delete(remove_favorite))
}

#[utoipa::path(
    get,
    path = "/api/v1/favorites",
    responses((status = 200, description = "Your bookmarks, newest first", body = crate::ApiResponse<Vec<FavoriteDetailResponse>>)),
    security(("bearer" = [])),
    tag = "Favorites"
)]
pub async fn list_favorites(
    user: AuthenticatedUser,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ServiceError> {
    let favorites = state.services.favorites.list_for_user(user.user_id).await?;
    let items: Vec<FavoriteDetailResponse> = favorites
        .into_iter()
        .map(FavoriteDetailResponse::from)
        .collect();
    Ok(success_response(items))
}

#[utoipa::path(
    post,
    path = "/api/v1/favorites",
    request_body = AddFavoriteRequest,
    responses(
        (status = 201, description = "Product bookmarked", body = crate::ApiResponse<FavoriteResponse>),
        (status = 404, description = "Product missing or inactive", body = crate::errors::ErrorResponse),
        (status = 409, description = "Already bookmarked", body = crate::errors::ErrorResponse)
    ),
    security(("bearer" = [])),
    tag = "Favorites"
)]
pub async fn add_favorite(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Json(payload): Json<AddFavoriteRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let favorite = state
        .services
        .favorites
        .add_favorite(user.user_id, payload.product_id)
        .await?;
    Ok(created_response(FavoriteResponse::from(favorite)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/favorites/{id}",
    params(("id" = i64, Path, description = "Favorite id")),
    responses(
        (status = 204, description = "Bookmark removed"),
        (status = 403, description = "Someone else's bookmark", body = crate::errors::ErrorResponse),
        (status = 404, description = "Favorite not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer" = [])),
    tag = "Favorites"
)]
pub async fn remove_favorite(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ServiceError> {
    state
        .services
        .favorites
        .remove_by_id(id, user.user_id)
        .await?;
    Ok(no_content_response())
}

// Request/Response DTOs

#[derive(Debug, Deserialize, ToSchema)]
pub struct AddFavoriteRequest {
    pub product_id: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct FavoriteResponse {
    pub id: i64,
    pub user_id: i64,
    pub product_id: i64,
}

impl From<FavoriteModel> for FavoriteResponse {
    fn from(model: FavoriteModel) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            product_id: model.product_id,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct FavoriteDetailResponse {
    pub id: i64,
    pub product: ProductResponse,
}

impl From<FavoriteWithProduct> for FavoriteDetailResponse {
    fn from(row: FavoriteWithProduct) -> Self {
        Self {
            id: row.favorite.id,
            product: ProductResponse::from(row.product),
        }
    }
}
