use super::common::{created_response, no_content_response, success_response, validate_input};
use crate::{
    auth::AuthenticatedUser, entities::ColorModel, errors::ServiceError,
    services::catalog::ColorInput, AppState,
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

/// Creates the router for color endpoints
pub fn colors_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_colors).post(create_color))
        .route(
            "/:id",
            get(get_color).put(update_color).delete(delete_color),
        )
}

#[utoipa::path(
    get,
    path = "/api/v1/colors",
    responses((status = 200, description = "Colors retrieved", body = crate::ApiResponse<Vec<ColorResponse>>)),
    tag = "Catalog"
)]
pub async fn list_colors(State(state): State<AppState>) -> Result<impl IntoResponse, ServiceError> {
    let colors = state.services.catalog.list_colors().await?;
    let colors: Vec<ColorResponse> = colors.into_iter().map(ColorResponse::from).collect();
    Ok(success_response(colors))
}

#[utoipa::path(
    get,
    path = "/api/v1/colors/{id}",
    params(("id" = i64, Path, description = "Color id")),
    responses(
        (status = 200, description = "Color retrieved", body = crate::ApiResponse<ColorResponse>),
        (status = 404, description = "Color not found", body = crate::errors::ErrorResponse)
    ),
    tag = "Catalog"
)]
pub async fn get_color(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ServiceError> {
    let color = state.services.catalog.get_color(id).await?;
    Ok(success_response(ColorResponse::from(color)))
}

#[utoipa::path(
    post,
    path = "/api/v1/colors",
    request_body = ColorRequest,
    responses(
        (status = 201, description = "Color created", body = crate::ApiResponse<ColorResponse>),
        (status = 409, description = "Name or hex code already taken", body = crate::errors::ErrorResponse)
    ),
    security(("bearer" = [])),
    tag = "Catalog"
)]
pub async fn create_color(
    _user: AuthenticatedUser,
    State(state): State<AppState>,
    Json(payload): Json<ColorRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    validate_input(&payload)?;

    let color = state
        .services
        .catalog
        .create_color(ColorInput {
            name: payload.name,
            hex_code: payload.hex_code,
        })
        .await?;
    Ok(created_response(ColorResponse::from(color)))
}

#[utoipa::path(
    put,
    path = "/api/v1/colors/{id}",
    params(("id" = i64, Path, description = "Color id")),
    request_body = ColorRequest,
    responses(
        (status = 200, description = "Color updated", body = crate::ApiResponse<ColorResponse>),
        (status = 404, description = "Color not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer" = [])),
    tag = "Catalog"
)]
pub async fn update_color(
    _user: AuthenticatedUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<ColorRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    validate_input(&payload)?;

    let color = state
        .services
        .catalog
        .update_color(
            id,
            ColorInput {
                name: payload.name,
                hex_code: payload.hex_code,
            },
        )
        .await?;
    Ok(success_response(ColorResponse::from(color)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/colors/{id}",
    params(("id" = i64, Path, description = "Color id")),
    responses(
        (status = 204, description = "Color deleted"),
        (status = 404, description = "Color not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer" = [])),
    tag = "Catalog"
)]
pub async fn delete_color(
    _user: AuthenticatedUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ServiceError> {
    state.services.catalog.delete_color(id).await?;
    Ok(no_content_response())
}

// Request/Response DTOs

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ColorRequest {
    #[validate(length(min = 1, max = 50))]
    pub name: String,
    /// Hex code like "#1a2b3c"
    pub hex_code: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ColorResponse {
    pub id: i64,
    pub name: String,
    pub hex_code: String,
}

impl From<ColorModel> for ColorResponse {
    fn from(model: ColorModel) -> Self {
        Self {
            id: model.id,
            name: model.name,
            hex_code: model.hex_code,
        }
    }
}
