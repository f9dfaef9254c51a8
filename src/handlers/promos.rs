use super::common::{
    created_response, no_content_response, success_response, validate_input, PaginationParams,
};
use super::products::ProductResponse;
use crate::{
    auth::AuthenticatedUser,
    entities::PromoModel,
    errors::ServiceError,
    services::promotions::{CreatePromoInput, PromoDetails, PromoRow, UpdatePromoInput},
    AppState, PaginatedResponse,
};
use axum::{
    extract::{Json, Path, Query, State},
    response::IntoResponse,
    routing::{delete, get, post},
    Router,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

/// Creates the router for promo endpoints
pub fn promos_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_promos).post(create_promo))
        .route("/active", get(active_promos))
        .route(
            "/:id",
            get(get_promo).put(update_promo).delete(delete_promo),
        )
        .route(
            "/:id/products/:product_id",
            post(add_promo_product).delete(remove_promo_product),
        )
}

#[utoipa::path(
    get,
    path = "/api/v1/promos",
    params(PaginationParams),
    responses((status = 200, description = "Promos, latest window first", body = crate::ApiResponse<crate::PaginatedResponse<PromoResponse>>)),
    tag = "Promos"
)]
pub async fn list_promos(
    State(state): State<AppState>,
    Query(pagination): Query<PaginationParams>,
) -> Result<impl IntoResponse, ServiceError> {
    let (page, per_page) = pagination.resolve(&state.config)?;
    let (promos, total) = state.services.promos.list(page, per_page).await?;
    let items: Vec<PromoResponse> = promos.into_iter().map(PromoResponse::from).collect();
    Ok(success_response(PaginatedResponse::new(
        items, total, page, per_page,
    )))
}

/// Promos running today: flagged active with today inside the inclusive
/// date window.
#[utoipa::path(
    get,
    path = "/api/v1/promos/active",
    responses((status = 200, description = "Promos running today", body = crate::ApiResponse<Vec<PromoResponse>>)),
    tag = "Promos"
)]
pub async fn active_promos(State(state): State<AppState>) -> Result<impl IntoResponse, ServiceError> {
    let promos = state.services.promos.list_active_today().await?;
    let items: Vec<PromoResponse> = promos
        .into_iter()
        .map(|promo| PromoResponse::from_model(promo, true))
        .collect();
    Ok(success_response(items))
}

#[utoipa::path(
    get,
    path = "/api/v1/promos/{id}",
    params(("id" = i64, Path, description = "Promo id")),
    responses(
        (status = 200, description = "Promo with its member products", body = crate::ApiResponse<PromoDetailResponse>),
        (status = 404, description = "Promo not found", body = crate::errors::ErrorResponse)
    ),
    tag = "Promos"
)]
pub async fn get_promo(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ServiceError> {
    let details = state.services.promos.get_details(id).await?;
    Ok(success_response(PromoDetailResponse::from(details)))
}

#[utoipa::path(
    post,
    path = "/api/v1/promos",
    request_body = CreatePromoRequest,
    responses(
        (status = 201, description = "Promo created", body = crate::ApiResponse<PromoResponse>),
        (status = 400, description = "Discount or date window invalid", body = crate::errors::ErrorResponse)
    ),
    security(("bearer" = [])),
    tag = "Promos"
)]
pub async fn create_promo(
    _user: AuthenticatedUser,
    State(state): State<AppState>,
    Json(payload): Json<CreatePromoRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    validate_input(&payload)?;

    let promo = state
        .services
        .promos
        .create_promo(CreatePromoInput {
            title: payload.title,
            description: payload.description,
            discount_percent: payload.discount_percent,
            start_date: payload.start_date,
            end_date: payload.end_date,
            is_active: payload.is_active,
        })
        .await?;
    Ok(created_response(PromoResponse::from_now(promo)))
}

#[utoipa::path(
    put,
    path = "/api/v1/promos/{id}",
    params(("id" = i64, Path, description = "Promo id")),
    request_body = UpdatePromoRequest,
    responses(
        (status = 200, description = "Promo updated", body = crate::ApiResponse<PromoResponse>),
        (status = 404, description = "Promo not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer" = [])),
    tag = "Promos"
)]
pub async fn update_promo(
    _user: AuthenticatedUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdatePromoRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    validate_input(&payload)?;

    let promo = state
        .services
        .promos
        .update_promo(
            id,
            UpdatePromoInput {
                title: payload.title,
                description: payload.description,
                discount_percent: payload.discount_percent,
                start_date: payload.start_date,
                end_date: payload.end_date,
                is_active: payload.is_active,
            },
        )
        .await?;
    Ok(success_response(PromoResponse::from_now(promo)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/promos/{id}",
    params(("id" = i64, Path, description = "Promo id")),
    responses(
        (status = 204, description = "Promo and its membership deleted"),
        (status = 404, description = "Promo not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer" = [])),
    tag = "Promos"
)]
pub async fn delete_promo(
    _user: AuthenticatedUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ServiceError> {
    state.services.promos.delete_promo(id).await?;
    Ok(no_content_response())
}

#[utoipa::path(
    post,
    path = "/api/v1/promos/{id}/products/{product_id}",
    params(
        ("id" = i64, Path, description = "Promo id"),
        ("product_id" = i64, Path, description = "Product id")
    ),
    responses(
        (status = 200, description = "Product added to the promo", body = crate::ApiResponse<PromoDetailResponse>),
        (status = 404, description = "Promo or product not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Product already in the promo", body = crate::errors::ErrorResponse)
    ),
    security(("bearer" = [])),
    tag = "Promos"
)]
pub async fn add_promo_product(
    _user: AuthenticatedUser,
    State(state): State<AppState>,
    Path((id, product_id)): Path<(i64, i64)>,
) -> Result<impl IntoResponse, ServiceError> {
    state.services.promos.add_product(id, product_id).await?;
    let details = state.services.promos.get_details(id).await?;
    Ok(success_response(PromoDetailResponse::from(details)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/promos/{id}/products/{product_id}",
    params(
        ("id" = i64, Path, description = "Promo id"),
        ("product_id" = i64, Path, description = "Product id")
    ),
    responses(
        (status = 200, description = "Product removed from the promo", body = crate::ApiResponse<PromoDetailResponse>),
        (status = 404, description = "Product is not part of the promo", body = crate::errors::ErrorResponse)
    ),
    security(("bearer" = [])),
    tag = "Promos"
)]
pub async fn remove_promo_product(
    _user: AuthenticatedUser,
    State(state): State<AppState>,
    Path((id, product_id)): Path<(i64, i64)>,
) -> Result<impl IntoResponse, ServiceError> {
    state.services.promos.remove_product(id, product_id).await?;
    let details = state.services.promos.get_details(id).await?;
    Ok(success_response(PromoDetailResponse::from(details)))
}

// Request/Response DTOs

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreatePromoRequest {
    #[validate(length(min = 1, max = 200))]
    #[schema(example = "Summer Sale")]
    pub title: String,
    pub description: Option<String>,
    /// Percentage in (0, 100]
    #[schema(value_type = String, example = "15.00")]
    pub discount_percent: Decimal,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub is_active: Option<bool>,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdatePromoRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    pub description: Option<String>,
    #[schema(value_type = Option<String>)]
    pub discount_percent: Option<Decimal>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PromoResponse {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    #[schema(value_type = String)]
    pub discount_percent: Decimal,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub is_active: bool,
    /// Whether today falls inside the window of an active promo
    pub is_currently_active: bool,
}

impl PromoResponse {
    fn from_model(promo: PromoModel, is_currently_active: bool) -> Self {
        Self {
            id: promo.id,
            title: promo.title,
            description: promo.description,
            discount_percent: promo.discount_percent,
            start_date: promo.start_date,
            end_date: promo.end_date,
            is_active: promo.is_active,
            is_currently_active,
        }
    }

    fn from_now(promo: PromoModel) -> Self {
        let is_currently_active = promo.is_active_on(chrono::Utc::now().date_naive());
        Self::from_model(promo, is_currently_active)
    }
}

impl From<PromoRow> for PromoResponse {
    fn from(row: PromoRow) -> Self {
        Self::from_model(row.promo, row.is_currently_active)
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PromoDetailResponse {
    pub promo: PromoResponse,
    pub products: Vec<ProductResponse>,
}

impl From<PromoDetails> for PromoDetailResponse {
    fn from(details: PromoDetails) -> Self {
        Self {
            promo: PromoResponse::from_model(details.promo, details.is_currently_active),
            products: details
                .products
                .into_iter()
                .map(ProductResponse::from)
                .collect(),
        }
    }
}
