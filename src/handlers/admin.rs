use super::common::{parse_id_list, success_response, PaginationParams};
use super::orders::OrderResponse;
use super::products::ProductResponse;
use super::reviews::ReviewResponse;
use crate::{
    auth::StaffUser,
    errors::ServiceError,
    services::{
        orders::{OrderAdminFilter, OrderAdminRow},
        products::{ProductAdminFilter, ProductAdminRow},
        reviews::{ReviewAdminFilter, ReviewAdminRow},
    },
    AppState, PaginatedResponse,
};
use axum::{
    extract::{Json, Path, Query, State},
    http::header,
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// Creates the router for the staff-only surface. Every handler takes the
/// [`StaffUser`] extractor, so a valid token without the staff flag gets a
/// 403 before any work happens.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/products", get(admin_list_products))
        .route("/products/activate", post(activate_products))
        .route("/products/deactivate", post(deactivate_products))
        .route("/products/export", post(export_products))
        .route("/orders", get(admin_list_orders))
        .route("/orders/:id/invoice", get(order_invoice))
        .route("/reviews", get(admin_list_reviews))
        .route("/reviews/moderate", post(moderate_reviews))
}

/// The staff product table: filters, free-text search, and the derived
/// columns the list view shows next to each row.
#[utoipa::path(
    get,
    path = "/api/v1/admin/products",
    params(
        ("tech_type_id" = Option<i64>, Query, description = "Filter by tech type"),
        ("brand" = Option<String>, Query, description = "Exact brand match"),
        ("is_active" = Option<bool>, Query, description = "Filter by active flag"),
        ("category_id" = Option<i64>, Query, description = "Filter by linked category"),
        ("created_from" = Option<String>, Query, description = "Created on or after (YYYY-MM-DD)"),
        ("created_to" = Option<String>, Query, description = "Created on or before (YYYY-MM-DD)"),
        ("search" = Option<String>, Query, description = "Free text over name, description, brand and tech type"),
        PaginationParams
    ),
    responses((status = 200, description = "Product rows with derived columns", body = crate::ApiResponse<crate::PaginatedResponse<ProductAdminRowResponse>>)),
    security(("bearer" = [])),
    tag = "Admin"
)]
pub async fn admin_list_products(
    _staff: StaffUser,
    State(state): State<AppState>,
    Query(filter): Query<ProductAdminFilter>,
    Query(pagination): Query<PaginationParams>,
) -> Result<impl IntoResponse, ServiceError> {
    let (page, per_page) = pagination.resolve(&state.config)?;
    let (rows, total) = state
        .services
        .products
        .admin_list(filter, page, per_page)
        .await?;
    let items: Vec<ProductAdminRowResponse> = rows
        .into_iter()
        .map(ProductAdminRowResponse::from)
        .collect();
    Ok(success_response(PaginatedResponse::new(
        items, total, page, per_page,
    )))
}

#[utoipa::path(
    post,
    path = "/api/v1/admin/products/activate",
    request_body = BulkIdsRequest,
    responses((status = 200, description = "Products activated", body = crate::ApiResponse<BulkActionResponse>)),
    security(("bearer" = [])),
    tag = "Admin"
)]
pub async fn activate_products(
    _staff: StaffUser,
    State(state): State<AppState>,
    Json(payload): Json<BulkIdsRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let affected = state
        .services
        .products
        .set_active_bulk(&payload.ids, true)
        .await?;
    Ok(success_response(BulkActionResponse { affected }))
}

#[utoipa::path(
    post,
    path = "/api/v1/admin/products/deactivate",
    request_body = BulkIdsRequest,
    responses((status = 200, description = "Products deactivated", body = crate::ApiResponse<BulkActionResponse>)),
    security(("bearer" = [])),
    tag = "Admin"
)]
pub async fn deactivate_products(
    _staff: StaffUser,
    State(state): State<AppState>,
    Json(payload): Json<BulkIdsRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let affected = state
        .services
        .products
        .set_active_bulk(&payload.ids, false)
        .await?;
    Ok(success_response(BulkActionResponse { affected }))
}

/// Download the selected products as CSV. `ids` is a comma-separated list;
/// leaving it out exports the whole catalog.
#[utoipa::path(
    post,
    path = "/api/v1/admin/products/export",
    params(ExportParams),
    responses((status = 200, description = "CSV attachment", content_type = "text/csv")),
    security(("bearer" = [])),
    tag = "Admin"
)]
pub async fn export_products(
    _staff: StaffUser,
    State(state): State<AppState>,
    Query(params): Query<ExportParams>,
) -> Result<impl IntoResponse, ServiceError> {
    let ids = match params.ids.as_deref() {
        Some(raw) => parse_id_list(raw)?,
        None => Vec::new(),
    };

    let csv = state.services.products.export_csv(&ids).await?;
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"products.csv\"".to_string(),
            ),
        ],
        csv,
    ))
}

/// The staff order table: filters, free-text search, and the live item sum
/// shown next to the stored total.
#[utoipa::path(
    get,
    path = "/api/v1/admin/orders",
    params(
        ("status" = Option<String>, Query, description = "Filter by fulfillment status"),
        ("payment_method" = Option<String>, Query, description = "Filter by payment method"),
        ("user_id" = Option<i64>, Query, description = "Filter by owning account"),
        ("date_from" = Option<String>, Query, description = "Ordered on or after (YYYY-MM-DD)"),
        ("date_to" = Option<String>, Query, description = "Ordered on or before (YYYY-MM-DD)"),
        ("search" = Option<String>, Query, description = "Free text over addresses, guest contact, customer and order id"),
        PaginationParams
    ),
    responses((status = 200, description = "Order rows with derived columns", body = crate::ApiResponse<crate::PaginatedResponse<OrderAdminRowResponse>>)),
    security(("bearer" = [])),
    tag = "Admin"
)]
pub async fn admin_list_orders(
    _staff: StaffUser,
    State(state): State<AppState>,
    Query(filter): Query<OrderAdminFilter>,
    Query(pagination): Query<PaginationParams>,
) -> Result<impl IntoResponse, ServiceError> {
    let (page, per_page) = pagination.resolve(&state.config)?;
    let (rows, total) = state
        .services
        .orders
        .admin_list(filter, page, per_page)
        .await?;
    let items: Vec<OrderAdminRowResponse> =
        rows.into_iter().map(OrderAdminRowResponse::from).collect();
    Ok(success_response(PaginatedResponse::new(
        items, total, page, per_page,
    )))
}

/// Renders the order as a PDF invoice and serves it as an attachment.
#[utoipa::path(
    get,
    path = "/api/v1/admin/orders/{id}/invoice",
    params(("id" = i64, Path, description = "Order id")),
    responses(
        (status = 200, description = "PDF attachment", content_type = "application/pdf"),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer" = [])),
    tag = "Admin"
)]
pub async fn order_invoice(
    _staff: StaffUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ServiceError> {
    let pdf = state.services.invoices.render_invoice(id).await?;
    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"order_{}.pdf\"", id),
            ),
        ],
        pdf,
    ))
}

/// The staff review table with the moderation backlog filters.
#[utoipa::path(
    get,
    path = "/api/v1/admin/reviews",
    params(
        ("is_moderated" = Option<bool>, Query, description = "Filter by moderation state"),
        ("rating" = Option<i32>, Query, description = "Exact rating"),
        ("tech_type_id" = Option<i64>, Query, description = "Filter by the product's tech type"),
        ("created_from" = Option<String>, Query, description = "Submitted on or after (YYYY-MM-DD)"),
        ("created_to" = Option<String>, Query, description = "Submitted on or before (YYYY-MM-DD)"),
        ("search" = Option<String>, Query, description = "Free text over author, product name and comment"),
        PaginationParams
    ),
    responses((status = 200, description = "Review rows with author and product resolved", body = crate::ApiResponse<crate::PaginatedResponse<ReviewAdminRowResponse>>)),
    security(("bearer" = [])),
    tag = "Admin"
)]
pub async fn admin_list_reviews(
    _staff: StaffUser,
    State(state): State<AppState>,
    Query(filter): Query<ReviewAdminFilter>,
    Query(pagination): Query<PaginationParams>,
) -> Result<impl IntoResponse, ServiceError> {
    let (page, per_page) = pagination.resolve(&state.config)?;
    let (rows, total) = state
        .services
        .reviews
        .admin_list(filter, page, per_page)
        .await?;
    let items: Vec<ReviewAdminRowResponse> = rows
        .into_iter()
        .map(ReviewAdminRowResponse::from)
        .collect();
    Ok(success_response(PaginatedResponse::new(
        items, total, page, per_page,
    )))
}

#[utoipa::path(
    post,
    path = "/api/v1/admin/reviews/moderate",
    request_body = ModerateReviewsRequest,
    responses((status = 200, description = "Moderation flag updated", body = crate::ApiResponse<BulkActionResponse>)),
    security(("bearer" = [])),
    tag = "Admin"
)]
pub async fn moderate_reviews(
    _staff: StaffUser,
    State(state): State<AppState>,
    Json(payload): Json<ModerateReviewsRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let affected = state
        .services
        .reviews
        .moderate_bulk(&payload.ids, payload.moderated)
        .await?;
    Ok(success_response(BulkActionResponse { affected }))
}

// Request/Response DTOs

#[derive(Debug, Deserialize, ToSchema)]
pub struct BulkIdsRequest {
    pub ids: Vec<i64>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ModerateReviewsRequest {
    pub ids: Vec<i64>,
    /// Target moderation state for every listed review
    pub moderated: bool,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ExportParams {
    /// Comma-separated product ids; omit to export everything
    pub ids: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BulkActionResponse {
    /// Number of rows the action changed
    pub affected: u64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProductAdminRowResponse {
    pub product: ProductResponse,
    pub full_name: String,
    pub tech_type_name: String,
    /// First three category names, with an ellipsis for longer lists
    pub category_names: String,
    pub variant_count: u64,
    pub average_rating: Option<f64>,
}

impl From<ProductAdminRow> for ProductAdminRowResponse {
    fn from(row: ProductAdminRow) -> Self {
        Self {
            product: ProductResponse::from(row.product),
            full_name: row.full_name,
            tech_type_name: row.tech_type_name,
            category_names: row.category_names,
            variant_count: row.variant_count,
            average_rating: row.average_rating,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderAdminRowResponse {
    pub order: OrderResponse,
    /// Customer display name: registered owner first, then the guest name
    pub customer: String,
    pub item_count: usize,
    /// Sum over the line items, shown next to the stored total
    #[schema(value_type = String)]
    pub items_total: Decimal,
}

impl From<OrderAdminRow> for OrderAdminRowResponse {
    fn from(row: OrderAdminRow) -> Self {
        Self {
            order: OrderResponse::from(row.order),
            customer: row.customer,
            item_count: row.item_count,
            items_total: row.items_total,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ReviewAdminRowResponse {
    #[serde(flatten)]
    pub review: ReviewResponse,
    pub product_name: String,
}

impl From<ReviewAdminRow> for ReviewAdminRowResponse {
    fn from(row: ReviewAdminRow) -> Self {
        Self {
            review: ReviewResponse::from_parts(row.review, row.username),
            product_name: row.product_name,
        }
    }
}
