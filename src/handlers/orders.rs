use super::common::{
    created_response, no_content_response, success_response, validate_input, PaginationParams,
};
use crate::{
    auth::AuthenticatedUser,
    entities::{OrderItemModel, OrderModel, OrderStatus, PaymentMethod},
    errors::ServiceError,
    services::orders::{
        AddOrderItemInput, CreateOrderInput, OrderDetails, UpdateOrderInput, UpdateOrderItemInput,
    },
    AppState, PaginatedResponse,
};
use axum::{
    extract::{Json, Path, Query, State},
    response::IntoResponse,
    routing::{get, post, put},
    Router,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

/// Creates the router for order endpoints
pub fn orders_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_orders).post(create_order))
        .route(
            "/:id",
            get(get_order).put(update_order).delete(delete_order),
        )
        .route("/:id/items", post(add_order_item))
        .route(
            "/:id/items/:item_id",
            put(update_order_item).delete(remove_order_item),
        )
        .route("/:id/status", put(update_order_status))
}

/// Which account a new order belongs to. Staff may place orders for any
/// account or for guests; everyone else places orders for themselves, and
/// anonymous callers can only check out as guests.
fn resolve_order_owner(
    user: Option<&AuthenticatedUser>,
    requested: Option<i64>,
) -> Result<Option<i64>, ServiceError> {
    match user {
        Some(u) if u.is_staff => Ok(requested),
        Some(u) => match requested {
            Some(id) if id != u.user_id => Err(ServiceError::Forbidden(
                "Orders can only be placed for your own account".to_string(),
            )),
            _ => Ok(Some(u.user_id)),
        },
        None => match requested {
            Some(_) => Err(ServiceError::Unauthorized(
                "Sign in to place an order on a user account".to_string(),
            )),
            None => Ok(None),
        },
    }
}

fn ensure_can_access(order: &OrderModel, user: &AuthenticatedUser) -> Result<(), ServiceError> {
    if user.is_staff || order.user_id == Some(user.user_id) {
        return Ok(());
    }
    Err(ServiceError::Forbidden(
        "You do not have access to this order".to_string(),
    ))
}

#[utoipa::path(
    get,
    path = "/api/v1/orders",
    params(ListOrdersParams, PaginationParams),
    responses((status = 200, description = "Orders newest first", body = crate::ApiResponse<crate::PaginatedResponse<OrderResponse>>)),
    security(("bearer" = [])),
    tag = "Orders"
)]
pub async fn list_orders(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Query(params): Query<ListOrdersParams>,
    Query(pagination): Query<PaginationParams>,
) -> Result<impl IntoResponse, ServiceError> {
    let (page, per_page) = pagination.resolve(&state.config)?;

    // Staff may browse any account (or everything); everyone else sees
    // their own orders only.
    let scope = if user.is_staff {
        params.user_id
    } else {
        Some(user.user_id)
    };

    let (orders, total) = state
        .services
        .orders
        .list_orders(scope, page, per_page)
        .await?;
    let items: Vec<OrderResponse> = orders.into_iter().map(OrderResponse::from).collect();
    Ok(success_response(PaginatedResponse::new(
        items, total, page, per_page,
    )))
}

/// Creates an order. Checkout works without an account: anonymous callers
/// provide the guest contact fields instead of owning the order.
#[utoipa::path(
    post,
    path = "/api/v1/orders",
    request_body = CreateOrderRequest,
    responses(
        (status = 201, description = "Order created with an empty item set", body = crate::ApiResponse<OrderResponse>),
        (status = 400, description = "Validation failed", body = crate::errors::ErrorResponse)
    ),
    tag = "Orders"
)]
pub async fn create_order(
    user: Option<AuthenticatedUser>,
    State(state): State<AppState>,
    Json(payload): Json<CreateOrderRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    validate_input(&payload)?;

    let user_id = resolve_order_owner(user.as_ref(), payload.user_id)?;
    let order = state
        .services
        .orders
        .create_order(CreateOrderInput {
            user_id,
            shipping_address: payload.shipping_address,
            payment_method: payload.payment_method,
            tracking_number: payload.tracking_number,
            guest_email: payload.guest_email,
            guest_phone: payload.guest_phone,
            guest_name: payload.guest_name,
        })
        .await?;
    Ok(created_response(OrderResponse::from(order)))
}

#[utoipa::path(
    get,
    path = "/api/v1/orders/{id}",
    params(("id" = i64, Path, description = "Order id")),
    responses(
        (status = 200, description = "Order with its items", body = crate::ApiResponse<OrderDetailResponse>),
        (status = 403, description = "Order belongs to someone else", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer" = [])),
    tag = "Orders"
)]
pub async fn get_order(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ServiceError> {
    let details = state.services.orders.get_order(id).await?;
    ensure_can_access(&details.order, &user)?;
    Ok(success_response(OrderDetailResponse::from(details)))
}

#[utoipa::path(
    put,
    path = "/api/v1/orders/{id}",
    params(("id" = i64, Path, description = "Order id")),
    request_body = UpdateOrderRequest,
    responses(
        (status = 200, description = "Order updated", body = crate::ApiResponse<OrderResponse>),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer" = [])),
    tag = "Orders"
)]
pub async fn update_order(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateOrderRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    validate_input(&payload)?;

    let details = state.services.orders.get_order(id).await?;
    ensure_can_access(&details.order, &user)?;

    if payload.user_id.is_some() && !user.is_staff {
        return Err(ServiceError::Forbidden(
            "Only staff can reassign an order to another account".to_string(),
        ));
    }

    let order = state
        .services
        .orders
        .update_order(
            id,
            UpdateOrderInput {
                user_id: payload.user_id,
                shipping_address: payload.shipping_address,
                payment_method: payload.payment_method,
                tracking_number: payload.tracking_number,
                guest_email: payload.guest_email,
                guest_phone: payload.guest_phone,
                guest_name: payload.guest_name,
            },
        )
        .await?;
    Ok(success_response(OrderResponse::from(order)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/orders/{id}",
    params(("id" = i64, Path, description = "Order id")),
    responses(
        (status = 204, description = "Order and its items deleted"),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer" = [])),
    tag = "Orders"
)]
pub async fn delete_order(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ServiceError> {
    let details = state.services.orders.get_order(id).await?;
    ensure_can_access(&details.order, &user)?;

    state.services.orders.delete_order(id).await?;
    Ok(no_content_response())
}

/// Adds a line item. The variant's current price is captured as the
/// snapshot unless an explicit `price_at_time` is supplied; the stored
/// order total is recomputed in the same transaction.
#[utoipa::path(
    post,
    path = "/api/v1/orders/{id}/items",
    params(("id" = i64, Path, description = "Order id")),
    request_body = AddOrderItemRequest,
    responses(
        (status = 201, description = "Item added, total recomputed", body = crate::ApiResponse<OrderItemWithTotalResponse>),
        (status = 404, description = "Order or variant not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer" = [])),
    tag = "Orders"
)]
pub async fn add_order_item(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<AddOrderItemRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    validate_input(&payload)?;

    let details = state.services.orders.get_order(id).await?;
    ensure_can_access(&details.order, &user)?;

    let (item, order_total) = state
        .services
        .orders
        .add_item(
            id,
            AddOrderItemInput {
                variant_id: payload.variant_id,
                quantity: payload.quantity,
                price_at_time: payload.price_at_time,
            },
        )
        .await?;
    Ok(created_response(OrderItemWithTotalResponse {
        item: OrderItemResponse::from(item),
        order_total,
    }))
}

#[utoipa::path(
    put,
    path = "/api/v1/orders/{id}/items/{item_id}",
    params(
        ("id" = i64, Path, description = "Order id"),
        ("item_id" = i64, Path, description = "Order item id")
    ),
    request_body = UpdateOrderItemRequest,
    responses(
        (status = 200, description = "Item updated, total recomputed", body = crate::ApiResponse<OrderItemWithTotalResponse>),
        (status = 404, description = "Order or item not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer" = [])),
    tag = "Orders"
)]
pub async fn update_order_item(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Path((id, item_id)): Path<(i64, i64)>,
    Json(payload): Json<UpdateOrderItemRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    validate_input(&payload)?;

    let details = state.services.orders.get_order(id).await?;
    ensure_can_access(&details.order, &user)?;

    let (item, order_total) = state
        .services
        .orders
        .update_item(
            id,
            item_id,
            UpdateOrderItemInput {
                quantity: payload.quantity,
                price_at_time: payload.price_at_time,
            },
        )
        .await?;
    Ok(success_response(OrderItemWithTotalResponse {
        item: OrderItemResponse::from(item),
        order_total,
    }))
}

#[utoipa::path(
    delete,
    path = "/api/v1/orders/{id}/items/{item_id}",
    params(
        ("id" = i64, Path, description = "Order id"),
        ("item_id" = i64, Path, description = "Order item id")
    ),
    responses(
        (status = 200, description = "Item removed, total recomputed", body = crate::ApiResponse<OrderTotalResponse>),
        (status = 404, description = "Order or item not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer" = [])),
    tag = "Orders"
)]
pub async fn remove_order_item(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Path((id, item_id)): Path<(i64, i64)>,
) -> Result<impl IntoResponse, ServiceError> {
    let details = state.services.orders.get_order(id).await?;
    ensure_can_access(&details.order, &user)?;

    let order_total = state.services.orders.remove_item(id, item_id).await?;
    Ok(success_response(OrderTotalResponse { order_total }))
}

#[utoipa::path(
    put,
    path = "/api/v1/orders/{id}/status",
    params(("id" = i64, Path, description = "Order id")),
    request_body = UpdateOrderStatusRequest,
    responses(
        (status = 200, description = "Status changed", body = crate::ApiResponse<OrderResponse>),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer" = [])),
    tag = "Orders"
)]
pub async fn update_order_status(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateOrderStatusRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let details = state.services.orders.get_order(id).await?;
    ensure_can_access(&details.order, &user)?;

    let order = state
        .services
        .orders
        .update_status(id, payload.status)
        .await?;
    Ok(success_response(OrderResponse::from(order)))
}

// Request/Response DTOs

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListOrdersParams {
    /// Restrict to one account; staff only, ignored for other callers
    pub user_id: Option<i64>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateOrderRequest {
    /// Target account; staff only, everyone else orders for themselves
    pub user_id: Option<i64>,
    #[validate(length(min = 1))]
    #[schema(example = "10 Main St, Springfield")]
    pub shipping_address: String,
    /// Defaults to card_online
    pub payment_method: Option<PaymentMethod>,
    pub tracking_number: Option<String>,
    #[validate(email)]
    pub guest_email: Option<String>,
    pub guest_phone: Option<String>,
    pub guest_name: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateOrderRequest {
    /// Reassign the order to another account; staff only
    pub user_id: Option<i64>,
    #[validate(length(min = 1))]
    pub shipping_address: Option<String>,
    pub payment_method: Option<PaymentMethod>,
    pub tracking_number: Option<String>,
    #[validate(email)]
    pub guest_email: Option<String>,
    pub guest_phone: Option<String>,
    pub guest_name: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct AddOrderItemRequest {
    pub variant_id: i64,
    #[validate(range(min = 1))]
    pub quantity: i32,
    /// Price snapshot override; defaults to the variant's current price
    #[schema(value_type = Option<String>, example = "999.99")]
    pub price_at_time: Option<Decimal>,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateOrderItemRequest {
    #[validate(range(min = 1))]
    pub quantity: Option<i32>,
    #[schema(value_type = Option<String>)]
    pub price_at_time: Option<Decimal>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateOrderStatusRequest {
    #[schema(example = "shipped")]
    pub status: OrderStatus,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderResponse {
    pub id: i64,
    pub user_id: Option<i64>,
    pub order_date: DateTime<Utc>,
    pub status: OrderStatus,
    #[schema(value_type = String)]
    pub total_price: Decimal,
    pub shipping_address: String,
    pub payment_method: PaymentMethod,
    pub tracking_number: Option<String>,
    pub guest_email: Option<String>,
    pub guest_phone: Option<String>,
    pub guest_name: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl From<OrderModel> for OrderResponse {
    fn from(model: OrderModel) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            order_date: model.order_date,
            status: model.status,
            total_price: model.total_price,
            shipping_address: model.shipping_address,
            payment_method: model.payment_method,
            tracking_number: model.tracking_number,
            guest_email: model.guest_email,
            guest_phone: model.guest_phone,
            guest_name: model.guest_name,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderItemResponse {
    pub id: i64,
    pub order_id: i64,
    pub variant_id: i64,
    pub quantity: i32,
    #[schema(value_type = String)]
    pub price_at_time: Decimal,
    #[schema(value_type = String)]
    pub line_total: Decimal,
}

impl From<OrderItemModel> for OrderItemResponse {
    fn from(model: OrderItemModel) -> Self {
        let line_total = model.line_total();
        Self {
            id: model.id,
            order_id: model.order_id,
            variant_id: model.variant_id,
            quantity: model.quantity,
            price_at_time: model.price_at_time,
            line_total,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderDetailResponse {
    pub order: OrderResponse,
    pub items: Vec<OrderItemResponse>,
}

impl From<OrderDetails> for OrderDetailResponse {
    fn from(details: OrderDetails) -> Self {
        Self {
            order: OrderResponse::from(details.order),
            items: details
                .items
                .into_iter()
                .map(OrderItemResponse::from)
                .collect(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderItemWithTotalResponse {
    pub item: OrderItemResponse,
    /// Stored order total after the mutation
    #[schema(value_type = String)]
    pub order_total: Decimal,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderTotalResponse {
    #[schema(value_type = String)]
    pub order_total: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn staff() -> AuthenticatedUser {
        AuthenticatedUser {
            user_id: 1,
            username: "admin".to_string(),
            is_staff: true,
        }
    }

    fn customer(id: i64) -> AuthenticatedUser {
        AuthenticatedUser {
            user_id: id,
            username: format!("user{}", id),
            is_staff: false,
        }
    }

    #[test]
    fn staff_place_orders_for_anyone() {
        let staff = staff();
        assert_eq!(resolve_order_owner(Some(&staff), Some(9)).unwrap(), Some(9));
        assert_eq!(resolve_order_owner(Some(&staff), None).unwrap(), None);
    }

    #[test]
    fn customers_place_orders_for_themselves() {
        let me = customer(5);
        assert_eq!(resolve_order_owner(Some(&me), None).unwrap(), Some(5));
        assert_eq!(resolve_order_owner(Some(&me), Some(5)).unwrap(), Some(5));
        assert_matches!(
            resolve_order_owner(Some(&me), Some(6)),
            Err(ServiceError::Forbidden(_))
        );
    }

    #[test]
    fn anonymous_checkout_is_guest_only() {
        assert_eq!(resolve_order_owner(None, None).unwrap(), None);
        assert_matches!(
            resolve_order_owner(None, Some(5)),
            Err(ServiceError::Unauthorized(_))
        );
    }

    #[test]
    fn order_access_is_owner_or_staff() {
        let order = OrderModel {
            id: 1,
            user_id: Some(5),
            order_date: Utc::now(),
            status: OrderStatus::Pending,
            total_price: Decimal::ZERO,
            shipping_address: "10 Main St".to_string(),
            payment_method: PaymentMethod::CardOnline,
            tracking_number: None,
            guest_email: None,
            guest_phone: None,
            guest_name: None,
            updated_at: Utc::now(),
        };

        assert!(ensure_can_access(&order, &customer(5)).is_ok());
        assert!(ensure_can_access(&order, &staff()).is_ok());
        assert_matches!(
            ensure_can_access(&order, &customer(6)),
            Err(ServiceError::Forbidden(_))
        );
    }

    #[test]
    fn guest_orders_are_staff_only() {
        let order = OrderModel {
            id: 2,
            user_id: None,
            order_date: Utc::now(),
            status: OrderStatus::Pending,
            total_price: Decimal::ZERO,
            shipping_address: "10 Main St".to_string(),
            payment_method: PaymentMethod::CashPickup,
            tracking_number: None,
            guest_email: Some("g@example.com".to_string()),
            guest_phone: None,
            guest_name: Some("Guest".to_string()),
            updated_at: Utc::now(),
        };

        assert!(ensure_can_access(&order, &staff()).is_ok());
        assert!(ensure_can_access(&order, &customer(5)).is_err());
    }
}
