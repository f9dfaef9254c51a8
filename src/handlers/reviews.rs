use super::common::{
    created_response, no_content_response, success_response, validate_input, PaginationParams,
};
use crate::{
    auth::AuthenticatedUser,
    entities::ReviewModel,
    errors::ServiceError,
    services::reviews::{CreateReviewInput, ReviewWithAuthor},
    AppState, PaginatedResponse,
};
use axum::{
    extract::{Json, Path, Query, State},
    response::IntoResponse,
    routing::{delete, get},
    Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

/// Creates the router for review endpoints
pub fn reviews_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_reviews).post(create_review))
        .route("/:id", delete(delete_review))
}

/// Reviews of one active product, newest first. The product filter is
/// required; there is no site-wide public review feed.
#[utoipa::path(
    get,
    path = "/api/v1/reviews",
    params(ListReviewsParams, PaginationParams),
    responses(
        (status = 200, description = "Reviews with author usernames", body = crate::ApiResponse<crate::PaginatedResponse<ReviewResponse>>),
        (status = 400, description = "Missing product filter", body = crate::errors::ErrorResponse),
        (status = 404, description = "Product missing or inactive", body = crate::errors::ErrorResponse)
    ),
    tag = "Reviews"
)]
pub async fn list_reviews(
    State(state): State<AppState>,
    Query(params): Query<ListReviewsParams>,
    Query(pagination): Query<PaginationParams>,
) -> Result<impl IntoResponse, ServiceError> {
    let product_id = params.product_id.ok_or_else(|| {
        ServiceError::ValidationError("The product_id query parameter is required".to_string())
    })?;
    let (page, per_page) = pagination.resolve(&state.config)?;

    let (reviews, total) = state
        .services
        .reviews
        .list_for_product(product_id, page, per_page)
        .await?;
    let items: Vec<ReviewResponse> = reviews.into_iter().map(ReviewResponse::from).collect();
    Ok(success_response(PaginatedResponse::new(
        items, total, page, per_page,
    )))
}

#[utoipa::path(
    post,
    path = "/api/v1/reviews",
    request_body = CreateReviewRequest,
    responses(
        (status = 201, description = "Review submitted, pending moderation", body = crate::ApiResponse<ReviewResponse>),
        (status = 404, description = "Product missing or inactive", body = crate::errors::ErrorResponse),
        (status = 409, description = "Product already reviewed by this user", body = crate::errors::ErrorResponse)
    ),
    security(("bearer" = [])),
    tag = "Reviews"
)]
pub async fn create_review(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateReviewRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    validate_input(&payload)?;

    let review = state
        .services
        .reviews
        .create_review(
            user.user_id,
            CreateReviewInput {
                product_id: payload.product_id,
                rating: payload.rating,
                comment: payload.comment,
            },
        )
        .await?;

    let username = user.username;
    Ok(created_response(ReviewResponse::from(ReviewWithAuthor {
        review,
        username,
    })))
}

#[utoipa::path(
    delete,
    path = "/api/v1/reviews/{id}",
    params(("id" = i64, Path, description = "Review id")),
    responses(
        (status = 204, description = "Review deleted"),
        (status = 403, description = "Not the author and not staff", body = crate::errors::ErrorResponse),
        (status = 404, description = "Review not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer" = [])),
    tag = "Reviews"
)]
pub async fn delete_review(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ServiceError> {
    state
        .services
        .reviews
        .delete_review(id, user.user_id, user.is_staff)
        .await?;
    Ok(no_content_response())
}

// Request/Response DTOs

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListReviewsParams {
    /// Product whose reviews to list; required
    pub product_id: Option<i64>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateReviewRequest {
    pub product_id: i64,
    /// Star rating from 1 to 5
    #[validate(range(min = 1, max = 5))]
    #[schema(example = 5)]
    pub rating: i32,
    #[validate(length(min = 1, max = 2000))]
    #[schema(example = "Battery easily lasts two days.")]
    pub comment: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ReviewResponse {
    pub id: i64,
    pub user_id: i64,
    pub username: String,
    pub product_id: i64,
    pub rating: i32,
    pub comment: String,
    pub created_at: DateTime<Utc>,
    pub is_moderated: bool,
}

impl From<ReviewWithAuthor> for ReviewResponse {
    fn from(row: ReviewWithAuthor) -> Self {
        let ReviewWithAuthor { review, username } = row;
        Self::from_parts(review, username)
    }
}

impl ReviewResponse {
    pub(crate) fn from_parts(review: ReviewModel, username: String) -> Self {
        Self {
            id: review.id,
            user_id: review.user_id,
            username,
            product_id: review.product_id,
            rating: review.rating,
            comment: review.comment,
            created_at: review.created_at,
            is_moderated: review.is_moderated,
        }
    }
}
