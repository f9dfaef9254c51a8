use super::colors::ColorResponse;
use super::common::{
    created_response, no_content_response, success_response, validate_input, PaginationParams,
};
use super::sizes::SizeResponse;
use super::tech_types::TechTypeResponse;
use crate::{
    auth::AuthenticatedUser,
    entities::{CategoryModel, ProductModel, ProductSpecificationModel, ProductVariantModel},
    errors::ServiceError,
    services::products::{
        CatalogSearchOutcome, CatalogSearchParams, CreateProductInput, CreateVariantInput,
        ProductDetails, ProductOverviewEntry, SpecificationInput, UpdateProductInput,
        UpdateVariantInput, VariantDetails,
    },
    AppState, PaginatedResponse,
};
use axum::{
    body::Bytes,
    extract::{Json, Path, Query, State},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

/// Creates the router for product endpoints. Fixed segments come before
/// the `:id` capture so `/recent` is never parsed as a product id.
pub fn products_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_products).post(create_product))
        .route("/recent", get(recent_products))
        .route("/search", get(search_products))
        .route("/overview", get(products_overview))
        .route(
            "/:id",
            get(get_product).put(update_product).delete(delete_product),
        )
        .route(
            "/:id/specifications",
            get(list_specifications).post(add_specification),
        )
        .route("/:id/variants", get(list_variants).post(create_variant))
        .route("/:id/instruction", post(upload_instruction_manual))
}

/// Routes for specifications addressed by their own id.
pub fn specifications_routes() -> Router<AppState> {
    Router::new().route(
        "/:id",
        axum::routing::put(update_specification).delete(delete_specification),
    )
}

/// Routes for variants addressed by their own id.
pub fn variants_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/:id",
            get(get_variant).put(update_variant).delete(delete_variant),
        )
        .route("/:id/image", post(upload_variant_image))
}

#[utoipa::path(
    get,
    path = "/api/v1/products",
    params(PaginationParams),
    responses((status = 200, description = "Active products, newest first", body = crate::ApiResponse<crate::PaginatedResponse<ProductResponse>>)),
    tag = "Products"
)]
pub async fn list_products(
    State(state): State<AppState>,
    Query(pagination): Query<PaginationParams>,
) -> Result<impl IntoResponse, ServiceError> {
    let (page, per_page) = pagination.resolve(&state.config)?;
    let (products, total) = state.services.products.list_active(page, per_page).await?;
    let items: Vec<ProductResponse> = products.into_iter().map(ProductResponse::from).collect();
    Ok(success_response(PaginatedResponse::new(
        items, total, page, per_page,
    )))
}

/// Active products created inside the configured recent window.
#[utoipa::path(
    get,
    path = "/api/v1/products/recent",
    responses((status = 200, description = "Recently added products", body = crate::ApiResponse<Vec<ProductResponse>>)),
    tag = "Products"
)]
pub async fn recent_products(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ServiceError> {
    let products = state.services.products.list_recent().await?;
    let items: Vec<ProductResponse> = products.into_iter().map(ProductResponse::from).collect();
    Ok(success_response(items))
}

/// Free-text catalog search. `name_contains` matches name or brand,
/// `desc_icontains` matches the description case-insensitively; the
/// response carries catalog-wide statistics alongside the hits.
#[utoipa::path(
    get,
    path = "/api/v1/products/search",
    params(
        ("name_contains" = Option<String>, Query, description = "Match against product name or brand"),
        ("desc_icontains" = Option<String>, Query, description = "Case-insensitive match against the description")
    ),
    responses((status = 200, description = "Search hits plus catalog statistics", body = crate::ApiResponse<CatalogSearchResponse>)),
    tag = "Products"
)]
pub async fn search_products(
    State(state): State<AppState>,
    Query(params): Query<CatalogSearchParams>,
) -> Result<impl IntoResponse, ServiceError> {
    let outcome = state.services.products.search_extended(params).await?;
    Ok(success_response(CatalogSearchResponse::from(outcome)))
}

/// The whole catalog with tech types, categories, variants and review
/// counts resolved in one response.
#[utoipa::path(
    get,
    path = "/api/v1/products/overview",
    responses((status = 200, description = "All products with relations resolved", body = crate::ApiResponse<Vec<ProductOverviewResponse>>)),
    tag = "Products"
)]
pub async fn products_overview(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ServiceError> {
    let entries = state.services.products.overview().await?;
    let items: Vec<ProductOverviewResponse> = entries
        .into_iter()
        .map(ProductOverviewResponse::from)
        .collect();
    Ok(success_response(items))
}

#[utoipa::path(
    get,
    path = "/api/v1/products/{id}",
    params(("id" = i64, Path, description = "Product id")),
    responses(
        (status = 200, description = "Product detail", body = crate::ApiResponse<ProductDetailResponse>),
        (status = 404, description = "Product missing or inactive", body = crate::errors::ErrorResponse)
    ),
    tag = "Products"
)]
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ServiceError> {
    let details = state.services.products.get_details(id).await?;
    Ok(success_response(ProductDetailResponse::from(details)))
}

#[utoipa::path(
    post,
    path = "/api/v1/products",
    request_body = CreateProductRequest,
    responses(
        (status = 201, description = "Product created", body = crate::ApiResponse<ProductResponse>),
        (status = 400, description = "Validation failed", body = crate::errors::ErrorResponse)
    ),
    security(("bearer" = [])),
    tag = "Products"
)]
pub async fn create_product(
    _user: AuthenticatedUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateProductRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    validate_input(&payload)?;

    let product = state
        .services
        .products
        .create_product(payload.into_input())
        .await?;
    Ok(created_response(ProductResponse::from(product)))
}

#[utoipa::path(
    put,
    path = "/api/v1/products/{id}",
    params(("id" = i64, Path, description = "Product id")),
    request_body = UpdateProductRequest,
    responses(
        (status = 200, description = "Product updated", body = crate::ApiResponse<ProductResponse>),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer" = [])),
    tag = "Products"
)]
pub async fn update_product(
    _user: AuthenticatedUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateProductRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    validate_input(&payload)?;

    let product = state
        .services
        .products
        .update_product(id, payload.into_input())
        .await?;
    Ok(success_response(ProductResponse::from(product)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/products/{id}",
    params(("id" = i64, Path, description = "Product id")),
    responses(
        (status = 204, description = "Product deleted"),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Variants are referenced by orders", body = crate::errors::ErrorResponse)
    ),
    security(("bearer" = [])),
    tag = "Products"
)]
pub async fn delete_product(
    _user: AuthenticatedUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ServiceError> {
    state.services.products.delete_product(id).await?;
    Ok(no_content_response())
}

#[utoipa::path(
    get,
    path = "/api/v1/products/{id}/specifications",
    params(("id" = i64, Path, description = "Product id")),
    responses(
        (status = 200, description = "Specifications ordered by name", body = crate::ApiResponse<Vec<SpecificationResponse>>),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse)
    ),
    tag = "Products"
)]
pub async fn list_specifications(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ServiceError> {
    let specs = state.services.products.list_specifications(id).await?;
    let items: Vec<SpecificationResponse> =
        specs.into_iter().map(SpecificationResponse::from).collect();
    Ok(success_response(items))
}

#[utoipa::path(
    post,
    path = "/api/v1/products/{id}/specifications",
    params(("id" = i64, Path, description = "Product id")),
    request_body = SpecificationRequest,
    responses(
        (status = 201, description = "Specification added", body = crate::ApiResponse<SpecificationResponse>),
        (status = 409, description = "Name already used for this product", body = crate::errors::ErrorResponse)
    ),
    security(("bearer" = [])),
    tag = "Products"
)]
pub async fn add_specification(
    _user: AuthenticatedUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<SpecificationRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    validate_input(&payload)?;

    let spec = state
        .services
        .products
        .add_specification(id, payload.into_input())
        .await?;
    Ok(created_response(SpecificationResponse::from(spec)))
}

#[utoipa::path(
    put,
    path = "/api/v1/specifications/{id}",
    params(("id" = i64, Path, description = "Specification id")),
    request_body = SpecificationRequest,
    responses(
        (status = 200, description = "Specification updated", body = crate::ApiResponse<SpecificationResponse>),
        (status = 404, description = "Specification not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer" = [])),
    tag = "Products"
)]
pub async fn update_specification(
    _user: AuthenticatedUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<SpecificationRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    validate_input(&payload)?;

    let existing = state.services.products.get_specification_by_id(id).await?;
    let spec = state
        .services
        .products
        .update_specification(existing.product_id, id, payload.into_input())
        .await?;
    Ok(success_response(SpecificationResponse::from(spec)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/specifications/{id}",
    params(("id" = i64, Path, description = "Specification id")),
    responses(
        (status = 204, description = "Specification deleted"),
        (status = 404, description = "Specification not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer" = [])),
    tag = "Products"
)]
pub async fn delete_specification(
    _user: AuthenticatedUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ServiceError> {
    let existing = state.services.products.get_specification_by_id(id).await?;
    state
        .services
        .products
        .delete_specification(existing.product_id, id)
        .await?;
    Ok(no_content_response())
}

#[utoipa::path(
    get,
    path = "/api/v1/products/{id}/variants",
    params(("id" = i64, Path, description = "Product id")),
    responses(
        (status = 200, description = "Variants cheapest first, colors and sizes resolved", body = crate::ApiResponse<Vec<VariantDetailResponse>>),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse)
    ),
    tag = "Products"
)]
pub async fn list_variants(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ServiceError> {
    let variants = state.services.products.list_variants(id).await?;
    let items: Vec<VariantDetailResponse> = variants
        .into_iter()
        .map(VariantDetailResponse::from)
        .collect();
    Ok(success_response(items))
}

#[utoipa::path(
    post,
    path = "/api/v1/products/{id}/variants",
    params(("id" = i64, Path, description = "Product id")),
    request_body = CreateVariantRequest,
    responses(
        (status = 201, description = "Variant created", body = crate::ApiResponse<VariantResponse>),
        (status = 409, description = "SKU or color/size combination already used", body = crate::errors::ErrorResponse)
    ),
    security(("bearer" = [])),
    tag = "Products"
)]
pub async fn create_variant(
    _user: AuthenticatedUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<CreateVariantRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    validate_input(&payload)?;

    let variant = state
        .services
        .products
        .create_variant(id, payload.into_input())
        .await?;
    Ok(created_response(VariantResponse::from(variant)))
}

#[utoipa::path(
    get,
    path = "/api/v1/variants/{id}",
    params(("id" = i64, Path, description = "Variant id")),
    responses(
        (status = 200, description = "Variant with color and size resolved", body = crate::ApiResponse<VariantDetailResponse>),
        (status = 404, description = "Variant not found", body = crate::errors::ErrorResponse)
    ),
    tag = "Products"
)]
pub async fn get_variant(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ServiceError> {
    let details = state.services.products.get_variant_details(id).await?;
    Ok(success_response(VariantDetailResponse::from(details)))
}

#[utoipa::path(
    put,
    path = "/api/v1/variants/{id}",
    params(("id" = i64, Path, description = "Variant id")),
    request_body = UpdateVariantRequest,
    responses(
        (status = 200, description = "Variant updated", body = crate::ApiResponse<VariantResponse>),
        (status = 404, description = "Variant not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer" = [])),
    tag = "Products"
)]
pub async fn update_variant(
    _user: AuthenticatedUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateVariantRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    validate_input(&payload)?;

    let existing = state.services.products.get_variant_by_id(id).await?;
    let variant = state
        .services
        .products
        .update_variant(existing.product_id, id, payload.into_input())
        .await?;
    Ok(success_response(VariantResponse::from(variant)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/variants/{id}",
    params(("id" = i64, Path, description = "Variant id")),
    responses(
        (status = 204, description = "Variant deleted"),
        (status = 404, description = "Variant not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Variant is referenced by order items", body = crate::errors::ErrorResponse)
    ),
    security(("bearer" = [])),
    tag = "Products"
)]
pub async fn delete_variant(
    _user: AuthenticatedUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ServiceError> {
    let existing = state.services.products.get_variant_by_id(id).await?;
    state
        .services
        .products
        .delete_variant(existing.product_id, id)
        .await?;
    Ok(no_content_response())
}

/// Accepts the raw file in the request body; the original filename comes
/// in as a query parameter and is sanitized before it touches the disk.
#[utoipa::path(
    post,
    path = "/api/v1/products/{id}/instruction",
    params(("id" = i64, Path, description = "Product id"), UploadParams),
    request_body(content = Vec<u8>, content_type = "application/octet-stream"),
    responses(
        (status = 200, description = "Instruction manual stored", body = crate::ApiResponse<ProductResponse>),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer" = [])),
    tag = "Products"
)]
pub async fn upload_instruction_manual(
    _user: AuthenticatedUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Query(params): Query<UploadParams>,
    body: Bytes,
) -> Result<impl IntoResponse, ServiceError> {
    if body.is_empty() {
        return Err(ServiceError::ValidationError(
            "Uploaded file is empty".to_string(),
        ));
    }

    let product = state
        .services
        .products
        .attach_instruction_manual(id, &params.filename, &body)
        .await?;
    Ok(success_response(ProductResponse::from(product)))
}

#[utoipa::path(
    post,
    path = "/api/v1/variants/{id}/image",
    params(("id" = i64, Path, description = "Variant id"), UploadParams),
    request_body(content = Vec<u8>, content_type = "application/octet-stream"),
    responses(
        (status = 200, description = "Variant image stored", body = crate::ApiResponse<VariantResponse>),
        (status = 404, description = "Variant not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer" = [])),
    tag = "Products"
)]
pub async fn upload_variant_image(
    _user: AuthenticatedUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Query(params): Query<UploadParams>,
    body: Bytes,
) -> Result<impl IntoResponse, ServiceError> {
    if body.is_empty() {
        return Err(ServiceError::ValidationError(
            "Uploaded file is empty".to_string(),
        ));
    }

    let existing = state.services.products.get_variant_by_id(id).await?;
    let variant = state
        .services
        .products
        .attach_variant_image(existing.product_id, id, &params.filename, &body)
        .await?;
    Ok(success_response(VariantResponse::from(variant)))
}

// Request/Response DTOs

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateProductRequest {
    #[validate(length(min = 1, max = 200))]
    #[schema(example = "Gamma 12")]
    pub name: String,
    pub description: Option<String>,
    #[validate(length(max = 100))]
    #[schema(example = "Nova")]
    pub brand: Option<String>,
    pub is_active: Option<bool>,
    pub tech_type_id: i64,
    #[validate(url)]
    pub manufacturer_url: Option<String>,
    /// Categories to link; an empty list leaves the product uncategorized
    #[serde(default)]
    pub category_ids: Vec<i64>,
}

impl CreateProductRequest {
    fn into_input(self) -> CreateProductInput {
        CreateProductInput {
            name: self.name,
            description: self.description,
            brand: self.brand,
            is_active: self.is_active,
            tech_type_id: self.tech_type_id,
            manufacturer_url: self.manufacturer_url,
            category_ids: self.category_ids,
        }
    }
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateProductRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    pub description: Option<String>,
    #[validate(length(max = 100))]
    pub brand: Option<String>,
    pub is_active: Option<bool>,
    pub tech_type_id: Option<i64>,
    #[validate(url)]
    pub manufacturer_url: Option<String>,
    /// When present, replaces the whole category set
    pub category_ids: Option<Vec<i64>>,
}

impl UpdateProductRequest {
    fn into_input(self) -> UpdateProductInput {
        UpdateProductInput {
            name: self.name,
            description: self.description,
            brand: self.brand,
            is_active: self.is_active,
            tech_type_id: self.tech_type_id,
            manufacturer_url: self.manufacturer_url,
            category_ids: self.category_ids,
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct SpecificationRequest {
    #[validate(length(min = 1, max = 100))]
    #[schema(example = "Display")]
    pub name: String,
    #[validate(length(min = 1, max = 255))]
    #[schema(example = "6.1 inch OLED")]
    pub value: String,
}

impl SpecificationRequest {
    fn into_input(self) -> SpecificationInput {
        SpecificationInput {
            name: self.name,
            value: self.value,
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateVariantRequest {
    pub color_id: Option<i64>,
    pub size_id: Option<i64>,
    #[validate(range(min = 0))]
    pub stock_quantity: i32,
    #[schema(value_type = String, example = "999.99")]
    pub price: Decimal,
    #[validate(length(min = 1, max = 64))]
    #[schema(example = "GAMMA12-BLK-128")]
    pub sku: String,
}

impl CreateVariantRequest {
    fn into_input(self) -> CreateVariantInput {
        CreateVariantInput {
            color_id: self.color_id,
            size_id: self.size_id,
            stock_quantity: self.stock_quantity,
            price: self.price,
            sku: self.sku,
        }
    }
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateVariantRequest {
    pub color_id: Option<i64>,
    pub size_id: Option<i64>,
    #[validate(range(min = 0))]
    pub stock_quantity: Option<i32>,
    #[schema(value_type = Option<String>, example = "899.99")]
    pub price: Option<Decimal>,
    #[validate(length(min = 1, max = 64))]
    pub sku: Option<String>,
}

impl UpdateVariantRequest {
    fn into_input(self) -> UpdateVariantInput {
        UpdateVariantInput {
            color_id: self.color_id,
            size_id: self.size_id,
            stock_quantity: self.stock_quantity,
            price: self.price,
            sku: self.sku,
        }
    }
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct UploadParams {
    /// Original filename of the uploaded file
    pub filename: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProductResponse {
    pub id: i64,
    pub name: String,
    /// "{brand} {name}" when a brand is recorded
    pub full_name: String,
    pub description: Option<String>,
    pub brand: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub tech_type_id: i64,
    /// Media path of the stored manual, served under /media
    pub instruction_manual: Option<String>,
    pub manufacturer_url: Option<String>,
}

impl From<ProductModel> for ProductResponse {
    fn from(model: ProductModel) -> Self {
        let full_name = model.full_name_with_brand();
        Self {
            id: model.id,
            name: model.name,
            full_name,
            description: model.description,
            brand: model.brand,
            is_active: model.is_active,
            created_at: model.created_at,
            tech_type_id: model.tech_type_id,
            instruction_manual: model.instruction_manual,
            manufacturer_url: model.manufacturer_url,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SpecificationResponse {
    pub id: i64,
    pub product_id: i64,
    pub name: String,
    pub value: String,
}

impl From<ProductSpecificationModel> for SpecificationResponse {
    fn from(model: ProductSpecificationModel) -> Self {
        Self {
            id: model.id,
            product_id: model.product_id,
            name: model.name,
            value: model.value,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct VariantResponse {
    pub id: i64,
    pub product_id: i64,
    pub color_id: Option<i64>,
    pub size_id: Option<i64>,
    pub stock_quantity: i32,
    #[schema(value_type = String)]
    pub price: Decimal,
    pub sku: String,
    /// Media path of the variant image, served under /media
    pub image: Option<String>,
}

impl From<ProductVariantModel> for VariantResponse {
    fn from(model: ProductVariantModel) -> Self {
        Self {
            id: model.id,
            product_id: model.product_id,
            color_id: model.color_id,
            size_id: model.size_id,
            stock_quantity: model.stock_quantity,
            price: model.price,
            sku: model.sku,
            image: model.image,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct VariantDetailResponse {
    pub id: i64,
    pub product_id: i64,
    pub color: Option<ColorResponse>,
    pub size: Option<SizeResponse>,
    pub stock_quantity: i32,
    #[schema(value_type = String)]
    pub price: Decimal,
    pub sku: String,
    pub image: Option<String>,
}

impl From<VariantDetails> for VariantDetailResponse {
    fn from(details: VariantDetails) -> Self {
        let VariantDetails {
            variant,
            color,
            size,
        } = details;
        Self {
            id: variant.id,
            product_id: variant.product_id,
            color: color.map(ColorResponse::from),
            size: size.map(SizeResponse::from),
            stock_quantity: variant.stock_quantity,
            price: variant.price,
            sku: variant.sku,
            image: variant.image,
        }
    }
}

/// Slim category reference embedded in product payloads.
#[derive(Debug, Serialize, ToSchema)]
pub struct CategorySummaryResponse {
    pub id: i64,
    pub name: String,
}

impl From<CategoryModel> for CategorySummaryResponse {
    fn from(model: CategoryModel) -> Self {
        Self {
            id: model.id,
            name: model.name,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProductDetailResponse {
    pub product: ProductResponse,
    pub tech_type: TechTypeResponse,
    pub categories: Vec<CategorySummaryResponse>,
    pub specifications: Vec<SpecificationResponse>,
    pub variants: Vec<VariantDetailResponse>,
    pub average_rating: Option<f64>,
    pub review_count: u64,
}

impl From<ProductDetails> for ProductDetailResponse {
    fn from(details: ProductDetails) -> Self {
        Self {
            product: ProductResponse::from(details.product),
            tech_type: TechTypeResponse::from(details.tech_type),
            categories: details
                .categories
                .into_iter()
                .map(CategorySummaryResponse::from)
                .collect(),
            specifications: details
                .specifications
                .into_iter()
                .map(SpecificationResponse::from)
                .collect(),
            variants: details
                .variants
                .into_iter()
                .map(VariantDetailResponse::from)
                .collect(),
            average_rating: details.average_rating,
            review_count: details.review_count,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProductOverviewResponse {
    pub product: ProductResponse,
    pub tech_type: TechTypeResponse,
    pub categories: Vec<CategorySummaryResponse>,
    pub variants: Vec<VariantDetailResponse>,
    pub review_count: u64,
}

impl From<ProductOverviewEntry> for ProductOverviewResponse {
    fn from(entry: ProductOverviewEntry) -> Self {
        Self {
            product: ProductResponse::from(entry.product),
            tech_type: TechTypeResponse::from(entry.tech_type),
            categories: entry
                .categories
                .into_iter()
                .map(CategorySummaryResponse::from)
                .collect(),
            variants: entry
                .variants
                .into_iter()
                .map(VariantDetailResponse::from)
                .collect(),
            review_count: entry.review_count,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct NameBrandSampleResponse {
    pub name: String,
    pub brand: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CatalogStatsResponse {
    pub total_active_products: u64,
    pub has_apple_products: bool,
    /// Ids of the five newest products regardless of active flag
    pub recent_product_ids: Vec<i64>,
    pub name_brand_samples: Vec<NameBrandSampleResponse>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CatalogSearchResponse {
    pub products: Vec<ProductResponse>,
    pub stats: CatalogStatsResponse,
}

impl From<CatalogSearchOutcome> for CatalogSearchResponse {
    fn from(outcome: CatalogSearchOutcome) -> Self {
        Self {
            products: outcome
                .products
                .into_iter()
                .map(ProductResponse::from)
                .collect(),
            stats: CatalogStatsResponse {
                total_active_products: outcome.stats.total_active_products,
                has_apple_products: outcome.stats.has_apple_products,
                recent_product_ids: outcome.stats.recent_product_ids,
                name_brand_samples: outcome
                    .stats
                    .name_brand_samples
                    .into_iter()
                    .map(|s| NameBrandSampleResponse {
                        name: s.name,
                        brand: s.brand,
                    })
                    .collect(),
            },
        }
    }
}
