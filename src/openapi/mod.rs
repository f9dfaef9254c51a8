use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "TechStore API",
        description = r#"
# TechStore Catalog and Order API

Backend for the TechStore shop: product catalog with variants, customer
orders, reviews, favorites and promotions, plus the staff surface used by
the back office.

## Features

- **Catalog**: tech types, categories, colors, sizes and products with
  per-variant stock, price and SKU
- **Orders**: registered and guest checkout, line item editing with order
  total recalculation, fulfillment status tracking
- **Reviews**: one review per customer per product, staff moderation
- **Favorites**: per-account product bookmarks
- **Promotions**: date-windowed percentage discounts linked to products
- **Staff tools**: filtered tables, bulk activation and moderation, CSV
  export and PDF invoices

## Authentication

Endpoints marked with the `bearer` security requirement expect a JWT in the
Authorization header:

```
Authorization: Bearer <access-token>
```

Tokens come from `POST /api/v1/auth/register` and `POST /api/v1/auth/login`;
exchange the refresh token for a new pair with `POST /api/v1/auth/refresh`.
Staff-only endpoints additionally require the account's staff flag.

## Error Handling

Errors use a consistent JSON shape with the matching HTTP status code:

```json
{
  "error": "Not Found",
  "message": "Product with id 42 not found",
  "request_id": "0b9f…",
  "timestamp": "2025-01-01T00:00:00Z"
}
```

## Pagination

List endpoints accept `page` (default 1) and `per_page` (server-capped)
query parameters and answer with `items`, `total`, `page`, `per_page` and
`total_pages`.
        "#,
        contact(name = "TechStore Engineering", email = "engineering@techstore.shop"),
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    servers(
        (url = "https://api.techstore.shop", description = "Production"),
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "Auth", description = "Registration, login and the current account"),
        (name = "Catalog", description = "Tech types, categories, colors and sizes"),
        (name = "Products", description = "Products, specifications, variants and uploads"),
        (name = "Orders", description = "Checkout and order management"),
        (name = "Reviews", description = "Product reviews"),
        (name = "Favorites", description = "Per-account product bookmarks"),
        (name = "Promos", description = "Promotions and their product links"),
        (name = "Admin", description = "Staff-only tables, bulk actions and exports")
    ),
    paths(
        // Auth
        crate::handlers::auth::register,
        crate::handlers::auth::login,
        crate::handlers::auth::refresh,
        crate::handlers::auth::me,

        // Tech types
        crate::handlers::tech_types::list_tech_types,
        crate::handlers::tech_types::get_tech_type,
        crate::handlers::tech_types::create_tech_type,
        crate::handlers::tech_types::update_tech_type,
        crate::handlers::tech_types::delete_tech_type,

        // Categories
        crate::handlers::categories::list_categories,
        crate::handlers::categories::get_category,
        crate::handlers::categories::create_category,
        crate::handlers::categories::update_category,
        crate::handlers::categories::delete_category,

        // Colors
        crate::handlers::colors::list_colors,
        crate::handlers::colors::get_color,
        crate::handlers::colors::create_color,
        crate::handlers::colors::update_color,
        crate::handlers::colors::delete_color,

        // Sizes
        crate::handlers::sizes::list_sizes,
        crate::handlers::sizes::get_size,
        crate::handlers::sizes::create_size,
        crate::handlers::sizes::update_size,
        crate::handlers::sizes::delete_size,

        // Products
        crate::handlers::products::list_products,
        crate::handlers::products::recent_products,
        crate::handlers::products::search_products,
        crate::handlers::products::products_overview,
        crate::handlers::products::get_product,
        crate::handlers::products::create_product,
        crate::handlers::products::update_product,
        crate::handlers::products::delete_product,
        crate::handlers::products::list_specifications,
        crate::handlers::products::add_specification,
        crate::handlers::products::update_specification,
        crate::handlers::products::delete_specification,
        crate::handlers::products::list_variants,
        crate::handlers::products::create_variant,
        crate::handlers::products::get_variant,
        crate::handlers::products::update_variant,
        crate::handlers::products::delete_variant,
        crate::handlers::products::upload_instruction_manual,
        crate::handlers::products::upload_variant_image,

        // Orders
        crate::handlers::orders::list_orders,
        crate::handlers::orders::create_order,
        crate::handlers::orders::get_order,
        crate::handlers::orders::update_order,
        crate::handlers::orders::delete_order,
        crate::handlers::orders::add_order_item,
        crate::handlers::orders::update_order_item,
        crate::handlers::orders::remove_order_item,
        crate::handlers::orders::update_order_status,

        // Reviews
        crate::handlers::reviews::list_reviews,
        crate::handlers::reviews::create_review,
        crate::handlers::reviews::delete_review,

        // Favorites
        crate::handlers::favorites::list_favorites,
        crate::handlers::favorites::add_favorite,
        crate::handlers::favorites::remove_favorite,

        // Promos
        crate::handlers::promos::list_promos,
        crate::handlers::promos::active_promos,
        crate::handlers::promos::get_promo,
        crate::handlers::promos::create_promo,
        crate::handlers::promos::update_promo,
        crate::handlers::promos::delete_promo,
        crate::handlers::promos::add_promo_product,
        crate::handlers::promos::remove_promo_product,

        // Admin
        crate::handlers::admin::admin_list_products,
        crate::handlers::admin::activate_products,
        crate::handlers::admin::deactivate_products,
        crate::handlers::admin::export_products,
        crate::handlers::admin::admin_list_orders,
        crate::handlers::admin::order_invoice,
        crate::handlers::admin::admin_list_reviews,
        crate::handlers::admin::moderate_reviews,

        // Root health/status and the legacy redirect stay out of the
        // documented surface
    ),
    components(
        schemas(
            // Common wrappers
            crate::ApiResponse<serde_json::Value>,
            crate::PaginatedResponse<serde_json::Value>,
            crate::errors::ErrorResponse,

            // Auth
            crate::handlers::auth::RegisterRequest,
            crate::handlers::auth::LoginRequest,
            crate::handlers::auth::RefreshRequest,
            crate::handlers::auth::UserResponse,
            crate::handlers::auth::TokenResponse,
            crate::handlers::auth::AuthResponse,

            // Catalog dimensions
            crate::handlers::tech_types::TechTypeRequest,
            crate::handlers::tech_types::TechTypeResponse,
            crate::handlers::categories::CategoryRequest,
            crate::handlers::categories::CategoryResponse,
            crate::handlers::colors::ColorRequest,
            crate::handlers::colors::ColorResponse,
            crate::handlers::sizes::SizeRequest,
            crate::handlers::sizes::SizeResponse,

            // Products
            crate::handlers::products::CreateProductRequest,
            crate::handlers::products::UpdateProductRequest,
            crate::handlers::products::SpecificationRequest,
            crate::handlers::products::CreateVariantRequest,
            crate::handlers::products::UpdateVariantRequest,
            crate::handlers::products::ProductResponse,
            crate::handlers::products::CategorySummaryResponse,
            crate::handlers::products::SpecificationResponse,
            crate::handlers::products::VariantResponse,
            crate::handlers::products::VariantDetailResponse,
            crate::handlers::products::ProductDetailResponse,
            crate::handlers::products::ProductOverviewResponse,
            crate::handlers::products::NameBrandSampleResponse,
            crate::handlers::products::CatalogStatsResponse,
            crate::handlers::products::CatalogSearchResponse,

            // Orders
            crate::entities::order::OrderStatus,
            crate::entities::order::PaymentMethod,
            crate::handlers::orders::CreateOrderRequest,
            crate::handlers::orders::UpdateOrderRequest,
            crate::handlers::orders::AddOrderItemRequest,
            crate::handlers::orders::UpdateOrderItemRequest,
            crate::handlers::orders::UpdateOrderStatusRequest,
            crate::handlers::orders::OrderResponse,
            crate::handlers::orders::OrderItemResponse,
            crate::handlers::orders::OrderDetailResponse,
            crate::handlers::orders::OrderItemWithTotalResponse,
            crate::handlers::orders::OrderTotalResponse,

            // Reviews and favorites
            crate::handlers::reviews::CreateReviewRequest,
            crate::handlers::reviews::ReviewResponse,
            crate::handlers::favorites::AddFavoriteRequest,
            crate::handlers::favorites::FavoriteResponse,
            crate::handlers::favorites::FavoriteDetailResponse,

            // Promos
            crate::handlers::promos::CreatePromoRequest,
            crate::handlers::promos::UpdatePromoRequest,
            crate::handlers::promos::PromoResponse,
            crate::handlers::promos::PromoDetailResponse,

            // Admin
            crate::handlers::admin::BulkIdsRequest,
            crate::handlers::admin::ModerateReviewsRequest,
            crate::handlers::admin::BulkActionResponse,
            crate::handlers::admin::ProductAdminRowResponse,
            crate::handlers::admin::OrderAdminRowResponse,
            crate::handlers::admin::ReviewAdminRowResponse
        )
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDocV1;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDocV1::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_generates_with_all_surfaces() {
        let openapi = ApiDocV1::openapi();
        let json = serde_json::to_string(&openapi).unwrap();
        assert!(json.contains("TechStore API"));
        assert!(json.contains("/api/v1/products"));
        assert!(json.contains("/api/v1/orders"));
        assert!(json.contains("/api/v1/admin/products/export"));
    }

    #[test]
    fn bearer_scheme_is_registered() {
        let openapi = ApiDocV1::openapi();
        let components = openapi.components.expect("components should exist");
        assert!(components.security_schemes.contains_key("bearer"));
    }
}
