//! TechStore API Library
//!
//! This crate provides the core functionality for the TechStore catalog and
//! order management API
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod auth;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod media;
pub mod middleware_helpers;
pub mod migrator;
pub mod openapi;
pub mod services;
pub mod tracing;

use axum::{extract::State, response::Json, routing::get, Router};
use chrono::Utc;
use sea_orm::DatabaseConnection;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use utoipa::ToSchema;

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub auth: auth::AuthService,
    pub event_sender: events::EventSender,
    pub media: Arc<media::MediaStore>,
    pub services: handlers::AppServices,
}

// Common response wrappers
#[derive(Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub meta: ResponseMeta,
}

#[derive(Serialize, ToSchema)]
pub struct ResponseMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub timestamp: String,
}

impl ResponseMeta {
    fn capture() -> Self {
        Self {
            request_id: crate::tracing::current_request_id().map(|rid| rid.as_str().to_string()),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            meta: ResponseMeta::capture(),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
            meta: ResponseMeta::capture(),
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct PaginatedResponse<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
    pub total_pages: u64,
}

impl<T> PaginatedResponse<T> {
    pub fn new(items: Vec<T>, total: u64, page: u64, per_page: u64) -> Self {
        let total_pages = if total == 0 {
            0
        } else {
            total.div_ceil(per_page.max(1))
        };
        Self {
            items,
            total,
            page,
            per_page,
            total_pages,
        }
    }
}

/// Standard API result type for JSON responses
pub type ApiResult<T> = Result<Json<ApiResponse<T>>, errors::ServiceError>;

/// Full v1 API surface rooted at `/api/v1`.
pub fn api_v1_routes() -> Router<AppState> {
    Router::new()
        .nest("/auth", handlers::auth::auth_routes())
        .nest("/tech-types", handlers::tech_types::tech_types_routes())
        .nest("/categories", handlers::categories::categories_routes())
        .nest("/colors", handlers::colors::colors_routes())
        .nest("/sizes", handlers::sizes::sizes_routes())
        .nest("/products", handlers::products::products_routes())
        // Flat routes for catalog children addressed by their own id
        .nest(
            "/specifications",
            handlers::products::specifications_routes(),
        )
        .nest("/variants", handlers::products::variants_routes())
        .nest("/orders", handlers::orders::orders_routes())
        .nest("/reviews", handlers::reviews::reviews_routes())
        .nest("/favorites", handlers::favorites::favorites_routes())
        .nest("/promos", handlers::promos::promos_routes())
        // Staff surface
        .nest("/admin", handlers::admin::admin_routes())
}

/// Routes served at the application root, outside `/api/v1`.
pub fn root_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(|| async { "techstore-api up" }))
        .route("/health", get(health_check))
        .route("/api/status", get(api_status))
        .route(
            "/old-products/:old_id",
            get(handlers::legacy::old_product_redirect),
        )
}

async fn api_status(State(state): State<AppState>) -> ApiResult<Value> {
    let status_data = json!({
        "status": "ok",
        "service": "techstore-api",
        "version": env!("CARGO_PKG_VERSION"),
        "environment": state.config.environment,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });

    Ok(Json(ApiResponse::success(status_data)))
}

async fn health_check(State(state): State<AppState>) -> ApiResult<Value> {
    let db_status = match db::check_connection(&state.db).await {
        Ok(_) => "healthy",
        Err(_) => "unhealthy",
    };

    let health_data = json!({
        "status": db_status,
        "checks": {
            "database": db_status,
        },
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });

    Ok(Json(ApiResponse::success(health_data)))
}

#[cfg(test)]
mod response_tests {
    use super::*;
    use chrono::DateTime;

    #[tokio::test]
    async fn success_response_includes_request_metadata() {
        let response =
            crate::tracing::scope_request_id(crate::tracing::RequestId::new("meta-123"), async {
                ApiResponse::success("ok")
            })
            .await;

        assert_eq!(response.meta.request_id.as_deref(), Some("meta-123"));
        DateTime::parse_from_rfc3339(&response.meta.timestamp).expect("timestamp should parse");
    }

    #[tokio::test]
    async fn error_response_includes_request_metadata() {
        let response =
            crate::tracing::scope_request_id(crate::tracing::RequestId::new("meta-err"), async {
                ApiResponse::<()>::error("oops".into())
            })
            .await;

        assert_eq!(response.meta.request_id.as_deref(), Some("meta-err"));
        assert_eq!(response.error.as_deref(), Some("oops"));
        assert!(!response.success);
    }

    #[test]
    fn pagination_math_rounds_up() {
        let page: PaginatedResponse<i64> = PaginatedResponse::new(vec![1, 2], 41, 1, 20);
        assert_eq!(page.total_pages, 3);

        let empty: PaginatedResponse<i64> = PaginatedResponse::new(vec![], 0, 1, 20);
        assert_eq!(empty.total_pages, 0);
    }
}
