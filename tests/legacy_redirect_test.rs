//! Integration tests for the legacy storefront redirect.
//!
//! Links from the old site carry the old numeric catalog ids, which map
//! onto the current ids with a fixed offset of 1000.

mod common;

use axum::http::{header, Method, StatusCode};
use chrono::Utc;
use common::TestApp;
use sea_orm::{ActiveModelTrait, Set};
use techstore_api::entities::{product, tech_type};

/// Inserts a product at a known id, the way rows migrated from the old
/// database kept their offset ids.
async fn seed_product_at(app: &TestApp, id: i64, name: &str) {
    let tech_type = tech_type::ActiveModel {
        name: Set(format!("Migrated {id}")),
        ..Default::default()
    }
    .insert(&*app.state.db)
    .await
    .expect("tech type inserted");

    product::ActiveModel {
        id: Set(id),
        name: Set(name.to_string()),
        description: Set(None),
        brand: Set(None),
        is_active: Set(true),
        created_at: Set(Utc::now()),
        tech_type_id: Set(tech_type.id),
        instruction_manual: Set(None),
        manufacturer_url: Set(None),
    }
    .insert(&*app.state.db)
    .await
    .expect("product inserted");
}

fn location(response: &axum::response::Response) -> String {
    response.headers()[header::LOCATION]
        .to_str()
        .unwrap()
        .to_string()
}

#[tokio::test]
async fn known_old_ids_redirect_permanently() {
    let app = TestApp::new().await;
    seed_product_at(&app, 1005, "Carried-over Laptop").await;

    let response = app.request(Method::GET, "/old-products/5", None, None).await;
    assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);
    assert_eq!(location(&response), "/api/v1/products/1005");
}

#[tokio::test]
async fn unknown_old_ids_fall_back_to_the_catalog() {
    let app = TestApp::new().await;

    let response = app
        .request(Method::GET, "/old-products/999999", None, None)
        .await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), "/api/v1/tech-types");
}

#[tokio::test]
async fn malformed_old_ids_fall_back_to_the_catalog() {
    let app = TestApp::new().await;
    seed_product_at(&app, 1005, "Carried-over Laptop").await;

    for old_id in ["abc", "5x", "-"] {
        let response = app
            .request(Method::GET, &format!("/old-products/{old_id}"), None, None)
            .await;
        assert_eq!(response.status(), StatusCode::FOUND, "old id {old_id:?}");
        assert_eq!(location(&response), "/api/v1/tech-types");
    }
}
