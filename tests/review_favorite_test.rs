//! Integration tests for product reviews and favorites.

mod common;

use axum::http::{Method, StatusCode};
use common::{body_json, TestApp};
use rust_decimal_macros::dec;
use serde_json::json;

#[tokio::test]
async fn reviews_are_submitted_listed_and_aggregated() {
    let app = TestApp::new().await;
    let (_, token) = app.register("reviewer").await;
    let seed = app.seed_catalog("REV-1", dec!(299.00)).await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/reviews",
            Some(json!({
                "product_id": seed.product_id,
                "rating": 4,
                "comment": "Solid build, quiet fans.",
            })),
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    assert_eq!(body["data"]["username"], json!("reviewer"));
    assert_eq!(body["data"]["is_moderated"], json!(false));

    // Fresh reviews are listed before any moderation happens
    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/reviews?product_id={}", seed.product_id),
            None,
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["total"], json!(1));
    assert_eq!(body["data"]["items"][0]["rating"], json!(4));

    // The aggregate shows up on the product detail
    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/products/{}", seed.product_id),
            None,
            None,
        )
        .await;
    let body = body_json(response).await;
    assert_eq!(body["data"]["review_count"], json!(1));
    assert_eq!(body["data"]["average_rating"], json!(4.0));

    let response = app.request(Method::GET, "/api/v1/reviews", None, None).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn review_constraints_are_enforced() {
    let app = TestApp::new().await;
    let (_, token) = app.register("strict").await;
    let seed = app.seed_catalog("REV-2", dec!(150.00)).await;

    for rating in [0, 6] {
        let response = app
            .request(
                Method::POST,
                "/api/v1/reviews",
                Some(json!({
                    "product_id": seed.product_id,
                    "rating": rating,
                    "comment": "out of range",
                })),
                Some(&token),
            )
            .await;
        assert_eq!(
            response.status(),
            StatusCode::BAD_REQUEST,
            "rating {rating} should be rejected"
        );
    }

    let payload = json!({
        "product_id": seed.product_id,
        "rating": 5,
        "comment": "First impressions are great.",
    });
    let response = app
        .request(Method::POST, "/api/v1/reviews", Some(payload.clone()), Some(&token))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    // One review per user and product
    let response = app
        .request(Method::POST, "/api/v1/reviews", Some(payload), Some(&token))
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = app
        .request(
            Method::POST,
            "/api/v1/reviews",
            Some(json!({"product_id": 999_999, "rating": 3, "comment": "ghost"})),
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .request(
            Method::POST,
            "/api/v1/reviews",
            Some(json!({"product_id": seed.product_id, "rating": 3, "comment": "anon"})),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn reviews_are_deleted_by_author_or_staff() {
    let app = TestApp::new().await;
    let (_, author_token) = app.register("author").await;
    let (_, other_token) = app.register("bystander").await;
    let (_, staff_token) = app.seed_staff("moderator").await;
    let seed = app.seed_catalog("REV-3", dec!(80.00)).await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/reviews",
            Some(json!({"product_id": seed.product_id, "rating": 2, "comment": "meh"})),
            Some(&author_token),
        )
        .await;
    let review_id = body_json(response).await["data"]["id"].as_i64().unwrap();

    let response = app
        .request(
            Method::DELETE,
            &format!("/api/v1/reviews/{review_id}"),
            None,
            Some(&other_token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .request(
            Method::DELETE,
            &format!("/api/v1/reviews/{review_id}"),
            None,
            Some(&staff_token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .request(
            Method::DELETE,
            &format!("/api/v1/reviews/{review_id}"),
            None,
            Some(&staff_token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn favorites_lifecycle() {
    let app = TestApp::new().await;
    let (user_id, token) = app.register("collector").await;
    let seed = app.seed_catalog("FAV-1", dec!(45.00)).await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/favorites",
            Some(json!({"product_id": seed.product_id})),
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    assert_eq!(body["data"]["user_id"], json!(user_id));
    let favorite_id = body["data"]["id"].as_i64().unwrap();

    let response = app
        .request(
            Method::POST,
            "/api/v1/favorites",
            Some(json!({"product_id": seed.product_id})),
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = app
        .request(Method::GET, "/api/v1/favorites", None, Some(&token))
        .await;
    let body = body_json(response).await;
    let items = body["data"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["product"]["id"], json!(seed.product_id));

    let response = app
        .request(
            Method::DELETE,
            &format!("/api/v1/favorites/{favorite_id}"),
            None,
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .request(Method::GET, "/api/v1/favorites", None, Some(&token))
        .await;
    let body = body_json(response).await;
    assert!(body["data"].as_array().unwrap().is_empty());

    let response = app
        .request(
            Method::DELETE,
            &format!("/api/v1/favorites/{favorite_id}"),
            None,
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn favorites_are_private_to_their_owner() {
    let app = TestApp::new().await;
    let (_, owner_token) = app.register("fav_owner").await;
    let (_, other_token) = app.register("fav_other").await;
    let seed = app.seed_catalog("FAV-2", dec!(66.00)).await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/favorites",
            Some(json!({"product_id": seed.product_id})),
            Some(&owner_token),
        )
        .await;
    let favorite_id = body_json(response).await["data"]["id"].as_i64().unwrap();

    let response = app
        .request(
            Method::DELETE,
            &format!("/api/v1/favorites/{favorite_id}"),
            None,
            Some(&other_token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .request(Method::GET, "/api/v1/favorites", None, Some(&other_token))
        .await;
    let body = body_json(response).await;
    assert!(body["data"].as_array().unwrap().is_empty());

    let response = app.request(Method::GET, "/api/v1/favorites", None, None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .request(
            Method::POST,
            "/api/v1/favorites",
            Some(json!({"product_id": 999_999})),
            Some(&other_token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
