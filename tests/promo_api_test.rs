//! Integration tests for promotional campaigns and their product links.

mod common;

use axum::http::{Method, StatusCode};
use chrono::{Duration, Utc};
use common::{body_json, TestApp};
use rust_decimal_macros::dec;
use serde_json::{json, Value};

fn promo_payload(title: &str, start_offset_days: i64, end_offset_days: i64) -> Value {
    let today = Utc::now().date_naive();
    json!({
        "title": title,
        "discount_percent": "15.00",
        "start_date": (today + Duration::days(start_offset_days)).to_string(),
        "end_date": (today + Duration::days(end_offset_days)).to_string(),
    })
}

#[tokio::test]
async fn promo_crud_and_validation() {
    let app = TestApp::new().await;
    let (_, token) = app.register("marketer").await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/promos",
            Some(promo_payload("Back to School", -1, 7)),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .request(
            Method::POST,
            "/api/v1/promos",
            Some(promo_payload("Back to School", -1, 7)),
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    let promo_id = body["data"]["id"].as_i64().unwrap();
    assert_eq!(body["data"]["is_currently_active"], json!(true));

    // Discount has to fall in (0, 100]
    for discount in ["0", "-5", "150"] {
        let mut payload = promo_payload("Broken", 0, 3);
        payload["discount_percent"] = json!(discount);
        let response = app
            .request(Method::POST, "/api/v1/promos", Some(payload), Some(&token))
            .await;
        assert_eq!(
            response.status(),
            StatusCode::BAD_REQUEST,
            "discount {discount} should be rejected"
        );
    }

    // The window must not be inverted
    let response = app
        .request(
            Method::POST,
            "/api/v1/promos",
            Some(promo_payload("Inverted", 5, 2)),
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .request(
            Method::PUT,
            &format!("/api/v1/promos/{promo_id}"),
            Some(json!({"discount_percent": "25.00"})),
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["discount_percent"], json!("25.00"));

    let response = app
        .request(
            Method::DELETE,
            &format!("/api/v1/promos/{promo_id}"),
            None,
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn active_listing_respects_the_date_window() {
    let app = TestApp::new().await;
    let (_, token) = app.register("scheduler").await;

    for (payload, expect_created) in [
        (promo_payload("Running now", -2, 2), true),
        (promo_payload("Already over", -10, -1), true),
        (promo_payload("Not yet", 3, 9), true),
    ] {
        let response = app
            .request(Method::POST, "/api/v1/promos", Some(payload), Some(&token))
            .await;
        assert_eq!(response.status().is_success(), expect_created);
    }

    // A disabled promo stays hidden even inside its window
    let mut disabled = promo_payload("Switched off", -1, 1);
    disabled["is_active"] = json!(false);
    let response = app
        .request(Method::POST, "/api/v1/promos", Some(disabled), Some(&token))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .request(Method::GET, "/api/v1/promos/active", None, None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let titles: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["Running now"]);

    // The full listing still shows everything
    let response = app.request(Method::GET, "/api/v1/promos", None, None).await;
    let body = body_json(response).await;
    assert_eq!(body["data"]["total"], json!(4));
}

#[tokio::test]
async fn products_are_linked_and_unlinked() {
    let app = TestApp::new().await;
    let (_, token) = app.register("linker").await;
    let seed = app.seed_catalog("PROMO-1", dec!(320.00)).await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/promos",
            Some(promo_payload("Bundle week", 0, 6)),
            Some(&token),
        )
        .await;
    let promo_id = body_json(response).await["data"]["id"].as_i64().unwrap();

    let link_uri = format!("/api/v1/promos/{promo_id}/products/{}", seed.product_id);
    let response = app.request(Method::POST, &link_uri, None, Some(&token)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["products"].as_array().unwrap().len(), 1);
    assert_eq!(body["data"]["products"][0]["id"], json!(seed.product_id));

    let response = app.request(Method::POST, &link_uri, None, Some(&token)).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/promos/{promo_id}"),
            None,
            None,
        )
        .await;
    let body = body_json(response).await;
    assert_eq!(body["data"]["products"].as_array().unwrap().len(), 1);

    let response = app
        .request(Method::DELETE, &link_uri, None, Some(&token))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert!(body["data"]["products"].as_array().unwrap().is_empty());

    let response = app
        .request(Method::DELETE, &link_uri, None, Some(&token))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/promos/{promo_id}/products/999999"),
            None,
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
