//! Integration tests for the catalog reference data: tech types,
//! categories, colors, and sizes.

mod common;

use axum::http::{Method, StatusCode};
use common::{body_json, TestApp};
use rust_decimal_macros::dec;
use serde_json::json;

#[tokio::test]
async fn anonymous_visitors_can_browse_the_catalog() {
    let app = TestApp::new().await;

    for uri in [
        "/api/v1/tech-types",
        "/api/v1/categories",
        "/api/v1/colors",
        "/api/v1/sizes",
    ] {
        let response = app.request(Method::GET, uri, None, None).await;
        assert_eq!(response.status(), StatusCode::OK, "GET {uri}");
        let body = body_json(response).await;
        assert!(body["data"].is_array(), "GET {uri} returns a list: {body}");
    }
}

#[tokio::test]
async fn catalog_writes_require_authentication() {
    let app = TestApp::new().await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/tech-types",
            Some(json!({"name": "Tablets"})),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .request(
            Method::POST,
            "/api/v1/colors",
            Some(json!({"name": "Red", "hex_code": "#ff0000"})),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn tech_type_crud_round_trip() {
    let app = TestApp::new().await;
    let (_, token) = app.register("curator").await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/tech-types",
            Some(json!({"name": "Smartwatches"})),
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    let id = body["data"]["id"].as_i64().expect("created id");

    let response = app
        .request(
            Method::PUT,
            &format!("/api/v1/tech-types/{id}"),
            Some(json!({"name": "Wearables"})),
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["name"], json!("Wearables"));

    let response = app
        .request(Method::GET, &format!("/api/v1/tech-types/{id}"), None, None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .request(
            Method::DELETE,
            &format!("/api/v1/tech-types/{id}"),
            None,
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .request(Method::GET, &format!("/api/v1/tech-types/{id}"), None, None)
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn duplicate_names_conflict() {
    let app = TestApp::new().await;
    let (_, token) = app.register("dupes").await;

    let payload = json!({"name": "Laptops"});
    let response = app
        .request(
            Method::POST,
            "/api/v1/tech-types",
            Some(payload.clone()),
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .request(Method::POST, "/api/v1/tech-types", Some(payload), Some(&token))
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = body_json(response).await;
    assert!(
        body["message"]
            .as_str()
            .unwrap_or_default()
            .contains("already exists"),
        "conflict body: {body}"
    );

    let size = json!({"name": "XL"});
    let response = app
        .request(Method::POST, "/api/v1/sizes", Some(size.clone()), Some(&token))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let response = app
        .request(Method::POST, "/api/v1/sizes", Some(size), Some(&token))
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn deleting_a_referenced_tech_type_is_refused() {
    let app = TestApp::new().await;
    let (_, token) = app.register("keeper").await;
    let seed = app.seed_catalog("TT-DEL-1", dec!(999.00)).await;

    let response = app
        .request(
            Method::DELETE,
            &format!("/api/v1/tech-types/{}", seed.tech_type_id),
            None,
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    // Still present after the refused delete
    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/tech-types/{}", seed.tech_type_id),
            None,
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn color_hex_codes_are_validated() {
    let app = TestApp::new().await;
    let (_, token) = app.register("painter").await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/colors",
            Some(json!({"name": "Midnight", "hex_code": "#12AB3f"})),
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    assert_eq!(body["data"]["hex_code"], json!("#12AB3f"));

    for bad in ["red", "#12345", "#12345g", "123456"] {
        let response = app
            .request(
                Method::POST,
                "/api/v1/colors",
                Some(json!({"name": format!("Bad {bad}"), "hex_code": bad})),
                Some(&token),
            )
            .await;
        assert_eq!(
            response.status(),
            StatusCode::BAD_REQUEST,
            "hex code {bad:?} should be rejected"
        );
    }
}

#[tokio::test]
async fn category_parents_are_checked() {
    let app = TestApp::new().await;
    let (_, token) = app.register("taxonomist").await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/categories",
            Some(json!({"name": "Accessories", "description": "Everything extra"})),
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let parent_id = body_json(response).await["data"]["id"].as_i64().unwrap();

    let response = app
        .request(
            Method::POST,
            "/api/v1/categories",
            Some(json!({"name": "Cables", "parent_id": parent_id})),
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let child = body_json(response).await;
    assert_eq!(child["data"]["parent_id"], json!(parent_id));
    assert_eq!(child["data"]["display_path"], json!("Accessories -> Cables"));
    let child_id = child["data"]["id"].as_i64().unwrap();

    let response = app
        .request(
            Method::POST,
            "/api/v1/categories",
            Some(json!({"name": "Orphans", "parent_id": 999_999})),
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // A category cannot become its own parent
    let response = app
        .request(
            Method::PUT,
            &format!("/api/v1/categories/{child_id}"),
            Some(json!({"name": "Cables", "parent_id": child_id})),
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn deleting_a_parent_category_orphans_its_children() {
    let app = TestApp::new().await;
    let (_, token) = app.register("pruner").await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/categories",
            Some(json!({"name": "Peripherals"})),
            Some(&token),
        )
        .await;
    let parent_id = body_json(response).await["data"]["id"].as_i64().unwrap();

    let response = app
        .request(
            Method::POST,
            "/api/v1/categories",
            Some(json!({"name": "Keyboards", "parent_id": parent_id})),
            Some(&token),
        )
        .await;
    let child_id = body_json(response).await["data"]["id"].as_i64().unwrap();

    let response = app
        .request(
            Method::DELETE,
            &format!("/api/v1/categories/{parent_id}"),
            None,
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    // The child survives with its parent reference cleared
    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/categories/{child_id}"),
            None,
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["name"], json!("Keyboards"));
    assert!(body["data"]["parent_id"].is_null());
    assert_eq!(body["data"]["display_path"], json!("Keyboards"));
}
