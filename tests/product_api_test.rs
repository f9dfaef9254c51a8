//! Integration tests for products, specifications, variants, and media
//! uploads.

mod common;

use axum::http::{Method, StatusCode};
use common::{body_bytes, body_json, TestApp};
use rust_decimal_macros::dec;
use serde_json::json;

async fn create_tech_type(app: &TestApp, token: &str, name: &str) -> i64 {
    let response = app
        .request(
            Method::POST,
            "/api/v1/tech-types",
            Some(json!({"name": name})),
            Some(token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await["data"]["id"].as_i64().unwrap()
}

async fn create_product(app: &TestApp, token: &str, payload: serde_json::Value) -> i64 {
    let response = app
        .request(Method::POST, "/api/v1/products", Some(payload), Some(token))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await["data"]["id"].as_i64().unwrap()
}

#[tokio::test]
async fn product_crud_with_relations() {
    let app = TestApp::new().await;
    let (_, token) = app.register("merch").await;
    let tech_type_id = create_tech_type(&app, &token, "Smartphones").await;

    let mut category_ids = Vec::new();
    for name in ["Flagship", "5G"] {
        let response = app
            .request(
                Method::POST,
                "/api/v1/categories",
                Some(json!({"name": name})),
                Some(&token),
            )
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        category_ids.push(body_json(response).await["data"]["id"].as_i64().unwrap());
    }

    let product_id = create_product(
        &app,
        &token,
        json!({
            "name": "Gamma 12",
            "brand": "Nova",
            "description": "Compact flagship",
            "tech_type_id": tech_type_id,
            "category_ids": category_ids,
        }),
    )
    .await;

    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/products/{product_id}"),
            None,
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["product"]["full_name"], json!("Nova Gamma 12"));
    assert_eq!(body["data"]["tech_type"]["name"], json!("Smartphones"));
    assert_eq!(body["data"]["categories"].as_array().unwrap().len(), 2);
    assert_eq!(body["data"]["review_count"], json!(0));
    assert!(body["data"]["average_rating"].is_null());

    let response = app
        .request(
            Method::PUT,
            &format!("/api/v1/products/{product_id}"),
            Some(json!({"name": "Gamma 12 Pro"})),
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["full_name"], json!("Nova Gamma 12 Pro"));

    let response = app.request(Method::GET, "/api/v1/products", None, None).await;
    let body = body_json(response).await;
    assert_eq!(body["data"]["total"], json!(1));
    assert_eq!(body["data"]["items"][0]["id"], json!(product_id));
}

#[tokio::test]
async fn inactive_products_are_hidden_from_public_surfaces() {
    let app = TestApp::new().await;
    let (_, token) = app.register("hider").await;
    let tech_type_id = create_tech_type(&app, &token, "Consoles").await;
    let product_id = create_product(
        &app,
        &token,
        json!({
            "name": "RetroBox",
            "tech_type_id": tech_type_id,
            "is_active": false,
        }),
    )
    .await;

    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/products/{product_id}"),
            None,
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app.request(Method::GET, "/api/v1/products", None, None).await;
    let body = body_json(response).await;
    assert_eq!(body["data"]["total"], json!(0));

    let response = app
        .request(Method::GET, "/api/v1/products/recent", None, None)
        .await;
    let body = body_json(response).await;
    assert!(body["data"].as_array().unwrap().is_empty());

    // The overview keeps inactive products visible
    let response = app
        .request(Method::GET, "/api/v1/products/overview", None, None)
        .await;
    let body = body_json(response).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
    assert_eq!(body["data"][0]["product"]["id"], json!(product_id));
}

#[tokio::test]
async fn specifications_lifecycle() {
    let app = TestApp::new().await;
    let (_, token) = app.register("spec_writer").await;
    let seed = app.seed_catalog("SPEC-1", dec!(499.00)).await;

    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/products/{}/specifications", seed.product_id),
            Some(json!({"name": "Display", "value": "14 inch IPS"})),
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let spec_id = body_json(response).await["data"]["id"].as_i64().unwrap();

    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/products/{}/specifications", seed.product_id),
            Some(json!({"name": "Battery", "value": "57 Wh"})),
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    // Listed alphabetically by name
    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/products/{}/specifications", seed.product_id),
            None,
            None,
        )
        .await;
    let body = body_json(response).await;
    assert_eq!(body["data"][0]["name"], json!("Battery"));
    assert_eq!(body["data"][1]["name"], json!("Display"));

    let response = app
        .request(
            Method::PUT,
            &format!("/api/v1/specifications/{spec_id}"),
            Some(json!({"name": "Display", "value": "14 inch OLED"})),
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await["data"]["value"],
        json!("14 inch OLED")
    );

    let response = app
        .request(
            Method::DELETE,
            &format!("/api/v1/specifications/{spec_id}"),
            None,
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .request(
            Method::POST,
            "/api/v1/products/999999/specifications",
            Some(json!({"name": "Ghost", "value": "none"})),
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn variants_sort_cheapest_first_and_reject_duplicate_skus() {
    let app = TestApp::new().await;
    let (_, token) = app.register("stocker").await;
    let seed = app.seed_catalog("VAR-BASE", dec!(799.00)).await;

    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/products/{}/variants", seed.product_id),
            Some(json!({"stock_quantity": 5, "price": "599.00", "sku": "VAR-CHEAP"})),
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let cheap_id = body_json(response).await["data"]["id"].as_i64().unwrap();

    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/products/{}/variants", seed.product_id),
            Some(json!({"stock_quantity": 2, "price": "999.00", "sku": "VAR-CHEAP"})),
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/products/{}/variants", seed.product_id),
            None,
            None,
        )
        .await;
    let body = body_json(response).await;
    let skus: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v["sku"].as_str().unwrap())
        .collect();
    assert_eq!(skus, vec!["VAR-CHEAP", "VAR-BASE"]);

    let response = app
        .request(
            Method::PUT,
            &format!("/api/v1/variants/{cheap_id}"),
            Some(json!({"stock_quantity": 0, "price": "549.00"})),
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["stock_quantity"], json!(0));
    assert_eq!(body["data"]["price"], json!("549.00"));

    let response = app
        .request(
            Method::DELETE,
            &format!("/api/v1/variants/{cheap_id}"),
            None,
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/variants/{cheap_id}"),
            None,
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn catalog_search_matches_names_brands_and_descriptions() {
    let app = TestApp::new().await;
    let (_, token) = app.register("searcher").await;
    let tech_type_id = create_tech_type(&app, &token, "Laptops").await;
    create_product(
        &app,
        &token,
        json!({
            "name": "MacBook Air",
            "brand": "Apple",
            "description": "Fanless ultrabook",
            "tech_type_id": tech_type_id,
        }),
    )
    .await;
    create_product(
        &app,
        &token,
        json!({
            "name": "ThinkPad X1",
            "brand": "Lenovo",
            "description": "Business workhorse",
            "tech_type_id": tech_type_id,
        }),
    )
    .await;

    let response = app
        .request(
            Method::GET,
            "/api/v1/products/search?name_contains=apple",
            None,
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let hits = body["data"]["products"].as_array().unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0]["name"], json!("MacBook Air"));
    assert_eq!(body["data"]["stats"]["has_apple_products"], json!(true));
    assert_eq!(body["data"]["stats"]["total_active_products"], json!(2));

    let response = app
        .request(
            Method::GET,
            "/api/v1/products/search?desc_icontains=WORKHORSE",
            None,
            None,
        )
        .await;
    let body = body_json(response).await;
    let hits = body["data"]["products"].as_array().unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0]["name"], json!("ThinkPad X1"));
}

#[tokio::test]
async fn uploaded_media_is_stored_and_served() {
    let app = TestApp::new().await;
    let (_, token) = app.register("uploader").await;
    let seed = app.seed_catalog("MEDIA-1", dec!(1299.00)).await;

    let response = app
        .request_raw(
            Method::POST,
            &format!(
                "/api/v1/products/{}/instruction?filename=manual.pdf",
                seed.product_id
            ),
            b"%PDF-1.4 fake manual".to_vec(),
            "application/pdf",
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let manual_path = body["data"]["instruction_manual"]
        .as_str()
        .expect("manual path recorded")
        .to_string();
    assert!(
        manual_path.starts_with(&format!(
            "product_instructions/product_{}/",
            seed.product_id
        )),
        "unexpected media path {manual_path}"
    );

    let response = app
        .request(Method::GET, &format!("/media/{manual_path}"), None, None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_bytes(response).await, b"%PDF-1.4 fake manual".to_vec());

    let response = app
        .request_raw(
            Method::POST,
            &format!("/api/v1/variants/{}/image?filename=front.png", seed.variant_id),
            vec![0x89, b'P', b'N', b'G'],
            "image/png",
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let image_path = body["data"]["image"].as_str().unwrap().to_string();
    assert!(image_path.starts_with("product_variants/"));

    let response = app
        .request(Method::GET, &format!("/media/{image_path}"), None, None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    // Empty uploads never reach the disk
    let response = app
        .request_raw(
            Method::POST,
            &format!(
                "/api/v1/products/{}/instruction?filename=empty.pdf",
                seed.product_id
            ),
            Vec::new(),
            "application/pdf",
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
