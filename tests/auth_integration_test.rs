//! Integration tests for registration, login, and token handling.

mod common;

use axum::http::{Method, StatusCode};
use common::{body_json, TestApp};
use serde_json::json;

#[tokio::test]
async fn register_login_me_flow() {
    let app = TestApp::new().await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/auth/register",
            Some(json!({
                "username": "ivan",
                "email": "ivan@example.com",
                "password": "correct-horse-battery",
                "first_name": "Ivan",
            })),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["data"]["user"]["username"], json!("ivan"));
    assert_eq!(body["data"]["user"]["is_staff"], json!(false));
    assert_eq!(body["data"]["tokens"]["token_type"], json!("Bearer"));

    let response = app
        .request(
            Method::POST,
            "/api/v1/auth/login",
            Some(json!({
                "username": "ivan",
                "password": "correct-horse-battery",
            })),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let token = body["data"]["tokens"]["access_token"]
        .as_str()
        .expect("login returns an access token")
        .to_string();

    let response = app
        .request(Method::GET, "/api/v1/auth/me", None, Some(&token))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["username"], json!("ivan"));
    assert_eq!(body["data"]["email"], json!("ivan@example.com"));
}

#[tokio::test]
async fn duplicate_username_is_rejected() {
    let app = TestApp::new().await;
    app.register("maria").await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/auth/register",
            Some(json!({
                "username": "maria",
                "email": "other@example.com",
                "password": "another-password-1",
            })),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = body_json(response).await;
    assert!(
        body["message"]
            .as_str()
            .unwrap_or_default()
            .contains("username"),
        "conflict message should name the username field: {body}"
    );
}

#[tokio::test]
async fn duplicate_email_is_rejected() {
    let app = TestApp::new().await;
    app.register("pavel").await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/auth/register",
            Some(json!({
                "username": "pavel2",
                "email": "pavel@example.com",
                "password": "another-password-1",
            })),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn weak_registration_payloads_are_rejected() {
    let app = TestApp::new().await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/auth/register",
            Some(json!({
                "username": "shorty",
                "email": "shorty@example.com",
                "password": "short",
            })),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .request(
            Method::POST,
            "/api/v1/auth/register",
            Some(json!({
                "username": "bademail",
                "email": "not-an-email",
                "password": "long-enough-password",
            })),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn login_with_wrong_password_is_unauthorized() {
    let app = TestApp::new().await;
    app.register("olga").await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/auth/login",
            Some(json!({
                "username": "olga",
                "password": "not-the-password",
            })),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // Unknown accounts answer identically to bad passwords
    let response = app
        .request(
            Method::POST,
            "/api/v1/auth/login",
            Some(json!({
                "username": "nobody",
                "password": "whatever-password",
            })),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn me_requires_a_valid_access_token() {
    let app = TestApp::new().await;

    let response = app.request(Method::GET, "/api/v1/auth/me", None, None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .request(Method::GET, "/api/v1/auth/me", None, Some("not-a-jwt"))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn refresh_token_cannot_be_used_as_access_token() {
    let app = TestApp::new().await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/auth/register",
            Some(json!({
                "username": "refresher",
                "email": "refresher@example.com",
                "password": "long-enough-password",
            })),
            None,
        )
        .await;
    let body = body_json(response).await;
    let refresh = body["data"]["tokens"]["refresh_token"]
        .as_str()
        .expect("registration returns a refresh token")
        .to_string();

    let response = app
        .request(Method::GET, "/api/v1/auth/me", None, Some(&refresh))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn refresh_exchanges_a_valid_refresh_token_for_a_new_pair() {
    let app = TestApp::new().await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/auth/register",
            Some(json!({
                "username": "rotator",
                "email": "rotator@example.com",
                "password": "long-enough-password",
            })),
            None,
        )
        .await;
    let body = body_json(response).await;
    let access = body["data"]["tokens"]["access_token"]
        .as_str()
        .expect("registration returns an access token")
        .to_string();
    let refresh = body["data"]["tokens"]["refresh_token"]
        .as_str()
        .expect("registration returns a refresh token")
        .to_string();

    let response = app
        .request(
            Method::POST,
            "/api/v1/auth/refresh",
            Some(json!({ "refresh_token": refresh })),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["user"]["username"], json!("rotator"));
    let fresh_access = body["data"]["tokens"]["access_token"]
        .as_str()
        .expect("refresh returns a new access token")
        .to_string();

    let response = app
        .request(Method::GET, "/api/v1/auth/me", None, Some(&fresh_access))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    // Access tokens are not accepted where a refresh token is expected
    let response = app
        .request(
            Method::POST,
            "/api/v1/auth/refresh",
            Some(json!({ "refresh_token": access })),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .request(
            Method::POST,
            "/api/v1/auth/refresh",
            Some(json!({ "refresh_token": "garbage" })),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn responses_carry_request_metadata() {
    let app = TestApp::new().await;

    let response = app.request(Method::GET, "/health", None, None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));

    let body = body_json(response).await;
    assert_eq!(body["success"], json!(true));
    assert!(
        body["meta"]["request_id"].is_string(),
        "meta should echo the request id: {body}"
    );
    assert!(body["meta"]["timestamp"].is_string());
}
