use std::sync::Arc;

use axum::{
    body::Body,
    http::{Method, Request},
    middleware, Router,
};
use http_body_util::BodyExt;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, Set};
use serde_json::Value;
use tempfile::TempDir;
use tokio::sync::mpsc;
use tower::ServiceExt;
use tower_http::services::ServeDir;

use techstore_api::{
    auth::{self, AuthConfig, AuthService},
    config::AppConfig,
    db,
    entities::user,
    events::{self, EventSender},
    handlers::AppServices,
    media::MediaStore,
    middleware_helpers,
    services::{
        catalog::TechTypeInput,
        products::{CreateProductInput, CreateVariantInput},
    },
    AppState,
};

const TEST_JWT_SECRET: &str =
    "integration_test_secret_key_that_is_long_enough_for_hs256_signing";

/// Harness that stands up the full application against a throwaway SQLite
/// database. Every instance gets its own temp directory for both the
/// database file and the media root, so tests can run in parallel.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    _event_task: tokio::task::JoinHandle<()>,
    _tmp: TempDir,
}

#[allow(dead_code)]
pub struct CatalogSeed {
    pub tech_type_id: i64,
    pub product_id: i64,
    pub variant_id: i64,
}

#[allow(dead_code)]
impl TestApp {
    /// Construct a new test application with fresh database state.
    pub async fn new() -> Self {
        let tmp = TempDir::new().expect("create temp dir for test app");
        let db_path = tmp.path().join("techstore_test.db");

        let mut cfg = AppConfig::new(
            format!("sqlite://{}?mode=rwc", db_path.display()),
            TEST_JWT_SECRET.to_string(),
            3600,
            86_400,
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;
        cfg.media_root = tmp.path().join("media").display().to_string();

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");
        let db_arc = Arc::new(pool);

        let (event_tx, event_rx) = mpsc::channel(64);
        let event_sender = EventSender::new(event_tx);
        let event_task = tokio::spawn(events::process_events(event_rx));

        let media = Arc::new(MediaStore::from_config(&cfg));
        let auth_service = AuthService::new(AuthConfig::from_app_config(&cfg));

        let services = AppServices::new(
            db_arc.clone(),
            Arc::new(event_sender.clone()),
            auth_service.clone(),
            media.clone(),
            &cfg,
        );

        let state = AppState {
            db: db_arc,
            config: cfg.clone(),
            auth: auth_service,
            event_sender,
            media: media.clone(),
            services,
        };

        let router = techstore_api::root_routes()
            .nest("/api/v1", techstore_api::api_v1_routes())
            .nest_service("/media", ServeDir::new(media.root()))
            .layer(middleware::from_fn(
                middleware_helpers::request_id_middleware,
            ))
            .with_state(state.clone());

        Self {
            router,
            state,
            _event_task: event_task,
            _tmp: tmp,
        }
    }

    /// Send a JSON request against the router with an optional bearer token.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> axum::response::Response {
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some(tok) = token {
            builder = builder.header("authorization", format!("Bearer {}", tok));
        }

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    /// Send a request with a raw (non-JSON) body, used for file uploads.
    pub async fn request_raw(
        &self,
        method: Method,
        uri: &str,
        bytes: Vec<u8>,
        content_type: &str,
        token: Option<&str>,
    ) -> axum::response::Response {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", content_type);

        if let Some(tok) = token {
            builder = builder.header("authorization", format!("Bearer {}", tok));
        }

        let request = builder
            .body(Body::from(bytes))
            .expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    /// Register a regular account through the API and return its id and
    /// access token.
    pub async fn register(&self, username: &str) -> (i64, String) {
        let response = self
            .request(
                Method::POST,
                "/api/v1/auth/register",
                Some(serde_json::json!({
                    "username": username,
                    "email": format!("{}@example.com", username),
                    "password": "test-password-123",
                })),
                None,
            )
            .await;
        assert_eq!(
            response.status(),
            axum::http::StatusCode::CREATED,
            "registration should succeed for {}",
            username
        );

        let body = body_json(response).await;
        let user_id = body["data"]["user"]["id"]
            .as_i64()
            .expect("registration response carries the user id");
        let token = body["data"]["tokens"]["access_token"]
            .as_str()
            .expect("registration response carries an access token")
            .to_string();
        (user_id, token)
    }

    /// Insert a staff account directly and mint a token for it. Staff flags
    /// are never granted through the public API, so tests seed them at the
    /// database level the way an operator would.
    pub async fn seed_staff(&self, username: &str) -> (i64, String) {
        let password_hash =
            auth::hash_password("staff-password-123").expect("hash staff password");
        let account = user::ActiveModel {
            username: Set(username.to_string()),
            email: Set(format!("{}@example.com", username)),
            password_hash: Set(password_hash),
            first_name: Set(None),
            last_name: Set(None),
            address: Set(None),
            phone: Set(None),
            is_active: Set(true),
            is_staff: Set(true),
            is_superuser: Set(false),
            date_joined: Set(chrono::Utc::now()),
            last_login: Set(None),
            ..Default::default()
        };
        let account = account
            .insert(&*self.state.db)
            .await
            .expect("insert staff account");

        let token = self
            .state
            .auth
            .generate_token_pair(&account)
            .expect("mint staff token")
            .access_token;
        (account.id, token)
    }

    /// Seed a tech type, an active product, and one variant. The sku doubles
    /// as a uniqueness discriminator for names.
    pub async fn seed_catalog(&self, sku: &str, price: Decimal) -> CatalogSeed {
        let tech_type = self
            .state
            .services
            .catalog
            .create_tech_type(TechTypeInput {
                name: format!("Laptops {}", sku),
            })
            .await
            .expect("seed tech type");

        let product = self
            .state
            .services
            .products
            .create_product(CreateProductInput {
                name: format!("ThinkBook {}", sku),
                description: Some("Seeded for integration tests".to_string()),
                brand: Some("Lenovo".to_string()),
                is_active: Some(true),
                tech_type_id: tech_type.id,
                manufacturer_url: None,
                category_ids: Vec::new(),
            })
            .await
            .expect("seed product");

        let variant = self
            .state
            .services
            .products
            .create_variant(
                product.id,
                CreateVariantInput {
                    color_id: None,
                    size_id: None,
                    stock_quantity: 25,
                    price,
                    sku: sku.to_string(),
                },
            )
            .await
            .expect("seed variant");

        CatalogSeed {
            tech_type_id: tech_type.id,
            product_id: product.id,
            variant_id: variant.id,
        }
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self._event_task.abort();
    }
}

/// Read the response body and parse it as JSON.
#[allow(dead_code)]
pub async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("read response body")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("response body is valid json")
}

/// Read the raw response body bytes.
#[allow(dead_code)]
pub async fn body_bytes(response: axum::response::Response) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .expect("read response body")
        .to_bytes()
        .to_vec()
}
