pub mod admin;
pub mod auth;
pub mod categories;
pub mod colors;
pub mod common;
pub mod favorites;
pub mod legacy;
pub mod orders;
pub mod products;
pub mod promos;
pub mod reviews;
pub mod sizes;
pub mod tech_types;

use crate::config::AppConfig;
use crate::db::DbPool;
use crate::events::EventSender;
use crate::media::MediaStore;
use std::sync::Arc;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub users: Arc<crate::services::users::UserService>,
    pub catalog: Arc<crate::services::catalog::CatalogService>,
    pub products: Arc<crate::services::products::ProductService>,
    pub orders: Arc<crate::services::orders::OrderService>,
    pub reviews: Arc<crate::services::reviews::ReviewService>,
    pub favorites: Arc<crate::services::favorites::FavoriteService>,
    pub promos: Arc<crate::services::promotions::PromoService>,
    pub invoices: Arc<crate::services::invoices::InvoiceService>,
}

impl AppServices {
    /// Build the full service container shared by all HTTP handlers.
    pub fn new(
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
        auth_service: crate::auth::AuthService,
        media: Arc<MediaStore>,
        cfg: &AppConfig,
    ) -> Self {
        let users = Arc::new(crate::services::users::UserService::new(
            db_pool.clone(),
            event_sender.clone(),
            auth_service,
        ));
        let catalog = Arc::new(crate::services::catalog::CatalogService::new(
            db_pool.clone(),
            event_sender.clone(),
        ));
        let products = Arc::new(crate::services::products::ProductService::new(
            db_pool.clone(),
            event_sender.clone(),
            media,
            cfg.recent_window(),
        ));
        let orders = Arc::new(crate::services::orders::OrderService::new(
            db_pool.clone(),
            event_sender.clone(),
        ));
        let reviews = Arc::new(crate::services::reviews::ReviewService::new(
            db_pool.clone(),
            event_sender.clone(),
        ));
        let favorites = Arc::new(crate::services::favorites::FavoriteService::new(
            db_pool.clone(),
            event_sender.clone(),
        ));
        let promos = Arc::new(crate::services::promotions::PromoService::new(
            db_pool.clone(),
            event_sender.clone(),
        ));
        let invoices = Arc::new(crate::services::invoices::InvoiceService::new(
            db_pool,
            event_sender,
        ));

        Self {
            users,
            catalog,
            products,
            orders,
            reviews,
            favorites,
            promos,
            invoices,
        }
    }
}
