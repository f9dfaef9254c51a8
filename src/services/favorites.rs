use crate::{
    db::DbPool,
    entities::{
        favorite::{self, Entity as Favorite, Model as FavoriteModel},
        product::{self, Entity as Product, Model as ProductModel},
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::catalog::map_unique_violation,
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, ModelTrait, QueryFilter, QueryOrder, Set,
};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument};

/// A favorite together with the bookmarked product.
#[derive(Debug, Serialize)]
pub struct FavoriteWithProduct {
    pub favorite: FavoriteModel,
    pub product: ProductModel,
}

/// Per-user product bookmarks. One favorite per (user, product) pair.
#[derive(Clone)]
pub struct FavoriteService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
}

impl FavoriteService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    /// Bookmarks an active product; doing it twice is a conflict.
    #[instrument(skip(self), fields(user_id = user_id, product_id = product_id))]
    pub async fn add_favorite(
        &self,
        user_id: i64,
        product_id: i64,
    ) -> Result<FavoriteModel, ServiceError> {
        let db = &*self.db_pool;

        Product::find_by_id(product_id)
            .filter(product::Column::IsActive.eq(true))
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", product_id)))?;

        let favorite = favorite::ActiveModel {
            user_id: Set(user_id),
            product_id: Set(product_id),
            ..Default::default()
        };
        let favorite = favorite
            .insert(db)
            .await
            .map_err(|e| map_unique_violation(e, "This product is already in your favorites"))?;

        self.event_sender
            .send_or_log(Event::FavoriteAdded {
                user_id,
                product_id,
            })
            .await;

        info!(
            favorite_id = favorite.id,
            user_id = user_id,
            product_id = product_id,
            "Added favorite"
        );
        Ok(favorite)
    }

    /// All favorites of a user with the products resolved, newest bookmark
    /// first.
    pub async fn list_for_user(
        &self,
        user_id: i64,
    ) -> Result<Vec<FavoriteWithProduct>, ServiceError> {
        let db = &*self.db_pool;

        let favorites = Favorite::find()
            .filter(favorite::Column::UserId.eq(user_id))
            .order_by_desc(favorite::Column::Id)
            .all(db)
            .await?;

        let product_ids: Vec<i64> = favorites.iter().map(|f| f.product_id).collect();
        let products: HashMap<i64, ProductModel> = if product_ids.is_empty() {
            HashMap::new()
        } else {
            Product::find()
                .filter(product::Column::Id.is_in(product_ids))
                .all(db)
                .await?
                .into_iter()
                .map(|p| (p.id, p))
                .collect()
        };

        Ok(favorites
            .into_iter()
            .filter_map(|favorite| {
                products.get(&favorite.product_id).cloned().map(|product| {
                    FavoriteWithProduct { favorite, product }
                })
            })
            .collect())
    }

    /// Removes a favorite addressed by its own id. Users only ever remove
    /// their own bookmarks; someone else's favorite id is off limits.
    #[instrument(skip(self), fields(favorite_id = favorite_id, user_id = user_id))]
    pub async fn remove_by_id(&self, favorite_id: i64, user_id: i64) -> Result<(), ServiceError> {
        let favorite = Favorite::find_by_id(favorite_id)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Favorite {} not found", favorite_id))
            })?;
        if favorite.user_id != user_id {
            return Err(ServiceError::Forbidden(
                "You can only remove your own favorites".to_string(),
            ));
        }

        self.remove_favorite(user_id, favorite.product_id).await
    }

    /// Removes one of the user's own favorites by product.
    #[instrument(skip(self), fields(user_id = user_id, product_id = product_id))]
    pub async fn remove_favorite(
        &self,
        user_id: i64,
        product_id: i64,
    ) -> Result<(), ServiceError> {
        let db = &*self.db_pool;

        let favorite = Favorite::find()
            .filter(favorite::Column::UserId.eq(user_id))
            .filter(favorite::Column::ProductId.eq(product_id))
            .one(db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!(
                    "Product {} is not in your favorites",
                    product_id
                ))
            })?;

        favorite.delete(db).await?;

        self.event_sender
            .send_or_log(Event::FavoriteRemoved {
                user_id,
                product_id,
            })
            .await;

        info!(
            user_id = user_id,
            product_id = product_id,
            "Removed favorite"
        );
        Ok(())
    }
}
