use crate::{
    db::DbPool,
    entities::{
        product::{self, Entity as Product, Model as ProductModel},
        promo::{self, Entity as Promo, Model as PromoModel},
        promo_product::{self, Entity as PromoProduct},
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::catalog::map_unique_violation,
};
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ActiveValue, ColumnTrait, EntityTrait, JoinType, ModelTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, RelationTrait, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use validator::Validate;

/// Input for creating a promotional campaign. The discount is a percentage
/// in (0, 100]; the date window is inclusive on both ends.
#[derive(Debug, Deserialize, Validate)]
pub struct CreatePromoInput {
    #[validate(length(min = 1, max = 200, message = "Title must be between 1 and 200 characters"))]
    pub title: String,
    pub description: Option<String>,
    pub discount_percent: Decimal,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub is_active: Option<bool>,
}

/// Partial update of a promo. `None` fields are left unchanged.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdatePromoInput {
    #[validate(length(min = 1, max = 200, message = "Title must be between 1 and 200 characters"))]
    pub title: Option<String>,
    pub description: Option<String>,
    pub discount_percent: Option<Decimal>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub is_active: Option<bool>,
}

/// A promo with its in-window state evaluated against today's date.
#[derive(Debug, Serialize)]
pub struct PromoRow {
    pub promo: PromoModel,
    pub is_currently_active: bool,
}

/// A promo with its member products.
#[derive(Debug, Serialize)]
pub struct PromoDetails {
    pub promo: PromoModel,
    pub products: Vec<ProductModel>,
    pub is_currently_active: bool,
}

/// Promotional campaigns and their product membership.
#[derive(Clone)]
pub struct PromoService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
}

impl PromoService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    #[instrument(skip(self, input), fields(title = %input.title))]
    pub async fn create_promo(&self, input: CreatePromoInput) -> Result<PromoModel, ServiceError> {
        input.validate()?;
        ensure_valid_discount(input.discount_percent)?;
        ensure_valid_window(input.start_date, input.end_date)?;

        let mut model = promo::ActiveModel {
            title: Set(input.title),
            description: Set(input.description),
            discount_percent: Set(input.discount_percent),
            start_date: Set(input.start_date),
            end_date: Set(input.end_date),
            ..Default::default()
        };
        if let Some(active) = input.is_active {
            model.is_active = Set(active);
        }
        let promo = model.insert(&*self.db_pool).await?;

        self.event_sender
            .send_or_log(Event::PromoCreated(promo.id))
            .await;

        info!(promo_id = promo.id, "Created promo");
        Ok(promo)
    }

    #[instrument(skip(self, input), fields(promo_id = promo_id))]
    pub async fn update_promo(
        &self,
        promo_id: i64,
        input: UpdatePromoInput,
    ) -> Result<PromoModel, ServiceError> {
        input.validate()?;
        if let Some(discount) = input.discount_percent {
            ensure_valid_discount(discount)?;
        }

        let existing = self.get_promo(promo_id).await?;

        // The resulting window must stay ordered even when only one end moves.
        let start = input.start_date.unwrap_or(existing.start_date);
        let end = input.end_date.unwrap_or(existing.end_date);
        ensure_valid_window(start, end)?;

        let mut update = promo::ActiveModel {
            id: ActiveValue::Unchanged(existing.id),
            ..Default::default()
        };
        let mut changed = false;
        if let Some(title) = input.title {
            update.title = Set(title);
            changed = true;
        }
        if let Some(description) = input.description {
            update.description = Set(Some(description));
            changed = true;
        }
        if let Some(discount) = input.discount_percent {
            update.discount_percent = Set(discount);
            changed = true;
        }
        if let Some(start_date) = input.start_date {
            update.start_date = Set(start_date);
            changed = true;
        }
        if let Some(end_date) = input.end_date {
            update.end_date = Set(end_date);
            changed = true;
        }
        if let Some(is_active) = input.is_active {
            update.is_active = Set(is_active);
            changed = true;
        }

        let promo = if changed {
            update.update(&*self.db_pool).await?
        } else {
            existing
        };

        self.event_sender
            .send_or_log(Event::PromoUpdated(promo_id))
            .await;

        info!(promo_id = promo_id, "Updated promo");
        Ok(promo)
    }

    /// Deletes a promo; membership rows go with it.
    #[instrument(skip(self), fields(promo_id = promo_id))]
    pub async fn delete_promo(&self, promo_id: i64) -> Result<(), ServiceError> {
        let existing = self.get_promo(promo_id).await?;
        existing.delete(&*self.db_pool).await?;

        self.event_sender
            .send_or_log(Event::PromoDeleted(promo_id))
            .await;

        info!(promo_id = promo_id, "Deleted promo");
        Ok(())
    }

    pub async fn get_promo(&self, promo_id: i64) -> Result<PromoModel, ServiceError> {
        Promo::find_by_id(promo_id)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Promo {} not found", promo_id)))
    }

    /// A promo with its member products and in-window state.
    pub async fn get_details(&self, promo_id: i64) -> Result<PromoDetails, ServiceError> {
        let db = &*self.db_pool;
        let promo = self.get_promo(promo_id).await?;

        let products = Product::find()
            .join(JoinType::InnerJoin, product::Relation::PromoProducts.def())
            .filter(promo_product::Column::PromoId.eq(promo_id))
            .order_by_asc(product::Column::Name)
            .all(db)
            .await?;

        let is_currently_active = promo.is_active_on(Utc::now().date_naive());
        Ok(PromoDetails {
            promo,
            products,
            is_currently_active,
        })
    }

    /// All promos, latest window first, with their in-window state.
    pub async fn list(
        &self,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<PromoRow>, u64), ServiceError> {
        let paginator = Promo::find()
            .order_by_desc(promo::Column::StartDate)
            .order_by_desc(promo::Column::Id)
            .paginate(&*self.db_pool, per_page);

        let total = paginator.num_items().await?;
        let promos = paginator.fetch_page(page.saturating_sub(1)).await?;

        let today = Utc::now().date_naive();
        let rows = promos
            .into_iter()
            .map(|promo| {
                let is_currently_active = promo.is_active_on(today);
                PromoRow {
                    promo,
                    is_currently_active,
                }
            })
            .collect();
        Ok((rows, total))
    }

    /// Promos running today: the active flag is set and today falls inside
    /// the inclusive date window.
    pub async fn list_active_today(&self) -> Result<Vec<PromoModel>, ServiceError> {
        let today = Utc::now().date_naive();
        let promos = Promo::find()
            .filter(promo::Column::IsActive.eq(true))
            .filter(promo::Column::StartDate.lte(today))
            .filter(promo::Column::EndDate.gte(today))
            .order_by_desc(promo::Column::StartDate)
            .all(&*self.db_pool)
            .await?;
        Ok(promos)
    }

    /// Adds a product to a promo; adding it twice is a conflict.
    #[instrument(skip(self), fields(promo_id = promo_id, product_id = product_id))]
    pub async fn add_product(&self, promo_id: i64, product_id: i64) -> Result<(), ServiceError> {
        let db = &*self.db_pool;
        self.get_promo(promo_id).await?;

        Product::find_by_id(product_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", product_id)))?;

        let link = promo_product::ActiveModel {
            promo_id: Set(promo_id),
            product_id: Set(product_id),
            ..Default::default()
        };
        link.insert(db)
            .await
            .map_err(|e| map_unique_violation(e, "This product is already part of the promo"))?;

        info!(
            promo_id = promo_id,
            product_id = product_id,
            "Added product to promo"
        );
        Ok(())
    }

    #[instrument(skip(self), fields(promo_id = promo_id, product_id = product_id))]
    pub async fn remove_product(&self, promo_id: i64, product_id: i64) -> Result<(), ServiceError> {
        let db = &*self.db_pool;

        let link = PromoProduct::find()
            .filter(promo_product::Column::PromoId.eq(promo_id))
            .filter(promo_product::Column::ProductId.eq(product_id))
            .one(db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!(
                    "Product {} is not part of promo {}",
                    product_id, promo_id
                ))
            })?;

        link.delete(db).await?;

        info!(
            promo_id = promo_id,
            product_id = product_id,
            "Removed product from promo"
        );
        Ok(())
    }
}

fn ensure_valid_discount(discount: Decimal) -> Result<(), ServiceError> {
    if discount <= Decimal::ZERO || discount > Decimal::from(100) {
        return Err(ServiceError::ValidationError(
            "Discount must be greater than 0 and at most 100".to_string(),
        ));
    }
    Ok(())
}

fn ensure_valid_window(start: NaiveDate, end: NaiveDate) -> Result<(), ServiceError> {
    if start > end {
        return Err(ServiceError::ValidationError(
            "Start date must not be after end date".to_string(),
        ));
    }
    Ok(())
}
