use crate::{
    db::{lower_like, DbPool},
    entities::{
        product::{self, Entity as Product},
        review::{self, Entity as Review, Model as ReviewModel},
        user::{self, Entity as User},
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::catalog::map_unique_violation,
};
use chrono::NaiveDate;
use sea_orm::{
    sea_query::{Condition, Expr},
    ActiveModelTrait, ColumnTrait, EntityTrait, JoinType, ModelTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, RelationTrait, Set,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument};
use validator::Validate;

/// Input for submitting a review. One review per user and product.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateReviewInput {
    pub product_id: i64,
    #[validate(range(min = 1, max = 5, message = "Rating must be between 1 and 5"))]
    pub rating: i32,
    #[validate(length(min = 1, max = 2000, message = "Comment must be between 1 and 2000 characters"))]
    pub comment: String,
}

/// Filters for the administrative review table.
#[derive(Debug, Default, Deserialize)]
pub struct ReviewAdminFilter {
    pub is_moderated: Option<bool>,
    pub rating: Option<i32>,
    pub tech_type_id: Option<i64>,
    pub created_from: Option<NaiveDate>,
    pub created_to: Option<NaiveDate>,
    pub search: Option<String>,
}

/// A review with the author's username resolved for display.
#[derive(Debug, Serialize)]
pub struct ReviewWithAuthor {
    pub review: ReviewModel,
    pub username: String,
}

/// Administrative listing row: the review plus resolved author and product
/// names.
#[derive(Debug, Serialize)]
pub struct ReviewAdminRow {
    pub review: ReviewModel,
    pub username: String,
    pub product_name: String,
}

/// Product reviews: submission, public listing per product, deletion by the
/// author or staff, and the moderation workflow.
#[derive(Clone)]
pub struct ReviewService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
}

impl ReviewService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    /// Submits a review for an active product. New reviews start
    /// unmoderated; a second review for the same product is a conflict.
    #[instrument(skip(self, input), fields(user_id = user_id, product_id = input.product_id))]
    pub async fn create_review(
        &self,
        user_id: i64,
        input: CreateReviewInput,
    ) -> Result<ReviewModel, ServiceError> {
        input.validate()?;
        let db = &*self.db_pool;

        Product::find_by_id(input.product_id)
            .filter(product::Column::IsActive.eq(true))
            .one(db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Product {} not found", input.product_id))
            })?;

        User::find_by_id(user_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("User {} not found", user_id)))?;

        let review = review::ActiveModel {
            user_id: Set(user_id),
            product_id: Set(input.product_id),
            rating: Set(input.rating),
            comment: Set(input.comment),
            ..Default::default()
        };
        let review = review
            .insert(db)
            .await
            .map_err(|e| map_unique_violation(e, "You have already reviewed this product"))?;

        self.event_sender
            .send_or_log(Event::ReviewSubmitted {
                review_id: review.id,
                product_id: review.product_id,
            })
            .await;

        info!(
            review_id = review.id,
            product_id = review.product_id,
            rating = review.rating,
            "Submitted review"
        );
        Ok(review)
    }

    /// Reviews of an active product, newest first, with author usernames.
    pub async fn list_for_product(
        &self,
        product_id: i64,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<ReviewWithAuthor>, u64), ServiceError> {
        let db = &*self.db_pool;

        Product::find_by_id(product_id)
            .filter(product::Column::IsActive.eq(true))
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", product_id)))?;

        let paginator = Review::find()
            .filter(review::Column::ProductId.eq(product_id))
            .order_by_desc(review::Column::CreatedAt)
            .order_by_desc(review::Column::Id)
            .paginate(db, per_page);

        let total = paginator.num_items().await?;
        let reviews = paginator.fetch_page(page.saturating_sub(1)).await?;

        let rows = self.with_usernames(reviews).await?;
        Ok((rows, total))
    }

    pub async fn get_review(&self, review_id: i64) -> Result<ReviewModel, ServiceError> {
        Review::find_by_id(review_id)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Review {} not found", review_id)))
    }

    /// Deletes a review. Only the author or staff may do this.
    #[instrument(skip(self), fields(review_id = review_id, user_id = user_id))]
    pub async fn delete_review(
        &self,
        review_id: i64,
        user_id: i64,
        is_staff: bool,
    ) -> Result<(), ServiceError> {
        let review = self.get_review(review_id).await?;
        if !is_staff && review.user_id != user_id {
            return Err(ServiceError::Forbidden(
                "Only the author or staff can delete a review".to_string(),
            ));
        }

        review.delete(&*self.db_pool).await?;

        self.event_sender
            .send_or_log(Event::ReviewDeleted { review_id })
            .await;

        info!(review_id = review_id, "Deleted review");
        Ok(())
    }

    /// Flags a set of reviews as moderated (or not) in one statement and
    /// reports how many rows changed.
    #[instrument(skip(self, ids), fields(count = ids.len(), moderated = moderated))]
    pub async fn moderate_bulk(
        &self,
        ids: &[i64],
        moderated: bool,
    ) -> Result<u64, ServiceError> {
        if ids.is_empty() {
            return Ok(0);
        }
        let db = &*self.db_pool;

        let found: Vec<i64> = Review::find()
            .filter(review::Column::Id.is_in(ids.to_vec()))
            .all(db)
            .await?
            .into_iter()
            .map(|r| r.id)
            .collect();

        let result = Review::update_many()
            .col_expr(review::Column::IsModerated, Expr::value(moderated))
            .filter(review::Column::Id.is_in(found.clone()))
            .exec(db)
            .await?;

        for review_id in found {
            self.event_sender
                .send_or_log(Event::ReviewModerated {
                    review_id,
                    approved: moderated,
                })
                .await;
        }

        info!(
            affected = result.rows_affected,
            moderated = moderated,
            "Bulk-moderated reviews"
        );
        Ok(result.rows_affected)
    }

    /// Administrative listing with moderation and rating filters, a tech
    /// type filter through the product, and free-text search over author,
    /// product name and comment.
    #[instrument(skip(self, filter))]
    pub async fn admin_list(
        &self,
        filter: ReviewAdminFilter,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<ReviewAdminRow>, u64), ServiceError> {
        let db = &*self.db_pool;

        let mut query = Review::find();
        let mut product_joined = false;

        if let Some(moderated) = filter.is_moderated {
            query = query.filter(review::Column::IsModerated.eq(moderated));
        }
        if let Some(rating) = filter.rating {
            query = query.filter(review::Column::Rating.eq(rating));
        }
        if let Some(tech_type_id) = filter.tech_type_id {
            query = query
                .join(JoinType::InnerJoin, review::Relation::Product.def())
                .filter(product::Column::TechTypeId.eq(tech_type_id));
            product_joined = true;
        }
        if let Some(from) = filter.created_from {
            query = query.filter(
                review::Column::CreatedAt
                    .gte(from.and_hms_opt(0, 0, 0).unwrap_or_default().and_utc()),
            );
        }
        if let Some(to) = filter.created_to {
            query = query.filter(
                review::Column::CreatedAt
                    .lte(to.and_hms_opt(23, 59, 59).unwrap_or_default().and_utc()),
            );
        }

        if let Some(term) = filter
            .search
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
        {
            let pattern = format!("%{}%", term.to_lowercase());
            if !product_joined {
                query = query.join(JoinType::LeftJoin, review::Relation::Product.def());
            }
            query = query
                .join(JoinType::LeftJoin, review::Relation::User.def())
                .filter(
                    Condition::any()
                        .add(lower_like((user::Entity, user::Column::Username), &pattern))
                        .add(lower_like((product::Entity, product::Column::Name), &pattern))
                        .add(lower_like(
                            (review::Entity, review::Column::Comment),
                            &pattern,
                        )),
                );
        }

        let paginator = query
            .order_by_desc(review::Column::CreatedAt)
            .order_by_desc(review::Column::Id)
            .paginate(db, per_page);

        let total = paginator.num_items().await?;
        let reviews = paginator.fetch_page(page.saturating_sub(1)).await?;

        let product_ids: Vec<i64> = reviews.iter().map(|r| r.product_id).collect();
        let product_names: HashMap<i64, String> = if product_ids.is_empty() {
            HashMap::new()
        } else {
            Product::find()
                .filter(product::Column::Id.is_in(product_ids))
                .all(db)
                .await?
                .into_iter()
                .map(|p| (p.id, p.name))
                .collect()
        };

        let with_authors = self.with_usernames(reviews).await?;
        let rows = with_authors
            .into_iter()
            .map(|row| {
                let product_name = product_names
                    .get(&row.review.product_id)
                    .cloned()
                    .unwrap_or_default();
                ReviewAdminRow {
                    product_name,
                    username: row.username,
                    review: row.review,
                }
            })
            .collect();

        Ok((rows, total))
    }

    async fn with_usernames(
        &self,
        reviews: Vec<ReviewModel>,
    ) -> Result<Vec<ReviewWithAuthor>, ServiceError> {
        let user_ids: Vec<i64> = reviews.iter().map(|r| r.user_id).collect();
        let usernames: HashMap<i64, String> = if user_ids.is_empty() {
            HashMap::new()
        } else {
            User::find()
                .filter(user::Column::Id.is_in(user_ids))
                .all(&*self.db_pool)
                .await?
                .into_iter()
                .map(|u| (u.id, u.username))
                .collect()
        };

        Ok(reviews
            .into_iter()
            .map(|review| {
                let username = usernames.get(&review.user_id).cloned().unwrap_or_default();
                ReviewWithAuthor { review, username }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(rating: i32, comment: &str) -> CreateReviewInput {
        CreateReviewInput {
            product_id: 1,
            rating,
            comment: comment.to_string(),
        }
    }

    #[test]
    fn rating_must_be_between_one_and_five() {
        assert!(input(0, "too low").validate().is_err());
        assert!(input(6, "too high").validate().is_err());
        assert!(input(1, "ok").validate().is_ok());
        assert!(input(5, "ok").validate().is_ok());
    }

    #[test]
    fn comment_cannot_be_empty() {
        assert!(input(4, "").validate().is_err());
    }
}
