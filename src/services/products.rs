use crate::{
    db::{lower_like, DbPool},
    entities::{
        category::{self, Entity as Category, Model as CategoryModel},
        color::{self, Entity as Color, Model as ColorModel},
        order_item::{self, Entity as OrderItem},
        product::{self, Entity as Product, Model as ProductModel},
        product_category::{self, Entity as ProductCategory},
        product_specification::{
            self, Entity as ProductSpecification, Model as ProductSpecificationModel,
        },
        product_variant::{self, Entity as ProductVariant, Model as ProductVariantModel},
        review::{self, Entity as Review},
        size::{self, Entity as Size, Model as SizeModel},
        tech_type::{self, Entity as TechType, Model as TechTypeModel},
    },
    errors::ServiceError,
    events::{Event, EventSender},
    media::MediaStore,
    services::catalog::map_unique_violation,
};
use chrono::{Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::{Condition, Expr},
    ActiveModelTrait, ActiveValue, ColumnTrait, ConnectionTrait, EntityTrait, FromQueryResult,
    JoinType, ModelTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, RelationTrait,
    Set, SqlErr, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{error, info, instrument};
use validator::Validate;

/// Input for creating a product. Categories are linked in the same
/// transaction as the insert.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateProductInput {
    #[validate(length(min = 1, max = 200, message = "Name must be between 1 and 200 characters"))]
    pub name: String,
    pub description: Option<String>,
    #[validate(length(max = 100, message = "Brand must be at most 100 characters"))]
    pub brand: Option<String>,
    pub is_active: Option<bool>,
    pub tech_type_id: i64,
    #[validate(url(message = "Manufacturer URL must be a valid URL"))]
    pub manufacturer_url: Option<String>,
    #[serde(default)]
    pub category_ids: Vec<i64>,
}

/// Partial update of a product. `None` fields are left unchanged;
/// `category_ids` replaces the whole category set when present.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateProductInput {
    #[validate(length(min = 1, max = 200, message = "Name must be between 1 and 200 characters"))]
    pub name: Option<String>,
    pub description: Option<String>,
    #[validate(length(max = 100, message = "Brand must be at most 100 characters"))]
    pub brand: Option<String>,
    pub is_active: Option<bool>,
    pub tech_type_id: Option<i64>,
    #[validate(url(message = "Manufacturer URL must be a valid URL"))]
    pub manufacturer_url: Option<String>,
    pub category_ids: Option<Vec<i64>>,
}

/// Name/value attribute of a product; unique per (product, name).
#[derive(Debug, Deserialize, Validate)]
pub struct SpecificationInput {
    #[validate(length(
        min = 1,
        max = 100,
        message = "Specification name must be between 1 and 100 characters"
    ))]
    pub name: String,
    #[validate(length(
        min = 1,
        max = 255,
        message = "Specification value must be between 1 and 255 characters"
    ))]
    pub value: String,
}

/// Input for creating a product variant. Color and size are optional; the
/// (product, color, size) combination and the SKU must be unique.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateVariantInput {
    pub color_id: Option<i64>,
    pub size_id: Option<i64>,
    #[validate(range(min = 0, message = "Stock quantity cannot be negative"))]
    pub stock_quantity: i32,
    pub price: Decimal,
    #[validate(length(min = 1, max = 64, message = "SKU must be between 1 and 64 characters"))]
    pub sku: String,
}

/// Partial update of a variant. `None` fields are left unchanged.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateVariantInput {
    pub color_id: Option<i64>,
    pub size_id: Option<i64>,
    #[validate(range(min = 0, message = "Stock quantity cannot be negative"))]
    pub stock_quantity: Option<i32>,
    pub price: Option<Decimal>,
    #[validate(length(min = 1, max = 64, message = "SKU must be between 1 and 64 characters"))]
    pub sku: Option<String>,
}

/// Filters for the administrative product table.
#[derive(Debug, Default, Deserialize)]
pub struct ProductAdminFilter {
    pub tech_type_id: Option<i64>,
    pub brand: Option<String>,
    pub is_active: Option<bool>,
    pub category_id: Option<i64>,
    pub created_from: Option<NaiveDate>,
    pub created_to: Option<NaiveDate>,
    pub search: Option<String>,
}

/// Free-text catalog search parameters. `name_contains` matches name or
/// brand with database collation; `desc_icontains` lowercases both sides.
#[derive(Debug, Default, Deserialize)]
pub struct CatalogSearchParams {
    pub name_contains: Option<String>,
    pub desc_icontains: Option<String>,
}

/// A variant together with its resolved color and size rows.
#[derive(Debug, Serialize)]
pub struct VariantDetails {
    pub variant: ProductVariantModel,
    pub color: Option<ColorModel>,
    pub size: Option<SizeModel>,
}

/// Full public view of a product: related rows plus review aggregates.
#[derive(Debug, Serialize)]
pub struct ProductDetails {
    pub product: ProductModel,
    pub tech_type: TechTypeModel,
    pub categories: Vec<CategoryModel>,
    pub specifications: Vec<ProductSpecificationModel>,
    pub variants: Vec<VariantDetails>,
    pub average_rating: Option<f64>,
    pub review_count: u64,
}

/// One product in the catalog overview with everything eagerly loaded.
#[derive(Debug, Serialize)]
pub struct ProductOverviewEntry {
    pub product: ProductModel,
    pub tech_type: TechTypeModel,
    pub categories: Vec<CategoryModel>,
    pub variants: Vec<VariantDetails>,
    pub review_count: u64,
}

/// Sample of product name and brand shown in search statistics.
#[derive(Debug, Serialize)]
pub struct NameBrandSample {
    pub name: String,
    pub brand: String,
}

/// Catalog-wide statistics returned alongside search results. Computed over
/// the whole catalog, not the filtered set.
#[derive(Debug, Serialize)]
pub struct CatalogSearchStats {
    pub total_active_products: u64,
    pub has_apple_products: bool,
    pub recent_product_ids: Vec<i64>,
    pub name_brand_samples: Vec<NameBrandSample>,
}

/// Search hits plus catalog statistics.
#[derive(Debug, Serialize)]
pub struct CatalogSearchOutcome {
    pub products: Vec<ProductModel>,
    pub stats: CatalogSearchStats,
}

/// Administrative listing row: the stored product plus columns computed at
/// query time for the staff table.
#[derive(Debug, Serialize)]
pub struct ProductAdminRow {
    pub product: ProductModel,
    pub full_name: String,
    pub tech_type_name: String,
    pub category_names: String,
    pub variant_count: u64,
    pub average_rating: Option<f64>,
}

#[derive(Debug, FromQueryResult)]
struct ReviewCountRow {
    product_id: i64,
    count: i64,
}

const CSV_HEADER: [&str; 9] = [
    "ID",
    "Name",
    "Description",
    "Brand",
    "Active",
    "Created at",
    "Tech type",
    "Instruction manual",
    "Manufacturer URL",
];

/// Catalog products: CRUD, public detail and listings, variants and
/// specifications, media attachments, the staff table and CSV export.
#[derive(Clone)]
pub struct ProductService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
    media: Arc<MediaStore>,
    recent_window: Duration,
}

impl ProductService {
    pub fn new(
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
        media: Arc<MediaStore>,
        recent_window: Duration,
    ) -> Self {
        Self {
            db_pool,
            event_sender,
            media,
            recent_window,
        }
    }

    /// Creates a product and its category links in one transaction.
    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create_product(
        &self,
        input: CreateProductInput,
    ) -> Result<ProductModel, ServiceError> {
        input.validate()?;

        let txn = self.db_pool.begin().await.map_err(|e| {
            error!(error = %e, "Failed to start transaction for product create");
            ServiceError::DatabaseError(e)
        })?;

        ensure_tech_type_exists(&txn, input.tech_type_id).await?;

        let mut model = product::ActiveModel {
            name: Set(input.name),
            description: Set(input.description),
            brand: Set(input.brand),
            tech_type_id: Set(input.tech_type_id),
            manufacturer_url: Set(input.manufacturer_url),
            ..Default::default()
        };
        if let Some(active) = input.is_active {
            model.is_active = Set(active);
        }
        let product = model.insert(&txn).await?;

        if !input.category_ids.is_empty() {
            replace_category_links(&txn, product.id, &input.category_ids).await?;
        }

        txn.commit().await.map_err(|e| {
            error!(error = %e, "Failed to commit product create");
            ServiceError::DatabaseError(e)
        })?;

        self.event_sender
            .send_or_log(Event::ProductCreated(product.id))
            .await;

        info!(product_id = product.id, "Created product");
        Ok(product)
    }

    /// Applies a partial update; replaces the category set when
    /// `category_ids` is given.
    #[instrument(skip(self, input), fields(product_id = product_id))]
    pub async fn update_product(
        &self,
        product_id: i64,
        input: UpdateProductInput,
    ) -> Result<ProductModel, ServiceError> {
        input.validate()?;

        let txn = self.db_pool.begin().await?;

        let existing = Product::find_by_id(product_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", product_id)))?;

        if let Some(tech_type_id) = input.tech_type_id {
            ensure_tech_type_exists(&txn, tech_type_id).await?;
        }

        let mut update = product::ActiveModel {
            id: ActiveValue::Unchanged(existing.id),
            ..Default::default()
        };
        let mut changed = false;
        if let Some(name) = input.name {
            update.name = Set(name);
            changed = true;
        }
        if let Some(description) = input.description {
            update.description = Set(Some(description));
            changed = true;
        }
        if let Some(brand) = input.brand {
            update.brand = Set(Some(brand));
            changed = true;
        }
        if let Some(is_active) = input.is_active {
            update.is_active = Set(is_active);
            changed = true;
        }
        if let Some(tech_type_id) = input.tech_type_id {
            update.tech_type_id = Set(tech_type_id);
            changed = true;
        }
        if let Some(url) = input.manufacturer_url {
            update.manufacturer_url = Set(Some(url));
            changed = true;
        }

        let product = if changed {
            update.update(&txn).await?
        } else {
            existing
        };

        if let Some(category_ids) = &input.category_ids {
            replace_category_links(&txn, product_id, category_ids).await?;
        }

        txn.commit().await.map_err(|e| {
            error!(error = %e, product_id = product_id, "Failed to commit product update");
            ServiceError::DatabaseError(e)
        })?;

        self.event_sender
            .send_or_log(Event::ProductUpdated(product_id))
            .await;

        info!(product_id = product_id, "Updated product");
        Ok(product)
    }

    /// Deletes a product. Variants, specifications, category links, reviews
    /// and favorites go with it; a variant that appears on an order blocks
    /// the whole delete.
    #[instrument(skip(self), fields(product_id = product_id))]
    pub async fn delete_product(&self, product_id: i64) -> Result<(), ServiceError> {
        let db = &*self.db_pool;
        let existing = Product::find_by_id(product_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", product_id)))?;

        existing.delete(db).await.map_err(|e| match e.sql_err() {
            Some(SqlErr::ForeignKeyConstraintViolation(_)) => ServiceError::Conflict(format!(
                "Product {} has variants referenced by orders and cannot be deleted",
                product_id
            )),
            _ => ServiceError::DatabaseError(e),
        })?;

        self.event_sender
            .send_or_log(Event::ProductDeleted(product_id))
            .await;

        info!(product_id = product_id, "Deleted product");
        Ok(())
    }

    /// Fetches a product regardless of its active flag. Administrative
    /// callers use this; the public detail goes through [`get_details`].
    ///
    /// [`get_details`]: ProductService::get_details
    pub async fn get_product(&self, product_id: i64) -> Result<ProductModel, ServiceError> {
        Product::find_by_id(product_id)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", product_id)))
    }

    /// Public product detail. Inactive products are reported exactly like
    /// missing ones so the flag is not observable from outside.
    pub async fn get_details(&self, product_id: i64) -> Result<ProductDetails, ServiceError> {
        let db = &*self.db_pool;

        let product = Product::find_by_id(product_id)
            .filter(product::Column::IsActive.eq(true))
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", product_id)))?;

        let tech_type = TechType::find_by_id(product.tech_type_id)
            .one(db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Tech type {} not found", product.tech_type_id))
            })?;

        let categories = Category::find()
            .join(
                JoinType::InnerJoin,
                category::Relation::ProductCategories.def(),
            )
            .filter(product_category::Column::ProductId.eq(product_id))
            .order_by_asc(category::Column::Name)
            .all(db)
            .await?;

        let specifications = ProductSpecification::find()
            .filter(product_specification::Column::ProductId.eq(product_id))
            .order_by_asc(product_specification::Column::Name)
            .all(db)
            .await?;

        let variants = ProductVariant::find()
            .filter(product_variant::Column::ProductId.eq(product_id))
            .order_by_asc(product_variant::Column::Price)
            .all(db)
            .await?;
        let variants = self.with_color_and_size(variants).await?;

        let ratings = self.product_ratings(product_id).await?;
        let review_count = ratings.len() as u64;
        let average_rating = mean_rating(&ratings);

        Ok(ProductDetails {
            product,
            tech_type,
            categories,
            specifications,
            variants,
            average_rating,
            review_count,
        })
    }

    /// Active products, newest first, paginated.
    pub async fn list_active(
        &self,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<ProductModel>, u64), ServiceError> {
        let paginator = Product::find()
            .filter(product::Column::IsActive.eq(true))
            .order_by_desc(product::Column::CreatedAt)
            .order_by_asc(product::Column::Name)
            .paginate(&*self.db_pool, per_page);

        let total = paginator.num_items().await?;
        let products = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((products, total))
    }

    /// Active products created inside the recent window, newest first.
    pub async fn list_recent(&self) -> Result<Vec<ProductModel>, ServiceError> {
        let cutoff = Utc::now() - self.recent_window;
        let products = Product::find()
            .filter(product::Column::IsActive.eq(true))
            .filter(product::Column::CreatedAt.gte(cutoff))
            .order_by_desc(product::Column::CreatedAt)
            .all(&*self.db_pool)
            .await?;
        Ok(products)
    }

    /// Free-text search over active products plus catalog-wide statistics.
    ///
    /// `name_contains` matches name or brand as the database collates it;
    /// `desc_icontains` is an explicit case-insensitive match on the
    /// description. The statistics block ignores the filters.
    pub async fn search_extended(
        &self,
        params: CatalogSearchParams,
    ) -> Result<CatalogSearchOutcome, ServiceError> {
        let db = &*self.db_pool;

        let mut query = Product::find().filter(product::Column::IsActive.eq(true));

        if let Some(term) = params
            .name_contains
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
        {
            query = query.filter(
                Condition::any()
                    .add(product::Column::Name.contains(term))
                    .add(product::Column::Brand.contains(term)),
            );
        }
        if let Some(term) = params
            .desc_icontains
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
        {
            let pattern = format!("%{}%", term.to_lowercase());
            query = query.filter(lower_like(product::Column::Description, &pattern));
        }

        let products = query
            .order_by_desc(product::Column::CreatedAt)
            .order_by_asc(product::Column::Name)
            .all(db)
            .await?;

        let total_active_products = Product::find()
            .filter(product::Column::IsActive.eq(true))
            .count(db)
            .await?;

        let has_apple_products = Product::find()
            .filter(product::Column::Brand.eq("Apple"))
            .count(db)
            .await?
            > 0;

        let recent_product_ids: Vec<i64> = Product::find()
            .select_only()
            .column(product::Column::Id)
            .order_by_desc(product::Column::CreatedAt)
            .limit(5)
            .into_tuple()
            .all(db)
            .await?;

        let name_brand_samples: Vec<NameBrandSample> = Product::find()
            .filter(product::Column::Brand.is_not_null())
            .order_by_desc(product::Column::CreatedAt)
            .limit(5)
            .all(db)
            .await?
            .into_iter()
            .map(|p| NameBrandSample {
                name: p.name,
                brand: p.brand.unwrap_or_default(),
            })
            .collect();

        Ok(CatalogSearchOutcome {
            products,
            stats: CatalogSearchStats {
                total_active_products,
                has_apple_products,
                recent_product_ids,
                name_brand_samples,
            },
        })
    }

    /// The whole catalog with every relation resolved in a fixed number of
    /// queries: tech types, categories, variants with color and size, and
    /// per-product review counts.
    pub async fn overview(&self) -> Result<Vec<ProductOverviewEntry>, ServiceError> {
        let db = &*self.db_pool;

        let products = Product::find()
            .order_by_desc(product::Column::CreatedAt)
            .order_by_asc(product::Column::Name)
            .all(db)
            .await?;
        if products.is_empty() {
            return Ok(Vec::new());
        }

        let tech_types: HashMap<i64, TechTypeModel> = TechType::find()
            .all(db)
            .await?
            .into_iter()
            .map(|t| (t.id, t))
            .collect();

        let links = ProductCategory::find().all(db).await?;
        let categories: HashMap<i64, CategoryModel> = Category::find()
            .all(db)
            .await?
            .into_iter()
            .map(|c| (c.id, c))
            .collect();
        let mut categories_by_product: HashMap<i64, Vec<CategoryModel>> = HashMap::new();
        for link in &links {
            if let Some(cat) = categories.get(&link.category_id) {
                categories_by_product
                    .entry(link.product_id)
                    .or_default()
                    .push(cat.clone());
            }
        }

        let variants = ProductVariant::find()
            .order_by_asc(product_variant::Column::Price)
            .all(db)
            .await?;
        let variant_details = self.with_color_and_size(variants).await?;
        let mut variants_by_product: HashMap<i64, Vec<VariantDetails>> = HashMap::new();
        for details in variant_details {
            variants_by_product
                .entry(details.variant.product_id)
                .or_default()
                .push(details);
        }

        let counts: Vec<ReviewCountRow> = Review::find()
            .select_only()
            .column(review::Column::ProductId)
            .column_as(
                Expr::col((review::Entity, review::Column::Id)).count(),
                "count",
            )
            .group_by(review::Column::ProductId)
            .into_model()
            .all(db)
            .await?;
        let review_counts: HashMap<i64, u64> = counts
            .into_iter()
            .map(|row| (row.product_id, row.count.max(0) as u64))
            .collect();

        let mut entries = Vec::with_capacity(products.len());
        for p in products {
            let tech_type = tech_types.get(&p.tech_type_id).cloned().ok_or_else(|| {
                ServiceError::NotFound(format!("Tech type {} not found", p.tech_type_id))
            })?;
            let categories = categories_by_product.remove(&p.id).unwrap_or_default();
            let variants = variants_by_product.remove(&p.id).unwrap_or_default();
            let review_count = review_counts.get(&p.id).copied().unwrap_or(0);
            entries.push(ProductOverviewEntry {
                product: p,
                tech_type,
                categories,
                variants,
                review_count,
            });
        }
        Ok(entries)
    }

    pub async fn list_specifications(
        &self,
        product_id: i64,
    ) -> Result<Vec<ProductSpecificationModel>, ServiceError> {
        let db = &*self.db_pool;
        self.get_product(product_id).await?;

        let specifications = ProductSpecification::find()
            .filter(product_specification::Column::ProductId.eq(product_id))
            .order_by_asc(product_specification::Column::Name)
            .all(db)
            .await?;
        Ok(specifications)
    }

    #[instrument(skip(self, input), fields(product_id = product_id, name = %input.name))]
    pub async fn add_specification(
        &self,
        product_id: i64,
        input: SpecificationInput,
    ) -> Result<ProductSpecificationModel, ServiceError> {
        input.validate()?;
        self.get_product(product_id).await?;

        let spec = product_specification::ActiveModel {
            product_id: Set(product_id),
            name: Set(input.name),
            value: Set(input.value),
            ..Default::default()
        };
        let spec = spec.insert(&*self.db_pool).await.map_err(|e| {
            map_unique_violation(e, "This product already has a specification with this name")
        })?;

        info!(
            product_id = product_id,
            specification_id = spec.id,
            "Added product specification"
        );
        Ok(spec)
    }

    pub async fn update_specification(
        &self,
        product_id: i64,
        specification_id: i64,
        input: SpecificationInput,
    ) -> Result<ProductSpecificationModel, ServiceError> {
        input.validate()?;
        let existing = self.get_specification(product_id, specification_id).await?;

        let update = product_specification::ActiveModel {
            id: ActiveValue::Unchanged(existing.id),
            name: Set(input.name),
            value: Set(input.value),
            ..Default::default()
        };
        let spec = update.update(&*self.db_pool).await.map_err(|e| {
            map_unique_violation(e, "This product already has a specification with this name")
        })?;

        info!(
            product_id = product_id,
            specification_id = specification_id,
            "Updated product specification"
        );
        Ok(spec)
    }

    pub async fn delete_specification(
        &self,
        product_id: i64,
        specification_id: i64,
    ) -> Result<(), ServiceError> {
        let existing = self.get_specification(product_id, specification_id).await?;
        existing.delete(&*self.db_pool).await?;

        info!(
            product_id = product_id,
            specification_id = specification_id,
            "Deleted product specification"
        );
        Ok(())
    }

    /// Variants of a product with colors and sizes resolved, cheapest first.
    pub async fn list_variants(
        &self,
        product_id: i64,
    ) -> Result<Vec<VariantDetails>, ServiceError> {
        let db = &*self.db_pool;
        self.get_product(product_id).await?;

        let variants = ProductVariant::find()
            .filter(product_variant::Column::ProductId.eq(product_id))
            .order_by_asc(product_variant::Column::Price)
            .all(db)
            .await?;
        self.with_color_and_size(variants).await
    }

    pub async fn get_variant(
        &self,
        product_id: i64,
        variant_id: i64,
    ) -> Result<ProductVariantModel, ServiceError> {
        let variant = self.get_variant_by_id(variant_id).await?;
        if variant.product_id != product_id {
            return Err(ServiceError::InvalidOperation(
                "Variant does not belong to this product".to_string(),
            ));
        }
        Ok(variant)
    }

    /// Looks a variant up by id alone; callers that do not know the owning
    /// product resolve it from the returned row.
    pub async fn get_variant_by_id(
        &self,
        variant_id: i64,
    ) -> Result<ProductVariantModel, ServiceError> {
        ProductVariant::find_by_id(variant_id)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Variant {} not found", variant_id)))
    }

    /// A single variant with color and size resolved, addressed by id alone.
    pub async fn get_variant_details(
        &self,
        variant_id: i64,
    ) -> Result<VariantDetails, ServiceError> {
        let variant = self.get_variant_by_id(variant_id).await?;
        let mut details = self.with_color_and_size(vec![variant]).await?;
        details
            .pop()
            .ok_or_else(|| ServiceError::NotFound(format!("Variant {} not found", variant_id)))
    }

    #[instrument(skip(self, input), fields(product_id = product_id, sku = %input.sku))]
    pub async fn create_variant(
        &self,
        product_id: i64,
        input: CreateVariantInput,
    ) -> Result<ProductVariantModel, ServiceError> {
        input.validate()?;
        ensure_non_negative_price(input.price)?;

        let db = &*self.db_pool;
        self.get_product(product_id).await?;
        ensure_color_exists(db, input.color_id).await?;
        ensure_size_exists(db, input.size_id).await?;

        let variant = product_variant::ActiveModel {
            product_id: Set(product_id),
            color_id: Set(input.color_id),
            size_id: Set(input.size_id),
            stock_quantity: Set(input.stock_quantity),
            price: Set(input.price),
            sku: Set(input.sku),
            ..Default::default()
        };
        let variant = variant.insert(db).await.map_err(|e| {
            map_unique_violation(
                e,
                "A variant with this SKU or color/size combination already exists",
            )
        })?;

        self.event_sender
            .send_or_log(Event::VariantCreated {
                product_id,
                variant_id: variant.id,
            })
            .await;

        info!(
            product_id = product_id,
            variant_id = variant.id,
            "Created product variant"
        );
        Ok(variant)
    }

    #[instrument(skip(self, input), fields(product_id = product_id, variant_id = variant_id))]
    pub async fn update_variant(
        &self,
        product_id: i64,
        variant_id: i64,
        input: UpdateVariantInput,
    ) -> Result<ProductVariantModel, ServiceError> {
        input.validate()?;
        if let Some(price) = input.price {
            ensure_non_negative_price(price)?;
        }

        let db = &*self.db_pool;
        let existing = self.get_variant(product_id, variant_id).await?;
        ensure_color_exists(db, input.color_id).await?;
        ensure_size_exists(db, input.size_id).await?;

        let mut update = product_variant::ActiveModel {
            id: ActiveValue::Unchanged(existing.id),
            ..Default::default()
        };
        let mut changed = false;
        if let Some(color_id) = input.color_id {
            update.color_id = Set(Some(color_id));
            changed = true;
        }
        if let Some(size_id) = input.size_id {
            update.size_id = Set(Some(size_id));
            changed = true;
        }
        if let Some(stock) = input.stock_quantity {
            update.stock_quantity = Set(stock);
            changed = true;
        }
        if let Some(price) = input.price {
            update.price = Set(price);
            changed = true;
        }
        if let Some(sku) = input.sku {
            update.sku = Set(sku);
            changed = true;
        }

        let variant = if changed {
            update.update(db).await.map_err(|e| {
                map_unique_violation(
                    e,
                    "A variant with this SKU or color/size combination already exists",
                )
            })?
        } else {
            existing
        };

        self.event_sender
            .send_or_log(Event::VariantUpdated {
                product_id,
                variant_id,
            })
            .await;

        info!(
            product_id = product_id,
            variant_id = variant_id,
            "Updated product variant"
        );
        Ok(variant)
    }

    /// Deletes a variant unless an order item references it.
    #[instrument(skip(self), fields(product_id = product_id, variant_id = variant_id))]
    pub async fn delete_variant(
        &self,
        product_id: i64,
        variant_id: i64,
    ) -> Result<(), ServiceError> {
        let db = &*self.db_pool;
        let variant = self.get_variant(product_id, variant_id).await?;

        let references = OrderItem::find()
            .filter(order_item::Column::VariantId.eq(variant_id))
            .count(db)
            .await?;
        if references > 0 {
            return Err(ServiceError::Conflict(format!(
                "Variant {} is referenced by {} order item(s) and cannot be deleted",
                variant_id, references
            )));
        }

        variant.delete(db).await?;

        self.event_sender
            .send_or_log(Event::VariantDeleted {
                product_id,
                variant_id,
            })
            .await;

        info!(
            product_id = product_id,
            variant_id = variant_id,
            "Deleted product variant"
        );
        Ok(())
    }

    /// Stores an uploaded instruction manual and records its media path on
    /// the product. A previously stored file is removed.
    #[instrument(skip(self, bytes), fields(product_id = product_id, filename = %filename))]
    pub async fn attach_instruction_manual(
        &self,
        product_id: i64,
        filename: &str,
        bytes: &[u8],
    ) -> Result<ProductModel, ServiceError> {
        let db = &*self.db_pool;
        let product = self.get_product(product_id).await?;

        let stored = self
            .media
            .store_instruction_manual(product_id, filename, bytes)
            .await?;

        if let Some(previous) = product.instruction_manual.as_deref() {
            if previous != stored {
                self.media.remove(previous).await?;
            }
        }

        let update = product::ActiveModel {
            id: ActiveValue::Unchanged(product.id),
            instruction_manual: Set(Some(stored)),
            ..Default::default()
        };
        let product = update.update(db).await?;

        self.event_sender
            .send_or_log(Event::ProductUpdated(product_id))
            .await;

        info!(product_id = product_id, "Attached instruction manual");
        Ok(product)
    }

    /// Stores an uploaded variant image and records its media path on the
    /// variant. A previously stored file is removed.
    #[instrument(skip(self, bytes), fields(product_id = product_id, variant_id = variant_id))]
    pub async fn attach_variant_image(
        &self,
        product_id: i64,
        variant_id: i64,
        filename: &str,
        bytes: &[u8],
    ) -> Result<ProductVariantModel, ServiceError> {
        let db = &*self.db_pool;
        let variant = self.get_variant(product_id, variant_id).await?;

        let stored = self.media.store_variant_image(filename, bytes).await?;

        if let Some(previous) = variant.image.as_deref() {
            if previous != stored {
                self.media.remove(previous).await?;
            }
        }

        let update = product_variant::ActiveModel {
            id: ActiveValue::Unchanged(variant.id),
            image: Set(Some(stored)),
            ..Default::default()
        };
        let variant = update.update(db).await?;

        self.event_sender
            .send_or_log(Event::VariantUpdated {
                product_id,
                variant_id,
            })
            .await;

        info!(
            product_id = product_id,
            variant_id = variant_id,
            "Attached variant image"
        );
        Ok(variant)
    }

    /// Administrative listing with filters, free-text search, and derived
    /// columns (tech type name, category summary, variant count, mean
    /// rating).
    #[instrument(skip(self, filter))]
    pub async fn admin_list(
        &self,
        filter: ProductAdminFilter,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<ProductAdminRow>, u64), ServiceError> {
        let db = &*self.db_pool;

        let mut query = Product::find();

        if let Some(tech_type_id) = filter.tech_type_id {
            query = query.filter(product::Column::TechTypeId.eq(tech_type_id));
        }
        if let Some(brand) = &filter.brand {
            query = query.filter(product::Column::Brand.eq(brand.clone()));
        }
        if let Some(active) = filter.is_active {
            query = query.filter(product::Column::IsActive.eq(active));
        }
        if let Some(category_id) = filter.category_id {
            query = query
                .join(
                    JoinType::InnerJoin,
                    product::Relation::ProductCategories.def(),
                )
                .filter(product_category::Column::CategoryId.eq(category_id));
        }
        if let Some(from) = filter.created_from {
            query = query.filter(
                product::Column::CreatedAt
                    .gte(from.and_hms_opt(0, 0, 0).unwrap_or_default().and_utc()),
            );
        }
        if let Some(to) = filter.created_to {
            query = query.filter(
                product::Column::CreatedAt
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
            let cond = Condition::any()
                .add(lower_like((product::Entity, product::Column::Name), &pattern))
                .add(lower_like(
                    (product::Entity, product::Column::Description),
                    &pattern,
                ))
                .add(lower_like(
                    (product::Entity, product::Column::Brand),
                    &pattern,
                ))
                .add(lower_like(
                    (tech_type::Entity, tech_type::Column::Name),
                    &pattern,
                ));
            query = query
                .join(JoinType::LeftJoin, product::Relation::TechType.def())
                .filter(cond);
        }

        let paginator = query
            .order_by_desc(product::Column::CreatedAt)
            .order_by_asc(product::Column::Name)
            .paginate(db, per_page);

        let total = paginator.num_items().await?;
        let products = paginator.fetch_page(page.saturating_sub(1)).await?;

        let product_ids: Vec<i64> = products.iter().map(|p| p.id).collect();
        let tech_ids: Vec<i64> = products.iter().map(|p| p.tech_type_id).collect();

        let tech_names: HashMap<i64, String> = if tech_ids.is_empty() {
            HashMap::new()
        } else {
            TechType::find()
                .filter(tech_type::Column::Id.is_in(tech_ids))
                .all(db)
                .await?
                .into_iter()
                .map(|t| (t.id, t.name))
                .collect()
        };

        let links = if product_ids.is_empty() {
            Vec::new()
        } else {
            ProductCategory::find()
                .filter(product_category::Column::ProductId.is_in(product_ids.clone()))
                .all(db)
                .await?
        };
        let category_ids: Vec<i64> = links.iter().map(|l| l.category_id).collect();
        let category_names: HashMap<i64, String> = if category_ids.is_empty() {
            HashMap::new()
        } else {
            Category::find()
                .filter(category::Column::Id.is_in(category_ids))
                .all(db)
                .await?
                .into_iter()
                .map(|c| (c.id, c.name))
                .collect()
        };
        let mut names_by_product: HashMap<i64, Vec<String>> = HashMap::new();
        for link in &links {
            if let Some(name) = category_names.get(&link.category_id) {
                names_by_product
                    .entry(link.product_id)
                    .or_default()
                    .push(name.clone());
            }
        }
        for names in names_by_product.values_mut() {
            names.sort();
        }

        let variant_rows = if product_ids.is_empty() {
            Vec::new()
        } else {
            ProductVariant::find()
                .filter(product_variant::Column::ProductId.is_in(product_ids.clone()))
                .all(db)
                .await?
        };
        let mut variant_counts: HashMap<i64, u64> = HashMap::new();
        for v in &variant_rows {
            *variant_counts.entry(v.product_id).or_insert(0) += 1;
        }

        let review_rows = if product_ids.is_empty() {
            Vec::new()
        } else {
            Review::find()
                .filter(review::Column::ProductId.is_in(product_ids))
                .all(db)
                .await?
        };
        let mut ratings_by_product: HashMap<i64, Vec<i32>> = HashMap::new();
        for r in &review_rows {
            ratings_by_product
                .entry(r.product_id)
                .or_default()
                .push(r.rating);
        }

        let rows = products
            .into_iter()
            .map(|p| {
                let full_name = p.full_name_with_brand();
                let tech_type_name = tech_names.get(&p.tech_type_id).cloned().unwrap_or_default();
                let names = names_by_product.remove(&p.id).unwrap_or_default();
                let category_names = summarize_categories(&names);
                let variant_count = variant_counts.get(&p.id).copied().unwrap_or(0);
                let average_rating = ratings_by_product
                    .get(&p.id)
                    .and_then(|ratings| mean_rating(ratings));
                ProductAdminRow {
                    product: p,
                    full_name,
                    tech_type_name,
                    category_names,
                    variant_count,
                    average_rating,
                }
            })
            .collect();

        Ok((rows, total))
    }

    /// Flips the active flag on a set of products in one statement and
    /// reports how many rows changed.
    #[instrument(skip(self, ids), fields(count = ids.len(), active = active))]
    pub async fn set_active_bulk(&self, ids: &[i64], active: bool) -> Result<u64, ServiceError> {
        if ids.is_empty() {
            return Ok(0);
        }

        let result = Product::update_many()
            .col_expr(product::Column::IsActive, Expr::value(active))
            .filter(product::Column::Id.is_in(ids.to_vec()))
            .exec(&*self.db_pool)
            .await?;

        info!(
            affected = result.rows_affected,
            active = active,
            "Bulk-updated product active flag"
        );
        Ok(result.rows_affected)
    }

    /// Renders the selected products (or the whole catalog when `ids` is
    /// empty) as CSV with a human-readable header row.
    pub async fn export_csv(&self, ids: &[i64]) -> Result<String, ServiceError> {
        let db = &*self.db_pool;

        let mut query = Product::find();
        if !ids.is_empty() {
            query = query.filter(product::Column::Id.is_in(ids.to_vec()));
        }
        let products = query
            .order_by_desc(product::Column::CreatedAt)
            .order_by_asc(product::Column::Name)
            .all(db)
            .await?;

        let tech_ids: Vec<i64> = products.iter().map(|p| p.tech_type_id).collect();
        let tech_names: HashMap<i64, String> = if tech_ids.is_empty() {
            HashMap::new()
        } else {
            TechType::find()
                .filter(tech_type::Column::Id.is_in(tech_ids))
                .all(db)
                .await?
                .into_iter()
                .map(|t| (t.id, t.name))
                .collect()
        };

        let mut csv = String::new();
        csv.push_str(&CSV_HEADER.join(","));
        csv.push('\n');
        for p in &products {
            let fields = [
                p.id.to_string(),
                p.name.clone(),
                p.description.clone().unwrap_or_default(),
                p.brand.clone().unwrap_or_default(),
                p.is_active.to_string(),
                p.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
                tech_names.get(&p.tech_type_id).cloned().unwrap_or_default(),
                p.instruction_manual.clone().unwrap_or_default(),
                p.manufacturer_url.clone().unwrap_or_default(),
            ];
            let escaped: Vec<String> = fields.iter().map(|f| escape_csv_field(f)).collect();
            csv.push_str(&escaped.join(","));
            csv.push('\n');
        }

        info!(products = products.len(), "Exported products to CSV");
        Ok(csv)
    }

    /// Looks a specification up by id alone; callers that do not know the
    /// owning product resolve it from the returned row.
    pub async fn get_specification_by_id(
        &self,
        specification_id: i64,
    ) -> Result<ProductSpecificationModel, ServiceError> {
        ProductSpecification::find_by_id(specification_id)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Specification {} not found", specification_id))
            })
    }

    async fn get_specification(
        &self,
        product_id: i64,
        specification_id: i64,
    ) -> Result<ProductSpecificationModel, ServiceError> {
        let spec = self.get_specification_by_id(specification_id).await?;
        if spec.product_id != product_id {
            return Err(ServiceError::InvalidOperation(
                "Specification does not belong to this product".to_string(),
            ));
        }
        Ok(spec)
    }

    async fn with_color_and_size(
        &self,
        variants: Vec<ProductVariantModel>,
    ) -> Result<Vec<VariantDetails>, ServiceError> {
        let db = &*self.db_pool;

        let color_ids: Vec<i64> = variants.iter().filter_map(|v| v.color_id).collect();
        let size_ids: Vec<i64> = variants.iter().filter_map(|v| v.size_id).collect();

        let colors: HashMap<i64, ColorModel> = if color_ids.is_empty() {
            HashMap::new()
        } else {
            Color::find()
                .filter(color::Column::Id.is_in(color_ids))
                .all(db)
                .await?
                .into_iter()
                .map(|c| (c.id, c))
                .collect()
        };
        let sizes: HashMap<i64, SizeModel> = if size_ids.is_empty() {
            HashMap::new()
        } else {
            Size::find()
                .filter(size::Column::Id.is_in(size_ids))
                .all(db)
                .await?
                .into_iter()
                .map(|s| (s.id, s))
                .collect()
        };

        Ok(variants
            .into_iter()
            .map(|v| {
                let color = v.color_id.and_then(|id| colors.get(&id).cloned());
                let size = v.size_id.and_then(|id| sizes.get(&id).cloned());
                VariantDetails {
                    variant: v,
                    color,
                    size,
                }
            })
            .collect())
    }

    async fn product_ratings(&self, product_id: i64) -> Result<Vec<i32>, ServiceError> {
        let ratings: Vec<i32> = Review::find()
            .select_only()
            .column(review::Column::Rating)
            .filter(review::Column::ProductId.eq(product_id))
            .into_tuple()
            .all(&*self.db_pool)
            .await?;
        Ok(ratings)
    }
}

async fn ensure_tech_type_exists(
    conn: &impl ConnectionTrait,
    tech_type_id: i64,
) -> Result<(), ServiceError> {
    let exists = TechType::find_by_id(tech_type_id).count(conn).await? > 0;
    if !exists {
        return Err(ServiceError::ValidationError(format!(
            "Tech type {} does not exist",
            tech_type_id
        )));
    }
    Ok(())
}

async fn ensure_color_exists(
    conn: &impl ConnectionTrait,
    color_id: Option<i64>,
) -> Result<(), ServiceError> {
    if let Some(color_id) = color_id {
        let exists = Color::find_by_id(color_id).count(conn).await? > 0;
        if !exists {
            return Err(ServiceError::ValidationError(format!(
                "Color {} does not exist",
                color_id
            )));
        }
    }
    Ok(())
}

async fn ensure_size_exists(
    conn: &impl ConnectionTrait,
    size_id: Option<i64>,
) -> Result<(), ServiceError> {
    if let Some(size_id) = size_id {
        let exists = Size::find_by_id(size_id).count(conn).await? > 0;
        if !exists {
            return Err(ServiceError::ValidationError(format!(
                "Size {} does not exist",
                size_id
            )));
        }
    }
    Ok(())
}

async fn replace_category_links(
    conn: &impl ConnectionTrait,
    product_id: i64,
    category_ids: &[i64],
) -> Result<(), ServiceError> {
    let unique: HashSet<i64> = category_ids.iter().copied().collect();

    if !unique.is_empty() {
        let found = Category::find()
            .filter(category::Column::Id.is_in(unique.iter().copied().collect::<Vec<_>>()))
            .count(conn)
            .await?;
        if found != unique.len() as u64 {
            return Err(ServiceError::ValidationError(
                "One or more categories do not exist".to_string(),
            ));
        }
    }

    ProductCategory::delete_many()
        .filter(product_category::Column::ProductId.eq(product_id))
        .exec(conn)
        .await?;

    for category_id in &unique {
        let link = product_category::ActiveModel {
            product_id: Set(product_id),
            category_id: Set(*category_id),
            ..Default::default()
        };
        link.insert(conn).await?;
    }
    Ok(())
}

fn ensure_non_negative_price(price: Decimal) -> Result<(), ServiceError> {
    if price < Decimal::ZERO {
        return Err(ServiceError::ValidationError(
            "Price cannot be negative".to_string(),
        ));
    }
    Ok(())
}

fn mean_rating(ratings: &[i32]) -> Option<f64> {
    if ratings.is_empty() {
        return None;
    }
    let sum: f64 = ratings.iter().map(|r| f64::from(*r)).sum();
    Some(sum / ratings.len() as f64)
}

/// First three category names joined with ", "; longer lists get an
/// ellipsis, mirroring the staff table column.
fn summarize_categories(names: &[String]) -> String {
    let shown = names
        .iter()
        .take(3)
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ");
    if names.len() > 3 {
        format!("{}...", shown)
    } else {
        shown
    }
}

fn escape_csv_field(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn mean_rating_of_no_reviews_is_none() {
        assert_eq!(mean_rating(&[]), None);
    }

    #[test]
    fn mean_rating_averages_all_ratings() {
        assert_eq!(mean_rating(&[4, 5]), Some(4.5));
        assert_eq!(mean_rating(&[1, 2, 3]), Some(2.0));
    }

    #[test]
    fn category_summary_shows_at_most_three_names() {
        let names: Vec<String> = ["Phones", "Tablets"].iter().map(|s| s.to_string()).collect();
        assert_eq!(summarize_categories(&names), "Phones, Tablets");

        let names: Vec<String> = ["A", "B", "C", "D"].iter().map(|s| s.to_string()).collect();
        assert_eq!(summarize_categories(&names), "A, B, C...");

        assert_eq!(summarize_categories(&[]), "");
    }

    #[test]
    fn csv_fields_with_commas_or_quotes_are_quoted() {
        assert_eq!(escape_csv_field("plain"), "plain");
        assert_eq!(escape_csv_field("a,b"), "\"a,b\"");
        assert_eq!(escape_csv_field("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(escape_csv_field("two\nlines"), "\"two\nlines\"");
    }

    #[test]
    fn create_product_input_requires_name_and_valid_url() {
        let input = CreateProductInput {
            name: String::new(),
            description: None,
            brand: None,
            is_active: None,
            tech_type_id: 1,
            manufacturer_url: None,
            category_ids: vec![],
        };
        assert!(input.validate().is_err());

        let input = CreateProductInput {
            name: "Gamma 12".to_string(),
            description: None,
            brand: None,
            is_active: None,
            tech_type_id: 1,
            manufacturer_url: Some("not a url".to_string()),
            category_ids: vec![],
        };
        assert!(input.validate().is_err());

        let input = CreateProductInput {
            name: "Gamma 12".to_string(),
            description: Some("Flagship".to_string()),
            brand: Some("Nova".to_string()),
            is_active: Some(true),
            tech_type_id: 1,
            manufacturer_url: Some("https://nova.example.com".to_string()),
            category_ids: vec![1, 2],
        };
        assert!(input.validate().is_ok());
    }

    #[test]
    fn variant_input_rejects_negative_stock_and_blank_sku() {
        let input = CreateVariantInput {
            color_id: None,
            size_id: None,
            stock_quantity: -1,
            price: dec!(10.00),
            sku: "SKU-1".to_string(),
        };
        assert!(input.validate().is_err());

        let input = CreateVariantInput {
            color_id: None,
            size_id: None,
            stock_quantity: 0,
            price: dec!(10.00),
            sku: String::new(),
        };
        assert!(input.validate().is_err());
    }

    #[test]
    fn negative_prices_are_rejected() {
        assert!(ensure_non_negative_price(dec!(-0.01)).is_err());
        assert!(ensure_non_negative_price(dec!(0)).is_ok());
    }
}
