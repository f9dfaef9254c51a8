//! Reference-data subsystem: tech types, the category tree, colors, sizes.

use crate::{
    db::DbPool,
    entities::{
        category::{self, Entity as Category, Model as CategoryModel},
        color::{self, Entity as Color, Model as ColorModel},
        product::{self, Entity as Product},
        size::{self, Entity as Size, Model as SizeModel},
        tech_type::{self, Entity as TechType, Model as TechTypeModel},
    },
    errors::ServiceError,
    events::{Event, EventSender},
};
use once_cell::sync::Lazy;
use regex::Regex;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, ModelTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set, SqlErr,
};
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{info, instrument};
use validator::Validate;

static HEX_COLOR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^#[0-9A-Fa-f]{6}$").expect("hex color pattern"));

#[derive(Debug, Deserialize, Validate)]
pub struct TechTypeInput {
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CategoryInput {
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: String,
    pub description: Option<String>,
    pub parent_id: Option<i64>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ColorInput {
    #[validate(length(min = 1, max = 50, message = "Name must be 1-50 characters"))]
    pub name: String,
    #[validate(regex(path = "HEX_COLOR_RE", message = "Hex code must look like #1a2b3c"))]
    pub hex_code: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SizeInput {
    #[validate(length(min = 1, max = 20, message = "Name must be 1-20 characters"))]
    pub name: String,
}

/// A category paired with its rendered ancestry, e.g. "Audio -> Headphones".
#[derive(Debug, Clone)]
pub struct CategoryWithPath {
    pub category: CategoryModel,
    pub display_path: String,
}

/// CRUD over the four reference tables that products and variants hang off.
///
/// Deletions respect the schema: a tech type referenced by products is
/// protected, a deleted category detaches (not deletes) its children, and
/// deleting a color or size nulls the reference on affected variants.
#[derive(Clone)]
pub struct CatalogService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
}

impl CatalogService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    // Tech types

    pub async fn list_tech_types(&self) -> Result<Vec<TechTypeModel>, ServiceError> {
        Ok(TechType::find()
            .order_by_asc(tech_type::Column::Name)
            .all(&*self.db_pool)
            .await?)
    }

    pub async fn get_tech_type(&self, id: i64) -> Result<TechTypeModel, ServiceError> {
        TechType::find_by_id(id)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Tech type {} not found", id)))
    }

    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create_tech_type(
        &self,
        input: TechTypeInput,
    ) -> Result<TechTypeModel, ServiceError> {
        input.validate()?;

        let model = tech_type::ActiveModel {
            name: Set(input.name),
            ..Default::default()
        };
        let model = model
            .insert(&*self.db_pool)
            .await
            .map_err(|e| map_unique_violation(e, "A tech type with this name already exists"))?;

        info!(tech_type_id = model.id, "Created tech type");
        Ok(model)
    }

    #[instrument(skip(self, input), fields(tech_type_id = id))]
    pub async fn update_tech_type(
        &self,
        id: i64,
        input: TechTypeInput,
    ) -> Result<TechTypeModel, ServiceError> {
        input.validate()?;

        let model = self.get_tech_type(id).await?;
        let mut active: tech_type::ActiveModel = model.into();
        active.name = Set(input.name);
        let model = active
            .update(&*self.db_pool)
            .await
            .map_err(|e| map_unique_violation(e, "A tech type with this name already exists"))?;
        Ok(model)
    }

    /// Deleting a tech type still referenced by products is refused so the
    /// catalog cannot lose its classification.
    #[instrument(skip(self), fields(tech_type_id = id))]
    pub async fn delete_tech_type(&self, id: i64) -> Result<(), ServiceError> {
        let db = &*self.db_pool;
        let model = self.get_tech_type(id).await?;

        let referencing = Product::find()
            .filter(product::Column::TechTypeId.eq(id))
            .count(db)
            .await?;
        if referencing > 0 {
            return Err(ServiceError::Conflict(format!(
                "Tech type {} is referenced by {} product(s)",
                id, referencing
            )));
        }

        model.delete(db).await?;
        info!(tech_type_id = id, "Deleted tech type");
        Ok(())
    }

    // Categories

    pub async fn list_categories(&self) -> Result<Vec<CategoryModel>, ServiceError> {
        Ok(Category::find()
            .order_by_asc(category::Column::Name)
            .all(&*self.db_pool)
            .await?)
    }

    pub async fn get_category(&self, id: i64) -> Result<CategoryModel, ServiceError> {
        Category::find_by_id(id)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Category {} not found", id)))
    }

    /// Categories with their full ancestor chains, in name order.
    ///
    /// The whole table is loaded once; it is a small dimension table and the
    /// paths need every ancestor anyway.
    pub async fn list_categories_with_paths(&self) -> Result<Vec<CategoryWithPath>, ServiceError> {
        let categories = self.list_categories().await?;
        let paths: Vec<String> = {
            let by_id: HashMap<i64, &CategoryModel> =
                categories.iter().map(|c| (c.id, c)).collect();
            categories.iter().map(|c| display_path(&by_id, c.id)).collect()
        };
        Ok(categories
            .into_iter()
            .zip(paths)
            .map(|(category, display_path)| CategoryWithPath {
                category,
                display_path,
            })
            .collect())
    }

    pub async fn get_category_with_path(&self, id: i64) -> Result<CategoryWithPath, ServiceError> {
        let categories = self.list_categories().await?;
        let display_path = {
            let by_id: HashMap<i64, &CategoryModel> =
                categories.iter().map(|c| (c.id, c)).collect();
            display_path(&by_id, id)
        };
        categories
            .into_iter()
            .find(|c| c.id == id)
            .map(|category| CategoryWithPath {
                category,
                display_path,
            })
            .ok_or_else(|| ServiceError::NotFound(format!("Category {} not found", id)))
    }

    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create_category(
        &self,
        input: CategoryInput,
    ) -> Result<CategoryModel, ServiceError> {
        input.validate()?;

        if let Some(parent_id) = input.parent_id {
            self.get_category(parent_id).await.map_err(|_| {
                ServiceError::ValidationError(format!("Parent category {} not found", parent_id))
            })?;
        }

        let model = category::ActiveModel {
            name: Set(input.name),
            description: Set(input.description),
            parent_id: Set(input.parent_id),
            ..Default::default()
        };
        let model = model.insert(&*self.db_pool).await?;

        self.event_sender
            .send_or_log(Event::CategoryCreated(model.id))
            .await;

        info!(category_id = model.id, "Created category");
        Ok(model)
    }

    #[instrument(skip(self, input), fields(category_id = id))]
    pub async fn update_category(
        &self,
        id: i64,
        input: CategoryInput,
    ) -> Result<CategoryModel, ServiceError> {
        input.validate()?;

        let model = self.get_category(id).await?;

        if let Some(parent_id) = input.parent_id {
            if parent_id == id {
                return Err(ServiceError::ValidationError(
                    "A category cannot be its own parent".to_string(),
                ));
            }
            self.get_category(parent_id).await.map_err(|_| {
                ServiceError::ValidationError(format!("Parent category {} not found", parent_id))
            })?;
        }

        let mut active: category::ActiveModel = model.into();
        active.name = Set(input.name);
        active.description = Set(input.description);
        active.parent_id = Set(input.parent_id);
        Ok(active.update(&*self.db_pool).await?)
    }

    /// Deletes a category. Children survive with their parent reference
    /// nulled by the schema, and product links are removed.
    #[instrument(skip(self), fields(category_id = id))]
    pub async fn delete_category(&self, id: i64) -> Result<(), ServiceError> {
        let model = self.get_category(id).await?;
        model.delete(&*self.db_pool).await?;

        self.event_sender
            .send_or_log(Event::CategoryDeleted(id))
            .await;

        info!(category_id = id, "Deleted category");
        Ok(())
    }

    // Colors

    pub async fn list_colors(&self) -> Result<Vec<ColorModel>, ServiceError> {
        Ok(Color::find()
            .order_by_asc(color::Column::Name)
            .all(&*self.db_pool)
            .await?)
    }

    pub async fn get_color(&self, id: i64) -> Result<ColorModel, ServiceError> {
        Color::find_by_id(id)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Color {} not found", id)))
    }

    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create_color(&self, input: ColorInput) -> Result<ColorModel, ServiceError> {
        input.validate()?;

        let model = color::ActiveModel {
            name: Set(input.name),
            hex_code: Set(input.hex_code),
            ..Default::default()
        };
        let model = model.insert(&*self.db_pool).await.map_err(|e| {
            map_unique_violation(e, "A color with this name or hex code already exists")
        })?;

        info!(color_id = model.id, "Created color");
        Ok(model)
    }

    #[instrument(skip(self, input), fields(color_id = id))]
    pub async fn update_color(
        &self,
        id: i64,
        input: ColorInput,
    ) -> Result<ColorModel, ServiceError> {
        input.validate()?;

        let model = self.get_color(id).await?;
        let mut active: color::ActiveModel = model.into();
        active.name = Set(input.name);
        active.hex_code = Set(input.hex_code);
        let model = active.update(&*self.db_pool).await.map_err(|e| {
            map_unique_violation(e, "A color with this name or hex code already exists")
        })?;
        Ok(model)
    }

    /// Deletes a color; variants that used it keep running with the color
    /// reference nulled by the schema.
    #[instrument(skip(self), fields(color_id = id))]
    pub async fn delete_color(&self, id: i64) -> Result<(), ServiceError> {
        let model = self.get_color(id).await?;
        model.delete(&*self.db_pool).await?;
        info!(color_id = id, "Deleted color");
        Ok(())
    }

    // Sizes

    pub async fn list_sizes(&self) -> Result<Vec<SizeModel>, ServiceError> {
        Ok(Size::find()
            .order_by_asc(size::Column::Name)
            .all(&*self.db_pool)
            .await?)
    }

    pub async fn get_size(&self, id: i64) -> Result<SizeModel, ServiceError> {
        Size::find_by_id(id)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Size {} not found", id)))
    }

    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create_size(&self, input: SizeInput) -> Result<SizeModel, ServiceError> {
        input.validate()?;

        let model = size::ActiveModel {
            name: Set(input.name),
            ..Default::default()
        };
        let model = model
            .insert(&*self.db_pool)
            .await
            .map_err(|e| map_unique_violation(e, "A size with this name already exists"))?;

        info!(size_id = model.id, "Created size");
        Ok(model)
    }

    #[instrument(skip(self, input), fields(size_id = id))]
    pub async fn update_size(&self, id: i64, input: SizeInput) -> Result<SizeModel, ServiceError> {
        input.validate()?;

        let model = self.get_size(id).await?;
        let mut active: size::ActiveModel = model.into();
        active.name = Set(input.name);
        let model = active
            .update(&*self.db_pool)
            .await
            .map_err(|e| map_unique_violation(e, "A size with this name already exists"))?;
        Ok(model)
    }

    /// Deletes a size; variant references are nulled by the schema.
    #[instrument(skip(self), fields(size_id = id))]
    pub async fn delete_size(&self, id: i64) -> Result<(), ServiceError> {
        let model = self.get_size(id).await?;
        model.delete(&*self.db_pool).await?;
        info!(size_id = id, "Deleted size");
        Ok(())
    }
}

/// Turns a unique-constraint database error into a 409 with a readable
/// message; everything else passes through unchanged.
pub(crate) fn map_unique_violation(err: sea_orm::DbErr, message: &str) -> ServiceError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => ServiceError::Conflict(message.to_string()),
        _ => ServiceError::DatabaseError(err),
    }
}

/// Renders a category's full ancestry as `"Grandparent -> Parent -> Name"`.
///
/// A dangling parent reference ends the walk at the last resolvable
/// ancestor; a repeated id means a cycle and ends it too.
fn display_path(by_id: &HashMap<i64, &CategoryModel>, id: i64) -> String {
    let mut names = Vec::new();
    let mut seen = HashSet::new();
    let mut cursor = Some(id);
    while let Some(current) = cursor {
        if !seen.insert(current) {
            break;
        }
        match by_id.get(&current) {
            Some(node) => {
                names.push(node.name.as_str());
                cursor = node.parent_id;
            }
            None => break,
        }
    }
    names.reverse();
    names.join(" -> ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_code_pattern_accepts_standard_colors() {
        for code in ["#000000", "#FFFFFF", "#1a2B3c"] {
            let input = ColorInput {
                name: "Black".into(),
                hex_code: code.into(),
            };
            assert!(input.validate().is_ok(), "expected {code} to validate");
        }
    }

    #[test]
    fn hex_code_pattern_rejects_malformed_values() {
        for code in ["000000", "#00000", "#gggggg", "#0000000", ""] {
            let input = ColorInput {
                name: "Black".into(),
                hex_code: code.into(),
            };
            assert!(input.validate().is_err(), "expected {code} to be rejected");
        }
    }

    #[test]
    fn unique_violation_maps_to_conflict() {
        let err = sea_orm::DbErr::Custom("not a sql error".to_string());
        match map_unique_violation(err, "duplicate") {
            ServiceError::DatabaseError(_) => {}
            other => panic!("expected passthrough, got {other:?}"),
        }
    }

    fn node(id: i64, name: &str, parent_id: Option<i64>) -> CategoryModel {
        CategoryModel {
            id,
            name: name.to_string(),
            description: None,
            parent_id,
        }
    }

    #[test]
    fn display_path_walks_the_whole_ancestor_chain() {
        let tree = [
            node(1, "Audio", None),
            node(2, "Headphones", Some(1)),
            node(3, "In-Ear", Some(2)),
        ];
        let by_id: HashMap<i64, &CategoryModel> = tree.iter().map(|c| (c.id, c)).collect();

        assert_eq!(display_path(&by_id, 1), "Audio");
        assert_eq!(display_path(&by_id, 2), "Audio -> Headphones");
        assert_eq!(display_path(&by_id, 3), "Audio -> Headphones -> In-Ear");
    }

    #[test]
    fn display_path_survives_a_parent_cycle() {
        let tree = [node(1, "A", Some(2)), node(2, "B", Some(1))];
        let by_id: HashMap<i64, &CategoryModel> = tree.iter().map(|c| (c.id, c)).collect();

        assert_eq!(display_path(&by_id, 1), "B -> A");
    }

    #[test]
    fn display_path_stops_at_a_dangling_parent() {
        let tree = [node(5, "Orphan", Some(99))];
        let by_id: HashMap<i64, &CategoryModel> = tree.iter().map(|c| (c.id, c)).collect();

        assert_eq!(display_path(&by_id, 5), "Orphan");
        assert_eq!(display_path(&by_id, 42), "");
    }
}
