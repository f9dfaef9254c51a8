use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue, Set};
use serde::{Deserialize, Serialize};

/// Catalog product. Carries no price of its own; pricing and stock live on
/// the variants. `instruction_manual` holds a media-root relative path.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "products")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub name: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,
    pub brand: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub tech_type_id: i64,
    pub instruction_manual: Option<String>,
    pub manufacturer_url: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::tech_type::Entity",
        from = "Column::TechTypeId",
        to = "super::tech_type::Column::Id"
    )]
    TechType,
    #[sea_orm(has_many = "super::product_variant::Entity")]
    Variants,
    #[sea_orm(has_many = "super::product_specification::Entity")]
    Specifications,
    #[sea_orm(has_many = "super::review::Entity")]
    Reviews,
    #[sea_orm(has_many = "super::favorite::Entity")]
    Favorites,
    #[sea_orm(has_many = "super::product_category::Entity")]
    ProductCategories,
    #[sea_orm(has_many = "super::promo_product::Entity")]
    PromoProducts,
}

impl Related<super::tech_type::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TechType.def()
    }
}

impl Related<super::product_variant::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Variants.def()
    }
}

impl Related<super::product_specification::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Specifications.def()
    }
}

impl Related<super::review::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Reviews.def()
    }
}

impl Related<super::favorite::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Favorites.def()
    }
}

impl Related<super::product_category::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ProductCategories.def()
    }
}

impl Related<super::promo_product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PromoProducts.def()
    }
}

#[async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C: ConnectionTrait>(self, _db: &C, insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        let mut active_model = self;
        if insert {
            if let ActiveValue::NotSet = active_model.is_active {
                active_model.is_active = Set(true);
            }
            if let ActiveValue::NotSet = active_model.created_at {
                active_model.created_at = Set(Utc::now());
            }
        }
        Ok(active_model)
    }
}

impl Model {
    /// "{brand} {name}" when a brand is recorded, plain name otherwise.
    pub fn full_name_with_brand(&self) -> String {
        match self.brand.as_deref() {
            Some(brand) if !brand.is_empty() => format!("{} {}", brand, self.name),
            _ => self.name.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(brand: Option<&str>) -> Model {
        Model {
            id: 1,
            name: "Gamma 12".to_string(),
            description: None,
            brand: brand.map(str::to_string),
            is_active: true,
            created_at: Utc::now(),
            tech_type_id: 1,
            instruction_manual: None,
            manufacturer_url: None,
        }
    }

    #[test]
    fn full_name_includes_brand_when_present() {
        assert_eq!(product(Some("Nova")).full_name_with_brand(), "Nova Gamma 12");
    }

    #[test]
    fn full_name_falls_back_to_bare_name() {
        assert_eq!(product(None).full_name_with_brand(), "Gamma 12");
        assert_eq!(product(Some("")).full_name_with_brand(), "Gamma 12");
    }
}
