use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Membership row linking a product to a promotional campaign.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "promo_products")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub promo_id: i64,
    pub product_id: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::promo::Entity",
        from = "Column::PromoId",
        to = "super::promo::Column::Id"
    )]
    Promo,
    #[sea_orm(
        belongs_to = "super::product::Entity",
        from = "Column::ProductId",
        to = "super::product::Column::Id"
    )]
    Product,
}

impl Related<super::promo::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Promo.def()
    }
}

impl Related<super::product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Product.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
