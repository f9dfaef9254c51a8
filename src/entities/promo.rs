use chrono::NaiveDate;
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Promotional campaign: a percent discount applied to member products
/// within an inclusive date window.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "promos")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub title: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,
    #[sea_orm(column_type = "Decimal(Some((5, 2)))")]
    pub discount_percent: Decimal,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub is_active: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::promo_product::Entity")]
    PromoProducts,
}

impl Related<super::promo_product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PromoProducts.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Active flag AND the date falls inside [start_date, end_date].
    pub fn is_active_on(&self, date: NaiveDate) -> bool {
        self.is_active && self.start_date <= date && date <= self.end_date
    }
}
