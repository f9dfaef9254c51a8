use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue, Set};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Customer order. `total_price` is a derived cache: it is recomputed from
/// the item set on every item mutation and must never be written directly by
/// callers. The owner is either a registered user or the guest contact
/// fields, not both.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub user_id: Option<i64>,
    pub order_date: DateTime<Utc>,
    pub status: OrderStatus,
    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub total_price: Decimal,
    #[sea_orm(column_type = "Text")]
    pub shipping_address: String,
    pub payment_method: PaymentMethod,
    pub tracking_number: Option<String>,
    pub guest_email: Option<String>,
    pub guest_phone: Option<String>,
    pub guest_name: Option<String>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,
    #[sea_orm(has_many = "super::order_item::Entity")]
    Items,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::order_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Items.def()
    }
}

#[async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C: ConnectionTrait>(self, _db: &C, insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        let mut active_model = self;
        let now = Utc::now();
        if insert {
            if let ActiveValue::NotSet = active_model.order_date {
                active_model.order_date = Set(now);
            }
            if let ActiveValue::NotSet = active_model.total_price {
                active_model.total_price = Set(Decimal::ZERO);
            }
        }
        active_model.updated_at = Set(now);
        Ok(active_model)
    }
}

impl Model {
    /// Customer display name: registered owner first, then the guest name.
    pub fn customer_name(&self, user: Option<&super::user::Model>) -> String {
        if let Some(user) = user {
            return user.display_name();
        }
        match self.guest_name.as_deref() {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => "Customer not specified".to_string(),
        }
    }
}

/// Fulfillment state of an order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "processing")]
    Processing,
    #[sea_orm(string_value = "shipped")]
    Shipped,
    #[sea_orm(string_value = "delivered")]
    Delivered,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

impl OrderStatus {
    pub fn label(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "Pending",
            OrderStatus::Processing => "Processing",
            OrderStatus::Shipped => "Shipped",
            OrderStatus::Delivered => "Delivered",
            OrderStatus::Cancelled => "Cancelled",
        }
    }
}

/// How the customer pays for the order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(50))")]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    #[sea_orm(string_value = "card_online")]
    CardOnline,
    #[sea_orm(string_value = "cash_pickup")]
    CashPickup,
    #[sea_orm(string_value = "courier_cash")]
    CourierCash,
    #[sea_orm(string_value = "courier_card")]
    CourierCard,
}

impl PaymentMethod {
    pub fn label(&self) -> &'static str {
        match self {
            PaymentMethod::CardOnline => "Card online",
            PaymentMethod::CashPickup => "Cash on pickup",
            PaymentMethod::CourierCash => "Cash to courier",
            PaymentMethod::CourierCard => "Card to courier",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order(user_id: Option<i64>, guest_name: Option<&str>) -> Model {
        Model {
            id: 7,
            user_id,
            order_date: Utc::now(),
            status: OrderStatus::Pending,
            total_price: Decimal::ZERO,
            shipping_address: "10 Main St".to_string(),
            payment_method: PaymentMethod::CardOnline,
            tracking_number: None,
            guest_email: None,
            guest_phone: None,
            guest_name: guest_name.map(str::to_string),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn registered_owner_takes_precedence_over_guest_name() {
        let user = super::super::user::Model {
            id: 3,
            username: "ivan".to_string(),
            email: "ivan@example.com".to_string(),
            password_hash: String::new(),
            first_name: Some("Ivan".to_string()),
            last_name: Some("Petrov".to_string()),
            address: None,
            phone: None,
            is_active: true,
            is_staff: false,
            is_superuser: false,
            date_joined: Utc::now(),
            last_login: None,
        };
        let order = order(Some(3), Some("Walk-in"));
        assert_eq!(order.customer_name(Some(&user)), "Ivan Petrov");
    }

    #[test]
    fn guest_name_used_when_no_registered_owner() {
        let order = order(None, Some("Walk-in"));
        assert_eq!(order.customer_name(None), "Walk-in");
    }

    #[test]
    fn placeholder_when_no_customer_information() {
        let order = order(None, None);
        assert_eq!(order.customer_name(None), "Customer not specified");
    }
}
