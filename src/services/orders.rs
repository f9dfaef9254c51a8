use crate::{
    db::{lower_like, DbPool},
    entities::{
        order::{self, Entity as Order, Model as OrderModel, OrderStatus, PaymentMethod},
        order_item::{self, Entity as OrderItem, Model as OrderItemModel},
        product_variant::Entity as ProductVariant,
        user::{self, Entity as User, Model as UserModel},
    },
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::Condition,
    ActiveModelTrait, ActiveValue, ColumnTrait, ConnectionTrait, EntityTrait, JoinType,
    ModelTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, RelationTrait, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use validator::Validate;

/// Input for creating an order. The owner is either a registered user
/// (`user_id`) or a guest described by the `guest_*` fields, never both.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateOrderInput {
    pub user_id: Option<i64>,
    #[validate(length(min = 1, message = "Shipping address is required"))]
    pub shipping_address: String,
    pub payment_method: Option<PaymentMethod>,
    pub tracking_number: Option<String>,
    #[validate(email(message = "Guest email must be a valid email address"))]
    pub guest_email: Option<String>,
    pub guest_phone: Option<String>,
    pub guest_name: Option<String>,
}

/// Partial update of an order header. Fields left as `None` are unchanged.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateOrderInput {
    pub user_id: Option<i64>,
    #[validate(length(min = 1, message = "Shipping address cannot be blank"))]
    pub shipping_address: Option<String>,
    pub payment_method: Option<PaymentMethod>,
    pub tracking_number: Option<String>,
    #[validate(email(message = "Guest email must be a valid email address"))]
    pub guest_email: Option<String>,
    pub guest_phone: Option<String>,
    pub guest_name: Option<String>,
}

/// Input for adding an item to an order. When `price_at_time` is omitted the
/// current variant price is captured as the snapshot.
#[derive(Debug, Deserialize, Validate)]
pub struct AddOrderItemInput {
    pub variant_id: i64,
    #[validate(range(min = 1, message = "Quantity must be at least 1"))]
    pub quantity: i32,
    pub price_at_time: Option<Decimal>,
}

/// Partial update of an order item.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateOrderItemInput {
    #[validate(range(min = 1, message = "Quantity must be at least 1"))]
    pub quantity: Option<i32>,
    pub price_at_time: Option<Decimal>,
}

/// Filters accepted by the administrative order listing.
#[derive(Debug, Default, Deserialize)]
pub struct OrderAdminFilter {
    pub status: Option<OrderStatus>,
    pub payment_method: Option<PaymentMethod>,
    pub user_id: Option<i64>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub search: Option<String>,
}

/// Order header together with its line items.
#[derive(Debug, Serialize)]
pub struct OrderDetails {
    pub order: OrderModel,
    pub items: Vec<OrderItemModel>,
}

/// Administrative listing row: the stored header plus columns derived at
/// read time (customer display name, live sum over the line items).
#[derive(Debug, Serialize)]
pub struct OrderAdminRow {
    pub order: OrderModel,
    pub customer: String,
    pub item_count: usize,
    pub items_total: Decimal,
}

/// Service for managing orders and their line items.
///
/// Every item mutation runs inside a transaction together with
/// [`OrderService::recalculate_total`], so the stored `total_price` is never
/// observed out of step with the item set.
#[derive(Clone)]
pub struct OrderService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
}

impl OrderService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    /// Creates a new order header.
    ///
    /// The order starts with an empty item set and a zero total; items are
    /// attached afterwards through [`OrderService::add_item`].
    #[instrument(skip(self, input), fields(user_id = ?input.user_id))]
    pub async fn create_order(&self, input: CreateOrderInput) -> Result<OrderModel, ServiceError> {
        input.validate()?;
        ensure_single_owner(
            input.user_id,
            input.guest_email.as_deref(),
            input.guest_phone.as_deref(),
            input.guest_name.as_deref(),
        )?;

        let db = &*self.db_pool;

        if let Some(user_id) = input.user_id {
            User::find_by_id(user_id)
                .one(db)
                .await?
                .ok_or_else(|| ServiceError::NotFound(format!("User {} not found", user_id)))?;
        }

        let order = order::ActiveModel {
            user_id: Set(input.user_id),
            status: Set(OrderStatus::Pending),
            shipping_address: Set(input.shipping_address),
            payment_method: Set(input.payment_method.unwrap_or(PaymentMethod::CardOnline)),
            tracking_number: Set(input.tracking_number),
            guest_email: Set(input.guest_email),
            guest_phone: Set(input.guest_phone),
            guest_name: Set(input.guest_name),
            ..Default::default()
        };

        let order = order.insert(db).await.map_err(|e| {
            error!(error = %e, "Failed to create order");
            ServiceError::DatabaseError(e)
        })?;

        self.event_sender
            .send_or_log(Event::OrderCreated(order.id))
            .await;

        info!(order_id = order.id, "Created order");
        Ok(order)
    }

    /// Fetches an order together with its items.
    pub async fn get_order(&self, order_id: i64) -> Result<OrderDetails, ServiceError> {
        let db = &*self.db_pool;
        let order = Order::find_by_id(order_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

        let items = order
            .find_related(OrderItem)
            .order_by_asc(order_item::Column::Id)
            .all(db)
            .await?;

        Ok(OrderDetails { order, items })
    }

    /// Lists orders newest first, optionally restricted to one user.
    pub async fn list_orders(
        &self,
        user_id: Option<i64>,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<OrderModel>, u64), ServiceError> {
        let mut query = Order::find();
        if let Some(user_id) = user_id {
            query = query.filter(order::Column::UserId.eq(user_id));
        }

        let paginator = query
            .order_by_desc(order::Column::OrderDate)
            .order_by_desc(order::Column::Id)
            .paginate(&*self.db_pool, per_page);

        let total = paginator.num_items().await?;
        let orders = paginator.fetch_page(page.saturating_sub(1)).await?;

        Ok((orders, total))
    }

    /// Updates header fields of an order. The owner exclusivity rule is
    /// re-checked against the merged result so an update cannot turn a guest
    /// order into one that carries both owner variants.
    #[instrument(skip(self, input), fields(order_id = order_id))]
    pub async fn update_order(
        &self,
        order_id: i64,
        input: UpdateOrderInput,
    ) -> Result<OrderModel, ServiceError> {
        input.validate()?;

        let db = &*self.db_pool;
        let order = Order::find_by_id(order_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

        let merged_user = input.user_id.or(order.user_id);
        let merged_email = input
            .guest_email
            .clone()
            .or_else(|| order.guest_email.clone());
        let merged_phone = input
            .guest_phone
            .clone()
            .or_else(|| order.guest_phone.clone());
        let merged_name = input.guest_name.clone().or_else(|| order.guest_name.clone());
        ensure_single_owner(
            merged_user,
            merged_email.as_deref(),
            merged_phone.as_deref(),
            merged_name.as_deref(),
        )?;

        if let Some(user_id) = input.user_id {
            User::find_by_id(user_id)
                .one(db)
                .await?
                .ok_or_else(|| ServiceError::NotFound(format!("User {} not found", user_id)))?;
        }

        let mut active: order::ActiveModel = order.into();
        if let Some(user_id) = input.user_id {
            active.user_id = Set(Some(user_id));
        }
        if let Some(address) = input.shipping_address {
            active.shipping_address = Set(address);
        }
        if let Some(method) = input.payment_method {
            active.payment_method = Set(method);
        }
        if let Some(tracking) = input.tracking_number {
            active.tracking_number = Set(Some(tracking));
        }
        if let Some(email) = input.guest_email {
            active.guest_email = Set(Some(email));
        }
        if let Some(phone) = input.guest_phone {
            active.guest_phone = Set(Some(phone));
        }
        if let Some(name) = input.guest_name {
            active.guest_name = Set(Some(name));
        }

        let updated = active.update(db).await?;

        self.event_sender
            .send_or_log(Event::OrderUpdated(order_id))
            .await;

        Ok(updated)
    }

    /// Deletes an order and, through the schema cascade, its items.
    #[instrument(skip(self), fields(order_id = order_id))]
    pub async fn delete_order(&self, order_id: i64) -> Result<(), ServiceError> {
        let db = &*self.db_pool;
        let order = Order::find_by_id(order_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

        order.delete(db).await?;

        self.event_sender
            .send_or_log(Event::OrderDeleted(order_id))
            .await;

        info!(order_id = order_id, "Deleted order");
        Ok(())
    }

    /// Changes the fulfillment status of an order.
    #[instrument(skip(self), fields(order_id = order_id))]
    pub async fn update_status(
        &self,
        order_id: i64,
        status: OrderStatus,
    ) -> Result<OrderModel, ServiceError> {
        let db = &*self.db_pool;
        let order = Order::find_by_id(order_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

        let old_status = order.status;
        if old_status == status {
            return Ok(order);
        }

        let mut active: order::ActiveModel = order.into();
        active.status = Set(status);
        let updated = active.update(db).await?;

        self.event_sender
            .send_or_log(Event::OrderStatusChanged {
                order_id,
                old_status: old_status.label().to_string(),
                new_status: status.label().to_string(),
            })
            .await;

        info!(
            order_id = order_id,
            old_status = old_status.label(),
            new_status = status.label(),
            "Order status updated"
        );
        Ok(updated)
    }

    /// Adds an item to an order and recomputes the stored total in the same
    /// transaction.
    ///
    /// When no explicit `price_at_time` is supplied the variant's current
    /// price is copied as the snapshot; later variant price changes do not
    /// touch it.
    #[instrument(skip(self, input), fields(order_id = order_id, variant_id = input.variant_id))]
    pub async fn add_item(
        &self,
        order_id: i64,
        input: AddOrderItemInput,
    ) -> Result<(OrderItemModel, Decimal), ServiceError> {
        input.validate()?;
        if let Some(price) = input.price_at_time {
            ensure_non_negative_price(price)?;
        }

        let txn = self.db_pool.begin().await.map_err(|e| {
            error!(error = %e, "Failed to start transaction for order item insert");
            ServiceError::DatabaseError(e)
        })?;

        Order::find_by_id(order_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

        let variant = ProductVariant::find_by_id(input.variant_id)
            .one(&txn)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Variant {} not found", input.variant_id))
            })?;

        let price_at_time = input.price_at_time.unwrap_or(variant.price);

        let item = order_item::ActiveModel {
            order_id: Set(order_id),
            variant_id: Set(input.variant_id),
            quantity: Set(input.quantity),
            price_at_time: Set(price_at_time),
            ..Default::default()
        };
        let item = item.insert(&txn).await?;

        let (total, _) = self.recalculate_total(&txn, order_id).await?;

        txn.commit().await.map_err(|e| {
            error!(error = %e, order_id = order_id, "Failed to commit order item insert");
            ServiceError::DatabaseError(e)
        })?;

        self.event_sender
            .send_or_log(Event::OrderItemAdded {
                order_id,
                item_id: item.id,
            })
            .await;
        self.event_sender
            .send_or_log(Event::OrderTotalRecalculated { order_id, total })
            .await;

        info!(
            order_id = order_id,
            item_id = item.id,
            quantity = input.quantity,
            "Added order item"
        );
        Ok((item, total))
    }

    /// Updates the quantity or price snapshot of an order item and recomputes
    /// the stored total in the same transaction.
    #[instrument(skip(self, input), fields(order_id = order_id, item_id = item_id))]
    pub async fn update_item(
        &self,
        order_id: i64,
        item_id: i64,
        input: UpdateOrderItemInput,
    ) -> Result<(OrderItemModel, Decimal), ServiceError> {
        input.validate()?;
        if let Some(price) = input.price_at_time {
            ensure_non_negative_price(price)?;
        }

        let txn = self.db_pool.begin().await?;

        let item = OrderItem::find_by_id(item_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order item {} not found", item_id)))?;

        if item.order_id != order_id {
            return Err(ServiceError::InvalidOperation(
                "Item does not belong to this order".to_string(),
            ));
        }

        let mut active: order_item::ActiveModel = item.into();
        if let Some(quantity) = input.quantity {
            active.quantity = Set(quantity);
        }
        if let Some(price) = input.price_at_time {
            active.price_at_time = Set(price);
        }
        let item = active.update(&txn).await?;

        let (total, _) = self.recalculate_total(&txn, order_id).await?;

        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::OrderItemUpdated { order_id, item_id })
            .await;
        self.event_sender
            .send_or_log(Event::OrderTotalRecalculated { order_id, total })
            .await;

        Ok((item, total))
    }

    /// Removes an item from an order and recomputes the stored total in the
    /// same transaction.
    #[instrument(skip(self), fields(order_id = order_id, item_id = item_id))]
    pub async fn remove_item(&self, order_id: i64, item_id: i64) -> Result<Decimal, ServiceError> {
        let txn = self.db_pool.begin().await?;

        let item = OrderItem::find_by_id(item_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order item {} not found", item_id)))?;

        if item.order_id != order_id {
            return Err(ServiceError::InvalidOperation(
                "Item does not belong to this order".to_string(),
            ));
        }

        item.delete(&txn).await?;

        let (total, _) = self.recalculate_total(&txn, order_id).await?;

        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::OrderItemRemoved { order_id, item_id })
            .await;
        self.event_sender
            .send_or_log(Event::OrderTotalRecalculated { order_id, total })
            .await;

        info!(order_id = order_id, item_id = item_id, "Removed order item");
        Ok(total)
    }

    /// Recomputes the stored order total from the current item set.
    ///
    /// The total is the sum of `quantity * price_at_time` over the items
    /// (zero for an empty set). The write touches only the total column and
    /// is skipped entirely when the stored value already matches, which makes
    /// the call idempotent. Returns the computed total and whether a write
    /// happened.
    ///
    /// Callers that mutate items pass their open transaction so the item
    /// write and the total update commit together.
    pub async fn recalculate_total(
        &self,
        conn: &impl ConnectionTrait,
        order_id: i64,
    ) -> Result<(Decimal, bool), ServiceError> {
        let items = OrderItem::find()
            .filter(order_item::Column::OrderId.eq(order_id))
            .all(conn)
            .await?;

        let total: Decimal = items.iter().map(OrderItemModel::line_total).sum();

        let order = Order::find_by_id(order_id)
            .one(conn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

        if order.total_price == total {
            return Ok((total, false));
        }

        let update = order::ActiveModel {
            id: ActiveValue::Unchanged(order.id),
            total_price: Set(total),
            ..Default::default()
        };
        update.update(conn).await?;

        info!(order_id = order_id, total = %total, "Recalculated order total");
        Ok((total, true))
    }

    /// Administrative listing with filters, free-text search, and derived
    /// columns (customer display name, live item sum next to the stored
    /// total).
    #[instrument(skip(self, filter))]
    pub async fn admin_list(
        &self,
        filter: OrderAdminFilter,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<OrderAdminRow>, u64), ServiceError> {
        let db = &*self.db_pool;

        let mut query = Order::find();

        if let Some(status) = filter.status {
            query = query.filter(order::Column::Status.eq(status));
        }
        if let Some(method) = filter.payment_method {
            query = query.filter(order::Column::PaymentMethod.eq(method));
        }
        if let Some(user_id) = filter.user_id {
            query = query.filter(order::Column::UserId.eq(user_id));
        }
        if let Some(from) = filter.date_from {
            query = query.filter(
                order::Column::OrderDate
                    .gte(from.and_hms_opt(0, 0, 0).unwrap_or_default().and_utc()),
            );
        }
        if let Some(to) = filter.date_to {
            query = query.filter(
                order::Column::OrderDate
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
            let mut cond = Condition::any()
                .add(lower_like(
                    (order::Entity, order::Column::ShippingAddress),
                    &pattern,
                ))
                .add(lower_like(
                    (order::Entity, order::Column::TrackingNumber),
                    &pattern,
                ))
                .add(lower_like(
                    (order::Entity, order::Column::GuestEmail),
                    &pattern,
                ))
                .add(lower_like(
                    (order::Entity, order::Column::GuestPhone),
                    &pattern,
                ))
                .add(lower_like(
                    (order::Entity, order::Column::GuestName),
                    &pattern,
                ))
                .add(lower_like((user::Entity, user::Column::Username), &pattern))
                .add(lower_like((user::Entity, user::Column::Email), &pattern));
            if let Ok(id) = term.parse::<i64>() {
                cond = cond.add(order::Column::Id.eq(id));
            }
            query = query
                .join(JoinType::LeftJoin, order::Relation::User.def())
                .filter(cond);
        }

        let paginator = query
            .order_by_desc(order::Column::OrderDate)
            .order_by_desc(order::Column::Id)
            .paginate(db, per_page);

        let total = paginator.num_items().await?;
        let orders = paginator.fetch_page(page.saturating_sub(1)).await?;

        let order_ids: Vec<i64> = orders.iter().map(|o| o.id).collect();
        let user_ids: Vec<i64> = orders.iter().filter_map(|o| o.user_id).collect();

        let items = if order_ids.is_empty() {
            Vec::new()
        } else {
            OrderItem::find()
                .filter(order_item::Column::OrderId.is_in(order_ids))
                .all(db)
                .await?
        };
        let users: HashMap<i64, UserModel> = if user_ids.is_empty() {
            HashMap::new()
        } else {
            User::find()
                .filter(user::Column::Id.is_in(user_ids))
                .all(db)
                .await?
                .into_iter()
                .map(|u| (u.id, u))
                .collect()
        };

        let mut sums: HashMap<i64, (usize, Decimal)> = HashMap::new();
        for item in &items {
            let entry = sums.entry(item.order_id).or_insert((0, Decimal::ZERO));
            entry.0 += 1;
            entry.1 += item.line_total();
        }

        let rows = orders
            .into_iter()
            .map(|o| {
                let user = o.user_id.and_then(|id| users.get(&id));
                let customer = o.customer_name(user);
                let (item_count, items_total) =
                    sums.get(&o.id).copied().unwrap_or((0, Decimal::ZERO));
                if items_total != o.total_price {
                    warn!(
                        order_id = o.id,
                        stored = %o.total_price,
                        derived = %items_total,
                        "Stored order total out of step with item sum"
                    );
                }
                OrderAdminRow {
                    order: o,
                    customer,
                    item_count,
                    items_total,
                }
            })
            .collect();

        Ok((rows, total))
    }
}

fn ensure_single_owner(
    user_id: Option<i64>,
    guest_email: Option<&str>,
    guest_phone: Option<&str>,
    guest_name: Option<&str>,
) -> Result<(), ServiceError> {
    let has_guest = [guest_email, guest_phone, guest_name]
        .iter()
        .any(|f| f.map(|v| !v.trim().is_empty()).unwrap_or(false));
    if user_id.is_some() && has_guest {
        return Err(ServiceError::ValidationError(
            "An order belongs to either a registered user or a guest, not both".to_string(),
        ));
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

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn single_owner_rule_rejects_mixed_ownership() {
        assert!(ensure_single_owner(Some(1), Some("g@example.com"), None, None).is_err());
        assert!(ensure_single_owner(Some(1), None, None, Some("Guest")).is_err());
    }

    #[test]
    fn single_owner_rule_accepts_either_side_or_neither() {
        assert!(ensure_single_owner(Some(1), None, None, None).is_ok());
        assert!(ensure_single_owner(None, Some("g@example.com"), Some("555"), Some("G")).is_ok());
        assert!(ensure_single_owner(None, None, None, None).is_ok());
    }

    #[test]
    fn single_owner_rule_ignores_blank_guest_fields() {
        assert!(ensure_single_owner(Some(1), Some("  "), Some(""), None).is_ok());
    }

    #[test]
    fn negative_price_is_rejected() {
        assert!(ensure_non_negative_price(dec!(-0.01)).is_err());
        assert!(ensure_non_negative_price(Decimal::ZERO).is_ok());
        assert!(ensure_non_negative_price(dec!(19.99)).is_ok());
    }

    #[test]
    fn add_item_input_rejects_zero_quantity() {
        let input = AddOrderItemInput {
            variant_id: 1,
            quantity: 0,
            price_at_time: None,
        };
        assert!(input.validate().is_err());
    }
}
