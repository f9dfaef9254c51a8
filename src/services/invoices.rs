use crate::{
    db::DbPool,
    entities::{
        color::{self, Entity as Color},
        order::{Entity as Order, Model as OrderModel},
        order_item::{self, Entity as OrderItem, Model as OrderItemModel},
        product::{self, Entity as Product},
        product_variant::{self, Entity as ProductVariant},
        size::{self, Entity as Size},
        user::{Entity as User, Model as UserModel},
    },
    errors::ServiceError,
    events::{Event, EventSender},
};
use printpdf::{BuiltinFont, Mm, PdfDocument};
use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument};

/// One priced line of an invoice with everything resolved for display.
#[derive(Debug)]
struct InvoiceLine {
    product_name: String,
    variant: String,
    unit_price: Decimal,
    quantity: i32,
    line_total: Decimal,
}

/// Renders order invoices as PDF documents.
#[derive(Clone)]
pub struct InvoiceService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
}

impl InvoiceService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    /// Renders the invoice for an order: a header with the order facts, one
    /// row per item priced at its frozen snapshot, and the stored total.
    #[instrument(skip(self), fields(order_id = order_id))]
    pub async fn render_invoice(&self, order_id: i64) -> Result<Vec<u8>, ServiceError> {
        let db = &*self.db_pool;

        let order = Order::find_by_id(order_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

        let user = match order.user_id {
            Some(user_id) => User::find_by_id(user_id).one(db).await?,
            None => None,
        };

        let items = OrderItem::find()
            .filter(order_item::Column::OrderId.eq(order_id))
            .order_by_asc(order_item::Column::Id)
            .all(db)
            .await?;
        let lines = self.resolve_lines(&items).await?;

        let bytes = compose_pdf(&order, user.as_ref(), &lines)?;

        self.event_sender
            .send_or_log(Event::InvoiceRendered { order_id })
            .await;

        info!(
            order_id = order_id,
            lines = lines.len(),
            size = bytes.len(),
            "Rendered invoice PDF"
        );
        Ok(bytes)
    }

    async fn resolve_lines(
        &self,
        items: &[OrderItemModel],
    ) -> Result<Vec<InvoiceLine>, ServiceError> {
        let db = &*self.db_pool;

        let variant_ids: Vec<i64> = items.iter().map(|i| i.variant_id).collect();
        let variants: HashMap<i64, product_variant::Model> = if variant_ids.is_empty() {
            HashMap::new()
        } else {
            ProductVariant::find()
                .filter(product_variant::Column::Id.is_in(variant_ids))
                .all(db)
                .await?
                .into_iter()
                .map(|v| (v.id, v))
                .collect()
        };

        let product_ids: Vec<i64> = variants.values().map(|v| v.product_id).collect();
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

        let color_ids: Vec<i64> = variants.values().filter_map(|v| v.color_id).collect();
        let color_names: HashMap<i64, String> = if color_ids.is_empty() {
            HashMap::new()
        } else {
            Color::find()
                .filter(color::Column::Id.is_in(color_ids))
                .all(db)
                .await?
                .into_iter()
                .map(|c| (c.id, c.name))
                .collect()
        };
        let size_ids: Vec<i64> = variants.values().filter_map(|v| v.size_id).collect();
        let size_names: HashMap<i64, String> = if size_ids.is_empty() {
            HashMap::new()
        } else {
            Size::find()
                .filter(size::Column::Id.is_in(size_ids))
                .all(db)
                .await?
                .into_iter()
                .map(|s| (s.id, s.name))
                .collect()
        };

        let lines = items
            .iter()
            .map(|item| {
                let variant = variants.get(&item.variant_id);
                let product_name = variant
                    .and_then(|v| product_names.get(&v.product_id).cloned())
                    .unwrap_or_else(|| format!("Variant {}", item.variant_id));
                let descriptor = variant
                    .map(|v| {
                        variant_descriptor(
                            &v.sku,
                            v.color_id
                                .and_then(|id| color_names.get(&id))
                                .map(String::as_str),
                            v.size_id
                                .and_then(|id| size_names.get(&id))
                                .map(String::as_str),
                        )
                    })
                    .unwrap_or_default();
                InvoiceLine {
                    product_name,
                    variant: descriptor,
                    unit_price: item.price_at_time,
                    quantity: item.quantity,
                    line_total: item.line_total(),
                }
            })
            .collect();
        Ok(lines)
    }
}

/// "Color / Size" when both are set, one of them when only one is, the SKU
/// when the variant has neither.
fn variant_descriptor(sku: &str, color: Option<&str>, size: Option<&str>) -> String {
    match (color, size) {
        (Some(color), Some(size)) => format!("{} / {}", color, size),
        (Some(color), None) => color.to_string(),
        (None, Some(size)) => size.to_string(),
        (None, None) => sku.to_string(),
    }
}

fn compose_pdf(
    order: &OrderModel,
    user: Option<&UserModel>,
    lines: &[InvoiceLine],
) -> Result<Vec<u8>, ServiceError> {
    let (doc, page, layer) = PdfDocument::new(
        format!("Invoice {}", order.id),
        Mm(210.0),
        Mm(297.0),
        "Layer 1",
    );
    let font = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(|e| ServiceError::DocumentError(e.to_string()))?;
    let bold = doc
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(|e| ServiceError::DocumentError(e.to_string()))?;

    let mut layer_ref = doc.get_page(page).get_layer(layer);
    let mut y = 277.0;

    layer_ref.use_text(
        format!("Invoice #{}", order.id),
        18.0,
        Mm(20.0),
        Mm(y),
        &bold,
    );
    y -= 12.0;

    let header = [
        format!("Date: {}", order.order_date.format("%Y-%m-%d %H:%M")),
        format!("Customer: {}", order.customer_name(user)),
        format!("Status: {}", order.status.label()),
        format!("Payment method: {}", order.payment_method.label()),
        format!(
            "Shipping address: {}",
            order.shipping_address.replace('\n', ", ")
        ),
    ];
    for line in &header {
        layer_ref.use_text(line.clone(), 11.0, Mm(20.0), Mm(y), &font);
        y -= 6.0;
    }
    y -= 6.0;

    layer_ref.use_text("Product", 10.0, Mm(20.0), Mm(y), &bold);
    layer_ref.use_text("Variant", 10.0, Mm(85.0), Mm(y), &bold);
    layer_ref.use_text("Unit price", 10.0, Mm(130.0), Mm(y), &bold);
    layer_ref.use_text("Qty", 10.0, Mm(158.0), Mm(y), &bold);
    layer_ref.use_text("Line total", 10.0, Mm(172.0), Mm(y), &bold);
    y -= 7.0;

    for line in lines {
        if y < 25.0 {
            let (next_page, next_layer) = doc.add_page(Mm(210.0), Mm(297.0), "Layer 1");
            layer_ref = doc.get_page(next_page).get_layer(next_layer);
            y = 277.0;
        }
        layer_ref.use_text(line.product_name.clone(), 10.0, Mm(20.0), Mm(y), &font);
        layer_ref.use_text(line.variant.clone(), 10.0, Mm(85.0), Mm(y), &font);
        layer_ref.use_text(line.unit_price.to_string(), 10.0, Mm(130.0), Mm(y), &font);
        layer_ref.use_text(line.quantity.to_string(), 10.0, Mm(158.0), Mm(y), &font);
        layer_ref.use_text(line.line_total.to_string(), 10.0, Mm(172.0), Mm(y), &font);
        y -= 6.0;
    }

    y -= 8.0;
    layer_ref.use_text(
        format!("Total: {}", order.total_price),
        12.0,
        Mm(130.0),
        Mm(y),
        &bold,
    );

    doc.save_to_bytes()
        .map_err(|e| ServiceError::DocumentError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::order::{OrderStatus, PaymentMethod};
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn order() -> OrderModel {
        OrderModel {
            id: 42,
            user_id: None,
            order_date: Utc::now(),
            status: OrderStatus::Processing,
            total_price: dec!(2598.00),
            shipping_address: "1 Main St\nSpringfield".to_string(),
            payment_method: PaymentMethod::CardOnline,
            tracking_number: None,
            guest_email: Some("guest@example.com".to_string()),
            guest_phone: None,
            guest_name: Some("Sam Guest".to_string()),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn descriptor_prefers_color_and_size_over_sku() {
        assert_eq!(
            variant_descriptor("SKU-1", Some("Black"), Some("256GB")),
            "Black / 256GB"
        );
        assert_eq!(variant_descriptor("SKU-1", Some("Black"), None), "Black");
        assert_eq!(variant_descriptor("SKU-1", None, Some("256GB")), "256GB");
        assert_eq!(variant_descriptor("SKU-1", None, None), "SKU-1");
    }

    #[test]
    fn composed_pdf_is_nonempty_and_starts_with_magic() {
        let lines = vec![
            InvoiceLine {
                product_name: "Gamma 12".to_string(),
                variant: "Black / 256GB".to_string(),
                unit_price: dec!(1299.00),
                quantity: 2,
                line_total: dec!(2598.00),
            },
        ];
        let bytes = compose_pdf(&order(), None, &lines).expect("pdf should render");
        assert!(bytes.starts_with(b"%PDF"));
        assert!(bytes.len() > 500);
    }

    #[test]
    fn empty_orders_still_render() {
        let bytes = compose_pdf(&order(), None, &[]).expect("pdf should render");
        assert!(bytes.starts_with(b"%PDF"));
    }
}
