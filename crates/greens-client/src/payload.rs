//! Wire payloads exchanged with the backend.
//!
//! The backend speaks decimal prices and camelCase keys; these types convert
//! to and from the cents-based domain types at the boundary.

use chrono::{DateTime, NaiveDate};
use greens_commerce::{Cart, CartItem, CommerceError, Currency, Money, OrderSummary, ProductId};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::GatewayError;

/// One cart line as the backend sends it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItemPayload {
    #[serde(alias = "_id", alias = "productId", deserialize_with = "flexible_id")]
    pub id: String,
    pub name: String,
    pub price: f64,
    pub quantity: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl CartItemPayload {
    pub fn from_item(item: &CartItem) -> Self {
        Self {
            id: item.id.to_string(),
            name: item.name.clone(),
            price: item.unit_price.to_decimal(),
            quantity: item.quantity,
            color: item.color.clone(),
            size: item.size.clone(),
            image: item.image.clone(),
        }
    }

    pub fn into_item(self, currency: Currency) -> Result<CartItem, CommerceError> {
        let price = Money::from_decimal(self.price, currency)?;
        let mut item = CartItem::new(self.id, self.name, price, self.quantity)?;
        item.color = self.color;
        item.size = self.size;
        item.image = self.image;
        Ok(item)
    }
}

/// The cart as the backend sends it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CartPayload {
    #[serde(default)]
    pub items: Vec<CartItemPayload>,
    /// Server-computed total. Only compared against, never trusted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<f64>,
}

impl CartPayload {
    pub fn from_cart(cart: &Cart) -> Self {
        Self {
            items: cart.items.iter().map(CartItemPayload::from_item).collect(),
            total: Some(cart.total.to_decimal()),
        }
    }

    /// Convert to a cart with locally recomputed totals.
    pub fn into_cart(self, currency: Currency) -> Result<Cart, CommerceError> {
        let server_total = self.total;
        let items = self
            .items
            .into_iter()
            .map(|i| i.into_item(currency))
            .collect::<Result<Vec<_>, _>>()?;
        let cart = Cart::from_items(currency, items)?;

        if let Some(server_total) = server_total {
            let server_total = Money::from_decimal(server_total, currency)?;
            if server_total != cart.total {
                tracing::warn!(
                    server = %server_total,
                    computed = %cart.total,
                    "backend cart total disagrees with line totals"
                );
            }
        }
        Ok(cart)
    }
}

/// `POST /cart/add` answers with either the whole cart or the added line.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum AddResponse {
    Item(CartItemPayload),
    Cart(CartPayload),
}

#[derive(Debug, Serialize)]
pub(crate) struct AddToCartBody {
    pub product: CartItemPayload,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct UpdateQuantityBody<'a> {
    pub product_id: &'a ProductId,
    pub quantity: i64,
}

#[derive(Debug, Serialize)]
pub(crate) struct VoucherBody<'a> {
    pub code: &'a str,
}

/// `POST /cart/voucher` response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoucherResponse {
    pub discount: f64,
}

/// One row of `GET /orders/`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderPayload {
    #[serde(alias = "_id", deserialize_with = "flexible_id")]
    pub id: String,
    /// `YYYY-MM-DD` or an RFC 3339 timestamp.
    pub date: String,
    pub amount: f64,
}

impl OrderPayload {
    pub fn into_summary(self, currency: Currency) -> Result<OrderSummary, GatewayError> {
        let date = parse_order_date(&self.date).ok_or_else(|| {
            GatewayError::request_failed(format!("invalid order date: {}", self.date))
        })?;
        let amount = Money::from_decimal(self.amount, currency)?;
        Ok(OrderSummary::new(self.id, date, amount))
    }
}

fn parse_order_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.date_naive())
        .or_else(|_| NaiveDate::parse_from_str(raw, "%Y-%m-%d"))
        .ok()
}

/// Accept ids sent as either strings or numbers.
fn flexible_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Number(i64),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(s) => s,
        RawId::Number(n) => n.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cart_payload_to_cart() {
        let payload: CartPayload = serde_json::from_str(
            r#"{"items":[
                {"id":1,"name":"Kale","price":199,"quantity":2,"color":"green"},
                {"_id":"chard","name":"Chard","price":150,"quantity":2}
            ],"total":698}"#,
        )
        .unwrap();
        let cart = payload.into_cart(Currency::USD).unwrap();
        assert_eq!(cart.items[0].id.as_str(), "1");
        assert_eq!(cart.items[0].color.as_deref(), Some("green"));
        assert_eq!(cart.total.amount_cents, 69800);
    }

    #[test]
    fn test_server_total_is_not_trusted() {
        let payload: CartPayload = serde_json::from_str(
            r#"{"items":[{"id":"k","name":"Kale","price":1.5,"quantity":3}],"total":999}"#,
        )
        .unwrap();
        let cart = payload.into_cart(Currency::USD).unwrap();
        assert_eq!(cart.total.amount_cents, 450);
    }

    #[test]
    fn test_add_response_variants() {
        let item: AddResponse =
            serde_json::from_str(r#"{"id":"k","name":"Kale","price":1,"quantity":1}"#).unwrap();
        assert!(matches!(item, AddResponse::Item(_)));

        let cart: AddResponse = serde_json::from_str(r#"{"items":[],"total":0}"#).unwrap();
        assert!(matches!(cart, AddResponse::Cart(_)));
    }

    #[test]
    fn test_update_body_shape() {
        let id = ProductId::new("kale");
        let body = serde_json::to_value(UpdateQuantityBody {
            product_id: &id,
            quantity: 3,
        })
        .unwrap();
        assert_eq!(body, serde_json::json!({"productId":"kale","quantity":3}));
    }

    #[test]
    fn test_order_payload_dates() {
        let order: OrderPayload =
            serde_json::from_str(r#"{"id":7,"date":"2024-03-02T10:15:00Z","amount":24.5}"#)
                .unwrap();
        let summary = order.into_summary(Currency::USD).unwrap();
        assert_eq!(summary.date, NaiveDate::from_ymd_opt(2024, 3, 2).unwrap());
        assert_eq!(summary.amount.amount_cents, 2450);

        let plain = OrderPayload {
            id: "o1".into(),
            date: "2024-01-15".into(),
            amount: 1.0,
        };
        assert!(plain.into_summary(Currency::USD).is_ok());

        let bad = OrderPayload {
            id: "o2".into(),
            date: "last tuesday".into(),
            amount: 1.0,
        };
        assert!(matches!(
            bad.into_summary(Currency::USD),
            Err(GatewayError::RequestFailed(_))
        ));
    }
}
