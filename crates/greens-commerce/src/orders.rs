//! Order history and seller dashboard summaries.

use crate::error::CommerceError;
use crate::ids::OrderId;
use crate::money::{Currency, Money};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One row of the order history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderSummary {
    pub id: OrderId,
    /// Day the order was placed.
    pub date: NaiveDate,
    /// Amount charged.
    pub amount: Money,
}

impl OrderSummary {
    pub fn new(id: impl Into<OrderId>, date: NaiveDate, amount: Money) -> Self {
        Self {
            id: id.into(),
            date,
            amount,
        }
    }
}

/// Aggregate figures shown on the seller dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderStats {
    pub order_count: usize,
    pub revenue: Money,
    /// Revenue divided by order count, rounded to the nearest cent.
    pub average_order: Money,
    pub first_order: Option<NaiveDate>,
    pub last_order: Option<NaiveDate>,
}

impl OrderStats {
    /// Summarize a list of orders. An empty list yields zero figures.
    pub fn from_orders(orders: &[OrderSummary], currency: Currency) -> Result<Self, CommerceError> {
        let revenue = Money::try_sum(orders.iter().map(|o| &o.amount), currency)?;

        let average_order = if orders.is_empty() {
            Money::zero(currency)
        } else {
            let count = orders.len() as f64;
            Money::new((revenue.amount_cents as f64 / count).round() as i64, currency)
        };

        Ok(Self {
            order_count: orders.len(),
            revenue,
            average_order,
            first_order: orders.iter().map(|o| o.date).min(),
            last_order: orders.iter().map(|o| o.date).max(),
        })
    }
}

/// Revenue per calendar month, keyed by `(year, month)`.
pub fn monthly_revenue(
    orders: &[OrderSummary],
    currency: Currency,
) -> Result<BTreeMap<(i32, u32), Money>, CommerceError> {
    let mut months: BTreeMap<(i32, u32), Money> = BTreeMap::new();
    for order in orders {
        let key = (order.date.year(), order.date.month());
        let entry = months.entry(key).or_insert_with(|| Money::zero(currency));
        *entry = entry.try_add(&order.amount)?;
    }
    Ok(months)
}
