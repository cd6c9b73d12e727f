//! Cart and line item types.

use super::CartAction;
use crate::error::CommerceError;
use crate::ids::ProductId;
use crate::money::{Currency, Money};
use serde::{Deserialize, Serialize};

/// Maximum quantity allowed per line item.
pub const MAX_QUANTITY_PER_ITEM: i64 = 9999;

/// A shopping cart.
///
/// `total` always equals the sum of the line totals. It is recomputed from
/// the items after every mutation and never adjusted incrementally.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Cart {
    /// Items in insertion order.
    pub items: Vec<CartItem>,
    /// Sum of all line totals.
    pub total: Money,
    /// Cart currency.
    pub currency: Currency,
}

impl Cart {
    /// Create an empty cart.
    pub fn new(currency: Currency) -> Self {
        Self {
            items: Vec::new(),
            total: Money::zero(currency),
            currency,
        }
    }

    /// Build a cart from items received from elsewhere (e.g. the backend).
    ///
    /// Line totals and the cart total are recomputed locally.
    pub fn from_items(currency: Currency, items: Vec<CartItem>) -> Result<Self, CommerceError> {
        let mut cart = Self::new(currency);
        cart.replace(items)?;
        Ok(cart)
    }

    /// Add an item to the cart.
    ///
    /// An item with the same product id and the same variant (color and
    /// size) as an existing line is merged into it by summing quantities.
    /// A different variant of the same product becomes a separate line.
    pub fn add_item(&mut self, item: CartItem) -> Result<(), CommerceError> {
        item.validate()?;
        self.ensure_currency(&item.unit_price)?;

        let mut items = self.items.clone();
        if let Some(existing) = items.iter_mut().find(|i| i.same_line(&item)) {
            let quantity = existing
                .quantity
                .checked_add(item.quantity)
                .ok_or(CommerceError::Overflow)?;
            existing.set_quantity(quantity)?;
        } else {
            items.push(item);
        }
        self.commit(items)
    }

    /// Remove every line for a product, whatever its variant.
    ///
    /// Returns the number of lines removed.
    pub fn remove_item(&mut self, id: &ProductId) -> usize {
        let before = self.items.len();
        self.items.retain(|i| &i.id != id);
        let removed = before - self.items.len();
        if removed > 0 {
            // Dropping lines can only shrink the sum, so this cannot overflow.
            self.total = self.sum_lines(&self.items).unwrap_or(Money::zero(self.currency));
        }
        removed
    }

    /// Set the quantity on every line for a product.
    ///
    /// Fails with `InvalidQuantity` for zero or negative quantities; use
    /// [`Cart::remove_item`] to drop a product.
    pub fn update_quantity(&mut self, id: &ProductId, quantity: i64) -> Result<(), CommerceError> {
        check_quantity(quantity)?;

        let mut items = self.items.clone();
        let mut matched = false;
        for item in items.iter_mut().filter(|i| &i.id == id) {
            item.set_quantity(quantity)?;
            matched = true;
        }
        if !matched {
            return Err(CommerceError::ItemNotInCart(id.to_string()));
        }
        self.commit(items)
    }

    /// Clear all items from the cart.
    pub fn clear(&mut self) {
        self.items.clear();
        self.total = Money::zero(self.currency);
    }

    /// Replace the contents with another item list, recomputing every total.
    pub fn replace(&mut self, items: Vec<CartItem>) -> Result<(), CommerceError> {
        let mut normalized = Vec::with_capacity(items.len());
        for mut item in items {
            item.validate()?;
            self.ensure_currency(&item.unit_price)?;
            let quantity = item.quantity;
            item.set_quantity(quantity)?;
            normalized.push(item);
        }
        self.commit(normalized)
    }

    /// Apply a reducer action.
    pub fn apply(&mut self, action: CartAction) -> Result<(), CommerceError> {
        tracing::debug!(action = action.name(), "applying cart action");
        match action {
            CartAction::Add(item) => self.add_item(item),
            CartAction::Remove(id) => {
                self.remove_item(&id);
                Ok(())
            }
            CartAction::UpdateQuantity { id, quantity } => self.update_quantity(&id, quantity),
            CartAction::Clear => {
                self.clear();
                Ok(())
            }
            CartAction::Replace(items) => self.replace(items),
        }
    }

    /// Lines whose product id is in `ids`, in cart order.
    pub fn selected(&self, ids: &[ProductId]) -> Vec<CartItem> {
        self.items
            .iter()
            .filter(|i| ids.contains(&i.id))
            .cloned()
            .collect()
    }

    /// Subtotal of the lines whose product id is in `ids`.
    pub fn subtotal_of(&self, ids: &[ProductId]) -> Result<Money, CommerceError> {
        Money::try_sum(
            self.items
                .iter()
                .filter(|i| ids.contains(&i.id))
                .map(|i| &i.line_total),
            self.currency,
        )
    }

    /// Get total item count (sum of quantities).
    pub fn item_count(&self) -> i64 {
        self.items.iter().map(|i| i.quantity).sum()
    }

    /// Check if cart is empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Get the first line for a product.
    pub fn get_item(&self, id: &ProductId) -> Option<&CartItem> {
        self.items.iter().find(|i| &i.id == id)
    }

    fn commit(&mut self, items: Vec<CartItem>) -> Result<(), CommerceError> {
        let total = self.sum_lines(&items)?;
        self.items = items;
        self.total = total;
        Ok(())
    }

    fn sum_lines(&self, items: &[CartItem]) -> Result<Money, CommerceError> {
        Money::try_sum(items.iter().map(|i| &i.line_total), self.currency)
    }

    fn ensure_currency(&self, price: &Money) -> Result<(), CommerceError> {
        if price.currency != self.currency {
            return Err(CommerceError::CurrencyMismatch {
                expected: self.currency.code().to_string(),
                got: price.currency.code().to_string(),
            });
        }
        Ok(())
    }
}

impl Default for Cart {
    fn default() -> Self {
        Self::new(Currency::default())
    }
}

/// A line item in the cart.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    /// Product being purchased.
    pub id: ProductId,
    /// Product name (denormalized for display).
    pub name: String,
    /// Unit price.
    pub unit_price: Money,
    /// Quantity.
    pub quantity: i64,
    /// `unit_price * quantity`.
    pub line_total: Money,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    /// Image URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl CartItem {
    /// Create a new line item.
    pub fn new(
        id: impl Into<ProductId>,
        name: impl Into<String>,
        unit_price: Money,
        quantity: i64,
    ) -> Result<Self, CommerceError> {
        check_quantity(quantity)?;
        let line_total = unit_price.try_multiply(quantity)?;
        Ok(Self {
            id: id.into(),
            name: name.into(),
            unit_price,
            quantity,
            line_total,
            color: None,
            size: None,
            image: None,
        })
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    pub fn with_size(mut self, size: impl Into<String>) -> Self {
        self.size = Some(size.into());
        self
    }

    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }

    /// Whether two items describe the same cart line (product and variant).
    pub fn same_line(&self, other: &CartItem) -> bool {
        self.id == other.id && self.color == other.color && self.size == other.size
    }

    fn set_quantity(&mut self, quantity: i64) -> Result<(), CommerceError> {
        check_quantity(quantity)?;
        self.line_total = self.unit_price.try_multiply(quantity)?;
        self.quantity = quantity;
        Ok(())
    }

    fn validate(&self) -> Result<(), CommerceError> {
        check_quantity(self.quantity)?;
        if self.unit_price.is_negative() {
            return Err(CommerceError::InvalidPrice(self.id.to_string()));
        }
        Ok(())
    }
}

fn check_quantity(quantity: i64) -> Result<(), CommerceError> {
    if quantity <= 0 {
        return Err(CommerceError::InvalidQuantity(quantity));
    }
    if quantity > MAX_QUANTITY_PER_ITEM {
        return Err(CommerceError::QuantityExceedsLimit(
            quantity,
            MAX_QUANTITY_PER_ITEM,
        ));
    }
    Ok(())
}
