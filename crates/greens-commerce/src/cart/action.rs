//! Reducer actions for the cart.

use crate::cart::CartItem;
use crate::ids::ProductId;
use serde::{Deserialize, Serialize};

/// A state transition on a [`Cart`](crate::cart::Cart).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum CartAction {
    /// Add a line, merging with an identical product variant.
    Add(CartItem),
    /// Remove every line for a product.
    Remove(ProductId),
    /// Set the quantity for a product.
    UpdateQuantity { id: ProductId, quantity: i64 },
    /// Empty the cart.
    Clear,
    /// Replace the contents with a server payload.
    Replace(Vec<CartItem>),
}

impl CartAction {
    /// Short name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            CartAction::Add(_) => "add",
            CartAction::Remove(_) => "remove",
            CartAction::UpdateQuantity { .. } => "update_quantity",
            CartAction::Clear => "clear",
            CartAction::Replace(_) => "replace",
        }
    }
}
