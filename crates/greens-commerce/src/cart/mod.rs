//! Shopping cart module.
//!
//! Contains the cart store, its line items and the reducer actions that
//! mutate it.

mod action;
mod cart;

pub use action::CartAction;
pub use cart::{Cart, CartItem, MAX_QUANTITY_PER_ITEM};
