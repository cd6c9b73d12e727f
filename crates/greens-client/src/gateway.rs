//! The backend boundary as seen by the cart store.

use async_trait::async_trait;
use greens_commerce::{Cart, CartItem, Money, OrderSummary, ProductId};

use crate::error::GatewayError;

/// What `add_to_cart` got back.
#[derive(Debug, Clone, PartialEq)]
pub enum CartUpdate {
    /// The full cart after the add.
    Cart(Cart),
    /// Only the added line; the caller merges it locally.
    Item(CartItem),
}

/// Remote cart operations.
///
/// Every call may fail. Implementations make no promise about ordering
/// between concurrent calls; callers that care sequence the responses
/// themselves (see [`CartStore`](crate::CartStore)).
#[async_trait]
pub trait CartGateway: Send + Sync {
    async fn fetch_cart(&self) -> Result<Cart, GatewayError>;

    async fn add_to_cart(&self, item: &CartItem) -> Result<CartUpdate, GatewayError>;

    async fn update_quantity(&self, id: &ProductId, quantity: i64) -> Result<Cart, GatewayError>;

    async fn remove_from_cart(&self, id: &ProductId) -> Result<Cart, GatewayError>;

    /// Ask the backend to price a voucher against the server-side cart.
    async fn apply_voucher(&self, code: &str) -> Result<Money, GatewayError>;

    async fn fetch_orders(&self) -> Result<Vec<OrderSummary>, GatewayError>;
}

#[async_trait]
impl<G: CartGateway + ?Sized> CartGateway for std::sync::Arc<G> {
    async fn fetch_cart(&self) -> Result<Cart, GatewayError> {
        (**self).fetch_cart().await
    }

    async fn add_to_cart(&self, item: &CartItem) -> Result<CartUpdate, GatewayError> {
        (**self).add_to_cart(item).await
    }

    async fn update_quantity(&self, id: &ProductId, quantity: i64) -> Result<Cart, GatewayError> {
        (**self).update_quantity(id, quantity).await
    }

    async fn remove_from_cart(&self, id: &ProductId) -> Result<Cart, GatewayError> {
        (**self).remove_from_cart(id).await
    }

    async fn apply_voucher(&self, code: &str) -> Result<Money, GatewayError> {
        (**self).apply_voucher(code).await
    }

    async fn fetch_orders(&self) -> Result<Vec<OrderSummary>, GatewayError> {
        (**self).fetch_orders().await
    }
}
