//! In-process backend for offline use and tests.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use greens_auth::UnauthorizedHook;
use greens_commerce::{Cart, CartItem, Currency, Money, OrderSummary, ProductId, VoucherBook};

use crate::endpoint::Endpoint;
use crate::error::GatewayError;
use crate::gateway::{CartGateway, CartUpdate};

/// A [`CartGateway`] that keeps the cart in memory.
///
/// Behaves like the real backend: `add_to_cart` answers with the whole
/// cart (or only the added line, see [`MemoryGateway::returning_items`]),
/// vouchers are priced against the whole server-side cart, and queued
/// failures are returned in order before any real work happens.
pub struct MemoryGateway {
    cart: Mutex<Cart>,
    orders: Mutex<Vec<OrderSummary>>,
    vouchers: VoucherBook,
    failures: Mutex<VecDeque<GatewayError>>,
    latency: HashMap<Endpoint, Duration>,
    return_items: bool,
    on_unauthorized: Option<Arc<dyn UnauthorizedHook>>,
}

impl MemoryGateway {
    pub fn new(currency: Currency) -> Self {
        Self::with_cart(Cart::new(currency))
    }

    /// Start from an existing cart.
    pub fn with_cart(cart: Cart) -> Self {
        let currency = cart.currency;
        Self {
            cart: Mutex::new(cart),
            orders: Mutex::new(Vec::new()),
            vouchers: VoucherBook::builtin(currency),
            failures: Mutex::new(VecDeque::new()),
            latency: HashMap::new(),
            return_items: false,
            on_unauthorized: None,
        }
    }

    pub fn with_orders(self, orders: Vec<OrderSummary>) -> Self {
        *lock(&self.orders) = orders;
        self
    }

    pub fn with_vouchers(mut self, vouchers: VoucherBook) -> Self {
        self.vouchers = vouchers;
        self
    }

    /// Delay every call to `endpoint`.
    pub fn with_latency(mut self, endpoint: Endpoint, delay: Duration) -> Self {
        self.latency.insert(endpoint, delay);
        self
    }

    /// Answer `add_to_cart` with the added line instead of the whole cart.
    pub fn returning_items(mut self) -> Self {
        self.return_items = true;
        self
    }

    /// Called when an injected [`GatewayError::Unauthorized`] is returned.
    pub fn with_unauthorized_hook(mut self, hook: Arc<dyn UnauthorizedHook>) -> Self {
        self.on_unauthorized = Some(hook);
        self
    }

    /// Make the next call fail with `error`.
    pub fn fail_next(&self, error: GatewayError) {
        lock(&self.failures).push_back(error);
    }

    /// Current server-side cart.
    pub fn cart(&self) -> Cart {
        lock(&self.cart).clone()
    }

    async fn enter(&self, endpoint: Endpoint) -> Result<(), GatewayError> {
        if let Some(delay) = self.latency.get(&endpoint) {
            tokio::time::sleep(*delay).await;
        }

        let failure = lock(&self.failures).pop_front();
        match failure {
            None => Ok(()),
            Some(GatewayError::Unauthorized) => {
                tracing::debug!(endpoint = %endpoint, "injected 401");
                if let Some(hook) = &self.on_unauthorized {
                    hook.on_unauthorized();
                }
                Err(GatewayError::Unauthorized)
            }
            Some(error) => {
                tracing::debug!(endpoint = %endpoint, %error, "injected failure");
                Err(error)
            }
        }
    }
}

impl Default for MemoryGateway {
    fn default() -> Self {
        Self::new(Currency::default())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn rejected(error: impl std::fmt::Display) -> GatewayError {
    GatewayError::request_failed(error.to_string())
}

#[async_trait]
impl CartGateway for MemoryGateway {
    async fn fetch_cart(&self) -> Result<Cart, GatewayError> {
        self.enter(Endpoint::FetchCart).await?;
        Ok(self.cart())
    }

    async fn add_to_cart(&self, item: &CartItem) -> Result<CartUpdate, GatewayError> {
        self.enter(Endpoint::AddToCart).await?;
        let mut cart = lock(&self.cart);
        cart.add_item(item.clone()).map_err(rejected)?;

        if self.return_items {
            let line = cart
                .items
                .iter()
                .find(|line| line.same_line(item))
                .cloned()
                .ok_or_else(|| GatewayError::request_failed("added line missing"))?;
            // The added line alone, at the quantity the caller sent.
            let mut echoed = line;
            echoed.quantity = item.quantity;
            echoed.line_total = item.line_total;
            return Ok(CartUpdate::Item(echoed));
        }
        Ok(CartUpdate::Cart(cart.clone()))
    }

    async fn update_quantity(&self, id: &ProductId, quantity: i64) -> Result<Cart, GatewayError> {
        self.enter(Endpoint::UpdateQuantity).await?;
        let mut cart = lock(&self.cart);
        cart.update_quantity(id, quantity).map_err(rejected)?;
        Ok(cart.clone())
    }

    async fn remove_from_cart(&self, id: &ProductId) -> Result<Cart, GatewayError> {
        self.enter(Endpoint::RemoveFromCart).await?;
        let mut cart = lock(&self.cart);
        if cart.remove_item(id) == 0 {
            return Err(GatewayError::request_failed(format!("item not in cart: {id}")));
        }
        Ok(cart.clone())
    }

    async fn apply_voucher(&self, code: &str) -> Result<Money, GatewayError> {
        self.enter(Endpoint::ApplyVoucher).await?;
        let cart = self.cart();
        let applied = self.vouchers.evaluate(code, &cart.items).map_err(rejected)?;
        Ok(applied.discount)
    }

    async fn fetch_orders(&self) -> Result<Vec<OrderSummary>, GatewayError> {
        self.enter(Endpoint::FetchOrders).await?;
        Ok(lock(&self.orders).clone())
    }
}
