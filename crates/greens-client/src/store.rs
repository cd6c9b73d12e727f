//! Client-side cart state fed by gateway responses.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use greens_commerce::{
    Cart, CartAction, CartItem, CommerceError, Currency, Money, OrderSummary, ProductId,
};

use crate::error::GatewayError;
use crate::gateway::{CartGateway, CartUpdate};

struct StoreState {
    cart: Cart,
    /// Ticket of the newest response applied so far.
    applied: u64,
    /// Newest failure and the ticket of the call that produced it.
    last_error: Option<(u64, GatewayError)>,
}

impl StoreState {
    fn fail(&mut self, ticket: u64, error: &GatewayError) {
        let newer = ticket > self.applied
            && self.last_error.as_ref().map_or(true, |(at, _)| *at < ticket);
        if newer {
            self.last_error = Some((ticket, error.clone()));
        }
    }

    fn succeed(&mut self, ticket: u64) {
        if self.last_error.as_ref().is_some_and(|(at, _)| *at < ticket) {
            self.last_error = None;
        }
    }
}

enum Settled {
    Current(Cart),
    /// A line the backend committed arrived after a newer snapshot was applied.
    StaleDelta,
}

/// The storefront's cart.
///
/// Every remote call takes a ticket when it starts. A full cart response is
/// applied only if no response with a newer ticket has been applied already,
/// so a slow fetch never overwrites the result of a later mutation. A lone
/// line that arrives late cannot be placed against the newer state and
/// triggers a reload instead.
pub struct CartStore<G> {
    gateway: G,
    issued: AtomicU64,
    state: Mutex<StoreState>,
}

impl<G: CartGateway> CartStore<G> {
    pub fn new(gateway: G, currency: Currency) -> Self {
        Self {
            gateway,
            issued: AtomicU64::new(0),
            state: Mutex::new(StoreState {
                cart: Cart::new(currency),
                applied: 0,
                last_error: None,
            }),
        }
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    /// Current cart.
    pub fn snapshot(&self) -> Cart {
        self.lock().cart.clone()
    }

    /// The most recent gateway failure, cleared by a later success.
    pub fn last_error(&self) -> Option<GatewayError> {
        self.lock().last_error.as_ref().map(|(_, e)| e.clone())
    }

    /// Reload the cart from the backend.
    pub async fn refresh(&self) -> Result<Cart, GatewayError> {
        let ticket = self.ticket();
        let result = self.gateway.fetch_cart().await;
        self.settle_cart(ticket, "fetch", result)
    }

    pub async fn add(&self, item: CartItem) -> Result<Cart, GatewayError> {
        let ticket = self.ticket();
        let result = self.gateway.add_to_cart(&item).await;
        match self.settle(ticket, "add", result)? {
            Settled::Current(cart) => Ok(cart),
            Settled::StaleDelta => self.refresh().await,
        }
    }

    pub async fn update_quantity(
        &self,
        id: &ProductId,
        quantity: i64,
    ) -> Result<Cart, GatewayError> {
        let ticket = self.ticket();
        let result = self.gateway.update_quantity(id, quantity).await;
        self.settle_cart(ticket, "update", result)
    }

    pub async fn remove(&self, id: &ProductId) -> Result<Cart, GatewayError> {
        let ticket = self.ticket();
        let result = self.gateway.remove_from_cart(id).await;
        self.settle_cart(ticket, "remove", result)
    }

    /// Empty the local cart. Responses still in flight become stale.
    pub fn clear(&self) {
        let ticket = self.ticket();
        let mut state = self.lock();
        state.cart.clear();
        state.applied = ticket;
    }

    /// Apply a local mutation. Responses still in flight become stale.
    ///
    /// A rejected action leaves the cart and the in-flight responses alone.
    pub fn dispatch(&self, action: CartAction) -> Result<Cart, CommerceError> {
        let ticket = self.ticket();
        let mut state = self.lock();
        state.cart.apply(action)?;
        state.applied = ticket;
        Ok(state.cart.clone())
    }

    /// Have the backend price a voucher against its own copy of the cart.
    pub async fn apply_voucher_remote(&self, code: &str) -> Result<Money, GatewayError> {
        let ticket = self.ticket();
        let result = self.gateway.apply_voucher(code).await;
        self.record(ticket, &result);
        result
    }

    pub async fn orders(&self) -> Result<Vec<OrderSummary>, GatewayError> {
        let ticket = self.ticket();
        let result = self.gateway.fetch_orders().await;
        self.record(ticket, &result);
        result
    }

    fn ticket(&self) -> u64 {
        self.issued.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn settle_cart(
        &self,
        ticket: u64,
        op: &'static str,
        result: Result<Cart, GatewayError>,
    ) -> Result<Cart, GatewayError> {
        match self.settle(ticket, op, result.map(CartUpdate::Cart))? {
            Settled::Current(cart) => Ok(cart),
            // Only item responses come back as deltas.
            Settled::StaleDelta => Ok(self.snapshot()),
        }
    }

    fn settle(
        &self,
        ticket: u64,
        op: &'static str,
        result: Result<CartUpdate, GatewayError>,
    ) -> Result<Settled, GatewayError> {
        let mut state = self.lock();
        let update = match result {
            Ok(update) => update,
            Err(e) => {
                tracing::warn!(op, ticket, error = %e, "cart request failed");
                state.fail(ticket, &e);
                return Err(e);
            }
        };

        if ticket <= state.applied {
            tracing::debug!(op, ticket, applied = state.applied, "stale cart response");
            state.succeed(ticket);
            return Ok(match update {
                CartUpdate::Cart(_) => Settled::Current(state.cart.clone()),
                CartUpdate::Item(_) => Settled::StaleDelta,
            });
        }

        match update {
            CartUpdate::Cart(cart) => state.cart = cart,
            CartUpdate::Item(item) => {
                if let Err(e) = state.cart.apply(CartAction::Add(item)) {
                    let e = GatewayError::request_failed(e.to_string());
                    state.fail(ticket, &e);
                    return Err(e);
                }
            }
        }
        state.applied = ticket;
        state.succeed(ticket);
        tracing::debug!(op, ticket, total = %state.cart.total, "cart updated");
        Ok(Settled::Current(state.cart.clone()))
    }

    fn record<T>(&self, ticket: u64, result: &Result<T, GatewayError>) {
        let mut state = self.lock();
        match result {
            Ok(_) => state.succeed(ticket),
            Err(e) => state.fail(ticket, e),
        }
    }

    fn lock(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::endpoint::Endpoint;
    use crate::memory::MemoryGateway;

    fn usd(cents: i64) -> Money {
        Money::new(cents, Currency::USD)
    }

    fn item(id: &str, cents: i64, qty: i64) -> CartItem {
        CartItem::new(id, id, usd(cents), qty).unwrap()
    }

    fn cart_of(items: Vec<CartItem>) -> Cart {
        Cart::from_items(Currency::USD, items).unwrap()
    }

    /// Answers every call with a fixed result after a per-call delay.
    struct Canned {
        fetch: (Duration, Result<Cart, GatewayError>),
        add: (Duration, Result<Cart, GatewayError>),
    }

    #[async_trait]
    impl CartGateway for Canned {
        async fn fetch_cart(&self) -> Result<Cart, GatewayError> {
            tokio::time::sleep(self.fetch.0).await;
            self.fetch.1.clone()
        }

        async fn add_to_cart(&self, _item: &CartItem) -> Result<CartUpdate, GatewayError> {
            tokio::time::sleep(self.add.0).await;
            self.add.1.clone().map(CartUpdate::Cart)
        }

        async fn update_quantity(&self, _: &ProductId, _: i64) -> Result<Cart, GatewayError> {
            Err(GatewayError::request_failed("unsupported"))
        }

        async fn remove_from_cart(&self, _: &ProductId) -> Result<Cart, GatewayError> {
            Err(GatewayError::request_failed("unsupported"))
        }

        async fn apply_voucher(&self, _: &str) -> Result<Money, GatewayError> {
            Err(GatewayError::request_failed("unsupported"))
        }

        async fn fetch_orders(&self) -> Result<Vec<OrderSummary>, GatewayError> {
            Ok(Vec::new())
        }
    }

    /// Commits adds server-side and answers with the added line only.
    struct Deltas {
        server: Mutex<Cart>,
        latency: HashMap<&'static str, Duration>,
    }

    impl Deltas {
        fn new(latency: &[(&'static str, u64)]) -> Self {
            Self {
                server: Mutex::new(Cart::new(Currency::USD)),
                latency: latency
                    .iter()
                    .map(|(id, ms)| (*id, Duration::from_millis(*ms)))
                    .collect(),
            }
        }
    }

    #[async_trait]
    impl CartGateway for Deltas {
        async fn fetch_cart(&self) -> Result<Cart, GatewayError> {
            Ok(self.server.lock().unwrap().clone())
        }

        async fn add_to_cart(&self, item: &CartItem) -> Result<CartUpdate, GatewayError> {
            let delay = self.latency.get(item.id.as_str()).copied().unwrap_or_default();
            tokio::time::sleep(delay).await;
            self.server.lock().unwrap().add_item(item.clone()).unwrap();
            Ok(CartUpdate::Item(item.clone()))
        }

        async fn update_quantity(&self, _: &ProductId, _: i64) -> Result<Cart, GatewayError> {
            Err(GatewayError::request_failed("unsupported"))
        }

        async fn remove_from_cart(&self, _: &ProductId) -> Result<Cart, GatewayError> {
            Err(GatewayError::request_failed("unsupported"))
        }

        async fn apply_voucher(&self, _: &str) -> Result<Money, GatewayError> {
            Err(GatewayError::request_failed("unsupported"))
        }

        async fn fetch_orders(&self) -> Result<Vec<OrderSummary>, GatewayError> {
            Ok(Vec::new())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_fetch_does_not_overwrite_newer_add() {
        let gateway = Canned {
            fetch: (Duration::from_millis(300), Ok(cart_of(Vec::new()))),
            add: (Duration::from_millis(10), Ok(cart_of(vec![item("kale", 199, 1)]))),
        };
        let store = CartStore::new(gateway, Currency::USD);

        let (fetched, added) = tokio::join!(store.refresh(), store.add(item("kale", 199, 1)));
        assert_eq!(added.unwrap().total, usd(199));
        // The fetch started first, so its empty cart is dropped.
        assert_eq!(fetched.unwrap().total, usd(199));
        assert_eq!(store.snapshot().items.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_newer_fetch_wins_over_older_add() {
        let gateway = Canned {
            fetch: (Duration::from_millis(10), Ok(cart_of(vec![item("chard", 150, 2)]))),
            add: (Duration::from_millis(300), Ok(cart_of(vec![item("kale", 199, 1)]))),
        };
        let store = CartStore::new(gateway, Currency::USD);

        let (_added, _fetched) = tokio::join!(store.add(item("kale", 199, 1)), store.refresh());
        assert_eq!(store.snapshot().total, usd(300));
    }

    #[tokio::test]
    async fn test_mutations_through_memory_gateway() {
        let store = CartStore::new(MemoryGateway::default(), Currency::USD);
        store.add(item("kale", 199, 2)).await.unwrap();
        store.add(item("chard", 150, 2)).await.unwrap();
        assert_eq!(store.snapshot().total, usd(698));

        store.update_quantity(&"kale".into(), 1).await.unwrap();
        assert_eq!(store.snapshot().total, usd(499));

        store.remove(&"chard".into()).await.unwrap();
        assert_eq!(store.snapshot().total, usd(199));
    }

    #[tokio::test]
    async fn test_item_responses_are_merged_locally() {
        let store = CartStore::new(MemoryGateway::default().returning_items(), Currency::USD);
        store.add(item("kale", 199, 2)).await.unwrap();
        let cart = store.add(item("kale", 199, 1)).await.unwrap();
        assert_eq!(cart.items.len(), 1);
        assert_eq!(cart.items[0].quantity, 3);
        assert_eq!(cart.total, usd(597));
    }

    #[tokio::test(start_paused = true)]
    async fn test_overlapping_item_responses_reach_the_cart() {
        let store = CartStore::new(Deltas::new(&[("kale", 300), ("chard", 10)]), Currency::USD);

        let (kale, chard) = tokio::join!(
            store.add(item("kale", 199, 1)),
            store.add(item("chard", 150, 2))
        );
        assert_eq!(chard.unwrap().items.len(), 1);
        // The late kale line is reconciled by reloading the backend's cart.
        assert_eq!(kale.unwrap().total, usd(499));

        let ids: Vec<_> = store.snapshot().items.iter().map(|i| i.id.to_string()).collect();
        assert_eq!(ids.len(), 2);
        assert!(ids.contains(&"kale".to_string()));
        assert!(ids.contains(&"chard".to_string()));
        assert_eq!(store.snapshot(), store.gateway().server.lock().unwrap().clone());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_failure_does_not_replace_newer_success() {
        let gateway = Canned {
            fetch: (Duration::from_millis(300), Err(GatewayError::request_failed("503"))),
            add: (Duration::from_millis(10), Ok(cart_of(vec![item("kale", 199, 1)]))),
        };
        let store = CartStore::new(gateway, Currency::USD);

        let (fetched, added) = tokio::join!(store.refresh(), store.add(item("kale", 199, 1)));
        // The caller still hears about its own failure.
        assert_eq!(fetched, Err(GatewayError::RequestFailed("503".into())));
        assert!(added.is_ok());
        assert_eq!(store.last_error(), None);
        assert_eq!(store.snapshot().total, usd(199));
    }

    #[tokio::test(start_paused = true)]
    async fn test_newer_failure_survives_older_success() {
        let gateway = Canned {
            fetch: (Duration::from_millis(300), Ok(cart_of(vec![item("chard", 150, 2)]))),
            add: (Duration::from_millis(10), Err(GatewayError::request_failed("503"))),
        };
        let store = CartStore::new(gateway, Currency::USD);

        let (fetched, added) = tokio::join!(store.refresh(), store.add(item("kale", 199, 1)));
        assert!(fetched.is_ok());
        assert!(added.is_err());
        assert_eq!(store.snapshot().total, usd(300));
        assert_eq!(store.last_error(), Some(GatewayError::RequestFailed("503".into())));
    }

    #[tokio::test(start_paused = true)]
    async fn test_dispatch_makes_in_flight_responses_stale() {
        let gateway = MemoryGateway::default()
            .with_latency(Endpoint::AddToCart, Duration::from_millis(100));
        let store = CartStore::new(gateway, Currency::USD);

        let (added, dispatched) = tokio::join!(store.add(item("kale", 199, 1)), async {
            store.dispatch(CartAction::Add(item("chard", 150, 2)))
        });
        assert_eq!(dispatched.unwrap().total, usd(300));
        assert_eq!(added.unwrap().total, usd(300));
        assert!(store.snapshot().get_item(&"kale".into()).is_none());
    }

    #[test]
    fn test_dispatch_rejects_invalid_quantity_locally() {
        let store = CartStore::new(MemoryGateway::default(), Currency::USD);
        store.dispatch(CartAction::Add(item("kale", 199, 1))).unwrap();

        let err = store
            .dispatch(CartAction::UpdateQuantity {
                id: "kale".into(),
                quantity: 0,
            })
            .unwrap_err();
        assert_eq!(err, CommerceError::InvalidQuantity(0));
        assert_eq!(store.snapshot().total, usd(199));
        assert_eq!(store.last_error(), None);
    }

    #[tokio::test]
    async fn test_failure_keeps_cart_and_records_error() {
        let gateway = Arc::new(MemoryGateway::default());
        let store = CartStore::new(gateway.clone(), Currency::USD);
        store.add(item("kale", 199, 1)).await.unwrap();

        gateway.fail_next(GatewayError::request_failed("503"));
        assert!(store.remove(&"kale".into()).await.is_err());
        assert_eq!(store.snapshot().total, usd(199));
        assert_eq!(
            store.last_error(),
            Some(GatewayError::RequestFailed("503".into()))
        );

        store.refresh().await.unwrap();
        assert_eq!(store.last_error(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_makes_in_flight_responses_stale() {
        let gateway = MemoryGateway::default()
            .with_latency(Endpoint::AddToCart, Duration::from_millis(100));
        let store = CartStore::new(gateway, Currency::USD);

        let (cart, ()) = tokio::join!(store.add(item("kale", 199, 1)), async { store.clear() });
        assert!(cart.unwrap().is_empty());
        assert!(store.snapshot().is_empty());
    }

    #[tokio::test]
    async fn test_remote_voucher() {
        let store = CartStore::new(MemoryGateway::default(), Currency::USD);
        store.add(item("kale", 10000, 1)).await.unwrap();
        assert_eq!(store.apply_voucher_remote("SAVE10").await.unwrap(), usd(1000));
        assert!(store.apply_voucher_remote("BOGUS").await.is_err());
        assert!(store.last_error().is_some());
    }
}
