//! Async voucher application.
//!
//! Each `apply` call takes a ticket before it starts waiting. When calls
//! overlap, only the most recently issued ticket may commit its result;
//! older completions are dropped.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use greens_commerce::{CartItem, Currency, Money, VoucherApplication, VoucherBook, VoucherError};
use serde::Serialize;

/// Default simulated evaluation latency.
pub const DEFAULT_VOUCHER_LATENCY: Duration = Duration::from_millis(500);

/// Identifies one `apply` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VoucherTicket(u64);

impl VoucherTicket {
    pub fn value(&self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VoucherStatus {
    Idle,
    Applying,
    Applied,
    Rejected,
}

/// What the storefront shows next to the voucher input.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoucherSnapshot {
    pub status: VoucherStatus,
    /// Ticket of the call that produced this state (0 before any call).
    pub ticket: u64,
    pub code: String,
    pub subtotal: Money,
    pub discount: Money,
    /// Display text of the last rejection.
    pub error: Option<String>,
}

impl VoucherSnapshot {
    fn idle(currency: Currency) -> Self {
        Self {
            status: VoucherStatus::Idle,
            ticket: 0,
            code: String::new(),
            subtotal: Money::zero(currency),
            discount: Money::zero(currency),
            error: None,
        }
    }

    pub fn is_applying(&self) -> bool {
        self.status == VoucherStatus::Applying
    }
}

/// Applies vouchers from a [`VoucherBook`] with last-issued-wins semantics.
pub struct VoucherController {
    book: Arc<VoucherBook>,
    currency: Currency,
    latency: Duration,
    issued: AtomicU64,
    state: Mutex<VoucherSnapshot>,
}

impl VoucherController {
    pub fn new(book: Arc<VoucherBook>, currency: Currency) -> Self {
        Self {
            book,
            currency,
            latency: DEFAULT_VOUCHER_LATENCY,
            issued: AtomicU64::new(0),
            state: Mutex::new(VoucherSnapshot::idle(currency)),
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn book(&self) -> &VoucherBook {
        &self.book
    }

    /// Issue a new ticket and mark the voucher as applying.
    pub fn begin(&self, code: &str) -> VoucherTicket {
        let ticket = VoucherTicket(self.issued.fetch_add(1, Ordering::SeqCst) + 1);
        let mut state = self.lock();
        state.status = VoucherStatus::Applying;
        state.ticket = ticket.0;
        state.code = code.trim().to_string();
        state.error = None;
        ticket
    }

    /// Commit a result if `ticket` is still the newest one issued.
    ///
    /// Returns `false` and leaves the state alone for a stale ticket.
    pub fn finish(
        &self,
        ticket: VoucherTicket,
        result: &Result<VoucherApplication, VoucherError>,
    ) -> bool {
        let mut state = self.lock();
        if ticket.0 != self.issued.load(Ordering::SeqCst) {
            tracing::debug!(ticket = ticket.0, "dropping stale voucher result");
            return false;
        }

        state.ticket = ticket.0;
        match result {
            Ok(applied) => {
                state.status = VoucherStatus::Applied;
                state.code = applied.code.clone();
                state.subtotal = applied.subtotal;
                state.discount = applied.discount;
                state.error = None;
            }
            Err(e) => {
                state.status = VoucherStatus::Rejected;
                state.subtotal = Money::zero(self.currency);
                state.discount = Money::zero(self.currency);
                state.error = Some(e.to_string());
            }
        }
        true
    }

    /// Evaluate `code` against `selected` after the configured latency.
    ///
    /// Returns `None` when a newer call superseded this one.
    pub async fn apply(
        &self,
        code: &str,
        selected: Vec<CartItem>,
    ) -> Option<Result<VoucherApplication, VoucherError>> {
        let ticket = self.begin(code);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let result = self.book.evaluate(code, &selected);
        if let Err(e) = &result {
            tracing::info!(code = %code.trim(), error = %e, "voucher rejected");
        }
        self.finish(ticket, &result).then_some(result)
    }

    /// Forget any applied voucher. In-flight calls become stale.
    pub fn reset(&self) {
        self.issued.fetch_add(1, Ordering::SeqCst);
        *self.lock() = VoucherSnapshot::idle(self.currency);
    }

    pub fn snapshot(&self) -> VoucherSnapshot {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, VoucherSnapshot> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn usd(cents: i64) -> Money {
        Money::new(cents, Currency::USD)
    }

    fn line(id: &str, cents: i64, qty: i64) -> CartItem {
        CartItem::new(id, id, usd(cents), qty).unwrap()
    }

    fn controller() -> VoucherController {
        VoucherController::new(Arc::new(VoucherBook::builtin(Currency::USD)), Currency::USD)
    }

    #[tokio::test(start_paused = true)]
    async fn test_apply_save10() {
        let vouchers = controller();
        let result = vouchers.apply("save10", vec![line("a", 10000, 1)]).await;
        assert_eq!(result.unwrap().unwrap().discount, usd(1000));

        let snap = vouchers.snapshot();
        assert_eq!(snap.status, VoucherStatus::Applied);
        assert_eq!(snap.code, "SAVE10");
        assert_eq!(snap.discount, usd(1000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_fixed_amount_capped_at_subtotal() {
        let vouchers = controller();
        vouchers.apply("FIXED15", vec![line("a", 1000, 1)]).await;
        assert_eq!(vouchers.snapshot().discount, usd(1000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejection_resets_discount() {
        let vouchers = controller();
        vouchers.apply("SAVE10", vec![line("a", 10000, 1)]).await;
        vouchers.apply("BOGUS", vec![line("a", 10000, 1)]).await;

        let snap = vouchers.snapshot();
        assert_eq!(snap.status, VoucherStatus::Rejected);
        assert!(snap.discount.is_zero());
        assert_eq!(snap.error.as_deref(), Some("Invalid voucher code: BOGUS"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_selection() {
        let vouchers = controller();
        let result = vouchers.apply("SAVE10", Vec::new()).await;
        assert_eq!(result, Some(Err(VoucherError::NoItemsSelected)));
        assert_eq!(
            vouchers.snapshot().error.as_deref(),
            Some("Please select items to apply the voucher")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_applying_while_waiting() {
        let vouchers = Arc::new(controller());
        let task = tokio::spawn({
            let vouchers = vouchers.clone();
            async move { vouchers.apply("SAVE10", vec![line("a", 100, 1)]).await }
        });
        tokio::task::yield_now().await;
        assert!(vouchers.snapshot().is_applying());

        task.await.unwrap();
        assert_eq!(vouchers.snapshot().status, VoucherStatus::Applied);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_completion_does_not_overwrite() {
        let vouchers = controller();
        let items = vec![line("a", 10000, 1)];

        // The first call starts first and is superseded by the second.
        let (first, second) = tokio::join!(
            vouchers.apply("SAVE10", items.clone()),
            vouchers.apply("WELCOME", items.clone()),
        );
        assert_eq!(first, None);
        assert_eq!(second.unwrap().unwrap().discount, usd(1500));

        let snap = vouchers.snapshot();
        assert_eq!(snap.code, "WELCOME");
        assert_eq!(snap.discount, usd(1500));
        assert_eq!(snap.ticket, 2);
    }

    #[test]
    fn test_finish_with_stale_ticket() {
        let vouchers = controller();
        let old = vouchers.begin("SAVE10");
        let new = vouchers.begin("WELCOME");
        assert!(new > old);

        let book = VoucherBook::builtin(Currency::USD);
        let items = [line("a", 10000, 1)];
        assert!(!vouchers.finish(old, &book.evaluate("SAVE10", &items)));
        assert!(vouchers.snapshot().is_applying());
        assert!(vouchers.finish(new, &book.evaluate("WELCOME", &items)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_makes_in_flight_call_stale() {
        let vouchers = Arc::new(controller());
        let task = tokio::spawn({
            let vouchers = vouchers.clone();
            async move { vouchers.apply("SAVE10", vec![line("a", 100, 1)]).await }
        });
        tokio::task::yield_now().await;
        vouchers.reset();

        assert_eq!(task.await.unwrap(), None);
        assert_eq!(vouchers.snapshot().status, VoucherStatus::Idle);
    }
}
