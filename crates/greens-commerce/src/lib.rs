//! Domain types and logic for the Global Greens storefront.
//!
//! - **Cart**: line items, totals and the reducer that mutates them
//! - **Voucher**: static voucher rules and the evaluator that prices them
//! - **Orders**: order history and seller dashboard summaries
//!
//! # Example
//!
//! ```rust
//! use greens_commerce::prelude::*;
//!
//! let usd = |cents| Money::new(cents, Currency::USD);
//! let mut cart = Cart::new(Currency::USD);
//! cart.add_item(CartItem::new("kale", "Curly Kale", usd(19900), 2).unwrap())
//!     .unwrap();
//! cart.add_item(CartItem::new("chard", "Rainbow Chard", usd(15000), 2).unwrap())
//!     .unwrap();
//! assert_eq!(cart.total.amount_cents, 69800);
//!
//! let book = VoucherBook::default();
//! let applied = book.evaluate("welcome", &cart.items).unwrap();
//! assert_eq!(applied.discount.amount_cents, 10470);
//! ```

pub mod error;
pub mod ids;
pub mod money;

pub mod cart;
pub mod orders;
pub mod voucher;

pub use cart::{Cart, CartAction, CartItem};
pub use error::CommerceError;
pub use ids::*;
pub use money::{Currency, Money};
pub use orders::{OrderStats, OrderSummary};
pub use voucher::{VoucherApplication, VoucherBook, VoucherError, VoucherRule};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::error::CommerceError;
    pub use crate::ids::*;
    pub use crate::money::{Currency, Money};

    pub use crate::cart::{Cart, CartAction, CartItem, MAX_QUANTITY_PER_ITEM};
    pub use crate::orders::{monthly_revenue, OrderStats, OrderSummary};
    pub use crate::voucher::{
        VoucherApplication, VoucherBook, VoucherError, VoucherKind, VoucherRule,
    };
}
