//! Backend routes consumed by the storefront.

use std::fmt;

use greens_commerce::ProductId;
use reqwest::Method;

/// The backend routes, each with its method and retry semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    /// `GET /cart`
    FetchCart,
    /// `POST /cart/add`
    AddToCart,
    /// `PUT /cart/update`
    UpdateQuantity,
    /// `DELETE /cart/remove/:productId`
    RemoveFromCart,
    /// `POST /cart/voucher`
    ApplyVoucher,
    /// `GET /orders/`
    FetchOrders,
}

impl Endpoint {
    pub fn method(&self) -> Method {
        match self {
            Self::FetchCart | Self::FetchOrders => Method::GET,
            Self::AddToCart | Self::ApplyVoucher => Method::POST,
            Self::UpdateQuantity => Method::PUT,
            Self::RemoveFromCart => Method::DELETE,
        }
    }

    /// Path relative to the API base URL.
    ///
    /// `product` is only used by [`Endpoint::RemoveFromCart`].
    pub fn path(&self, product: Option<&ProductId>) -> String {
        match self {
            Self::FetchCart => "/cart".to_string(),
            Self::AddToCart => "/cart/add".to_string(),
            Self::UpdateQuantity => "/cart/update".to_string(),
            Self::RemoveFromCart => format!(
                "/cart/remove/{}",
                product.map(|p| encode_segment(p.as_str())).unwrap_or_default()
            ),
            Self::ApplyVoucher => "/cart/voucher".to_string(),
            Self::FetchOrders => "/orders/".to_string(),
        }
    }

    /// Whether repeating the request cannot change the outcome.
    ///
    /// Only idempotent requests are retried.
    pub fn is_idempotent(&self) -> bool {
        !matches!(self, Self::AddToCart | Self::ApplyVoucher)
    }

    /// Name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::FetchCart => "fetch_cart",
            Self::AddToCart => "add_to_cart",
            Self::UpdateQuantity => "update_quantity",
            Self::RemoveFromCart => "remove_from_cart",
            Self::ApplyVoucher => "apply_voucher",
            Self::FetchOrders => "fetch_orders",
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Percent-encode everything outside the RFC 3986 unreserved set.
fn encode_segment(segment: &str) -> String {
    let mut out = String::with_capacity(segment.len());
    for b in segment.bytes() {
        if b.is_ascii_alphanumeric() || matches!(b, b'-' | b'.' | b'_' | b'~') {
            out.push(b as char);
        } else {
            out.push_str(&format!("%{:02X}", b));
        }
    }
    out
}
