//! Backend access and async state for the storefront client.
//!
//! This crate provides:
//! - `CartGateway` - the REST boundary, with `HttpGateway` and `MemoryGateway`
//! - `Endpoint` - the backend routes and their retry semantics
//! - `RetryPolicy` - retry strategies for idempotent requests
//! - `CartStore` - the cart state fed by gateway responses, stale-safe
//! - `VoucherController` - async voucher application with last-issued-wins

mod config;
mod endpoint;
mod error;
mod gateway;
mod http;
mod memory;
mod payload;
mod retry;
mod store;
mod voucher;

pub use config::GatewayConfig;
pub use endpoint::Endpoint;
pub use error::GatewayError;
pub use gateway::{CartGateway, CartUpdate};
pub use http::HttpGateway;
pub use memory::MemoryGateway;
pub use payload::{CartItemPayload, CartPayload, OrderPayload, VoucherResponse};
pub use retry::{BackoffStrategy, RetryCondition, RetryPolicy};
pub use store::CartStore;
pub use voucher::{
    VoucherController, VoucherSnapshot, VoucherStatus, VoucherTicket, DEFAULT_VOUCHER_LATENCY,
};
