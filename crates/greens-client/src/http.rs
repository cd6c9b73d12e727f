//! HTTP gateway to the storefront backend.

use std::sync::Arc;

use async_trait::async_trait;
use greens_auth::{AuthSession, TokenProvider, UnauthorizedHook};
use greens_commerce::{Cart, CartItem, Currency, Money, OrderSummary, ProductId};
use reqwest::header::AUTHORIZATION;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::config::GatewayConfig;
use crate::endpoint::Endpoint;
use crate::error::GatewayError;
use crate::gateway::{CartGateway, CartUpdate};
use crate::payload::{
    AddResponse, AddToCartBody, CartItemPayload, CartPayload, OrderPayload, UpdateQuantityBody,
    VoucherBody, VoucherResponse,
};
use crate::retry::{AttemptFailure, RetryPolicy};

/// How a response status is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StatusClass {
    Success,
    Unauthorized,
    Failed,
}

pub(crate) fn classify_status(status: StatusCode) -> StatusClass {
    if status == StatusCode::UNAUTHORIZED {
        StatusClass::Unauthorized
    } else if status.is_success() {
        StatusClass::Success
    } else {
        StatusClass::Failed
    }
}

/// reqwest-backed [`CartGateway`].
///
/// Attaches the session's bearer token to every request. A 401 runs the
/// unauthorized hook (normally a session logout) and surfaces as
/// [`GatewayError::Unauthorized`].
pub struct HttpGateway {
    client: Client,
    base_url: String,
    currency: Currency,
    retry: RetryPolicy,
    tokens: Arc<dyn TokenProvider>,
    on_unauthorized: Arc<dyn UnauthorizedHook>,
}

impl HttpGateway {
    /// Create a gateway bound to a session.
    pub fn new(config: &GatewayConfig, session: Arc<AuthSession>) -> Result<Self, GatewayError> {
        Self::with_hooks(config, session.clone(), session)
    }

    /// Create a gateway with separate token source and 401 handler.
    pub fn with_hooks(
        config: &GatewayConfig,
        tokens: Arc<dyn TokenProvider>,
        on_unauthorized: Arc<dyn UnauthorizedHook>,
    ) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout())
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| GatewayError::request_failed(format!("building HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            currency: config.currency,
            retry: config.retry_policy(),
            tokens,
            on_unauthorized,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn send<B, T>(
        &self,
        endpoint: Endpoint,
        product: Option<&ProductId>,
        body: Option<&B>,
    ) -> Result<T, GatewayError>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, endpoint.path(product));
        let mut attempt = 0;

        loop {
            let mut request = self.client.request(endpoint.method(), &url);
            if let Some(token) = self.tokens.bearer_token() {
                request = request.header(AUTHORIZATION, token.header_value());
            }
            if let Some(body) = body {
                request = request.json(body);
            }

            tracing::debug!(endpoint = %endpoint, %url, attempt, "sending request");

            let failure = match request.send().await {
                Ok(response) => match classify_status(response.status()) {
                    StatusClass::Success => {
                        return response.json::<T>().await.map_err(|e| {
                            tracing::warn!(
                                endpoint = %endpoint,
                                error = %e,
                                "undecodable response"
                            );
                            GatewayError::request_failed(format!(
                                "{endpoint}: invalid response body"
                            ))
                        });
                    }
                    StatusClass::Unauthorized => {
                        tracing::warn!(endpoint = %endpoint, "backend answered 401, logging out");
                        self.on_unauthorized.on_unauthorized();
                        return Err(GatewayError::Unauthorized);
                    }
                    StatusClass::Failed => AttemptFailure::Status(response.status().as_u16()),
                },
                Err(e) if e.is_timeout() => AttemptFailure::Timeout,
                Err(e) if e.is_connect() => AttemptFailure::Connection,
                Err(e) => {
                    tracing::warn!(endpoint = %endpoint, error = %e, "request error");
                    return Err(GatewayError::request_failed(format!("{endpoint}: {e}")));
                }
            };

            if endpoint.is_idempotent() && self.retry.should_retry(failure, attempt) {
                let delay = self.retry.backoff.delay_for_attempt(attempt);
                tracing::debug!(endpoint = %endpoint, ?failure, ?delay, "retrying");
                tokio::time::sleep(delay).await;
                attempt += 1;
                continue;
            }

            tracing::warn!(
                endpoint = %endpoint,
                ?failure,
                attempts = attempt + 1,
                "request failed"
            );
            return Err(GatewayError::request_failed(describe(endpoint, failure)));
        }
    }
}

fn describe(endpoint: Endpoint, failure: AttemptFailure) -> String {
    match failure {
        AttemptFailure::Status(status) => format!("{endpoint}: HTTP {status}"),
        AttemptFailure::Timeout => format!("{endpoint}: timed out"),
        AttemptFailure::Connection => format!("{endpoint}: could not connect"),
    }
}

#[async_trait]
impl CartGateway for HttpGateway {
    async fn fetch_cart(&self) -> Result<Cart, GatewayError> {
        let payload: CartPayload = self.send::<(), _>(Endpoint::FetchCart, None, None).await?;
        Ok(payload.into_cart(self.currency)?)
    }

    async fn add_to_cart(&self, item: &CartItem) -> Result<CartUpdate, GatewayError> {
        let body = AddToCartBody {
            product: CartItemPayload::from_item(item),
        };
        let response: AddResponse = self.send(Endpoint::AddToCart, None, Some(&body)).await?;
        Ok(match response {
            AddResponse::Cart(cart) => CartUpdate::Cart(cart.into_cart(self.currency)?),
            AddResponse::Item(item) => CartUpdate::Item(item.into_item(self.currency)?),
        })
    }

    async fn update_quantity(&self, id: &ProductId, quantity: i64) -> Result<Cart, GatewayError> {
        let body = UpdateQuantityBody {
            product_id: id,
            quantity,
        };
        let payload: CartPayload = self.send(Endpoint::UpdateQuantity, None, Some(&body)).await?;
        Ok(payload.into_cart(self.currency)?)
    }

    async fn remove_from_cart(&self, id: &ProductId) -> Result<Cart, GatewayError> {
        let payload: CartPayload = self
            .send::<(), _>(Endpoint::RemoveFromCart, Some(id), None)
            .await?;
        Ok(payload.into_cart(self.currency)?)
    }

    async fn apply_voucher(&self, code: &str) -> Result<Money, GatewayError> {
        let body = VoucherBody { code };
        let response: VoucherResponse = self.send(Endpoint::ApplyVoucher, None, Some(&body)).await?;
        Ok(Money::from_decimal(response.discount, self.currency)?)
    }

    async fn fetch_orders(&self) -> Result<Vec<OrderSummary>, GatewayError> {
        let payload: Vec<OrderPayload> = self
            .send::<(), _>(Endpoint::FetchOrders, None, None)
            .await?;
        payload
            .into_iter()
            .map(|o| o.into_summary(self.currency))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_status() {
        assert_eq!(classify_status(StatusCode::OK), StatusClass::Success);
        assert_eq!(classify_status(StatusCode::CREATED), StatusClass::Success);
        assert_eq!(classify_status(StatusCode::UNAUTHORIZED), StatusClass::Unauthorized);
        assert_eq!(classify_status(StatusCode::FORBIDDEN), StatusClass::Failed);
        assert_eq!(classify_status(StatusCode::BAD_GATEWAY), StatusClass::Failed);
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let gateway = HttpGateway::new(
            &GatewayConfig::new("http://localhost:5000/api/"),
            Arc::new(AuthSession::new()),
        )
        .unwrap();
        assert_eq!(gateway.base_url(), "http://localhost:5000/api");
    }
}
