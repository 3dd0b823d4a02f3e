//! HTTP binding of the remote cart service.
//!
//! # Wire Format
//!
//! - `GET /cart` - fetch the cart, returns `{"items": [...]}`
//! - `POST /cart/items` - add a product, body `{"productId", "quantity"}`
//! - `PUT /cart/items/{id}` - set a line quantity, body `{"quantity"}`
//! - `DELETE /cart/items/{id}` - remove a line
//! - `DELETE /cart` - empty the cart
//!
//! Every request carries the session bearer token. A missing token fails
//! immediately with [`RemoteCartError::Unauthorized`] without touching the
//! network; `401`/`403` responses map to the same error so the caller can
//! invalidate the session.

use std::sync::Arc;

use async_trait::async_trait;
use cartsync_core::{ItemId, ProductId};
use reqwest::{RequestBuilder, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use tracing::instrument;

use crate::config::RemoteConfig;
use crate::session::SessionProvider;

use super::{CartPayload, RemoteCart, RemoteCartError};

// =============================================================================
// HttpCartClient
// =============================================================================

/// HTTP client for the remote cart service.
#[derive(Clone)]
pub struct HttpCartClient {
    inner: Arc<HttpCartClientInner>,
}

struct HttpCartClientInner {
    client: reqwest::Client,
    base: String,
    session: Arc<dyn SessionProvider>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AddItemRequest<'a> {
    product_id: &'a ProductId,
    quantity: u32,
}

#[derive(Serialize)]
struct UpdateQuantityRequest {
    quantity: u32,
}

impl HttpCartClient {
    /// Create a client for the configured service.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteCartError::Http`] when the underlying HTTP client
    /// cannot be constructed.
    pub fn new(
        config: &RemoteConfig,
        session: Arc<dyn SessionProvider>,
    ) -> Result<Self, RemoteCartError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        // Url normalizes an empty path to "/"; drop it so joins stay clean
        let base = config.base_url.as_str().trim_end_matches('/').to_string();

        Ok(Self {
            inner: Arc::new(HttpCartClientInner {
                client,
                base,
                session,
            }),
        })
    }

    fn bearer_token(&self) -> Result<SecretString, RemoteCartError> {
        self.inner
            .session
            .access_token()
            .ok_or(RemoteCartError::Unauthorized)
    }

    /// Attach the session token, send, and map non-success statuses.
    async fn send(&self, request: RequestBuilder) -> Result<reqwest::Response, RemoteCartError> {
        let token = self.bearer_token()?;
        let response = request.bearer_auth(token.expose_secret()).send().await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(RemoteCartError::Unauthorized);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(
                status = %status,
                body = %body.chars().take(500).collect::<String>(),
                "cart service returned non-success status"
            );
            return Err(RemoteCartError::Service {
                status: status.as_u16(),
                message: body.chars().take(200).collect(),
            });
        }

        Ok(response)
    }
}

#[async_trait]
impl RemoteCart for HttpCartClient {
    #[instrument(skip(self))]
    async fn load(&self) -> Result<CartPayload, RemoteCartError> {
        let url = format!("{}/cart", self.inner.base);
        let response = self.send(self.inner.client.get(&url)).await?;

        // Get the body as text first for better error diagnostics
        let text = response.text().await?;
        match serde_json::from_str(&text) {
            Ok(payload) => Ok(payload),
            Err(e) => {
                tracing::error!(
                    error = %e,
                    body = %text.chars().take(500).collect::<String>(),
                    "failed to parse cart payload"
                );
                Err(RemoteCartError::Parse(e))
            }
        }
    }

    #[instrument(skip(self), fields(product_id = %product_id))]
    async fn add(&self, product_id: &ProductId, quantity: u32) -> Result<(), RemoteCartError> {
        let url = format!("{}/cart/items", self.inner.base);
        let body = AddItemRequest {
            product_id,
            quantity,
        };
        self.send(self.inner.client.post(&url).json(&body)).await?;
        Ok(())
    }

    #[instrument(skip(self), fields(item_id = %item_id))]
    async fn remove(&self, item_id: &ItemId) -> Result<(), RemoteCartError> {
        let url = format!("{}/cart/items/{item_id}", self.inner.base);
        self.send(self.inner.client.delete(&url)).await?;
        Ok(())
    }

    #[instrument(skip(self), fields(item_id = %item_id))]
    async fn set_quantity(&self, item_id: &ItemId, quantity: u32) -> Result<(), RemoteCartError> {
        let url = format!("{}/cart/items/{item_id}", self.inner.base);
        let body = UpdateQuantityRequest { quantity };
        self.send(self.inner.client.put(&url).json(&body)).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn clear(&self) -> Result<(), RemoteCartError> {
        let url = format!("{}/cart", self.inner.base);
        self.send(self.inner.client.delete(&url)).await?;
        Ok(())
    }
}
