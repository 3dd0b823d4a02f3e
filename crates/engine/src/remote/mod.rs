//! Remote cart service client.
//!
//! The engine talks to the remote through the [`RemoteCart`] trait. The
//! production binding is [`HttpCartClient`]; tests inject [`MockCartService`].
//!
//! The remote is authoritative for authenticated carts. Adding a product the
//! server already holds a line for accumulates quantity on that line rather
//! than creating a duplicate, which is what makes cart migration replay
//! idempotent at the product level.

pub mod http;
pub mod mock;

pub use http::HttpCartClient;
pub use mock::MockCartService;

use async_trait::async_trait;
use cartsync_core::{CartItem, ItemId, ProductId};
use serde::Deserialize;
use thiserror::Error;

/// Errors that can occur when talking to the remote cart service.
#[derive(Debug, Error)]
pub enum RemoteCartError {
    /// HTTP transport failed (connect, timeout, TLS).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// No session token was available, or the remote rejected it.
    #[error("Unauthorized")]
    Unauthorized,

    /// The service answered with a non-success status.
    #[error("Service error {status}: {message}")]
    Service {
        /// HTTP status code.
        status: u16,
        /// Truncated response body.
        message: String,
    },

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Full cart contents as reported by the remote.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartPayload {
    /// Cart lines, in server order.
    #[serde(default)]
    pub items: Vec<CartItem>,
}

/// Operations the remote cart service offers.
///
/// Mutations return no payload; the engine trusts its optimistic local state
/// and reconciles on the next [`RemoteCart::load`].
#[async_trait]
pub trait RemoteCart: Send + Sync {
    /// Fetch the authenticated user's cart.
    async fn load(&self) -> Result<CartPayload, RemoteCartError>;

    /// Add `quantity` units of a product.
    async fn add(&self, product_id: &ProductId, quantity: u32) -> Result<(), RemoteCartError>;

    /// Remove a cart line.
    async fn remove(&self, item_id: &ItemId) -> Result<(), RemoteCartError>;

    /// Set the quantity of a cart line.
    async fn set_quantity(&self, item_id: &ItemId, quantity: u32) -> Result<(), RemoteCartError>;

    /// Delete every line in the cart.
    async fn clear(&self) -> Result<(), RemoteCartError>;
}
